//! Append-only audit trail for tickets.
//!
//! Ticket writes call the `record_*` functions with the transaction they
//! already hold, so the history row commits or rolls back together with the
//! ticket change.

use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::{ticket, ticket_history},
    errors::ServiceError,
    services::validation::validate_not_blank,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Fields that never produce history rows.
pub const IGNORED_FIELDS: &[&str] = &[
    "id",
    "tenant_id",
    "number",
    "created_at",
    "updated_at",
    "created_by",
    "updated_by",
    "is_active",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HistoryAction {
    Created,
    Updated,
    StatusChanged,
    PriorityChanged,
    Assigned,
    Deleted,
    NoteAdded,
    Viewed,
}

impl HistoryAction {
    /// Classifies a changed ticket field.
    pub fn for_field(field: &str) -> Self {
        match field {
            "status" => HistoryAction::StatusChanged,
            "priority" => HistoryAction::PriorityChanged,
            "assigned_to_id" => HistoryAction::Assigned,
            _ => HistoryAction::Updated,
        }
    }
}

/// One field that differs between two ticket snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
    pub action: HistoryAction,
}

impl FieldChange {
    pub fn description(&self) -> String {
        let old = display_value(&self.old_value);
        let new = display_value(&self.new_value);
        match self.action {
            HistoryAction::StatusChanged => format!("Status changed from {} to {}", old, new),
            HistoryAction::PriorityChanged => format!("Priority changed from {} to {}", old, new),
            HistoryAction::Assigned if self.new_value.is_null() => {
                format!("Assignment removed (was {})", old)
            }
            HistoryAction::Assigned => format!("Ticket assigned to {}", new),
            _ => format!("Field '{}' changed from {} to {}", self.field, old, new),
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "(empty)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Column representation of a JSON value: strings stay bare, null becomes NULL.
fn stored_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Compares two ticket snapshots field by field.
///
/// Walks the union of keys of both objects, skipping [`IGNORED_FIELDS`].
/// A missing key and an explicit `null` are the same value. Results are
/// ordered by field name. Non-object inputs are treated as empty objects.
pub fn diff_ticket(old: &Value, new: &Value) -> Vec<FieldChange> {
    let empty = Map::new();
    let old_map = old.as_object().unwrap_or(&empty);
    let new_map = new.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = old_map.keys().chain(new_map.keys()).collect();

    keys.into_iter()
        .filter(|key| !IGNORED_FIELDS.contains(&key.as_str()))
        .filter_map(|key| {
            let before = old_map.get(key).unwrap_or(&Value::Null);
            let after = new_map.get(key).unwrap_or(&Value::Null);
            if before == after {
                return None;
            }
            Some(FieldChange {
                field: key.clone(),
                old_value: before.clone(),
                new_value: after.clone(),
                action: HistoryAction::for_field(key),
            })
        })
        .collect()
}

/// Who performed a change and from where.
#[derive(Debug, Clone, Default)]
pub struct AuditContext {
    pub performed_by_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn history_row(
    ctx: &TenantContext,
    ticket_id: Uuid,
    action: HistoryAction,
    description: String,
    audit: &AuditContext,
) -> ticket_history::ActiveModel {
    ticket_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(ctx.tenant_id),
        ticket_id: Set(ticket_id),
        action_type: Set(action.to_string()),
        field_name: Set(None),
        old_value: Set(None),
        new_value: Set(None),
        description: Set(description),
        performed_by: Set(ctx.user_id),
        performed_by_name: Set(audit
            .performed_by_name
            .clone()
            .or_else(|| ctx.email.clone())),
        ip_address: Set(audit.ip_address.clone()),
        user_agent: Set(audit.user_agent.clone()),
        metadata: Set(json!({})),
        created_at: Set(Utc::now()),
    }
}

pub async fn record_created<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    ticket: &ticket::Model,
    audit: &AuditContext,
) -> Result<ticket_history::Model, ServiceError> {
    let mut row = history_row(
        ctx,
        ticket.id,
        HistoryAction::Created,
        format!("Ticket {} created", ticket.number),
        audit,
    );
    row.metadata = Set(json!({
        "number": ticket.number,
        "status": ticket.status,
        "priority": ticket.priority,
    }));
    counter!("helpdesk_ticket_history.rows", 1);
    Ok(row.insert(conn).await?)
}

/// Writes one row per change. Returns the number of rows written.
pub async fn record_changes<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    ticket_id: Uuid,
    changes: &[FieldChange],
    audit: &AuditContext,
) -> Result<usize, ServiceError> {
    for change in changes {
        let mut row = history_row(ctx, ticket_id, change.action, change.description(), audit);
        row.field_name = Set(Some(change.field.clone()));
        row.old_value = Set(stored_value(&change.old_value));
        row.new_value = Set(stored_value(&change.new_value));
        row.insert(conn).await?;
    }
    counter!("helpdesk_ticket_history.rows", changes.len() as u64);
    debug!(%ticket_id, changes = changes.len(), "ticket changes recorded");
    Ok(changes.len())
}

pub async fn record_deleted<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    ticket: &ticket::Model,
    audit: &AuditContext,
) -> Result<ticket_history::Model, ServiceError> {
    let row = history_row(
        ctx,
        ticket.id,
        HistoryAction::Deleted,
        format!("Ticket {} deleted", ticket.number),
        audit,
    );
    counter!("helpdesk_ticket_history.rows", 1);
    Ok(row.insert(conn).await?)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"note": "Called the customer, waiting for logs"}))]
pub struct AddNoteInput {
    #[validate(length(min = 1, max = 5000), custom = "validate_not_blank")]
    pub note: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistorySummary {
    pub ticket_id: Uuid,
    pub total: u64,
    pub by_action: BTreeMap<String, u64>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Reads and annotates ticket history
#[derive(Clone)]
pub struct TicketHistoryService {
    schemas: Arc<TenantSchemas>,
}

impl TicketHistoryService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    async fn ensure_ticket<C: ConnectionTrait>(
        conn: &C,
        ctx: &TenantContext,
        ticket_id: Uuid,
    ) -> Result<ticket::Model, ServiceError> {
        ticket::Entity::find_by_id(ticket_id)
            .filter(ticket::Column::TenantId.eq(ctx.tenant_id))
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Ticket", ticket_id))
    }

    /// History rows for a ticket, oldest first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list(
        &self,
        ctx: &TenantContext,
        ticket_id: Uuid,
        action: Option<HistoryAction>,
    ) -> Result<Vec<ticket_history::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        Self::ensure_ticket(&txn, ctx, ticket_id).await?;

        let mut query = ticket_history::Entity::find()
            .filter(ticket_history::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_history::Column::TicketId.eq(ticket_id));
        if let Some(action) = action {
            query = query.filter(ticket_history::Column::ActionType.eq(action.to_string()));
        }
        let rows = query
            .order_by_asc(ticket_history::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn summary(
        &self,
        ctx: &TenantContext,
        ticket_id: Uuid,
    ) -> Result<HistorySummary, ServiceError> {
        let rows = self.list(ctx, ticket_id, None).await?;

        let mut by_action = BTreeMap::new();
        for row in &rows {
            *by_action.entry(row.action_type.clone()).or_insert(0u64) += 1;
        }

        Ok(HistorySummary {
            ticket_id,
            total: rows.len() as u64,
            by_action,
            last_activity_at: rows.last().map(|row| row.created_at),
        })
    }

    /// Appends a free-text note to a ticket's history
    #[instrument(skip(self, ctx, input, audit), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_note(
        &self,
        ctx: &TenantContext,
        ticket_id: Uuid,
        input: AddNoteInput,
        audit: &AuditContext,
    ) -> Result<ticket_history::Model, ServiceError> {
        input.validate()?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        Self::ensure_ticket(&txn, ctx, ticket_id).await?;

        let mut row = history_row(ctx, ticket_id, HistoryAction::NoteAdded, input.note, audit);
        if let Some(metadata) = input.metadata {
            row.metadata = Set(metadata);
        }
        let note = row.insert(&txn).await?;
        txn.commit().await?;

        counter!("helpdesk_ticket_history.rows", 1);
        Ok(note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn identical_snapshots_produce_no_changes() {
        let ticket = json!({"subject": "Printer", "tags": ["a", "b"], "custom_fields": {"x": 1}});
        assert!(diff_ticket(&ticket, &ticket.clone()).is_empty());
    }

    #[test]
    fn ignored_fields_are_skipped() {
        let old = json!({"id": "1", "updated_at": "t1", "updated_by": "u1", "is_active": true});
        let new = json!({"id": "2", "updated_at": "t2", "updated_by": "u2", "is_active": false});
        assert!(diff_ticket(&old, &new).is_empty());
    }

    #[test]
    fn null_and_missing_are_equal() {
        let old = json!({"description": null});
        let new = json!({});
        assert!(diff_ticket(&old, &new).is_empty());
        assert!(diff_ticket(&new, &old).is_empty());
    }

    #[test]
    fn changes_are_sorted_by_field_and_classified() {
        let old = json!({
            "subject": "A",
            "status": "open",
            "priority": "low",
            "assigned_to_id": null,
        });
        let new = json!({
            "subject": "B",
            "status": "resolved",
            "priority": "high",
            "assigned_to_id": "9b2f4a1e-0000-0000-0000-000000000001",
        });

        let changes = diff_ticket(&old, &new);
        let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["assigned_to_id", "priority", "status", "subject"]);

        let actions: Vec<_> = changes.iter().map(|c| c.action).collect();
        assert_eq!(
            actions,
            vec![
                HistoryAction::Assigned,
                HistoryAction::PriorityChanged,
                HistoryAction::StatusChanged,
                HistoryAction::Updated,
            ]
        );
        assert_eq!(changes[2].description(), "Status changed from open to resolved");
    }

    #[test]
    fn arrays_and_objects_compare_structurally() {
        let old = json!({"tags": ["a", "b"], "custom_fields": {"k": 1}});
        let new = json!({"tags": ["b", "a"], "custom_fields": {"k": 1}});
        let changes = diff_ticket(&old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "tags");
        assert_eq!(stored_value(&changes[0].new_value).as_deref(), Some("[\"b\",\"a\"]"));
    }

    #[test]
    fn added_and_removed_keys_are_reported() {
        let old = json!({"impact": "low"});
        let new = json!({"urgency": "high"});
        let changes = diff_ticket(&old, &new);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "impact");
        assert!(changes[0].new_value.is_null());
        assert_eq!(changes[1].field, "urgency");
        assert!(changes[1].old_value.is_null());
    }

    #[rstest]
    #[case("status", HistoryAction::StatusChanged)]
    #[case("priority", HistoryAction::PriorityChanged)]
    #[case("assigned_to_id", HistoryAction::Assigned)]
    #[case("subject", HistoryAction::Updated)]
    #[case("tags", HistoryAction::Updated)]
    fn field_classification(#[case] field: &str, #[case] expected: HistoryAction) {
        assert_eq!(HistoryAction::for_field(field), expected);
    }

    #[test]
    fn unassignment_has_its_own_description() {
        let change = FieldChange {
            field: "assigned_to_id".into(),
            old_value: json!("agent-1"),
            new_value: Value::Null,
            action: HistoryAction::Assigned,
        };
        assert_eq!(change.description(), "Assignment removed (was agent-1)");
        assert_eq!(stored_value(&change.new_value), None);
    }
}
