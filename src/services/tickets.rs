use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::ticket,
    errors::ServiceError,
    services::{
        ticket_hierarchy::validate_classification,
        ticket_history::{self, diff_ticket, AuditContext},
        validation::validate_not_blank,
        Page,
    },
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::{Condition, Expr, Func, SimpleExpr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

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
pub enum TicketStatus {
    New,
    Open,
    InProgress,
    Pending,
    Resolved,
    Closed,
}

/// Scale shared by priority, urgency and impact.
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
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "subject": "Printer on floor 3 is jammed",
    "description": "Paper jam error E-203 since this morning",
    "priority": "high",
    "category_id": "550e8400-e29b-41d4-a716-446655440000",
    "tags": ["printer", "floor-3"]
}))]
pub struct CreateTicketInput {
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub subject: String,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub urgency: Option<TicketPriority>,
    pub impact: Option<TicketPriority>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub action_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub caller_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub assignment_group: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub custom_fields: Option<Value>,
}

/// Partial update. Absent fields keep their value; nullable references are
/// cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTicketInput {
    #[validate(length(min = 1, max = 500), custom = "validate_not_blank")]
    pub subject: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub urgency: Option<TicketPriority>,
    pub impact: Option<TicketPriority>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub subcategory_id: Option<Option<Uuid>>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub action_id: Option<Option<Uuid>>,
    pub company_id: Option<Uuid>,
    pub caller_id: Option<Uuid>,
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub assigned_to_id: Option<Option<Uuid>>,
    #[validate(length(max = 100))]
    pub assignment_group: Option<String>,
    pub tags: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub custom_fields: Option<Value>,
}

/// Distinguishes a missing field (`None`) from an explicit null (`Some(None)`).
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

/// Formats the per-tenant ticket number.
pub fn format_ticket_number(sequence: u64) -> String {
    format!("T-{:06}", sequence)
}

fn parse_ticket_number(number: &str) -> Option<u64> {
    number.strip_prefix("T-")?.parse().ok()
}

/// Next free ticket number for the tenant. Computed inside the creating
/// transaction; the unique index on (tenant_id, number) rejects a racing
/// duplicate.
async fn next_ticket_number<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<String, ServiceError> {
    // Longer numbers sort first once the sequence outgrows its padding.
    let last: Option<String> = ticket::Entity::find()
        .select_only()
        .column(ticket::Column::Number)
        .filter(ticket::Column::TenantId.eq(tenant_id))
        .filter(ticket::Column::Number.starts_with("T-"))
        .order_by_desc(SimpleExpr::from(Func::char_length(Expr::col(
            ticket::Column::Number,
        ))))
        .order_by_desc(ticket::Column::Number)
        .into_tuple()
        .one(conn)
        .await?;
    let last = last.as_deref().and_then(parse_ticket_number).unwrap_or(0);
    Ok(format_ticket_number(last + 1))
}

fn snapshot(model: &ticket::Model) -> Result<Value, ServiceError> {
    Ok(serde_json::to_value(model)?)
}

/// Service for managing tickets
#[derive(Clone)]
pub struct TicketService {
    schemas: Arc<TenantSchemas>,
}

impl TicketService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    /// Creates a ticket and its `created` history row
    #[instrument(skip(self, ctx, input, audit), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_ticket(
        &self,
        ctx: &TenantContext,
        input: CreateTicketInput,
        audit: &AuditContext,
    ) -> Result<ticket::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;

        validate_classification(
            &txn,
            ctx.tenant_id,
            input.category_id,
            input.subcategory_id,
            input.action_id,
        )
        .await?;

        let status = input.status.unwrap_or(TicketStatus::New);
        let now = Utc::now();
        let number = next_ticket_number(&txn, ctx.tenant_id).await?;

        let model = ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            number: Set(number),
            subject: Set(input.subject.trim().to_string()),
            description: Set(input.description),
            status: Set(status.to_string()),
            priority: Set(input.priority.unwrap_or(TicketPriority::Medium).to_string()),
            urgency: Set(input.urgency.map(|u| u.to_string())),
            impact: Set(input.impact.map(|i| i.to_string())),
            category_id: Set(input.category_id),
            subcategory_id: Set(input.subcategory_id),
            action_id: Set(input.action_id),
            company_id: Set(input.company_id),
            caller_id: Set(input.caller_id),
            assigned_to_id: Set(input.assigned_to_id),
            assignment_group: Set(input.assignment_group),
            tags: Set(json!(input.tags)),
            custom_fields: Set(input.custom_fields.unwrap_or_else(|| json!({}))),
            is_active: Set(true),
            created_by: Set(ctx.user_id),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            resolved_at: Set((status == TicketStatus::Resolved).then_some(now)),
            closed_at: Set((status == TicketStatus::Closed).then_some(now)),
        };

        let created = model.insert(&txn).await.map_err(|e| {
            crate::errors::map_unique_violation(e, "Ticket number already taken, retry")
        })?;
        ticket_history::record_created(&txn, ctx, &created, audit).await?;
        txn.commit().await?;

        counter!("helpdesk_tickets.created", 1);
        info!(ticket_id = %created.id, number = %created.number, "ticket created");
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_ticket(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<ticket::Model, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let found = find_ticket(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        Ok(found)
    }

    /// Lists tickets, newest first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_tickets(
        &self,
        ctx: &TenantContext,
        filter: TicketFilter,
        page: Page,
    ) -> Result<(Vec<ticket::Model>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;

        let mut query = ticket::Entity::find().filter(ticket::Column::TenantId.eq(ctx.tenant_id));
        if !filter.include_inactive {
            query = query.filter(ticket::Column::IsActive.eq(true));
        }
        if let Some(status) = filter.status {
            query = query.filter(ticket::Column::Status.eq(status.to_string()));
        }
        if let Some(priority) = filter.priority {
            query = query.filter(ticket::Column::Priority.eq(priority.to_string()));
        }
        if let Some(assignee) = filter.assigned_to_id {
            query = query.filter(ticket::Column::AssignedToId.eq(assignee));
        }
        if let Some(company_id) = filter.company_id {
            query = query.filter(ticket::Column::CompanyId.eq(company_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(ticket::Column::CategoryId.eq(category_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(ticket::Column::Subject.contains(search))
                    .add(ticket::Column::Number.contains(search)),
            );
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_desc(ticket::Column::CreatedAt)
            .order_by_desc(ticket::Column::Number)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok((rows, total))
    }

    /// Applies a partial update and records one history row per changed field
    #[instrument(skip(self, ctx, input, audit), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_ticket(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateTicketInput,
        audit: &AuditContext,
    ) -> Result<ticket::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_ticket(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Ticket", id));
        }

        let category_id = input.category_id.unwrap_or(existing.category_id);
        let subcategory_id = input.subcategory_id.unwrap_or(existing.subcategory_id);
        let action_id = input.action_id.unwrap_or(existing.action_id);
        let classification_touched = input.category_id.is_some()
            || input.subcategory_id.is_some()
            || input.action_id.is_some();
        if classification_touched {
            validate_classification(&txn, ctx.tenant_id, category_id, subcategory_id, action_id)
                .await?;
        }

        let before = snapshot(&existing)?;
        let previous_status = existing.status.clone();
        let now = Utc::now();

        let mut active: ticket::ActiveModel = existing.into();
        if let Some(subject) = input.subject {
            active.subject = Set(subject.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if let Some(status) = input.status {
            let status_name = status.to_string();
            if status_name != previous_status {
                match status {
                    TicketStatus::Resolved => active.resolved_at = Set(Some(now)),
                    TicketStatus::Closed => active.closed_at = Set(Some(now)),
                    _ => {}
                }
            }
            active.status = Set(status_name);
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority.to_string());
        }
        if let Some(urgency) = input.urgency {
            active.urgency = Set(Some(urgency.to_string()));
        }
        if let Some(impact) = input.impact {
            active.impact = Set(Some(impact.to_string()));
        }
        if classification_touched {
            active.category_id = Set(category_id);
            active.subcategory_id = Set(subcategory_id);
            active.action_id = Set(action_id);
        }
        if input.company_id.is_some() {
            active.company_id = Set(input.company_id);
        }
        if input.caller_id.is_some() {
            active.caller_id = Set(input.caller_id);
        }
        if let Some(assignee) = input.assigned_to_id {
            active.assigned_to_id = Set(assignee);
        }
        if input.assignment_group.is_some() {
            active.assignment_group = Set(input.assignment_group);
        }
        if let Some(tags) = input.tags {
            active.tags = Set(json!(tags));
        }
        if let Some(custom_fields) = input.custom_fields {
            active.custom_fields = Set(custom_fields);
        }
        active.updated_by = Set(Some(ctx.user_id));

        let updated = active.update(&txn).await?;
        let changes = diff_ticket(&before, &snapshot(&updated)?);
        ticket_history::record_changes(&txn, ctx, updated.id, &changes, audit).await?;
        txn.commit().await?;

        info!(ticket_id = %updated.id, changes = changes.len(), "ticket updated");
        Ok(updated)
    }

    /// Soft deletes a ticket
    #[instrument(skip(self, ctx, audit), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_ticket(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        audit: &AuditContext,
    ) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_ticket(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Ticket", id));
        }

        let mut active: ticket::ActiveModel = existing.clone().into();
        active.is_active = Set(false);
        active.updated_by = Set(Some(ctx.user_id));
        active.update(&txn).await?;
        ticket_history::record_deleted(&txn, ctx, &existing, audit).await?;
        txn.commit().await?;

        counter!("helpdesk_tickets.deleted", 1);
        Ok(())
    }
}

async fn find_ticket<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<ticket::Model, ServiceError> {
    ticket::Entity::find_by_id(id)
        .filter(ticket::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Ticket", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ticket_numbers_are_zero_padded() {
        assert_eq!(format_ticket_number(1), "T-000001");
        assert_eq!(format_ticket_number(1234567), "T-1234567");
        assert_eq!(parse_ticket_number("T-000042"), Some(42));
        assert_eq!(parse_ticket_number("X-1"), None);
    }

    #[test]
    fn statuses_use_snake_case() {
        assert_eq!(TicketStatus::InProgress.to_string(), "in_progress");
        assert_eq!(TicketStatus::from_str("pending").unwrap(), TicketStatus::Pending);
        assert!(TicketStatus::from_str("archived").is_err());
    }

    #[test]
    fn update_distinguishes_null_from_missing() {
        let explicit: UpdateTicketInput =
            serde_json::from_value(json!({"assigned_to_id": null})).unwrap();
        assert_eq!(explicit.assigned_to_id, Some(None));

        let missing: UpdateTicketInput = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.assigned_to_id, None);
    }

    #[test]
    fn subject_length_is_enforced() {
        let input: CreateTicketInput =
            serde_json::from_value(json!({"subject": ""})).unwrap();
        assert!(input.validate().is_err());
        let input: CreateTicketInput =
            serde_json::from_value(json!({"subject": "x".repeat(501)})).unwrap();
        assert!(input.validate().is_err());
    }
}
