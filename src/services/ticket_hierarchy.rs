//! Category -> Subcategory -> Action tree used to classify tickets.
//!
//! Rows are soft deleted. Deactivating a node deactivates everything
//! below it. A node scoped to a company is visible to that company only;
//! nodes without a company are shared by every company of the tenant.

use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::{ticket_action, ticket_category, ticket_subcategory},
    errors::ServiceError,
    services::validation::{validate_hex_color, validate_not_blank},
};
use chrono::Utc;
use sea_orm::{
    sea_query::{Condition, Expr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Create/update payload shared by the three levels. `parent_id` is the
/// category for a subcategory and the subcategory for an action; it is
/// ignored for categories.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "parent_id": "550e8400-e29b-41d4-a716-446655440000",
    "name": "Hardware",
    "color": "#3366FF",
    "sort_order": 1
}))]
pub struct NodeInput {
    pub parent_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom = "validate_hex_color")]
    pub color: Option<String>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    /// Actions only
    #[validate(range(min = 0, max = 100000))]
    pub estimated_time_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct NodeUpdate {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom = "validate_hex_color")]
    pub color: Option<String>,
    #[validate(length(max = 50))]
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    #[validate(range(min = 0, max = 100000))]
    pub estimated_time_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub parent_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone)]
pub struct SubcategoryTree {
    pub subcategory: ticket_subcategory::Model,
    pub actions: Vec<ticket_action::Model>,
}

#[derive(Debug, Clone)]
pub struct CategoryTree {
    pub category: ticket_category::Model,
    pub subcategories: Vec<SubcategoryTree>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn conflict(level: &str, name: &str) -> ServiceError {
    ServiceError::Conflict(format!("An active {} named '{}' already exists", level, name))
}

/// Checks that a ticket's classification is a consistent path in the tree.
///
/// A subcategory requires its category and an action requires its
/// subcategory; every referenced node must exist and be active.
pub async fn validate_classification<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    category_id: Option<Uuid>,
    subcategory_id: Option<Uuid>,
    action_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(category_id) = category_id {
        let found = ticket_category::Entity::find_by_id(category_id)
            .filter(ticket_category::Column::TenantId.eq(tenant_id))
            .filter(ticket_category::Column::IsActive.eq(true))
            .one(conn)
            .await?;
        if found.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Category {} does not exist or is inactive",
                category_id
            )));
        }
    }

    if let Some(subcategory_id) = subcategory_id {
        let sub = ticket_subcategory::Entity::find_by_id(subcategory_id)
            .filter(ticket_subcategory::Column::TenantId.eq(tenant_id))
            .filter(ticket_subcategory::Column::IsActive.eq(true))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Subcategory {} does not exist or is inactive",
                    subcategory_id
                ))
            })?;
        if Some(sub.category_id) != category_id {
            return Err(ServiceError::ValidationError(
                "Subcategory does not belong to the selected category".to_string(),
            ));
        }
    }

    if let Some(action_id) = action_id {
        let action = ticket_action::Entity::find_by_id(action_id)
            .filter(ticket_action::Column::TenantId.eq(tenant_id))
            .filter(ticket_action::Column::IsActive.eq(true))
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Action {} does not exist or is inactive",
                    action_id
                ))
            })?;
        if Some(action.subcategory_id) != subcategory_id {
            return Err(ServiceError::ValidationError(
                "Action does not belong to the selected subcategory".to_string(),
            ));
        }
    }

    Ok(())
}

/// Service for the ticket classification tree
#[derive(Clone)]
pub struct TicketHierarchyService {
    schemas: Arc<TenantSchemas>,
}

impl TicketHierarchyService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    // ---- categories ----

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_categories(
        &self,
        ctx: &TenantContext,
        filter: NodeFilter,
    ) -> Result<Vec<ticket_category::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = ticket_category::Entity::find()
            .filter(ticket_category::Column::TenantId.eq(ctx.tenant_id));
        if let Some(company_id) = filter.company_id {
            query = query.filter(
                Condition::any()
                    .add(ticket_category::Column::CompanyId.eq(company_id))
                    .add(ticket_category::Column::CompanyId.is_null()),
            );
        }
        if !filter.include_inactive {
            query = query.filter(ticket_category::Column::IsActive.eq(true));
        }
        let rows = query
            .order_by_asc(ticket_category::Column::SortOrder)
            .order_by_asc(ticket_category::Column::Name)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_category(
        &self,
        ctx: &TenantContext,
        input: NodeInput,
    ) -> Result<ticket_category::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;

        let siblings = ticket_category::Entity::find()
            .filter(ticket_category::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_category::Column::IsActive.eq(true))
            .all(&txn)
            .await?;
        if siblings
            .iter()
            .any(|s| s.company_id == input.company_id && same_name(&s.name, &input.name))
        {
            return Err(conflict("category", &input.name));
        }

        let now = Utc::now();
        let created = ticket_category::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            company_id: Set(input.company_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            color: Set(input.color),
            icon: Set(input.icon),
            sort_order: Set(input.sort_order.unwrap_or(0)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(category_id = %created.id, "ticket category created");
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_category(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: NodeUpdate,
    ) -> Result<ticket_category::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_category(&txn, ctx.tenant_id, id).await?;

        if let Some(name) = &input.name {
            let clash = ticket_category::Entity::find()
                .filter(ticket_category::Column::TenantId.eq(ctx.tenant_id))
                .filter(ticket_category::Column::IsActive.eq(true))
                .filter(ticket_category::Column::Id.ne(id))
                .all(&txn)
                .await?
                .into_iter()
                .any(|s| s.company_id == existing.company_id && same_name(&s.name, name));
            if clash {
                return Err(conflict("category", name));
            }
        }

        let mut active: ticket_category::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if input.color.is_some() {
            active.color = Set(input.color);
        }
        if input.icon.is_some() {
            active.icon = Set(input.icon);
        }
        if let Some(sort_order) = input.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Deactivates a category with its subcategories and their actions
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_category(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_category(&txn, ctx.tenant_id, id).await?;
        let now = Utc::now();

        let subcategory_ids: Vec<Uuid> = ticket_subcategory::Entity::find()
            .filter(ticket_subcategory::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_subcategory::Column::CategoryId.eq(existing.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        if !subcategory_ids.is_empty() {
            ticket_action::Entity::update_many()
                .col_expr(ticket_action::Column::IsActive, Expr::value(false))
                .col_expr(ticket_action::Column::UpdatedAt, Expr::value(now))
                .filter(ticket_action::Column::TenantId.eq(ctx.tenant_id))
                .filter(ticket_action::Column::SubcategoryId.is_in(subcategory_ids))
                .exec(&txn)
                .await?;
        }

        ticket_subcategory::Entity::update_many()
            .col_expr(ticket_subcategory::Column::IsActive, Expr::value(false))
            .col_expr(ticket_subcategory::Column::UpdatedAt, Expr::value(now))
            .filter(ticket_subcategory::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_subcategory::Column::CategoryId.eq(existing.id))
            .exec(&txn)
            .await?;

        let mut active: ticket_category::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        txn.commit().await?;
        info!(category_id = %id, "ticket category deactivated");
        Ok(())
    }

    // ---- subcategories ----

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_subcategories(
        &self,
        ctx: &TenantContext,
        filter: NodeFilter,
    ) -> Result<Vec<ticket_subcategory::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = ticket_subcategory::Entity::find()
            .filter(ticket_subcategory::Column::TenantId.eq(ctx.tenant_id));
        if let Some(category_id) = filter.parent_id {
            query = query.filter(ticket_subcategory::Column::CategoryId.eq(category_id));
        }
        if let Some(company_id) = filter.company_id {
            query = query.filter(
                Condition::any()
                    .add(ticket_subcategory::Column::CompanyId.eq(company_id))
                    .add(ticket_subcategory::Column::CompanyId.is_null()),
            );
        }
        if !filter.include_inactive {
            query = query.filter(ticket_subcategory::Column::IsActive.eq(true));
        }
        let rows = query
            .order_by_asc(ticket_subcategory::Column::SortOrder)
            .order_by_asc(ticket_subcategory::Column::Name)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_subcategory(
        &self,
        ctx: &TenantContext,
        input: NodeInput,
    ) -> Result<ticket_subcategory::Model, ServiceError> {
        input.validate()?;
        let category_id = input.parent_id.ok_or_else(|| {
            ServiceError::ValidationError("parent_id (category) is required".to_string())
        })?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let parent = ticket_category::Entity::find_by_id(category_id)
            .filter(ticket_category::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_category::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Category {} does not exist or is inactive",
                    category_id
                ))
            })?;

        let duplicate = ticket_subcategory::Entity::find()
            .filter(ticket_subcategory::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_subcategory::Column::CategoryId.eq(parent.id))
            .filter(ticket_subcategory::Column::IsActive.eq(true))
            .all(&txn)
            .await?
            .iter()
            .any(|s| same_name(&s.name, &input.name));
        if duplicate {
            return Err(conflict("subcategory", &input.name));
        }

        let now = Utc::now();
        let created = ticket_subcategory::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            category_id: Set(parent.id),
            company_id: Set(input.company_id.or(parent.company_id)),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            color: Set(input.color),
            icon: Set(input.icon),
            sort_order: Set(input.sort_order.unwrap_or(0)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_subcategory(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: NodeUpdate,
    ) -> Result<ticket_subcategory::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_subcategory(&txn, ctx.tenant_id, id).await?;

        if let Some(name) = &input.name {
            let clash = ticket_subcategory::Entity::find()
                .filter(ticket_subcategory::Column::TenantId.eq(ctx.tenant_id))
                .filter(ticket_subcategory::Column::CategoryId.eq(existing.category_id))
                .filter(ticket_subcategory::Column::IsActive.eq(true))
                .filter(ticket_subcategory::Column::Id.ne(id))
                .all(&txn)
                .await?
                .iter()
                .any(|s| same_name(&s.name, name));
            if clash {
                return Err(conflict("subcategory", name));
            }
        }

        let mut active: ticket_subcategory::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if input.color.is_some() {
            active.color = Set(input.color);
        }
        if input.icon.is_some() {
            active.icon = Set(input.icon);
        }
        if let Some(sort_order) = input.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_subcategory(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_subcategory(&txn, ctx.tenant_id, id).await?;
        let now = Utc::now();

        ticket_action::Entity::update_many()
            .col_expr(ticket_action::Column::IsActive, Expr::value(false))
            .col_expr(ticket_action::Column::UpdatedAt, Expr::value(now))
            .filter(ticket_action::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_action::Column::SubcategoryId.eq(existing.id))
            .exec(&txn)
            .await?;

        let mut active: ticket_subcategory::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(now);
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    // ---- actions ----

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_actions(
        &self,
        ctx: &TenantContext,
        filter: NodeFilter,
    ) -> Result<Vec<ticket_action::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = ticket_action::Entity::find()
            .filter(ticket_action::Column::TenantId.eq(ctx.tenant_id));
        if let Some(subcategory_id) = filter.parent_id {
            query = query.filter(ticket_action::Column::SubcategoryId.eq(subcategory_id));
        }
        if let Some(company_id) = filter.company_id {
            query = query.filter(
                Condition::any()
                    .add(ticket_action::Column::CompanyId.eq(company_id))
                    .add(ticket_action::Column::CompanyId.is_null()),
            );
        }
        if !filter.include_inactive {
            query = query.filter(ticket_action::Column::IsActive.eq(true));
        }
        let rows = query
            .order_by_asc(ticket_action::Column::SortOrder)
            .order_by_asc(ticket_action::Column::Name)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_action(
        &self,
        ctx: &TenantContext,
        input: NodeInput,
    ) -> Result<ticket_action::Model, ServiceError> {
        input.validate()?;
        let subcategory_id = input.parent_id.ok_or_else(|| {
            ServiceError::ValidationError("parent_id (subcategory) is required".to_string())
        })?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let parent = ticket_subcategory::Entity::find_by_id(subcategory_id)
            .filter(ticket_subcategory::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_subcategory::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Subcategory {} does not exist or is inactive",
                    subcategory_id
                ))
            })?;

        let duplicate = ticket_action::Entity::find()
            .filter(ticket_action::Column::TenantId.eq(ctx.tenant_id))
            .filter(ticket_action::Column::SubcategoryId.eq(parent.id))
            .filter(ticket_action::Column::IsActive.eq(true))
            .all(&txn)
            .await?
            .iter()
            .any(|s| same_name(&s.name, &input.name));
        if duplicate {
            return Err(conflict("action", &input.name));
        }

        let now = Utc::now();
        let created = ticket_action::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            subcategory_id: Set(parent.id),
            company_id: Set(input.company_id.or(parent.company_id)),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            estimated_time_minutes: Set(input.estimated_time_minutes),
            color: Set(input.color),
            icon: Set(input.icon),
            sort_order: Set(input.sort_order.unwrap_or(0)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_action(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: NodeUpdate,
    ) -> Result<ticket_action::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_action(&txn, ctx.tenant_id, id).await?;

        if let Some(name) = &input.name {
            let clash = ticket_action::Entity::find()
                .filter(ticket_action::Column::TenantId.eq(ctx.tenant_id))
                .filter(ticket_action::Column::SubcategoryId.eq(existing.subcategory_id))
                .filter(ticket_action::Column::IsActive.eq(true))
                .filter(ticket_action::Column::Id.ne(id))
                .all(&txn)
                .await?
                .iter()
                .any(|s| same_name(&s.name, name));
            if clash {
                return Err(conflict("action", name));
            }
        }

        let mut active: ticket_action::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if input.color.is_some() {
            active.color = Set(input.color);
        }
        if input.icon.is_some() {
            active.icon = Set(input.icon);
        }
        if let Some(sort_order) = input.sort_order {
            active.sort_order = Set(sort_order);
        }
        if input.estimated_time_minutes.is_some() {
            active.estimated_time_minutes = Set(input.estimated_time_minutes);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_action(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_action(&txn, ctx.tenant_id, id).await?;
        let mut active: ticket_action::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    // ---- tree ----

    /// The full active tree, each level ordered by sort order then name
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn hierarchy(
        &self,
        ctx: &TenantContext,
        company_id: Option<Uuid>,
    ) -> Result<Vec<CategoryTree>, ServiceError> {
        let filter = NodeFilter {
            company_id,
            ..Default::default()
        };
        let categories = self.list_categories(ctx, filter.clone()).await?;
        let subcategories = self.list_subcategories(ctx, filter.clone()).await?;
        let actions = self.list_actions(ctx, filter).await?;

        Ok(build_tree(categories, subcategories, actions))
    }
}

/// Assembles already-ordered levels into a tree. Children whose parent is
/// not present are dropped.
pub fn build_tree(
    categories: Vec<ticket_category::Model>,
    subcategories: Vec<ticket_subcategory::Model>,
    actions: Vec<ticket_action::Model>,
) -> Vec<CategoryTree> {
    categories
        .into_iter()
        .map(|category| {
            let subcategories = subcategories
                .iter()
                .filter(|s| s.category_id == category.id)
                .map(|subcategory| SubcategoryTree {
                    actions: actions
                        .iter()
                        .filter(|a| a.subcategory_id == subcategory.id)
                        .cloned()
                        .collect(),
                    subcategory: subcategory.clone(),
                })
                .collect();
            CategoryTree {
                category,
                subcategories,
            }
        })
        .collect()
}

/// Deactivated nodes are reported as missing.
async fn find_active_category<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<ticket_category::Model, ServiceError> {
    ticket_category::Entity::find_by_id(id)
        .filter(ticket_category::Column::TenantId.eq(tenant_id))
        .filter(ticket_category::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Category", id))
}

async fn find_active_subcategory<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<ticket_subcategory::Model, ServiceError> {
    ticket_subcategory::Entity::find_by_id(id)
        .filter(ticket_subcategory::Column::TenantId.eq(tenant_id))
        .filter(ticket_subcategory::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Subcategory", id))
}

async fn find_active_action<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<ticket_action::Model, ServiceError> {
    ticket_action::Entity::find_by_id(id)
        .filter(ticket_action::Column::TenantId.eq(tenant_id))
        .filter(ticket_action::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Action", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, sort_order: i32) -> ticket_category::Model {
        let now = Utc::now();
        ticket_category::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            company_id: None,
            name: name.into(),
            description: None,
            color: None,
            icon: None,
            sort_order,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn subcategory(category_id: Uuid, name: &str) -> ticket_subcategory::Model {
        let now = Utc::now();
        ticket_subcategory::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            category_id,
            company_id: None,
            name: name.into(),
            description: None,
            color: None,
            icon: None,
            sort_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn action(subcategory_id: Uuid, name: &str) -> ticket_action::Model {
        let now = Utc::now();
        ticket_action::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            subcategory_id,
            company_id: None,
            name: name.into(),
            description: None,
            estimated_time_minutes: Some(30),
            color: None,
            icon: None,
            sort_order: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn tree_nests_children_under_their_parents() {
        let hardware = category("Hardware", 1);
        let software = category("Software", 2);
        let printers = subcategory(hardware.id, "Printers");
        let laptops = subcategory(hardware.id, "Laptops");
        let orphan = subcategory(Uuid::new_v4(), "Orphan");
        let replace_toner = action(printers.id, "Replace toner");

        let tree = build_tree(
            vec![hardware.clone(), software.clone()],
            vec![printers.clone(), laptops.clone(), orphan],
            vec![replace_toner.clone()],
        );

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].category.id, hardware.id);
        assert_eq!(tree[0].subcategories.len(), 2);
        assert_eq!(tree[0].subcategories[0].subcategory.id, printers.id);
        assert_eq!(tree[0].subcategories[0].actions[0].id, replace_toner.id);
        assert!(tree[0].subcategories[1].actions.is_empty());
        assert!(tree[1].subcategories.is_empty());
    }

    #[test]
    fn sibling_names_compare_case_insensitively() {
        assert!(same_name("Printers", " printers "));
        assert!(!same_name("Printers", "Printer"));
    }

    #[test]
    fn color_must_be_hex() {
        let input = NodeInput {
            parent_id: None,
            company_id: None,
            name: "Hardware".into(),
            description: None,
            color: Some("blue".into()),
            icon: None,
            sort_order: None,
            estimated_time_minutes: None,
        };
        assert!(input.validate().is_err());
    }
}
