use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::{item, item_attachment, item_customer_link, item_link, item_supplier_link},
    errors::{map_unique_violation, ServiceError},
    services::{validation::validate_not_blank, Page},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Condition, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
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
pub enum ItemType {
    Material,
    Service,
}

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
pub enum ItemStatus {
    Active,
    UnderReview,
    Discontinued,
}

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
pub enum LinkType {
    Kit,
    Replacement,
    Compatible,
    Accessory,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Toner cartridge HP 85A",
    "item_type": "material",
    "integration_code": "ERP-00412",
    "measurement_unit": "un",
    "group_name": "Printers"
}))]
pub struct CreateItemInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub item_type: ItemType,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub integration_code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20), custom = "validate_not_blank")]
    pub measurement_unit: Option<String>,
    pub maintenance_plan: Option<String>,
    #[validate(length(max = 100))]
    pub group_name: Option<String>,
    /// Array of checklist entries
    #[schema(value_type = Option<Vec<Object>>)]
    pub checklist: Option<Value>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    pub item_type: Option<ItemType>,
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub integration_code: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 20), custom = "validate_not_blank")]
    pub measurement_unit: Option<String>,
    pub maintenance_plan: Option<String>,
    #[validate(length(max = 100))]
    pub group_name: Option<String>,
    #[schema(value_type = Option<Vec<Object>>)]
    pub checklist: Option<Value>,
    pub status: Option<ItemStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    pub status: Option<ItemStatus>,
    pub group_name: Option<String>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddAttachmentInput {
    #[validate(length(min = 1, max = 255), custom = "validate_not_blank")]
    pub file_name: String,
    #[validate(length(min = 1, max = 2048), custom = "validate_not_blank")]
    pub file_url: String,
    #[validate(range(min = 0))]
    pub file_size: i64,
    #[validate(length(max = 100))]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateItemLinkInput {
    pub linked_item_id: Uuid,
    pub link_type: LinkType,
    /// Defaults to 1
    pub quantity: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerLinkInput {
    pub customer_id: Uuid,
    #[validate(length(max = 200))]
    pub alias: Option<String>,
    #[validate(length(max = 100))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub barcode: Option<String>,
    #[serde(default)]
    pub is_asset: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierLinkInput {
    pub supplier_id: Uuid,
    #[validate(length(max = 100))]
    pub part_number: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    #[validate(range(min = 0, max = 3650))]
    pub lead_time_days: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ItemStats {
    pub total: u64,
    pub active: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_status: BTreeMap<String, u64>,
}

fn checklist_value(checklist: Option<Value>) -> Result<Value, ServiceError> {
    match checklist {
        None => Ok(json!([])),
        Some(value) if value.is_array() => Ok(value),
        Some(_) => Err(ServiceError::ValidationError(
            "checklist must be an array".to_string(),
        )),
    }
}

fn normalized_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Tallies `(item_type, status)` pairs into per-type and per-status counts.
pub fn tally_items(rows: &[(String, String)]) -> (BTreeMap<String, u64>, BTreeMap<String, u64>) {
    let mut by_type = BTreeMap::new();
    let mut by_status = BTreeMap::new();
    for (item_type, status) in rows {
        *by_type.entry(item_type.clone()).or_insert(0) += 1;
        *by_status.entry(status.clone()).or_insert(0) += 1;
    }
    (by_type, by_status)
}

/// Service for the parts and services catalog
#[derive(Clone)]
pub struct ItemService {
    schemas: Arc<TenantSchemas>,
}

impl ItemService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_item(
        &self,
        ctx: &TenantContext,
        input: CreateItemInput,
    ) -> Result<item::Model, ServiceError> {
        input.validate()?;
        let checklist = checklist_value(input.checklist)?;
        let integration_code = normalized_code(input.integration_code);

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        if let Some(code) = &integration_code {
            ensure_code_free(&txn, ctx.tenant_id, code, None).await?;
        }

        let now = Utc::now();
        let created = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            name: Set(input.name.trim().to_string()),
            item_type: Set(input.item_type.to_string()),
            integration_code: Set(integration_code.clone()),
            description: Set(input.description),
            measurement_unit: Set(input.measurement_unit.unwrap_or_else(|| "un".to_string())),
            maintenance_plan: Set(input.maintenance_plan),
            group_name: Set(input.group_name),
            checklist: Set(checklist),
            status: Set(input.status.unwrap_or(ItemStatus::Active).to_string()),
            is_active: Set(true),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, code_conflict(integration_code.as_deref())))?;
        txn.commit().await?;

        counter!("helpdesk_items.created", 1);
        info!(item_id = %created.id, "item created");
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_item(&self, ctx: &TenantContext, id: Uuid) -> Result<item::Model, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let found = find_item(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        Ok(found)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_items(
        &self,
        ctx: &TenantContext,
        filter: ItemFilter,
        page: Page,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;

        let mut query = item::Entity::find().filter(item::Column::TenantId.eq(ctx.tenant_id));
        if !filter.include_inactive {
            query = query.filter(item::Column::IsActive.eq(true));
        }
        if let Some(item_type) = filter.item_type {
            query = query.filter(item::Column::ItemType.eq(item_type.to_string()));
        }
        if let Some(status) = filter.status {
            query = query.filter(item::Column::Status.eq(status.to_string()));
        }
        if let Some(group) = filter.group_name {
            query = query.filter(item::Column::GroupName.eq(group));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(item::Column::Name.contains(search))
                    .add(item::Column::IntegrationCode.contains(search))
                    .add(item::Column::Description.contains(search)),
            );
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_asc(item::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok((rows, total))
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_item(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateItemInput,
    ) -> Result<item::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_item(&txn, ctx.tenant_id, id).await?;

        let integration_code = normalized_code(input.integration_code);
        if let Some(code) = &integration_code {
            ensure_code_free(&txn, ctx.tenant_id, code, Some(id)).await?;
        }

        let mut active: item::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(item_type) = input.item_type {
            active.item_type = Set(item_type.to_string());
        }
        if integration_code.is_some() {
            active.integration_code = Set(integration_code.clone());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if let Some(unit) = input.measurement_unit {
            active.measurement_unit = Set(unit);
        }
        if input.maintenance_plan.is_some() {
            active.maintenance_plan = Set(input.maintenance_plan);
        }
        if input.group_name.is_some() {
            active.group_name = Set(input.group_name);
        }
        if input.checklist.is_some() {
            active.checklist = Set(checklist_value(input.checklist)?);
        }
        if let Some(status) = input.status {
            active.status = Set(status.to_string());
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| map_unique_violation(e, code_conflict(integration_code.as_deref())))?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Soft deletes an item
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_item(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_item(&txn, ctx.tenant_id, id).await?;
        let mut active: item::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;

        counter!("helpdesk_items.deleted", 1);
        Ok(())
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn stats(&self, ctx: &TenantContext) -> Result<ItemStats, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let total = item::Entity::find()
            .filter(item::Column::TenantId.eq(ctx.tenant_id))
            .count(&txn)
            .await?;
        let rows: Vec<(String, String)> = item::Entity::find()
            .select_only()
            .column(item::Column::ItemType)
            .column(item::Column::Status)
            .filter(item::Column::TenantId.eq(ctx.tenant_id))
            .filter(item::Column::IsActive.eq(true))
            .into_tuple()
            .all(&txn)
            .await?;
        txn.commit().await?;

        let (by_type, by_status) = tally_items(&rows);
        Ok(ItemStats {
            total,
            active: rows.len() as u64,
            by_type,
            by_status,
        })
    }

    // Attachments

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_attachment(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        input: AddAttachmentInput,
    ) -> Result<item_attachment::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_active_item(&txn, ctx.tenant_id, item_id).await?;

        let created = item_attachment::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            item_id: Set(item_id),
            file_name: Set(input.file_name),
            file_url: Set(input.file_url),
            file_size: Set(input.file_size),
            content_type: Set(input.content_type),
            uploaded_by: Set(ctx.user_id),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_attachments(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
    ) -> Result<Vec<item_attachment::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_item(&txn, ctx.tenant_id, item_id).await?;
        let rows = item_attachment::Entity::find()
            .filter(item_attachment::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_attachment::Column::ItemId.eq(item_id))
            .order_by_asc(item_attachment::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn remove_attachment(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        attachment_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let result = item_attachment::Entity::delete_many()
            .filter(item_attachment::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_attachment::Column::ItemId.eq(item_id))
            .filter(item_attachment::Column::Id.eq(attachment_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Attachment", attachment_id));
        }
        txn.commit().await?;
        Ok(())
    }

    // Item links

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_link(
        &self,
        ctx: &TenantContext,
        parent_item_id: Uuid,
        input: CreateItemLinkInput,
    ) -> Result<item_link::Model, ServiceError> {
        input.validate()?;
        if parent_item_id == input.linked_item_id {
            return Err(ServiceError::ValidationError(
                "An item cannot be linked to itself".to_string(),
            ));
        }
        let quantity = input.quantity.unwrap_or(Decimal::ONE);
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Link quantity must be greater than zero".to_string(),
            ));
        }

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_active_item(&txn, ctx.tenant_id, parent_item_id).await?;
        find_active_item(&txn, ctx.tenant_id, input.linked_item_id).await?;

        let duplicate = item_link::Entity::find()
            .filter(item_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_link::Column::ParentItemId.eq(parent_item_id))
            .filter(item_link::Column::LinkedItemId.eq(input.linked_item_id))
            .count(&txn)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::Conflict(
                "These items are already linked".to_string(),
            ));
        }

        let created = item_link::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            parent_item_id: Set(parent_item_id),
            linked_item_id: Set(input.linked_item_id),
            link_type: Set(input.link_type.to_string()),
            quantity: Set(quantity),
            notes: Set(input.notes),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, "These items are already linked"))?;
        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_links(
        &self,
        ctx: &TenantContext,
        parent_item_id: Uuid,
    ) -> Result<Vec<item_link::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_item(&txn, ctx.tenant_id, parent_item_id).await?;
        let rows = item_link::Entity::find()
            .filter(item_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_link::Column::ParentItemId.eq(parent_item_id))
            .order_by_asc(item_link::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn remove_link(
        &self,
        ctx: &TenantContext,
        parent_item_id: Uuid,
        link_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let result = item_link::Entity::delete_many()
            .filter(item_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_link::Column::ParentItemId.eq(parent_item_id))
            .filter(item_link::Column::Id.eq(link_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Item link", link_id));
        }
        txn.commit().await?;
        Ok(())
    }

    // Customer links

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_customer_link(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        input: CreateCustomerLinkInput,
    ) -> Result<item_customer_link::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_active_item(&txn, ctx.tenant_id, item_id).await?;

        let duplicate = item_customer_link::Entity::find()
            .filter(item_customer_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_customer_link::Column::ItemId.eq(item_id))
            .filter(item_customer_link::Column::CustomerId.eq(input.customer_id))
            .filter(item_customer_link::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::Conflict(
                "Item is already linked to this customer".to_string(),
            ));
        }

        let now = Utc::now();
        let created = item_customer_link::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            item_id: Set(item_id),
            customer_id: Set(input.customer_id),
            alias: Set(input.alias),
            sku: Set(input.sku),
            barcode: Set(input.barcode),
            is_asset: Set(input.is_asset),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_customer_links(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
    ) -> Result<Vec<item_customer_link::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_item(&txn, ctx.tenant_id, item_id).await?;
        let rows = item_customer_link::Entity::find()
            .filter(item_customer_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_customer_link::Column::ItemId.eq(item_id))
            .filter(item_customer_link::Column::IsActive.eq(true))
            .order_by_asc(item_customer_link::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn remove_customer_link(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        link_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let link = item_customer_link::Entity::find_by_id(link_id)
            .filter(item_customer_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_customer_link::Column::ItemId.eq(item_id))
            .filter(item_customer_link::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Customer link", link_id))?;

        let mut active: item_customer_link::ActiveModel = link.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    // Supplier links

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn add_supplier_link(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        input: CreateSupplierLinkInput,
    ) -> Result<item_supplier_link::Model, ServiceError> {
        input.validate()?;
        if input.unit_price.is_some_and(|price| price < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "unit_price cannot be negative".to_string(),
            ));
        }
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_active_item(&txn, ctx.tenant_id, item_id).await?;

        let duplicate = item_supplier_link::Entity::find()
            .filter(item_supplier_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_supplier_link::Column::ItemId.eq(item_id))
            .filter(item_supplier_link::Column::SupplierId.eq(input.supplier_id))
            .filter(item_supplier_link::Column::IsActive.eq(true))
            .count(&txn)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::Conflict(
                "Item is already linked to this supplier".to_string(),
            ));
        }

        let now = Utc::now();
        let created = item_supplier_link::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            item_id: Set(item_id),
            supplier_id: Set(input.supplier_id),
            part_number: Set(input.part_number),
            description: Set(input.description),
            unit_price: Set(input.unit_price),
            lead_time_days: Set(input.lead_time_days),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_supplier_links(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
    ) -> Result<Vec<item_supplier_link::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_item(&txn, ctx.tenant_id, item_id).await?;
        let rows = item_supplier_link::Entity::find()
            .filter(item_supplier_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_supplier_link::Column::ItemId.eq(item_id))
            .filter(item_supplier_link::Column::IsActive.eq(true))
            .order_by_asc(item_supplier_link::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn remove_supplier_link(
        &self,
        ctx: &TenantContext,
        item_id: Uuid,
        link_id: Uuid,
    ) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let link = item_supplier_link::Entity::find_by_id(link_id)
            .filter(item_supplier_link::Column::TenantId.eq(ctx.tenant_id))
            .filter(item_supplier_link::Column::ItemId.eq(item_id))
            .filter(item_supplier_link::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier link", link_id))?;

        let mut active: item_supplier_link::ActiveModel = link.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

fn code_conflict(code: Option<&str>) -> String {
    format!(
        "Integration code '{}' is already in use",
        code.unwrap_or_default()
    )
}

async fn ensure_code_free<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    code: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = item::Entity::find()
        .filter(item::Column::TenantId.eq(tenant_id))
        .filter(item::Column::IntegrationCode.eq(code));
    if let Some(id) = except {
        query = query.filter(item::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(ServiceError::Conflict(code_conflict(Some(code))));
    }
    Ok(())
}

pub(crate) async fn find_item<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<item::Model, ServiceError> {
    item::Entity::find_by_id(id)
        .filter(item::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Item", id))
}

/// Like `find_item`, but soft-deleted items count as missing.
pub(crate) async fn find_active_item<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<item::Model, ServiceError> {
    let found = find_item(conn, tenant_id, id).await?;
    if !found.is_active {
        return Err(ServiceError::not_found("Item", id));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn statuses_round_trip_through_strings() {
        assert_eq!(ItemStatus::UnderReview.to_string(), "under_review");
        assert_eq!(LinkType::from_str("replacement").ok(), Some(LinkType::Replacement));
        assert!(ItemType::from_str("gadget").is_err());
    }

    #[test]
    fn checklist_must_be_an_array() {
        assert_eq!(checklist_value(None).ok(), Some(json!([])));
        assert!(checklist_value(Some(json!([{"step": "inspect"}]))).is_ok());
        assert!(checklist_value(Some(json!({"step": "inspect"}))).is_err());
    }

    #[test]
    fn blank_integration_codes_are_dropped() {
        assert_eq!(normalized_code(Some("  ".into())), None);
        assert_eq!(normalized_code(Some(" ERP-1 ".into())), Some("ERP-1".into()));
    }

    #[test]
    fn tally_groups_by_type_and_status() {
        let rows = vec![
            ("material".to_string(), "active".to_string()),
            ("material".to_string(), "discontinued".to_string()),
            ("service".to_string(), "active".to_string()),
        ];
        let (by_type, by_status) = tally_items(&rows);
        assert_eq!(by_type.get("material"), Some(&2));
        assert_eq!(by_type.get("service"), Some(&1));
        assert_eq!(by_status.get("active"), Some(&2));
        assert_eq!(by_status.get("discontinued"), Some(&1));
    }
}
