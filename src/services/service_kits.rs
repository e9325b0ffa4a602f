use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::{item, service_kit, service_kit_item},
    errors::ServiceError,
    services::{validation::validate_not_blank, Page},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
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
pub enum KitType {
    Maintenance,
    Repair,
    Installation,
    Emergency,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct KitItemInput {
    pub item_id: Uuid,
    pub quantity: Decimal,
    #[serde(default)]
    pub is_optional: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Preventive maintenance - split AC",
    "kit_type": "maintenance",
    "equipment_model": "Split 12000 BTU",
    "items": [{"item_id": "6f1c2b7e-8c38-4a53-9a51-0d6c8c9d2f10", "quantity": "2", "is_optional": false}]
}))]
pub struct CreateServiceKitInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub description: Option<String>,
    pub kit_type: KitType,
    #[validate(length(max = 200))]
    pub equipment_model: Option<String>,
    #[serde(default)]
    pub items: Vec<KitItemInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateServiceKitInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub kit_type: Option<KitType>,
    #[validate(length(max = 200))]
    pub equipment_model: Option<String>,
    /// Replaces every kit item when present
    pub items: Option<Vec<KitItemInput>>,
}

#[derive(Debug, Clone, Default)]
pub struct KitFilter {
    pub kit_type: Option<KitType>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

/// A kit together with its items.
#[derive(Debug, Clone)]
pub struct ServiceKitWithItems {
    pub kit: service_kit::Model,
    pub items: Vec<service_kit_item::Model>,
}

/// Rejects non-positive quantities and repeated items.
pub fn validate_kit_items(items: &[KitItemInput]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for entry in items {
        if entry.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for item {} must be greater than zero",
                entry.item_id
            )));
        }
        if !seen.insert(entry.item_id) {
            return Err(ServiceError::ValidationError(format!(
                "Item {} appears more than once in the kit",
                entry.item_id
            )));
        }
    }
    Ok(())
}

/// Service for service kits
#[derive(Clone)]
pub struct ServiceKitService {
    schemas: Arc<TenantSchemas>,
}

impl ServiceKitService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_kit(
        &self,
        ctx: &TenantContext,
        input: CreateServiceKitInput,
    ) -> Result<ServiceKitWithItems, ServiceError> {
        input.validate()?;
        validate_kit_items(&input.items)?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        ensure_items_usable(&txn, ctx.tenant_id, &input.items).await?;

        let now = Utc::now();
        let kit = service_kit::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            kit_type: Set(input.kit_type.to_string()),
            equipment_model: Set(input.equipment_model),
            is_active: Set(true),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        let items = insert_kit_items(&txn, ctx.tenant_id, kit.id, &input.items).await?;
        txn.commit().await?;

        info!(kit_id = %kit.id, items = items.len(), "service kit created");
        Ok(ServiceKitWithItems { kit, items })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_kit(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<ServiceKitWithItems, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let kit = find_kit(&txn, ctx.tenant_id, id).await?;
        let items = kit_items(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        Ok(ServiceKitWithItems { kit, items })
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_kits(
        &self,
        ctx: &TenantContext,
        filter: KitFilter,
        page: Page,
    ) -> Result<(Vec<service_kit::Model>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query =
            service_kit::Entity::find().filter(service_kit::Column::TenantId.eq(ctx.tenant_id));
        if !filter.include_inactive {
            query = query.filter(service_kit::Column::IsActive.eq(true));
        }
        if let Some(kit_type) = filter.kit_type {
            query = query.filter(service_kit::Column::KitType.eq(kit_type.to_string()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(service_kit::Column::Name.contains(search))
                    .add(service_kit::Column::EquipmentModel.contains(search)),
            );
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_asc(service_kit::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok((rows, total))
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_kit(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateServiceKitInput,
    ) -> Result<ServiceKitWithItems, ServiceError> {
        input.validate()?;
        if let Some(items) = &input.items {
            validate_kit_items(items)?;
        }

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_kit(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Service kit", id));
        }

        let mut active: service_kit::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if let Some(kit_type) = input.kit_type {
            active.kit_type = Set(kit_type.to_string());
        }
        if input.equipment_model.is_some() {
            active.equipment_model = Set(input.equipment_model);
        }
        active.updated_at = Set(Utc::now());
        let kit = active.update(&txn).await?;

        let items = match input.items {
            Some(items) => {
                ensure_items_usable(&txn, ctx.tenant_id, &items).await?;
                service_kit_item::Entity::delete_many()
                    .filter(service_kit_item::Column::TenantId.eq(ctx.tenant_id))
                    .filter(service_kit_item::Column::KitId.eq(id))
                    .exec(&txn)
                    .await?;
                insert_kit_items(&txn, ctx.tenant_id, id, &items).await?
            }
            None => kit_items(&txn, ctx.tenant_id, id).await?,
        };
        txn.commit().await?;
        Ok(ServiceKitWithItems { kit, items })
    }

    /// Soft deletes a kit; its items are kept for reference
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_kit(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_kit(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Service kit", id));
        }
        let mut active: service_kit::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

async fn find_kit<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<service_kit::Model, ServiceError> {
    service_kit::Entity::find_by_id(id)
        .filter(service_kit::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Service kit", id))
}

async fn kit_items<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    kit_id: Uuid,
) -> Result<Vec<service_kit_item::Model>, ServiceError> {
    Ok(service_kit_item::Entity::find()
        .filter(service_kit_item::Column::TenantId.eq(tenant_id))
        .filter(service_kit_item::Column::KitId.eq(kit_id))
        .all(conn)
        .await?)
}

/// Every referenced item must exist and be active in the tenant.
async fn ensure_items_usable<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    items: &[KitItemInput],
) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Ok(());
    }
    let wanted: Vec<Uuid> = items.iter().map(|i| i.item_id).collect();
    let found: HashSet<Uuid> = item::Entity::find()
        .select_only()
        .column(item::Column::Id)
        .filter(item::Column::TenantId.eq(tenant_id))
        .filter(item::Column::IsActive.eq(true))
        .filter(item::Column::Id.is_in(wanted.clone()))
        .into_tuple::<Uuid>()
        .all(conn)
        .await?
        .into_iter()
        .collect();

    match wanted.into_iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(ServiceError::ValidationError(format!(
            "Item {} does not exist or is inactive",
            missing
        ))),
        None => Ok(()),
    }
}

async fn insert_kit_items<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    kit_id: Uuid,
    items: &[KitItemInput],
) -> Result<Vec<service_kit_item::Model>, ServiceError> {
    let mut created = Vec::with_capacity(items.len());
    for entry in items {
        let row = service_kit_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            kit_id: Set(kit_id),
            item_id: Set(entry.item_id),
            quantity: Set(entry.quantity),
            is_optional: Set(entry.is_optional),
        }
        .insert(conn)
        .await?;
        created.push(row);
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(item_id: Uuid, quantity: Decimal) -> KitItemInput {
        KitItemInput {
            item_id,
            quantity,
            is_optional: false,
        }
    }

    #[test]
    fn kit_items_must_be_unique_and_positive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_kit_items(&[entry(a, dec!(1)), entry(b, dec!(0.5))]).is_ok());
        assert!(validate_kit_items(&[entry(a, dec!(1)), entry(a, dec!(2))]).is_err());
        assert!(validate_kit_items(&[entry(a, dec!(0))]).is_err());
        assert!(validate_kit_items(&[]).is_ok());
    }

    #[test]
    fn kit_types_parse_from_snake_case() {
        let parsed: KitType = serde_json::from_value(json!("installation")).unwrap();
        assert_eq!(parsed, KitType::Installation);
        assert!(serde_json::from_value::<KitType>(json!("upgrade")).is_err());
    }
}
