//! Warehouses, per-warehouse stock levels and the movement ledger.

use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::{stock_item, stock_movement, warehouse},
    errors::{map_unique_violation, ServiceError},
    services::{items::find_active_item, validation::validate_not_blank, Page},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, instrument, warn};
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
pub enum MovementType {
    In,
    Out,
    Transfer,
    Adjustment,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Main warehouse",
    "code": "WH-01",
    "address": "Rua A, 100",
    "warehouse_type": "main"
}))]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub code: String,
    pub address: Option<String>,
    /// Defaults to `main`
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub warehouse_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateWarehouseInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub code: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1, max = 50), custom = "validate_not_blank")]
    pub warehouse_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StockFilter {
    pub warehouse_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    pub low_stock: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub item_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "movement_type": "in",
    "item_id": "6f1c2b7e-8c38-4a53-9a51-0d6c8c9d2f10",
    "warehouse_id": "a3c5e2f4-1b2d-4c6e-8f90-123456789abc",
    "quantity": "10",
    "unit_cost": "12.50",
    "reference_document": "NF-1234"
}))]
pub struct CreateMovementInput {
    pub movement_type: MovementType,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    #[validate(length(max = 100))]
    pub reference_document: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStockThresholdsInput {
    pub minimum_stock: Option<Decimal>,
    pub maximum_stock: Option<Decimal>,
    #[validate(length(max = 50))]
    pub bin_location: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockStats {
    pub distinct_items: u64,
    pub total_quantity: Decimal,
    pub total_value: Decimal,
    pub low_stock_count: u64,
}

/// Result of applying a movement: the ledger row and the stock rows it touched.
#[derive(Debug, Clone)]
pub struct MovementOutcome {
    pub movement: stock_movement::Model,
    pub source: stock_item::Model,
    pub destination: Option<stock_item::Model>,
}

/// Upper bound for a movement quantity and for the quantity held by a stock row.
pub const MAX_STOCK_QUANTITY: Decimal = dec!(1_000_000_000);
/// Upper bound for a unit cost.
pub const MAX_UNIT_COST: Decimal = dec!(1_000_000_000);

/// Checks quantity rules that do not need the database.
pub fn validate_movement(input: &CreateMovementInput) -> Result<(), ServiceError> {
    if input.quantity > MAX_STOCK_QUANTITY {
        return Err(ServiceError::ValidationError(format!(
            "quantity cannot exceed {}",
            MAX_STOCK_QUANTITY
        )));
    }
    if input.unit_cost.is_some_and(|cost| cost > MAX_UNIT_COST) {
        return Err(ServiceError::ValidationError(format!(
            "unit_cost cannot exceed {}",
            MAX_UNIT_COST
        )));
    }
    match input.movement_type {
        MovementType::Adjustment => {
            if input.quantity < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Adjustment quantity cannot be negative".to_string(),
                ));
            }
        }
        _ => {
            if input.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Movement quantity must be greater than zero".to_string(),
                ));
            }
        }
    }
    if input.unit_cost.is_some_and(|cost| cost < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "unit_cost cannot be negative".to_string(),
        ));
    }
    match (input.movement_type, input.destination_warehouse_id) {
        (MovementType::Transfer, None) => Err(ServiceError::ValidationError(
            "Transfers require destination_warehouse_id".to_string(),
        )),
        (MovementType::Transfer, Some(dest)) if dest == input.warehouse_id => {
            Err(ServiceError::ValidationError(
                "Destination warehouse must differ from the source".to_string(),
            ))
        }
        (MovementType::Transfer, Some(_)) => Ok(()),
        (_, Some(_)) => Err(ServiceError::ValidationError(
            "Only transfers take a destination warehouse".to_string(),
        )),
        (_, None) => Ok(()),
    }
}

/// Fails with 422 when `requested` exceeds what is not reserved.
pub fn ensure_available(stock: &stock_item::Model, requested: Decimal) -> Result<(), ServiceError> {
    let available = stock.available();
    if available < requested {
        return Err(ServiceError::InsufficientStock(format!(
            "Requested {} but only {} available",
            requested, available
        )));
    }
    Ok(())
}

/// Quantity a stock row ends up with, rejected when it leaves the allowed range.
pub fn resulting_quantity(value: Option<Decimal>) -> Result<Decimal, ServiceError> {
    value
        .filter(|q| *q >= Decimal::ZERO && *q <= MAX_STOCK_QUANTITY)
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Resulting stock quantity must stay between 0 and {}",
                MAX_STOCK_QUANTITY
            ))
        })
}

/// Aggregates stock rows into the dashboard figures.
pub fn summarize_stock(rows: &[stock_item::Model]) -> Result<StockStats, ServiceError> {
    let overflow = || ServiceError::InternalError("Stock totals overflowed".to_string());
    let distinct: BTreeSet<Uuid> = rows.iter().map(|r| r.item_id).collect();
    let mut total_quantity = Decimal::ZERO;
    let mut total_value = Decimal::ZERO;
    for row in rows {
        total_quantity = total_quantity.checked_add(row.quantity).ok_or_else(overflow)?;
        total_value = row
            .quantity
            .checked_mul(row.unit_cost)
            .and_then(|value| total_value.checked_add(value))
            .ok_or_else(overflow)?;
    }
    Ok(StockStats {
        distinct_items: distinct.len() as u64,
        total_quantity,
        total_value,
        low_stock_count: rows.iter().filter(|r| r.is_low_stock()).count() as u64,
    })
}

/// Service for warehouses and stock
#[derive(Clone)]
pub struct StockService {
    schemas: Arc<TenantSchemas>,
}

impl StockService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    // Warehouses

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_warehouse(
        &self,
        ctx: &TenantContext,
        input: CreateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        input.validate()?;
        let code = input.code.trim().to_string();
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        ensure_warehouse_code_free(&txn, ctx.tenant_id, &code, None).await?;

        let now = Utc::now();
        let created = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            name: Set(input.name.trim().to_string()),
            code: Set(code.clone()),
            address: Set(input.address),
            warehouse_type: Set(input.warehouse_type.unwrap_or_else(|| "main".to_string())),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, warehouse_conflict(&code)))?;
        txn.commit().await?;

        info!(warehouse_id = %created.id, code = %created.code, "warehouse created");
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_warehouses(
        &self,
        ctx: &TenantContext,
        include_inactive: bool,
    ) -> Result<Vec<warehouse::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query =
            warehouse::Entity::find().filter(warehouse::Column::TenantId.eq(ctx.tenant_id));
        if !include_inactive {
            query = query.filter(warehouse::Column::IsActive.eq(true));
        }
        let rows = query.order_by_asc(warehouse::Column::Code).all(&txn).await?;
        txn.commit().await?;
        Ok(rows)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_warehouse(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<warehouse::Model, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let found = find_warehouse(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        Ok(found)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_warehouse(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_warehouse(&txn, ctx.tenant_id, id).await?;

        let code = input.code.map(|c| c.trim().to_string());
        if let Some(code) = &code {
            ensure_warehouse_code_free(&txn, ctx.tenant_id, code, Some(id)).await?;
        }

        let mut active: warehouse::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(code) = code.clone() {
            active.code = Set(code);
        }
        if input.address.is_some() {
            active.address = Set(input.address);
        }
        if let Some(kind) = input.warehouse_type {
            active.warehouse_type = Set(kind);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| map_unique_violation(e, warehouse_conflict(code.as_deref().unwrap_or_default())))?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Soft deletes a warehouse
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_warehouse(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_warehouse(&txn, ctx.tenant_id, id).await?;
        let mut active: warehouse::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    // Stock levels

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_stock(
        &self,
        ctx: &TenantContext,
        filter: StockFilter,
        page: Page,
    ) -> Result<(Vec<stock_item::Model>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query =
            stock_item::Entity::find().filter(stock_item::Column::TenantId.eq(ctx.tenant_id));
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(stock_item::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(item_id) = filter.item_id {
            query = query.filter(stock_item::Column::ItemId.eq(item_id));
        }
        if filter.low_stock {
            query = query.filter(
                sea_orm::sea_query::Expr::col(stock_item::Column::Quantity)
                    .lte(sea_orm::sea_query::Expr::col(stock_item::Column::MinimumStock)),
            );
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_asc(stock_item::Column::WarehouseId)
            .order_by_asc(stock_item::Column::ItemId)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok((rows, total))
    }

    /// Rows at or below their minimum, lowest coverage first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn low_stock_report(
        &self,
        ctx: &TenantContext,
        warehouse_id: Option<Uuid>,
    ) -> Result<Vec<stock_item::Model>, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query =
            stock_item::Entity::find().filter(stock_item::Column::TenantId.eq(ctx.tenant_id));
        if let Some(warehouse_id) = warehouse_id {
            query = query.filter(stock_item::Column::WarehouseId.eq(warehouse_id));
        }
        let mut rows: Vec<stock_item::Model> = query
            .all(&txn)
            .await?
            .into_iter()
            .filter(stock_item::Model::is_low_stock)
            .collect();
        txn.commit().await?;

        rows.sort_by(|a, b| {
            (a.quantity - a.minimum_stock)
                .cmp(&(b.quantity - b.minimum_stock))
                .then(a.item_id.cmp(&b.item_id))
        });
        Ok(rows)
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_thresholds(
        &self,
        ctx: &TenantContext,
        stock_id: Uuid,
        input: UpdateStockThresholdsInput,
    ) -> Result<stock_item::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = stock_item::Entity::find_by_id(stock_id)
            .filter(stock_item::Column::TenantId.eq(ctx.tenant_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Stock item", stock_id))?;

        let minimum = input.minimum_stock.unwrap_or(existing.minimum_stock);
        let maximum = input.maximum_stock.or(existing.maximum_stock);
        if minimum < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "minimum_stock cannot be negative".to_string(),
            ));
        }
        if maximum.is_some_and(|max| max < minimum) {
            return Err(ServiceError::ValidationError(
                "maximum_stock must not be below minimum_stock".to_string(),
            ));
        }

        let mut active: stock_item::ActiveModel = existing.into();
        active.minimum_stock = Set(minimum);
        active.maximum_stock = Set(maximum);
        if input.bin_location.is_some() {
            active.bin_location = Set(input.bin_location);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn stats(
        &self,
        ctx: &TenantContext,
        warehouse_id: Option<Uuid>,
    ) -> Result<StockStats, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query =
            stock_item::Entity::find().filter(stock_item::Column::TenantId.eq(ctx.tenant_id));
        if let Some(warehouse_id) = warehouse_id {
            query = query.filter(stock_item::Column::WarehouseId.eq(warehouse_id));
        }
        let rows = query.all(&txn).await?;
        txn.commit().await?;
        summarize_stock(&rows)
    }

    // Movements

    /// Records a movement and applies it to the stock rows in one transaction
    #[instrument(
        skip(self, ctx, input),
        fields(tenant_id = %ctx.tenant_id, movement_type = %input.movement_type)
    )]
    pub async fn create_movement(
        &self,
        ctx: &TenantContext,
        input: CreateMovementInput,
    ) -> Result<MovementOutcome, ServiceError> {
        input.validate()?;
        validate_movement(&input)?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        find_active_item(&txn, ctx.tenant_id, input.item_id).await?;
        find_active_warehouse(&txn, ctx.tenant_id, input.warehouse_id).await?;
        if let Some(dest) = input.destination_warehouse_id {
            find_active_warehouse(&txn, ctx.tenant_id, dest).await?;
        }

        let existing = find_stock(&txn, ctx.tenant_id, input.item_id, input.warehouse_id).await?;
        let (source, destination) = match input.movement_type {
            MovementType::In => {
                let stock = match existing {
                    Some(stock) => stock,
                    None => {
                        create_stock_row(&txn, ctx.tenant_id, input.item_id, input.warehouse_id)
                            .await?
                    }
                };
                let quantity = resulting_quantity(stock.quantity.checked_add(input.quantity))?;
                let unit_cost = input.unit_cost.unwrap_or(stock.unit_cost);
                (set_quantity(&txn, stock, quantity, Some(unit_cost)).await?, None)
            }
            MovementType::Out => {
                let stock = existing.ok_or_else(|| no_stock(&input))?;
                ensure_available(&stock, input.quantity)?;
                let quantity = resulting_quantity(stock.quantity.checked_sub(input.quantity))?;
                (set_quantity(&txn, stock, quantity, None).await?, None)
            }
            MovementType::Adjustment => {
                let stock = match existing {
                    Some(stock) => stock,
                    None => {
                        create_stock_row(&txn, ctx.tenant_id, input.item_id, input.warehouse_id)
                            .await?
                    }
                };
                if input.quantity < stock.reserved_quantity {
                    warn!(
                        stock_id = %stock.id,
                        counted = %input.quantity,
                        reserved = %stock.reserved_quantity,
                        "adjusted below reserved quantity"
                    );
                }
                (set_quantity(&txn, stock, input.quantity, input.unit_cost).await?, None)
            }
            MovementType::Transfer => {
                let dest_id = input.destination_warehouse_id.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "Transfers require destination_warehouse_id".to_string(),
                    )
                })?;
                let stock = existing.ok_or_else(|| no_stock(&input))?;
                ensure_available(&stock, input.quantity)?;
                let unit_cost = stock.unit_cost;
                let remaining = resulting_quantity(stock.quantity.checked_sub(input.quantity))?;
                let source = set_quantity(&txn, stock, remaining, None).await?;

                let target = match find_stock(&txn, ctx.tenant_id, input.item_id, dest_id).await? {
                    Some(target) => target,
                    None => create_stock_row(&txn, ctx.tenant_id, input.item_id, dest_id).await?,
                };
                let target_cost = if target.quantity.is_zero() {
                    Some(unit_cost)
                } else {
                    None
                };
                let received = resulting_quantity(target.quantity.checked_add(input.quantity))?;
                let target = set_quantity(&txn, target, received, target_cost).await?;
                (source, Some(target))
            }
        };

        let movement = stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            item_id: Set(input.item_id),
            warehouse_id: Set(input.warehouse_id),
            destination_warehouse_id: Set(input.destination_warehouse_id),
            movement_type: Set(input.movement_type.to_string()),
            quantity: Set(input.quantity),
            unit_cost: Set(input.unit_cost),
            reason: Set(input.reason),
            reference_document: Set(input.reference_document),
            performed_by: Set(ctx.user_id),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        counter!("helpdesk_stock.movements", 1);
        info!(
            movement_id = %movement.id,
            item_id = %movement.item_id,
            quantity = %movement.quantity,
            "stock movement applied"
        );
        Ok(MovementOutcome {
            movement,
            source,
            destination,
        })
    }

    /// Movement ledger, newest first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_movements(
        &self,
        ctx: &TenantContext,
        filter: MovementFilter,
        page: Page,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = stock_movement::Entity::find()
            .filter(stock_movement::Column::TenantId.eq(ctx.tenant_id));
        if let Some(item_id) = filter.item_id {
            query = query.filter(stock_movement::Column::ItemId.eq(item_id));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(stock_movement::Column::WarehouseId.eq(warehouse_id))
                    .add(stock_movement::Column::DestinationWarehouseId.eq(warehouse_id)),
            );
        }
        if let Some(kind) = filter.movement_type {
            query = query.filter(stock_movement::Column::MovementType.eq(kind.to_string()));
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok((rows, total))
    }
}

fn warehouse_conflict(code: &str) -> String {
    format!("Warehouse code '{}' is already in use", code)
}

fn no_stock(input: &CreateMovementInput) -> ServiceError {
    ServiceError::InsufficientStock(format!(
        "Item {} has no stock in warehouse {}",
        input.item_id, input.warehouse_id
    ))
}

async fn ensure_warehouse_code_free<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    code: &str,
    except: Option<Uuid>,
) -> Result<(), ServiceError> {
    let mut query = warehouse::Entity::find()
        .filter(warehouse::Column::TenantId.eq(tenant_id))
        .filter(warehouse::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(warehouse::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(ServiceError::Conflict(warehouse_conflict(code)));
    }
    Ok(())
}

async fn find_warehouse<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<warehouse::Model, ServiceError> {
    warehouse::Entity::find_by_id(id)
        .filter(warehouse::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Warehouse", id))
}

async fn find_active_warehouse<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<warehouse::Model, ServiceError> {
    let found = find_warehouse(conn, tenant_id, id).await?;
    if !found.is_active {
        return Err(ServiceError::not_found("Warehouse", id));
    }
    Ok(found)
}

async fn find_stock<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    item_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Option<stock_item::Model>, ServiceError> {
    Ok(stock_item::Entity::find()
        .filter(stock_item::Column::TenantId.eq(tenant_id))
        .filter(stock_item::Column::ItemId.eq(item_id))
        .filter(stock_item::Column::WarehouseId.eq(warehouse_id))
        .one(conn)
        .await?)
}

async fn create_stock_row<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    item_id: Uuid,
    warehouse_id: Uuid,
) -> Result<stock_item::Model, ServiceError> {
    let now = Utc::now();
    let created = stock_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        item_id: Set(item_id),
        warehouse_id: Set(warehouse_id),
        quantity: Set(Decimal::ZERO),
        reserved_quantity: Set(Decimal::ZERO),
        minimum_stock: Set(Decimal::ZERO),
        maximum_stock: Set(None),
        unit_cost: Set(Decimal::ZERO),
        bin_location: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| map_unique_violation(e, "Stock row already exists for this item and warehouse"))?;
    Ok(created)
}

async fn set_quantity<C: ConnectionTrait>(
    conn: &C,
    stock: stock_item::Model,
    quantity: Decimal,
    unit_cost: Option<Decimal>,
) -> Result<stock_item::Model, ServiceError> {
    let mut active: stock_item::ActiveModel = stock.into();
    active.quantity = Set(quantity);
    if let Some(cost) = unit_cost {
        active.unit_cost = Set(cost);
    }
    active.updated_at = Set(Utc::now());
    Ok(active.update(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn movement(kind: MovementType, quantity: Decimal) -> CreateMovementInput {
        CreateMovementInput {
            movement_type: kind,
            item_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            destination_warehouse_id: None,
            quantity,
            unit_cost: None,
            reason: None,
            reference_document: None,
        }
    }

    fn stock(quantity: Decimal, reserved: Decimal, minimum: Decimal, cost: Decimal) -> stock_item::Model {
        let now = Utc::now();
        stock_item::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            quantity,
            reserved_quantity: reserved,
            minimum_stock: minimum,
            maximum_stock: None,
            unit_cost: cost,
            bin_location: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn quantities_must_be_positive_except_adjustments() {
        assert!(validate_movement(&movement(MovementType::In, dec!(1))).is_ok());
        assert_matches!(
            validate_movement(&movement(MovementType::Out, dec!(0))),
            Err(ServiceError::ValidationError(_))
        );
        assert!(validate_movement(&movement(MovementType::Adjustment, dec!(0))).is_ok());
        assert!(validate_movement(&movement(MovementType::Adjustment, dec!(-1))).is_err());
    }

    #[test]
    fn transfers_need_a_different_destination() {
        let mut input = movement(MovementType::Transfer, dec!(2));
        assert!(validate_movement(&input).is_err());
        input.destination_warehouse_id = Some(input.warehouse_id);
        assert!(validate_movement(&input).is_err());
        input.destination_warehouse_id = Some(Uuid::new_v4());
        assert!(validate_movement(&input).is_ok());

        let mut inbound = movement(MovementType::In, dec!(2));
        inbound.destination_warehouse_id = Some(Uuid::new_v4());
        assert!(validate_movement(&inbound).is_err());
    }

    #[test]
    fn oversized_quantities_and_costs_are_rejected() {
        let input = movement(MovementType::In, MAX_STOCK_QUANTITY + dec!(1));
        assert_matches!(validate_movement(&input), Err(ServiceError::ValidationError(_)));

        let mut input = movement(MovementType::In, dec!(1));
        input.unit_cost = Some(MAX_UNIT_COST + dec!(1));
        assert_matches!(validate_movement(&input), Err(ServiceError::ValidationError(_)));

        assert!(resulting_quantity(Some(MAX_STOCK_QUANTITY)).is_ok());
        assert!(resulting_quantity(MAX_STOCK_QUANTITY.checked_add(dec!(1))).is_err());
        assert!(resulting_quantity(Decimal::MAX.checked_add(dec!(1))).is_err());
    }

    #[test]
    fn stats_report_overflow_instead_of_panicking() {
        let huge = stock(Decimal::MAX, dec!(0), dec!(0), dec!(10));
        assert_matches!(summarize_stock(&[huge]), Err(ServiceError::InternalError(_)));
    }

    #[test]
    fn reserved_quantity_is_not_available() {
        let row = stock(dec!(10), dec!(4), dec!(0), dec!(1));
        assert!(ensure_available(&row, dec!(6)).is_ok());
        assert_matches!(
            ensure_available(&row, dec!(7)),
            Err(ServiceError::InsufficientStock(_))
        );
    }

    #[test]
    fn stats_sum_value_and_count_low_rows() {
        let mut a = stock(dec!(10), dec!(0), dec!(2), dec!(1.5));
        let b = stock(dec!(1), dec!(0), dec!(5), dec!(10));
        let mut c = stock(dec!(4), dec!(0), dec!(4), dec!(2));
        c.item_id = a.item_id;
        a.warehouse_id = Uuid::new_v4();

        let stats = summarize_stock(&[a, b, c]).unwrap();
        assert_eq!(stats.distinct_items, 2);
        assert_eq!(stats.total_quantity, dec!(15));
        assert_eq!(stats.total_value, dec!(33));
        assert_eq!(stats.low_stock_count, 2);
    }
}
