use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    entities::{stock_item, stock_movement, warehouse},
    services::stock::{
        CreateMovementInput, CreateWarehouseInput, MovementFilter, MovementOutcome, MovementType,
        StockFilter, StockStats, UpdateStockThresholdsInput, UpdateWarehouseInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Warehouse and stock routes, mounted under `/api/parts-services`
pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route(
            "/warehouses/:id",
            get(get_warehouse)
                .put(update_warehouse)
                .delete(delete_warehouse),
        )
        .route("/stock", get(list_stock))
        .route("/stock/low", get(low_stock_report))
        .route("/stock/stats", get(stock_stats))
        .route("/stock/:id/thresholds", put(update_thresholds))
        .route("/stock/movements", get(list_movements).post(create_movement))
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StockListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub warehouse_id: Option<Uuid>,
    pub item_id: Option<Uuid>,
    /// Only rows at or below their minimum
    #[serde(default)]
    pub low_stock: bool,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WarehouseScopeQuery {
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MovementListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub item_id: Option<Uuid>,
    /// Matches source or destination warehouse
    pub warehouse_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WarehouseSummary {
    pub id: Uuid,
    #[schema(example = "Main warehouse")]
    pub name: String,
    /// Unique per tenant
    #[schema(example = "WH-01")]
    pub code: String,
    pub address: Option<String>,
    #[schema(example = "main")]
    pub warehouse_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<warehouse::Model> for WarehouseSummary {
    fn from(model: warehouse::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            code: model.code,
            address: model.address,
            warehouse_type: model.warehouse_type,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLevel {
    pub id: Uuid,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,
    /// quantity minus reserved_quantity
    pub available_quantity: Decimal,
    pub minimum_stock: Decimal,
    pub maximum_stock: Option<Decimal>,
    pub unit_cost: Decimal,
    pub bin_location: Option<String>,
    pub low_stock: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<stock_item::Model> for StockLevel {
    fn from(model: stock_item::Model) -> Self {
        let available_quantity = model.available();
        let low_stock = model.is_low_stock();
        Self {
            id: model.id,
            item_id: model.item_id,
            warehouse_id: model.warehouse_id,
            quantity: model.quantity,
            reserved_quantity: model.reserved_quantity,
            available_quantity,
            minimum_stock: model.minimum_stock,
            maximum_stock: model.maximum_stock,
            unit_cost: model.unit_cost,
            bin_location: model.bin_location,
            low_stock,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementSummary {
    pub id: Uuid,
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    /// in, out, transfer or adjustment
    pub movement_type: String,
    pub quantity: Decimal,
    pub unit_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub reference_document: Option<String>,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<stock_movement::Model> for MovementSummary {
    fn from(model: stock_movement::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            warehouse_id: model.warehouse_id,
            destination_warehouse_id: model.destination_warehouse_id,
            movement_type: model.movement_type,
            quantity: model.quantity,
            unit_cost: model.unit_cost,
            reason: model.reason,
            reference_document: model.reference_document,
            performed_by: model.performed_by,
            created_at: model.created_at,
        }
    }
}

/// A recorded movement with the stock levels after it was applied
#[derive(Debug, Serialize, ToSchema)]
pub struct MovementResult {
    pub movement: MovementSummary,
    pub source: StockLevel,
    pub destination: Option<StockLevel>,
}

impl From<MovementOutcome> for MovementResult {
    fn from(outcome: MovementOutcome) -> Self {
        Self {
            movement: outcome.movement.into(),
            source: outcome.source.into(),
            destination: outcome.destination.map(StockLevel::from),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/parts-services/warehouses",
    params(WarehouseListQuery),
    responses((status = 200, description = "Warehouses by name", body = ApiResponse<Vec<WarehouseSummary>>)),
    tag = "parts-services"
)]
pub async fn list_warehouses(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<WarehouseListQuery>,
) -> ApiResult<Vec<WarehouseSummary>> {
    let rows = state
        .services
        .stock
        .list_warehouses(&ctx, query.include_inactive)
        .await?;
    Ok(ok(rows.into_iter().map(WarehouseSummary::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/warehouses",
    request_body = CreateWarehouseInput,
    responses(
        (status = 201, description = "Warehouse created", body = ApiResponse<WarehouseSummary>),
        (status = 409, description = "Code already used", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn create_warehouse(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateWarehouseInput>,
) -> CreatedResult<WarehouseSummary> {
    let warehouse = state.services.stock.create_warehouse(&ctx, payload).await?;
    Ok(created(warehouse.into()))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 200, description = "Warehouse fetched", body = ApiResponse<WarehouseSummary>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn get_warehouse(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<WarehouseSummary> {
    let warehouse = state.services.stock.get_warehouse(&ctx, id).await?;
    Ok(ok(warehouse.into()))
}

#[utoipa::path(
    put,
    path = "/api/parts-services/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    request_body = UpdateWarehouseInput,
    responses(
        (status = 200, description = "Warehouse updated", body = ApiResponse<WarehouseSummary>),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn update_warehouse(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateWarehouseInput>,
) -> ApiResult<WarehouseSummary> {
    let warehouse = state
        .services
        .stock
        .update_warehouse(&ctx, id, payload)
        .await?;
    Ok(ok(warehouse.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/warehouses/:id",
    params(("id" = Uuid, Path, description = "Warehouse ID")),
    responses(
        (status = 204, description = "Warehouse deactivated"),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.stock.delete_warehouse(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/parts-services/stock",
    params(StockListQuery),
    responses((status = 200, description = "Stock levels", body = ApiResponse<PaginatedResponse<StockLevel>>)),
    tag = "parts-services"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<StockListQuery>,
) -> ApiResult<PaginatedResponse<StockLevel>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let filter = StockFilter {
        warehouse_id: query.warehouse_id,
        item_id: query.item_id,
        low_stock: query.low_stock,
    };
    let (rows, total) = state.services.stock.list_stock(&ctx, filter, page).await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/stock/low",
    params(WarehouseScopeQuery),
    responses((status = 200, description = "Rows with quantity at or below minimum", body = ApiResponse<Vec<StockLevel>>)),
    tag = "parts-services"
)]
pub async fn low_stock_report(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<WarehouseScopeQuery>,
) -> ApiResult<Vec<StockLevel>> {
    let rows = state
        .services
        .stock
        .low_stock_report(&ctx, query.warehouse_id)
        .await?;
    Ok(ok(rows.into_iter().map(StockLevel::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/stock/stats",
    params(WarehouseScopeQuery),
    responses((status = 200, description = "Stock totals", body = ApiResponse<StockStats>)),
    tag = "parts-services"
)]
pub async fn stock_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<WarehouseScopeQuery>,
) -> ApiResult<StockStats> {
    let stats = state.services.stock.stats(&ctx, query.warehouse_id).await?;
    Ok(ok(stats))
}

#[utoipa::path(
    put,
    path = "/api/parts-services/stock/:id/thresholds",
    params(("id" = Uuid, Path, description = "Stock row ID")),
    request_body = UpdateStockThresholdsInput,
    responses(
        (status = 200, description = "Thresholds updated", body = ApiResponse<StockLevel>),
        (status = 400, description = "Maximum below minimum", body = crate::errors::ErrorResponse),
        (status = 404, description = "Stock row not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn update_thresholds(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateStockThresholdsInput>,
) -> ApiResult<StockLevel> {
    let stock = state
        .services
        .stock
        .update_thresholds(&ctx, id, payload)
        .await?;
    Ok(ok(stock.into()))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/stock/movements",
    params(MovementListQuery),
    responses((status = 200, description = "Movement ledger, newest first", body = ApiResponse<PaginatedResponse<MovementSummary>>)),
    tag = "parts-services"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<MovementListQuery>,
) -> ApiResult<PaginatedResponse<MovementSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let filter = MovementFilter {
        item_id: query.item_id,
        warehouse_id: query.warehouse_id,
        movement_type: query.movement_type,
    };
    let (rows, total) = state
        .services
        .stock
        .list_movements(&ctx, filter, page)
        .await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/stock/movements",
    request_body = CreateMovementInput,
    responses(
        (status = 201, description = "Movement applied", body = ApiResponse<MovementResult>),
        (status = 400, description = "Invalid movement", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn create_movement(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateMovementInput>,
) -> CreatedResult<MovementResult> {
    let outcome = state.services.stock.create_movement(&ctx, payload).await?;
    Ok(created(outcome.into()))
}
