use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    entities::{item, item_attachment, item_customer_link, item_link, item_supplier_link},
    services::items::{
        AddAttachmentInput, CreateCustomerLinkInput, CreateItemInput, CreateItemLinkInput,
        CreateSupplierLinkInput, ItemFilter, ItemStats, ItemStatus, ItemType, UpdateItemInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Catalog routes, mounted under `/api/parts-services`
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/stats", get(item_stats))
        .route(
            "/items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route(
            "/items/:id/attachments",
            get(list_attachments).post(add_attachment),
        )
        .route(
            "/items/:id/attachments/:attachment_id",
            delete(remove_attachment),
        )
        .route("/items/:id/links", get(list_links).post(add_link))
        .route("/items/:id/links/:link_id", delete(remove_link))
        .route(
            "/items/:id/customers",
            get(list_customer_links).post(add_customer_link),
        )
        .route("/items/:id/customers/:link_id", delete(remove_customer_link))
        .route(
            "/items/:id/suppliers",
            get(list_supplier_links).post(add_supplier_link),
        )
        .route("/items/:id/suppliers/:link_id", delete(remove_supplier_link))
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub item_type: Option<ItemType>,
    pub status: Option<ItemStatus>,
    pub group_name: Option<String>,
    /// Matches name, integration code or description
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
    "name": "Toner cartridge HP 85A",
    "item_type": "material",
    "integration_code": "ERP-00412",
    "measurement_unit": "un",
    "group_name": "Printers",
    "checklist": [],
    "status": "active",
    "is_active": true
}))]
pub struct ItemSummary {
    pub id: Uuid,
    pub name: String,
    /// material or service
    pub item_type: String,
    /// External ERP code, unique per tenant
    pub integration_code: Option<String>,
    pub description: Option<String>,
    pub measurement_unit: String,
    pub maintenance_plan: Option<String>,
    pub group_name: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub checklist: Value,
    /// active, under_review or discontinued
    pub status: String,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<item::Model> for ItemSummary {
    fn from(model: item::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            item_type: model.item_type,
            integration_code: model.integration_code,
            description: model.description,
            measurement_unit: model.measurement_unit,
            maintenance_plan: model.maintenance_plan,
            group_name: model.group_name,
            checklist: model.checklist,
            status: model.status,
            is_active: model.is_active,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttachmentSummary {
    pub id: Uuid,
    pub item_id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub file_size: i64,
    pub content_type: Option<String>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<item_attachment::Model> for AttachmentSummary {
    fn from(model: item_attachment::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            file_name: model.file_name,
            file_url: model.file_url,
            file_size: model.file_size,
            content_type: model.content_type,
            uploaded_by: model.uploaded_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemLinkSummary {
    pub id: Uuid,
    pub parent_item_id: Uuid,
    pub linked_item_id: Uuid,
    /// kit, replacement, compatible or accessory
    pub link_type: String,
    pub quantity: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<item_link::Model> for ItemLinkSummary {
    fn from(model: item_link::Model) -> Self {
        Self {
            id: model.id,
            parent_item_id: model.parent_item_id,
            linked_item_id: model.linked_item_id,
            link_type: model.link_type,
            quantity: model.quantity,
            notes: model.notes,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerLinkSummary {
    pub id: Uuid,
    pub item_id: Uuid,
    pub customer_id: Uuid,
    /// Name the customer uses for the item
    pub alias: Option<String>,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    /// The customer owns this unit as an asset
    pub is_asset: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<item_customer_link::Model> for CustomerLinkSummary {
    fn from(model: item_customer_link::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            customer_id: model.customer_id,
            alias: model.alias,
            sku: model.sku,
            barcode: model.barcode,
            is_asset: model.is_asset,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierLinkSummary {
    pub id: Uuid,
    pub item_id: Uuid,
    pub supplier_id: Uuid,
    pub part_number: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<Decimal>,
    pub lead_time_days: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<item_supplier_link::Model> for SupplierLinkSummary {
    fn from(model: item_supplier_link::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            supplier_id: model.supplier_id,
            part_number: model.part_number,
            description: model.description,
            unit_price: model.unit_price,
            lead_time_days: model.lead_time_days,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

fn summaries<M, T: From<M>>(rows: Vec<M>) -> Vec<T> {
    rows.into_iter().map(T::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items",
    params(ItemListQuery),
    responses((status = 200, description = "Items listed by name", body = ApiResponse<PaginatedResponse<ItemSummary>>)),
    tag = "parts-services"
)]
pub async fn list_items(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<ItemListQuery>,
) -> ApiResult<PaginatedResponse<ItemSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let filter = ItemFilter {
        item_type: query.item_type,
        status: query.status,
        group_name: query.group_name,
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (rows, total) = state.services.items.list_items(&ctx, filter, page).await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/items",
    request_body = CreateItemInput,
    responses(
        (status = 201, description = "Item created", body = ApiResponse<ItemSummary>),
        (status = 409, description = "Integration code already used", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn create_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateItemInput>,
) -> CreatedResult<ItemSummary> {
    let item = state.services.items.create_item(&ctx, payload).await?;
    Ok(created(item.into()))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items/stats",
    responses((status = 200, description = "Item counts by type and status", body = ApiResponse<ItemStats>)),
    tag = "parts-services"
)]
pub async fn item_stats(State(state): State<AppState>, ctx: TenantContext) -> ApiResult<ItemStats> {
    Ok(ok(state.services.items.stats(&ctx).await?))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item fetched", body = ApiResponse<ItemSummary>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn get_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ItemSummary> {
    let item = state.services.items.get_item(&ctx, id).await?;
    Ok(ok(item.into()))
}

#[utoipa::path(
    put,
    path = "/api/parts-services/items/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = UpdateItemInput,
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemSummary>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Integration code already used", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn update_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateItemInput>,
) -> ApiResult<ItemSummary> {
    let item = state.services.items.update_item(&ctx, id, payload).await?;
    Ok(ok(item.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/items/:id",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deactivated"),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.items.delete_item(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items/:id/attachments",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses((status = 200, description = "Attachments of the item", body = ApiResponse<Vec<AttachmentSummary>>)),
    tag = "parts-services"
)]
pub async fn list_attachments(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Vec<AttachmentSummary>> {
    let rows = state.services.items.list_attachments(&ctx, id).await?;
    Ok(ok(summaries(rows)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/items/:id/attachments",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = AddAttachmentInput,
    responses((status = 201, description = "Attachment stored", body = ApiResponse<AttachmentSummary>)),
    tag = "parts-services"
)]
pub async fn add_attachment(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AddAttachmentInput>,
) -> CreatedResult<AttachmentSummary> {
    let attachment = state.services.items.add_attachment(&ctx, id, payload).await?;
    Ok(created(attachment.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/items/:id/attachments/:attachment_id",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("attachment_id" = Uuid, Path, description = "Attachment ID")
    ),
    responses((status = 204, description = "Attachment removed")),
    tag = "parts-services"
)]
pub async fn remove_attachment(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath((id, attachment_id)): AppPath<(Uuid, Uuid)>,
) -> NoContent {
    state
        .services
        .items
        .remove_attachment(&ctx, id, attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items/:id/links",
    params(("id" = Uuid, Path, description = "Parent item ID")),
    responses((status = 200, description = "Linked items", body = ApiResponse<Vec<ItemLinkSummary>>)),
    tag = "parts-services"
)]
pub async fn list_links(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Vec<ItemLinkSummary>> {
    let rows = state.services.items.list_links(&ctx, id).await?;
    Ok(ok(summaries(rows)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/items/:id/links",
    params(("id" = Uuid, Path, description = "Parent item ID")),
    request_body = CreateItemLinkInput,
    responses(
        (status = 201, description = "Link created", body = ApiResponse<ItemLinkSummary>),
        (status = 400, description = "Item linked to itself", body = crate::errors::ErrorResponse),
        (status = 409, description = "Pair already linked", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn add_link(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateItemLinkInput>,
) -> CreatedResult<ItemLinkSummary> {
    let link = state.services.items.add_link(&ctx, id, payload).await?;
    Ok(created(link.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/items/:id/links/:link_id",
    params(
        ("id" = Uuid, Path, description = "Parent item ID"),
        ("link_id" = Uuid, Path, description = "Link ID")
    ),
    responses((status = 204, description = "Link removed")),
    tag = "parts-services"
)]
pub async fn remove_link(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath((id, link_id)): AppPath<(Uuid, Uuid)>,
) -> NoContent {
    state.services.items.remove_link(&ctx, id, link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items/:id/customers",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses((status = 200, description = "Active customer links", body = ApiResponse<Vec<CustomerLinkSummary>>)),
    tag = "parts-services"
)]
pub async fn list_customer_links(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Vec<CustomerLinkSummary>> {
    let rows = state.services.items.list_customer_links(&ctx, id).await?;
    Ok(ok(summaries(rows)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/items/:id/customers",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = CreateCustomerLinkInput,
    responses(
        (status = 201, description = "Customer linked", body = ApiResponse<CustomerLinkSummary>),
        (status = 409, description = "Customer already linked", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn add_customer_link(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateCustomerLinkInput>,
) -> CreatedResult<CustomerLinkSummary> {
    let link = state
        .services
        .items
        .add_customer_link(&ctx, id, payload)
        .await?;
    Ok(created(link.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/items/:id/customers/:link_id",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("link_id" = Uuid, Path, description = "Customer link ID")
    ),
    responses((status = 204, description = "Customer link deactivated")),
    tag = "parts-services"
)]
pub async fn remove_customer_link(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath((id, link_id)): AppPath<(Uuid, Uuid)>,
) -> NoContent {
    state
        .services
        .items
        .remove_customer_link(&ctx, id, link_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/parts-services/items/:id/suppliers",
    params(("id" = Uuid, Path, description = "Item ID")),
    responses((status = 200, description = "Active supplier links", body = ApiResponse<Vec<SupplierLinkSummary>>)),
    tag = "parts-services"
)]
pub async fn list_supplier_links(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Vec<SupplierLinkSummary>> {
    let rows = state.services.items.list_supplier_links(&ctx, id).await?;
    Ok(ok(summaries(rows)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/items/:id/suppliers",
    params(("id" = Uuid, Path, description = "Item ID")),
    request_body = CreateSupplierLinkInput,
    responses(
        (status = 201, description = "Supplier linked", body = ApiResponse<SupplierLinkSummary>),
        (status = 409, description = "Supplier already linked", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn add_supplier_link(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateSupplierLinkInput>,
) -> CreatedResult<SupplierLinkSummary> {
    let link = state
        .services
        .items
        .add_supplier_link(&ctx, id, payload)
        .await?;
    Ok(created(link.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/items/:id/suppliers/:link_id",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("link_id" = Uuid, Path, description = "Supplier link ID")
    ),
    responses((status = 204, description = "Supplier link deactivated")),
    tag = "parts-services"
)]
pub async fn remove_supplier_link(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath((id, link_id)): AppPath<(Uuid, Uuid)>,
) -> NoContent {
    state
        .services
        .items
        .remove_supplier_link(&ctx, id, link_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
