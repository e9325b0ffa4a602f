use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    entities::{service_kit, service_kit_item},
    services::service_kits::{
        CreateServiceKitInput, KitFilter, KitType, ServiceKitWithItems, UpdateServiceKitInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Service kit routes, mounted under `/api/parts-services`
pub fn service_kit_routes() -> Router<AppState> {
    Router::new()
        .route("/service-kits", get(list_kits).post(create_kit))
        .route(
            "/service-kits/:id",
            get(get_kit).put(update_kit).delete(delete_kit),
        )
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KitListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub kit_type: Option<KitType>,
    /// Matches name or equipment model
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceKitSummary {
    pub id: Uuid,
    #[schema(example = "Preventive maintenance - split AC")]
    pub name: String,
    pub description: Option<String>,
    /// maintenance, repair, installation or emergency
    #[schema(example = "maintenance")]
    pub kit_type: String,
    pub equipment_model: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<service_kit::Model> for ServiceKitSummary {
    fn from(model: service_kit::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            kit_type: model.kit_type,
            equipment_model: model.equipment_model,
            is_active: model.is_active,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KitItemSummary {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub is_optional: bool,
}

impl From<service_kit_item::Model> for KitItemSummary {
    fn from(model: service_kit_item::Model) -> Self {
        Self {
            id: model.id,
            item_id: model.item_id,
            quantity: model.quantity,
            is_optional: model.is_optional,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceKitDetail {
    #[serde(flatten)]
    pub kit: ServiceKitSummary,
    pub items: Vec<KitItemSummary>,
}

impl From<ServiceKitWithItems> for ServiceKitDetail {
    fn from(value: ServiceKitWithItems) -> Self {
        Self {
            kit: value.kit.into(),
            items: value.items.into_iter().map(KitItemSummary::from).collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/parts-services/service-kits",
    params(KitListQuery),
    responses((status = 200, description = "Service kits", body = ApiResponse<PaginatedResponse<ServiceKitSummary>>)),
    tag = "parts-services"
)]
pub async fn list_kits(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<KitListQuery>,
) -> ApiResult<PaginatedResponse<ServiceKitSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let filter = KitFilter {
        kit_type: query.kit_type,
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (rows, total) = state
        .services
        .service_kits
        .list_kits(&ctx, filter, page)
        .await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/parts-services/service-kits",
    request_body = CreateServiceKitInput,
    responses(
        (status = 201, description = "Kit created with its items", body = ApiResponse<ServiceKitDetail>),
        (status = 400, description = "Unknown, inactive or repeated item", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn create_kit(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateServiceKitInput>,
) -> CreatedResult<ServiceKitDetail> {
    let kit = state.services.service_kits.create_kit(&ctx, payload).await?;
    Ok(created(kit.into()))
}

#[utoipa::path(
    get,
    path = "/api/parts-services/service-kits/:id",
    params(("id" = Uuid, Path, description = "Service kit ID")),
    responses(
        (status = 200, description = "Kit with its items", body = ApiResponse<ServiceKitDetail>),
        (status = 404, description = "Kit not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn get_kit(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ServiceKitDetail> {
    let kit = state.services.service_kits.get_kit(&ctx, id).await?;
    Ok(ok(kit.into()))
}

#[utoipa::path(
    put,
    path = "/api/parts-services/service-kits/:id",
    params(("id" = Uuid, Path, description = "Service kit ID")),
    request_body = UpdateServiceKitInput,
    responses(
        (status = 200, description = "Kit updated", body = ApiResponse<ServiceKitDetail>),
        (status = 404, description = "Kit not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn update_kit(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateServiceKitInput>,
) -> ApiResult<ServiceKitDetail> {
    let kit = state
        .services
        .service_kits
        .update_kit(&ctx, id, payload)
        .await?;
    Ok(ok(kit.into()))
}

#[utoipa::path(
    delete,
    path = "/api/parts-services/service-kits/:id",
    params(("id" = Uuid, Path, description = "Service kit ID")),
    responses(
        (status = 204, description = "Kit deactivated"),
        (status = 404, description = "Kit not found", body = crate::errors::ErrorResponse)
    ),
    tag = "parts-services"
)]
pub async fn delete_kit(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.service_kits.delete_kit(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
