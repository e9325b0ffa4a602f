use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult};
use crate::{
    auth::{AuthRouterExt, Role},
    entities::tenant,
    services::tenants::{CreateTenantInput, UpdateTenantInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Platform operator routes under `/api/saas-admin`
pub fn saas_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(list_tenants).post(create_tenant))
        .route("/tenants/:id", get(get_tenant).put(update_tenant))
        .route("/tenants/:id/activate", post(activate_tenant))
        .route("/tenants/:id/deactivate", post(deactivate_tenant))
        .with_role(Role::SaasAdmin)
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TenantListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Only tenants with this activation state
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "7d9f8b9e-3c1a-4f7b-9a43-2b8f1f0c6d11",
    "name": "Acme Support",
    "subdomain": "acme",
    "schema_name": "tenant_7d9f8b9e_3c1a_4f7b_9a43_2b8f1f0c6d11",
    "settings": {"timezone": "America/Sao_Paulo"},
    "is_active": true,
    "created_at": "2024-03-01T12:00:00Z",
    "updated_at": "2024-03-01T12:00:00Z"
}))]
pub struct TenantSummary {
    pub id: Uuid,
    /// Display name of the organization
    #[schema(example = "Acme Support")]
    pub name: String,
    /// Lowercase slug used to route the tenant
    #[schema(example = "acme")]
    pub subdomain: String,
    /// Database schema holding the tenant's tables
    pub schema_name: String,
    #[schema(value_type = Object)]
    pub settings: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<tenant::Model> for TenantSummary {
    fn from(model: tenant::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            subdomain: model.subdomain,
            schema_name: model.schema_name,
            settings: model.settings,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/saas-admin/tenants",
    params(TenantListQuery),
    responses(
        (status = 200, description = "Tenants listed", body = ApiResponse<PaginatedResponse<TenantSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    tag = "saas-admin"
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TenantListQuery>,
) -> ApiResult<PaginatedResponse<TenantSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let (rows, total) = state.services.tenants.list_tenants(query.active, page).await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/saas-admin/tenants",
    request_body = CreateTenantInput,
    responses(
        (status = 201, description = "Tenant created and provisioned", body = ApiResponse<TenantSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Subdomain already taken", body = crate::errors::ErrorResponse)
    ),
    tag = "saas-admin"
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTenantInput>,
) -> CreatedResult<TenantSummary> {
    let tenant = state.services.tenants.create_tenant(payload).await?;
    Ok(created(TenantSummary::from(tenant)))
}

#[utoipa::path(
    get,
    path = "/api/saas-admin/tenants/:id",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant fetched", body = ApiResponse<TenantSummary>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse)
    ),
    tag = "saas-admin"
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<TenantSummary> {
    let tenant = state.services.tenants.get_tenant(id).await?;
    Ok(ok(tenant.into()))
}

#[utoipa::path(
    put,
    path = "/api/saas-admin/tenants/:id",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    request_body = UpdateTenantInput,
    responses(
        (status = 200, description = "Tenant updated", body = ApiResponse<TenantSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse)
    ),
    tag = "saas-admin"
)]
pub async fn update_tenant(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateTenantInput>,
) -> ApiResult<TenantSummary> {
    let tenant = state.services.tenants.update_tenant(id, payload).await?;
    Ok(ok(tenant.into()))
}

#[utoipa::path(
    post,
    path = "/api/saas-admin/tenants/:id/activate",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant activated", body = ApiResponse<TenantSummary>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse)
    ),
    tag = "saas-admin"
)]
pub async fn activate_tenant(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<TenantSummary> {
    let tenant = state.services.tenants.set_active(id, true).await?;
    Ok(ok(tenant.into()))
}

#[utoipa::path(
    post,
    path = "/api/saas-admin/tenants/:id/deactivate",
    params(("id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant deactivated", body = ApiResponse<TenantSummary>),
        (status = 404, description = "Tenant not found", body = crate::errors::ErrorResponse)
    ),
    tag = "saas-admin"
)]
pub async fn deactivate_tenant(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<TenantSummary> {
    let tenant = state.services.tenants.set_active(id, false).await?;
    Ok(ok(tenant.into()))
}
