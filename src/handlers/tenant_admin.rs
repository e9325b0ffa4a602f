use super::{common::ok, extract::AppJson, saas_admin::TenantSummary};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    services::tenants::{TenantStats, UpdateTenantInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{extract::State, routing::get, Router};

/// Routes a tenant administrator uses to manage their own organization
pub fn tenant_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/tenant", get(get_current_tenant).put(update_current_tenant))
        .route("/stats", get(tenant_stats))
        .with_role(Role::TenantAdmin)
}

#[utoipa::path(
    get,
    path = "/api/tenant-admin/tenant",
    responses(
        (status = 200, description = "Caller's tenant", body = ApiResponse<TenantSummary>),
        (status = 403, description = "Tenant inactive or caller not an administrator", body = crate::errors::ErrorResponse)
    ),
    tag = "tenant-admin"
)]
pub async fn get_current_tenant(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<TenantSummary> {
    let tenant = state.services.tenants.current_tenant(&ctx).await?;
    Ok(ok(tenant.into()))
}

/// Settings in the body are merged into the stored ones; `null` removes a key.
#[utoipa::path(
    put,
    path = "/api/tenant-admin/tenant",
    request_body = UpdateTenantInput,
    responses(
        (status = 200, description = "Tenant updated", body = ApiResponse<TenantSummary>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "tenant-admin"
)]
pub async fn update_current_tenant(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<UpdateTenantInput>,
) -> ApiResult<TenantSummary> {
    let tenant = state
        .services
        .tenants
        .update_current_tenant(&ctx, payload)
        .await?;
    Ok(ok(tenant.into()))
}

#[utoipa::path(
    get,
    path = "/api/tenant-admin/stats",
    responses(
        (status = 200, description = "Usage counters for the tenant", body = ApiResponse<TenantStats>)
    ),
    tag = "tenant-admin"
)]
pub async fn tenant_stats(State(state): State<AppState>, ctx: TenantContext) -> ApiResult<TenantStats> {
    let stats = state.services.tenants.stats(&ctx).await?;
    Ok(ok(stats))
}
