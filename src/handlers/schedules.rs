use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    services::schedules::{
        CreateScheduleTemplateInput, ScheduleConfiguration, ScheduleTemplateView,
        UpdateScheduleTemplateInput,
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
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Timecard routes under `/api/timecard`
pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/schedule-templates",
            get(list_templates).post(create_template),
        )
        .route(
            "/schedule-templates/:id",
            get(get_template)
                .put(update_template)
                .delete(delete_template),
        )
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Filter by activation state; active templates when absent
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleTemplateSummary {
    pub id: Uuid,
    #[schema(example = "Office hours")]
    pub name: String,
    pub description: Option<String>,
    /// 5x2, 6x1, 12x36, shift, flexible or custom
    #[schema(example = "5x2")]
    pub schedule_type: String,
    pub rotation_cycle_days: i32,
    pub configuration: ScheduleConfiguration,
    pub requires_approval: bool,
    pub is_active: bool,
    /// Hours worked per shift, break excluded
    #[schema(example = 8.0)]
    pub daily_hours: f64,
    #[schema(example = 40.0)]
    pub weekly_hours: f64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduleTemplateView> for ScheduleTemplateSummary {
    fn from(view: ScheduleTemplateView) -> Self {
        let template = view.template;
        Self {
            id: template.id,
            name: template.name,
            description: template.description,
            schedule_type: template.schedule_type,
            rotation_cycle_days: template.rotation_cycle_days,
            configuration: view.configuration,
            requires_approval: template.requires_approval,
            is_active: template.is_active,
            daily_hours: view.daily_hours,
            weekly_hours: view.weekly_hours,
            created_by: template.created_by,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/timecard/schedule-templates",
    params(ScheduleListQuery),
    responses((status = 200, description = "Schedule templates", body = ApiResponse<PaginatedResponse<ScheduleTemplateSummary>>)),
    tag = "timecard"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<ScheduleListQuery>,
) -> ApiResult<PaginatedResponse<ScheduleTemplateSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let (rows, total) = state
        .services
        .schedules
        .list_templates(&ctx, query.active, page)
        .await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/timecard/schedule-templates",
    request_body = CreateScheduleTemplateInput,
    responses(
        (status = 201, description = "Template created", body = ApiResponse<ScheduleTemplateSummary>),
        (status = 400, description = "Invalid configuration", body = crate::errors::ErrorResponse)
    ),
    tag = "timecard"
)]
pub async fn create_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateScheduleTemplateInput>,
) -> CreatedResult<ScheduleTemplateSummary> {
    let view = state.services.schedules.create_template(&ctx, payload).await?;
    Ok(created(view.into()))
}

#[utoipa::path(
    get,
    path = "/api/timecard/schedule-templates/:id",
    params(("id" = Uuid, Path, description = "Schedule template ID")),
    responses(
        (status = 200, description = "Template fetched", body = ApiResponse<ScheduleTemplateSummary>),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "timecard"
)]
pub async fn get_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ScheduleTemplateSummary> {
    let view = state.services.schedules.get_template(&ctx, id).await?;
    Ok(ok(view.into()))
}

#[utoipa::path(
    put,
    path = "/api/timecard/schedule-templates/:id",
    params(("id" = Uuid, Path, description = "Schedule template ID")),
    request_body = UpdateScheduleTemplateInput,
    responses(
        (status = 200, description = "Template updated", body = ApiResponse<ScheduleTemplateSummary>),
        (status = 400, description = "Invalid configuration", body = crate::errors::ErrorResponse),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "timecard"
)]
pub async fn update_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateScheduleTemplateInput>,
) -> ApiResult<ScheduleTemplateSummary> {
    let view = state
        .services
        .schedules
        .update_template(&ctx, id, payload)
        .await?;
    Ok(ok(view.into()))
}

#[utoipa::path(
    delete,
    path = "/api/timecard/schedule-templates/:id",
    params(("id" = Uuid, Path, description = "Schedule template ID")),
    responses(
        (status = 204, description = "Template deactivated"),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "timecard"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.schedules.delete_template(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
