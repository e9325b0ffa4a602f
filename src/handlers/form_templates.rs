use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    services::form_templates::{
        CreateFormTemplateInput, FormSubmission, FormTemplateView, SubmissionResult,
        TemplateField, TemplateTarget, UpdateFormTemplateInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn form_template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route(
            "/:id",
            get(get_template)
                .put(update_template)
                .delete(delete_template),
        )
        .route("/:id/validate", post(validate_submission))
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FormTemplateListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub target: Option<TemplateTarget>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FormTemplateSummary {
    pub id: Uuid,
    #[schema(example = "On-site visit report")]
    pub name: String,
    pub description: Option<String>,
    /// ticket, item, contract or general
    #[schema(example = "ticket")]
    pub target: String,
    /// Ordered field definitions
    pub fields: Vec<TemplateField>,
    /// Incremented on every update
    pub version: i32,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FormTemplateView> for FormTemplateSummary {
    fn from(view: FormTemplateView) -> Self {
        let template = view.template;
        Self {
            id: template.id,
            name: template.name,
            description: template.description,
            target: template.target,
            fields: view.fields,
            version: template.version,
            is_active: template.is_active,
            created_by: template.created_by,
            created_at: template.created_at,
            updated_at: template.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/form-templates",
    params(FormTemplateListQuery),
    responses((status = 200, description = "Form templates", body = ApiResponse<PaginatedResponse<FormTemplateSummary>>)),
    tag = "form-templates"
)]
pub async fn list_templates(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<FormTemplateListQuery>,
) -> ApiResult<PaginatedResponse<FormTemplateSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let (rows, total) = state
        .services
        .form_templates
        .list_templates(&ctx, query.target, query.include_inactive, page)
        .await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/form-templates",
    request_body = CreateFormTemplateInput,
    responses(
        (status = 201, description = "Template created at version 1", body = ApiResponse<FormTemplateSummary>),
        (status = 400, description = "Invalid field definitions", body = crate::errors::ErrorResponse)
    ),
    tag = "form-templates"
)]
pub async fn create_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateFormTemplateInput>,
) -> CreatedResult<FormTemplateSummary> {
    let view = state
        .services
        .form_templates
        .create_template(&ctx, payload)
        .await?;
    Ok(created(view.into()))
}

#[utoipa::path(
    get,
    path = "/api/form-templates/:id",
    params(("id" = Uuid, Path, description = "Form template ID")),
    responses(
        (status = 200, description = "Template fetched", body = ApiResponse<FormTemplateSummary>),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "form-templates"
)]
pub async fn get_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<FormTemplateSummary> {
    let view = state.services.form_templates.get_template(&ctx, id).await?;
    Ok(ok(view.into()))
}

#[utoipa::path(
    put,
    path = "/api/form-templates/:id",
    params(("id" = Uuid, Path, description = "Form template ID")),
    request_body = UpdateFormTemplateInput,
    responses(
        (status = 200, description = "Template updated, version bumped", body = ApiResponse<FormTemplateSummary>),
        (status = 400, description = "Invalid field definitions", body = crate::errors::ErrorResponse),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "form-templates"
)]
pub async fn update_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateFormTemplateInput>,
) -> ApiResult<FormTemplateSummary> {
    let view = state
        .services
        .form_templates
        .update_template(&ctx, id, payload)
        .await?;
    Ok(ok(view.into()))
}

#[utoipa::path(
    delete,
    path = "/api/form-templates/:id",
    params(("id" = Uuid, Path, description = "Form template ID")),
    responses(
        (status = 204, description = "Template deactivated"),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "form-templates"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.form_templates.delete_template(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Checks submitted values against the template without storing them.
#[utoipa::path(
    post,
    path = "/api/form-templates/:id/validate",
    params(("id" = Uuid, Path, description = "Form template ID")),
    request_body = FormSubmission,
    responses(
        (status = 200, description = "Per-field validation result", body = ApiResponse<SubmissionResult>),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse)
    ),
    tag = "form-templates"
)]
pub async fn validate_submission(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<FormSubmission>,
) -> ApiResult<SubmissionResult> {
    let result = state
        .services
        .form_templates
        .validate_submission(&ctx, id, payload)
        .await?;
    Ok(ok(result))
}
