use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{audit_context, created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, TenantContext},
    entities::ticket,
    services::tickets::{
        CreateTicketInput, TicketFilter, TicketPriority, TicketStatus, UpdateTicketInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Ticket routes; any authenticated tenant user may call them
pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route(
            "/:id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .with_auth()
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assigned_to_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// Matches subject or ticket number
    pub search: Option<String>,
    /// Include soft-deleted tickets
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "4b1c2f0e-8a1d-4c55-9e0f-3f6a1b2c3d4e",
    "number": "T-000042",
    "subject": "Printer on 3rd floor not responding",
    "status": "open",
    "priority": "high",
    "tags": ["hardware", "printer"],
    "custom_fields": {},
    "is_active": true,
    "created_at": "2024-05-02T09:15:00Z",
    "updated_at": "2024-05-02T09:15:00Z"
}))]
pub struct TicketSummary {
    pub id: Uuid,
    /// Sequential number, unique per tenant
    #[schema(example = "T-000042")]
    pub number: String,
    #[schema(example = "Printer on 3rd floor not responding")]
    pub subject: String,
    pub description: Option<String>,
    /// new, open, in_progress, pending, resolved or closed
    #[schema(example = "open")]
    pub status: String,
    #[schema(example = "high")]
    pub priority: String,
    pub urgency: Option<String>,
    pub impact: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub action_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub caller_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub assignment_group: Option<String>,
    #[schema(value_type = Vec<String>)]
    pub tags: Value,
    #[schema(value_type = Object)]
    pub custom_fields: Value,
    pub is_active: bool,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<ticket::Model> for TicketSummary {
    fn from(model: ticket::Model) -> Self {
        Self {
            id: model.id,
            number: model.number,
            subject: model.subject,
            description: model.description,
            status: model.status,
            priority: model.priority,
            urgency: model.urgency,
            impact: model.impact,
            category_id: model.category_id,
            subcategory_id: model.subcategory_id,
            action_id: model.action_id,
            company_id: model.company_id,
            caller_id: model.caller_id,
            assigned_to_id: model.assigned_to_id,
            assignment_group: model.assignment_group,
            tags: model.tags,
            custom_fields: model.custom_fields,
            is_active: model.is_active,
            created_by: model.created_by,
            updated_by: model.updated_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
            resolved_at: model.resolved_at,
            closed_at: model.closed_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    params(TicketListQuery),
    responses(
        (status = 200, description = "Tickets listed, newest first", body = ApiResponse<PaginatedResponse<TicketSummary>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<TicketListQuery>,
) -> ApiResult<PaginatedResponse<TicketSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let filter = TicketFilter {
        status: query.status,
        priority: query.priority,
        assigned_to_id: query.assigned_to_id,
        company_id: query.company_id,
        category_id: query.category_id,
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (rows, total) = state.services.tickets.list_tickets(&ctx, filter, page).await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/tickets",
    request_body = CreateTicketInput,
    responses(
        (status = 201, description = "Ticket created", body = ApiResponse<TicketSummary>),
        (status = 400, description = "Invalid request or classification", body = crate::errors::ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    ctx: TenantContext,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateTicketInput>,
) -> CreatedResult<TicketSummary> {
    let audit = audit_context(&headers, &ctx);
    let ticket = state
        .services
        .tickets
        .create_ticket(&ctx, payload, &audit)
        .await?;
    Ok(created(ticket.into()))
}

#[utoipa::path(
    get,
    path = "/api/tickets/:id",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Ticket fetched", body = ApiResponse<TicketSummary>),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<TicketSummary> {
    let ticket = state.services.tickets.get_ticket(&ctx, id).await?;
    Ok(ok(ticket.into()))
}

#[utoipa::path(
    put,
    path = "/api/tickets/:id",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = UpdateTicketInput,
    responses(
        (status = 200, description = "Ticket updated", body = ApiResponse<TicketSummary>),
        (status = 400, description = "Invalid request or classification", body = crate::errors::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    headers: HeaderMap,
    AppJson(payload): AppJson<UpdateTicketInput>,
) -> ApiResult<TicketSummary> {
    let audit = audit_context(&headers, &ctx);
    let ticket = state
        .services
        .tickets
        .update_ticket(&ctx, id, payload, &audit)
        .await?;
    Ok(ok(ticket.into()))
}

#[utoipa::path(
    delete,
    path = "/api/tickets/:id",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 204, description = "Ticket deactivated"),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "tickets"
)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    headers: HeaderMap,
) -> NoContent {
    let audit = audit_context(&headers, &ctx);
    state.services.tickets.delete_ticket(&ctx, id, &audit).await?;
    Ok(StatusCode::NO_CONTENT)
}
