use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{audit_context, created, ok, CreatedResult};
use crate::{
    auth::{AuthRouterExt, TenantContext},
    entities::ticket_history,
    services::ticket_history::{AddNoteInput, HistoryAction, HistorySummary},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn ticket_history_routes() -> Router<AppState> {
    Router::new()
        .route("/:ticket_id", get(list_history))
        .route("/:ticket_id/summary", get(history_summary))
        .route("/:ticket_id/notes", post(add_note))
        .with_auth()
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Only rows of this action type
    pub action_type: Option<HistoryAction>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub ticket_id: Uuid,
    /// created, updated, status_changed, priority_changed, assigned, deleted, note_added or viewed
    pub action_type: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: String,
    pub performed_by: Uuid,
    pub performed_by_name: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl From<ticket_history::Model> for HistoryEntry {
    fn from(model: ticket_history::Model) -> Self {
        Self {
            id: model.id,
            ticket_id: model.ticket_id,
            action_type: model.action_type,
            field_name: model.field_name,
            old_value: model.old_value,
            new_value: model.new_value,
            description: model.description,
            performed_by: model.performed_by,
            performed_by_name: model.performed_by_name,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            metadata: model.metadata,
            created_at: model.created_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/ticket-history/:ticket_id",
    params(("ticket_id" = Uuid, Path, description = "Ticket ID"), HistoryQuery),
    responses(
        (status = 200, description = "History rows, oldest first", body = ApiResponse<Vec<HistoryEntry>>),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-history"
)]
pub async fn list_history(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(ticket_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> ApiResult<Vec<HistoryEntry>> {
    let rows = state
        .services
        .ticket_history
        .list(&ctx, ticket_id, query.action_type)
        .await?;
    Ok(ok(rows.into_iter().map(HistoryEntry::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/ticket-history/:ticket_id/summary",
    params(("ticket_id" = Uuid, Path, description = "Ticket ID")),
    responses(
        (status = 200, description = "Row counts per action type", body = ApiResponse<HistorySummary>),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-history"
)]
pub async fn history_summary(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(ticket_id): AppPath<Uuid>,
) -> ApiResult<HistorySummary> {
    let summary = state.services.ticket_history.summary(&ctx, ticket_id).await?;
    Ok(ok(summary))
}

#[utoipa::path(
    post,
    path = "/api/ticket-history/:ticket_id/notes",
    params(("ticket_id" = Uuid, Path, description = "Ticket ID")),
    request_body = AddNoteInput,
    responses(
        (status = 201, description = "Note appended", body = ApiResponse<HistoryEntry>),
        (status = 400, description = "Empty note", body = crate::errors::ErrorResponse),
        (status = 404, description = "Ticket not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-history"
)]
pub async fn add_note(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(ticket_id): AppPath<Uuid>,
    headers: HeaderMap,
    AppJson(payload): AppJson<AddNoteInput>,
) -> CreatedResult<HistoryEntry> {
    let audit = audit_context(&headers, &ctx);
    let note = state
        .services
        .ticket_history
        .add_note(&ctx, ticket_id, payload, &audit)
        .await?;
    Ok(created(note.into()))
}
