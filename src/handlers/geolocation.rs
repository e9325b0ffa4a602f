use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, CreatedResult};
use crate::{
    auth::{AuthRouterExt, TenantContext},
    entities::agent_location,
    services::geolocation::{NearbyAgent, NearbyQuery, RecordLocationInput},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn geolocation_routes() -> Router<AppState> {
    Router::new()
        .route("/locations", post(record_location))
        .route("/latest", get(latest_locations))
        .route("/history/:user_id", get(location_history))
        .route("/nearby", get(nearby_agents))
        .with_auth()
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// At most 1000 points
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearbyParams {
    #[param(example = -23.5505)]
    pub latitude: f64,
    #[param(example = -46.6333)]
    pub longitude: f64,
    #[param(example = 10.0)]
    pub radius_km: f64,
}

impl From<NearbyParams> for NearbyQuery {
    fn from(params: NearbyParams) -> Self {
        Self {
            latitude: params.latitude,
            longitude: params.longitude,
            radius_km: params.radius_km,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl From<agent_location::Model> for LocationSummary {
    fn from(model: agent_location::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            latitude: model.latitude,
            longitude: model.longitude,
            accuracy_meters: model.accuracy_meters,
            recorded_at: model.recorded_at,
        }
    }
}

fn locations(rows: Vec<agent_location::Model>) -> Vec<LocationSummary> {
    rows.into_iter().map(LocationSummary::from).collect()
}

#[utoipa::path(
    post,
    path = "/api/geolocation/locations",
    request_body = RecordLocationInput,
    responses(
        (status = 201, description = "Caller's position stored", body = ApiResponse<LocationSummary>),
        (status = 400, description = "Coordinates out of range", body = crate::errors::ErrorResponse)
    ),
    tag = "geolocation"
)]
pub async fn record_location(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<RecordLocationInput>,
) -> CreatedResult<LocationSummary> {
    let location = state.services.geolocation.record_location(&ctx, payload).await?;
    Ok(created(location.into()))
}

#[utoipa::path(
    get,
    path = "/api/geolocation/latest",
    responses((status = 200, description = "Latest position per agent", body = ApiResponse<Vec<LocationSummary>>)),
    tag = "geolocation"
)]
pub async fn latest_locations(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> ApiResult<Vec<LocationSummary>> {
    let rows = state.services.geolocation.latest_locations(&ctx).await?;
    Ok(ok(locations(rows)))
}

#[utoipa::path(
    get,
    path = "/api/geolocation/history/:user_id",
    params(("user_id" = Uuid, Path, description = "Agent user ID"), HistoryWindow),
    responses(
        (status = 200, description = "Positions, newest first", body = ApiResponse<Vec<LocationSummary>>),
        (status = 400, description = "Inverted time window", body = crate::errors::ErrorResponse)
    ),
    tag = "geolocation"
)]
pub async fn location_history(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(user_id): AppPath<Uuid>,
    AppQuery(window): AppQuery<HistoryWindow>,
) -> ApiResult<Vec<LocationSummary>> {
    let rows = state
        .services
        .geolocation
        .history(&ctx, user_id, window.from, window.to, window.limit)
        .await?;
    Ok(ok(locations(rows)))
}

#[utoipa::path(
    get,
    path = "/api/geolocation/nearby",
    params(NearbyParams),
    responses(
        (status = 200, description = "Agents inside the radius, closest first", body = ApiResponse<Vec<NearbyAgent>>),
        (status = 400, description = "Invalid point or radius", body = crate::errors::ErrorResponse)
    ),
    tag = "geolocation"
)]
pub async fn nearby_agents(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(params): AppQuery<NearbyParams>,
) -> ApiResult<Vec<NearbyAgent>> {
    let agents = state
        .services
        .geolocation
        .nearby_agents(&ctx, params.into())
        .await?;
    Ok(ok(agents))
}
