use crate::{
    auth::TenantContext, db::TenantSchemas, entities::agent_location, errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::{Expr, Query},
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;
const MAX_HISTORY_POINTS: u64 = 1000;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"latitude": -23.5505, "longitude": -46.6333, "accuracy_meters": 12.5}))]
pub struct RecordLocationInput {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0))]
    pub accuracy_meters: Option<f64>,
    /// Device timestamp; defaults to the time the request is received
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(range(min = 0.0, max = 20000.0))]
    pub radius_km: f64,
}

/// Latest position of an agent and its distance from the query point.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NearbyAgent {
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub distance_km: f64,
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Keeps the first row seen per user; input must be ordered newest first.
pub fn latest_per_user(rows: Vec<agent_location::Model>) -> Vec<agent_location::Model> {
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(row.user_id)).collect()
}

/// Agents within `radius_km` of the point, closest first.
pub fn nearby(
    latest: &[agent_location::Model],
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Vec<NearbyAgent> {
    let mut found: Vec<NearbyAgent> = latest
        .iter()
        .map(|loc| NearbyAgent {
            user_id: loc.user_id,
            latitude: loc.latitude,
            longitude: loc.longitude,
            accuracy_meters: loc.accuracy_meters,
            recorded_at: loc.recorded_at,
            distance_km: haversine_km(latitude, longitude, loc.latitude, loc.longitude),
        })
        .filter(|agent| agent.distance_km <= radius_km)
        .collect();
    found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    found
}

/// Service for agent positions
#[derive(Clone)]
pub struct GeolocationService {
    schemas: Arc<TenantSchemas>,
}

impl GeolocationService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    /// Stores the caller's current position
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id, user_id = %ctx.user_id))]
    pub async fn record_location(
        &self,
        ctx: &TenantContext,
        input: RecordLocationInput,
    ) -> Result<agent_location::Model, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let created = agent_location::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            user_id: Set(ctx.user_id),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            accuracy_meters: Set(input.accuracy_meters),
            recorded_at: Set(input.recorded_at.unwrap_or(now)),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        debug!(location_id = %created.id, "location recorded");
        Ok(created)
    }

    /// Most recent position of every agent in the tenant
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn latest_locations(
        &self,
        ctx: &TenantContext,
    ) -> Result<Vec<agent_location::Model>, ServiceError> {
        let newest = Query::select()
            .column(agent_location::Column::UserId)
            .expr(Expr::col(agent_location::Column::RecordedAt).max())
            .from(agent_location::Entity)
            .and_where(agent_location::Column::TenantId.eq(ctx.tenant_id))
            .group_by_col(agent_location::Column::UserId)
            .to_owned();

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let rows = agent_location::Entity::find()
            .filter(agent_location::Column::TenantId.eq(ctx.tenant_id))
            .filter(
                Expr::tuple([
                    Expr::col(agent_location::Column::UserId).into(),
                    Expr::col(agent_location::Column::RecordedAt).into(),
                ])
                .in_subquery(newest),
            )
            .order_by_desc(agent_location::Column::RecordedAt)
            .order_by_desc(agent_location::Column::CreatedAt)
            .all(&txn)
            .await?;
        txn.commit().await?;
        // Two rows of one user can share the newest timestamp.
        Ok(latest_per_user(rows))
    }

    /// Positions of one user inside an optional time window, newest first
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn history(
        &self,
        ctx: &TenantContext,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u64>,
    ) -> Result<Vec<agent_location::Model>, ServiceError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "'from' must not be after 'to'".to_string(),
                ));
            }
        }

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = agent_location::Entity::find()
            .filter(agent_location::Column::TenantId.eq(ctx.tenant_id))
            .filter(agent_location::Column::UserId.eq(user_id));
        if let Some(from) = from {
            query = query.filter(agent_location::Column::RecordedAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(agent_location::Column::RecordedAt.lte(to));
        }
        let rows = query
            .order_by_desc(agent_location::Column::RecordedAt)
            .limit(limit.unwrap_or(MAX_HISTORY_POINTS).clamp(1, MAX_HISTORY_POINTS))
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }

    /// Agents whose latest position lies within the radius
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn nearby_agents(
        &self,
        ctx: &TenantContext,
        query: NearbyQuery,
    ) -> Result<Vec<NearbyAgent>, ServiceError> {
        query.validate()?;
        let latest = self.latest_locations(ctx).await?;
        Ok(nearby(&latest, query.latitude, query.longitude, query.radius_km))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(user_id: Uuid, lat: f64, lng: f64, minutes_ago: i64) -> agent_location::Model {
        let at = Utc::now() - chrono::Duration::minutes(minutes_ago);
        agent_location::Model {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            user_id,
            latitude: lat,
            longitude: lng,
            accuracy_meters: None,
            recorded_at: at,
            created_at: at,
        }
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Sao Paulo to Rio de Janeiro is roughly 360 km.
        let d = haversine_km(-23.5505, -46.6333, -22.9068, -43.1729);
        assert!((d - 360.0).abs() < 10.0, "got {}", d);
        assert_eq!(haversine_km(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn latest_keeps_first_row_per_user() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![
            location(a, 1.0, 1.0, 1),
            location(b, 2.0, 2.0, 2),
            location(a, 3.0, 3.0, 3),
        ];
        let latest = latest_per_user(rows);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].latitude, 1.0);
    }

    #[test]
    fn nearby_filters_by_radius_and_sorts() {
        let near = Uuid::new_v4();
        let nearer = Uuid::new_v4();
        let far = Uuid::new_v4();
        let latest = vec![
            location(near, -23.56, -46.64, 1),
            location(far, -22.9068, -43.1729, 1),
            location(nearer, -23.5506, -46.6334, 1),
        ];
        let found = nearby(&latest, -23.5505, -46.6333, 50.0);
        let ids: Vec<Uuid> = found.iter().map(|a| a.user_id).collect();
        assert_eq!(ids, vec![nearer, near]);
    }

    #[test]
    fn coordinates_are_range_checked() {
        let input = RecordLocationInput {
            latitude: 91.0,
            longitude: 0.0,
            accuracy_meters: None,
            recorded_at: None,
        };
        assert!(input.validate().is_err());
    }
}
