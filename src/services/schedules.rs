//! Timecard schedule templates and their derived working hours.

use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::schedule_template,
    errors::ServiceError,
    services::{validation::validate_not_blank, Page},
};
use chrono::{NaiveTime, Timelike, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum ScheduleType {
    #[serde(rename = "5x2")]
    #[strum(serialize = "5x2")]
    FiveByTwo,
    #[serde(rename = "6x1")]
    #[strum(serialize = "6x1")]
    SixByOne,
    #[serde(rename = "12x36")]
    #[strum(serialize = "12x36")]
    TwelveByThirtySix,
    #[serde(rename = "shift")]
    #[strum(serialize = "shift")]
    Shift,
    #[serde(rename = "flexible")]
    #[strum(serialize = "flexible")]
    Flexible,
    #[serde(rename = "custom")]
    #[strum(serialize = "custom")]
    Custom,
}

/// Working pattern stored as JSON on the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "work_days": [1, 2, 3, 4, 5],
    "start_time": "08:00",
    "end_time": "17:00",
    "break_duration_minutes": 60,
    "flexible_hours": false
}))]
pub struct ScheduleConfiguration {
    /// 0 = Sunday .. 6 = Saturday
    pub work_days: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub break_duration_minutes: u32,
    #[serde(default)]
    pub flexible_hours: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateScheduleTemplateInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: String,
    pub description: Option<String>,
    pub schedule_type: ScheduleType,
    /// Defaults to 7, or 2 for `12x36`
    #[validate(range(min = 1, max = 366))]
    pub rotation_cycle_days: Option<i32>,
    pub configuration: ScheduleConfiguration,
    #[serde(default)]
    pub requires_approval: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateScheduleTemplateInput {
    #[validate(length(min = 1, max = 200), custom = "validate_not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    pub schedule_type: Option<ScheduleType>,
    #[validate(range(min = 1, max = 366))]
    pub rotation_cycle_days: Option<i32>,
    pub configuration: Option<ScheduleConfiguration>,
    pub requires_approval: Option<bool>,
}

/// Template plus the hours derived from its configuration.
#[derive(Debug, Clone)]
pub struct ScheduleTemplateView {
    pub template: schedule_template::Model,
    pub configuration: ScheduleConfiguration,
    pub daily_hours: f64,
    pub weekly_hours: f64,
}

fn parse_clock(value: &str, field: &str) -> Result<NaiveTime, ServiceError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        ServiceError::ValidationError(format!("{} must be HH:MM, got '{}'", field, value))
    })
}

fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}

/// Shift length in minutes; an end at or before the start rolls into the next day.
pub fn shift_minutes(config: &ScheduleConfiguration) -> Result<i64, ServiceError> {
    let start = minutes_of(parse_clock(&config.start_time, "start_time")?);
    let end = minutes_of(parse_clock(&config.end_time, "end_time")?);
    Ok(if end <= start {
        end + MINUTES_PER_DAY - start
    } else {
        end - start
    })
}

/// Checks a configuration against the schedule type and rotation.
pub fn validate_configuration(
    schedule_type: ScheduleType,
    rotation_cycle_days: i32,
    config: &ScheduleConfiguration,
) -> Result<(), ServiceError> {
    if config.work_days.is_empty() {
        return Err(ServiceError::ValidationError(
            "work_days must contain at least one day".to_string(),
        ));
    }
    let mut seen = BTreeSet::new();
    for day in &config.work_days {
        if *day > 6 {
            return Err(ServiceError::ValidationError(format!(
                "work_days entries must be within 0..=6, got {}",
                day
            )));
        }
        if !seen.insert(*day) {
            return Err(ServiceError::ValidationError(format!(
                "work_days contains {} more than once",
                day
            )));
        }
    }

    let shift = shift_minutes(config)?;
    if shift <= i64::from(config.break_duration_minutes) {
        return Err(ServiceError::ValidationError(
            "Shift must be longer than the break".to_string(),
        ));
    }

    if schedule_type == ScheduleType::TwelveByThirtySix && rotation_cycle_days != 2 {
        return Err(ServiceError::ValidationError(
            "12x36 schedules use a 2 day rotation cycle".to_string(),
        ));
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Worked hours per shift and per week.
///
/// `12x36` alternates work and rest days, so a week holds 7/2 shifts.
pub fn working_hours(
    schedule_type: ScheduleType,
    rotation_cycle_days: i32,
    config: &ScheduleConfiguration,
) -> Result<(f64, f64), ServiceError> {
    let worked = shift_minutes(config)? - i64::from(config.break_duration_minutes);
    let daily = worked as f64 / 60.0;
    let weekly = match schedule_type {
        ScheduleType::TwelveByThirtySix => daily * 7.0 / f64::from(rotation_cycle_days.max(1)),
        _ => daily * config.work_days.len() as f64,
    };
    Ok((round2(daily), round2(weekly)))
}

fn default_rotation(schedule_type: ScheduleType) -> i32 {
    match schedule_type {
        ScheduleType::TwelveByThirtySix => 2,
        _ => 7,
    }
}

/// Rotation kept by an update: an explicit value wins, a type change resets
/// to that type's default, anything else keeps the stored cycle.
fn rotation_after_update(
    current_type: ScheduleType,
    current_rotation: i32,
    new_type: ScheduleType,
    requested: Option<i32>,
) -> i32 {
    match requested {
        Some(days) => days,
        None if new_type != current_type => default_rotation(new_type),
        None => current_rotation,
    }
}

fn view(template: schedule_template::Model) -> Result<ScheduleTemplateView, ServiceError> {
    let configuration: ScheduleConfiguration =
        serde_json::from_value(template.configuration.clone())?;
    let schedule_type: ScheduleType = template.schedule_type.parse().map_err(|_| {
        ServiceError::InternalError(format!(
            "Unknown schedule type '{}' stored on template {}",
            template.schedule_type, template.id
        ))
    })?;
    let (daily_hours, weekly_hours) =
        working_hours(schedule_type, template.rotation_cycle_days, &configuration)?;
    Ok(ScheduleTemplateView {
        template,
        configuration,
        daily_hours,
        weekly_hours,
    })
}

fn config_json(config: &ScheduleConfiguration) -> Result<Value, ServiceError> {
    Ok(serde_json::to_value(config)?)
}

/// Service for schedule templates
#[derive(Clone)]
pub struct ScheduleService {
    schemas: Arc<TenantSchemas>,
}

impl ScheduleService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_template(
        &self,
        ctx: &TenantContext,
        input: CreateScheduleTemplateInput,
    ) -> Result<ScheduleTemplateView, ServiceError> {
        input.validate()?;
        let rotation = input
            .rotation_cycle_days
            .unwrap_or_else(|| default_rotation(input.schedule_type));
        validate_configuration(input.schedule_type, rotation, &input.configuration)?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let now = Utc::now();
        let created = schedule_template::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            schedule_type: Set(input.schedule_type.to_string()),
            rotation_cycle_days: Set(rotation),
            configuration: Set(config_json(&input.configuration)?),
            requires_approval: Set(input.requires_approval),
            is_active: Set(true),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(template_id = %created.id, schedule_type = %created.schedule_type, "schedule template created");
        view(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_template(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<ScheduleTemplateView, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let found = find_template(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        view(found)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_templates(
        &self,
        ctx: &TenantContext,
        active: Option<bool>,
        page: Page,
    ) -> Result<(Vec<ScheduleTemplateView>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query = schedule_template::Entity::find()
            .filter(schedule_template::Column::TenantId.eq(ctx.tenant_id));
        query = query.filter(schedule_template::Column::IsActive.eq(active.unwrap_or(true)));

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_asc(schedule_template::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;

        let views = rows.into_iter().map(view).collect::<Result<Vec<_>, _>>()?;
        Ok((views, total))
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_template(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateScheduleTemplateInput,
    ) -> Result<ScheduleTemplateView, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_template(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Schedule template", id));
        }

        let current = view(existing.clone())?;
        let current_type: ScheduleType = current
            .template
            .schedule_type
            .parse()
            .unwrap_or(ScheduleType::Custom);
        let schedule_type = input.schedule_type.unwrap_or(current_type);
        let rotation = rotation_after_update(
            current_type,
            existing.rotation_cycle_days,
            schedule_type,
            input.rotation_cycle_days,
        );
        let configuration = input.configuration.unwrap_or(current.configuration);
        validate_configuration(schedule_type, rotation, &configuration)?;

        let mut active: schedule_template::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if let Some(requires_approval) = input.requires_approval {
            active.requires_approval = Set(requires_approval);
        }
        active.schedule_type = Set(schedule_type.to_string());
        active.rotation_cycle_days = Set(rotation);
        active.configuration = Set(config_json(&configuration)?);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        view(updated)
    }

    /// Soft deletes a template
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_template(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_template(&txn, ctx.tenant_id, id).await?;
        if !existing.is_active {
            return Err(ServiceError::not_found("Schedule template", id));
        }
        let mut active: schedule_template::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

async fn find_template<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<schedule_template::Model, ServiceError> {
    schedule_template::Entity::find_by_id(id)
        .filter(schedule_template::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Schedule template", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(days: &[u8], start: &str, end: &str, break_minutes: u32) -> ScheduleConfiguration {
        ScheduleConfiguration {
            work_days: days.to_vec(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            break_duration_minutes: break_minutes,
            flexible_hours: false,
        }
    }

    #[test]
    fn schedule_types_use_their_display_names() {
        assert_eq!(ScheduleType::TwelveByThirtySix.to_string(), "12x36");
        assert_eq!("5x2".parse::<ScheduleType>().ok(), Some(ScheduleType::FiveByTwo));
        assert_eq!(
            serde_json::to_value(ScheduleType::SixByOne).ok(),
            Some(json!("6x1"))
        );
    }

    #[test]
    fn office_week_is_forty_hours() {
        let cfg = config(&[1, 2, 3, 4, 5], "08:00", "17:00", 60);
        let (daily, weekly) = working_hours(ScheduleType::FiveByTwo, 7, &cfg).unwrap();
        assert_eq!(daily, 8.0);
        assert_eq!(weekly, 40.0);
    }

    #[test]
    fn night_shift_crosses_midnight() {
        let cfg = config(&[0, 1, 2, 3, 4, 5, 6], "19:00", "07:00", 60);
        assert_eq!(shift_minutes(&cfg).unwrap(), 12 * 60);
        let (daily, weekly) = working_hours(ScheduleType::TwelveByThirtySix, 2, &cfg).unwrap();
        assert_eq!(daily, 11.0);
        assert_eq!(weekly, 38.5);
    }

    #[rstest]
    #[case(config(&[], "08:00", "17:00", 0))]
    #[case(config(&[1, 1], "08:00", "17:00", 0))]
    #[case(config(&[7], "08:00", "17:00", 0))]
    #[case(config(&[1], "8am", "17:00", 0))]
    #[case(config(&[1], "08:00", "09:00", 60))]
    fn invalid_configurations_are_rejected(#[case] cfg: ScheduleConfiguration) {
        assert!(validate_configuration(ScheduleType::Custom, 7, &cfg).is_err());
    }

    #[test]
    fn twelve_by_thirty_six_requires_two_day_rotation() {
        let cfg = config(&[1, 3, 5], "07:00", "19:00", 60);
        assert!(validate_configuration(ScheduleType::TwelveByThirtySix, 7, &cfg).is_err());
        assert!(validate_configuration(ScheduleType::TwelveByThirtySix, 2, &cfg).is_ok());
        assert_eq!(default_rotation(ScheduleType::TwelveByThirtySix), 2);
    }

    #[rstest]
    #[case(ScheduleType::Custom, 14, ScheduleType::Custom, None, 14)]
    #[case(ScheduleType::Custom, 14, ScheduleType::FiveByTwo, None, 7)]
    #[case(ScheduleType::FiveByTwo, 7, ScheduleType::TwelveByThirtySix, None, 2)]
    #[case(ScheduleType::Custom, 14, ScheduleType::Custom, Some(21), 21)]
    fn updates_keep_custom_rotations(
        #[case] current_type: ScheduleType,
        #[case] current_rotation: i32,
        #[case] new_type: ScheduleType,
        #[case] requested: Option<i32>,
        #[case] expected: i32,
    ) {
        assert_eq!(
            rotation_after_update(current_type, current_rotation, new_type, requested),
            expected
        );
    }
}
