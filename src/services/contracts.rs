use crate::{
    auth::TenantContext,
    db::TenantSchemas,
    entities::contract,
    errors::{map_unique_violation, ServiceError},
    services::{tickets::TicketPriority, validation::{validate_currency, validate_not_blank}, Page},
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_EXPIRING_WINDOW_DAYS: i64 = 30;

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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Active,
    Suspended,
    Expired,
    Terminated,
    Renewed,
}

impl ContractStatus {
    /// Statuses reachable from `self`.
    pub fn allowed_transitions(self) -> &'static [ContractStatus] {
        use ContractStatus::*;
        match self {
            Draft => &[Active, Terminated],
            Active => &[Suspended, Expired, Terminated, Renewed],
            Suspended => &[Active, Terminated],
            Renewed => &[Active, Expired, Terminated],
            Expired | Terminated => &[],
        }
    }

    pub fn can_transition_to(self, next: ContractStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContractType {
    Service,
    Maintenance,
    Support,
    Rental,
    Sla,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "title": "Printer fleet maintenance",
    "customer_id": "0d3c7d1e-5b8f-4f7e-9a0b-6c2d1e3f4a5b",
    "contract_type": "maintenance",
    "start_date": "2024-01-01",
    "end_date": "2024-12-31",
    "monthly_value": "1500.00",
    "total_value": "18000.00",
    "currency": "BRL"
}))]
pub struct CreateContractInput {
    #[validate(length(min = 1, max = 300), custom = "validate_not_blank")]
    pub title: String,
    pub customer_id: Uuid,
    pub customer_company_id: Option<Uuid>,
    pub contract_type: ContractType,
    pub priority: Option<TicketPriority>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub auto_renewal: bool,
    #[serde(default)]
    pub monthly_value: Decimal,
    #[serde(default)]
    pub total_value: Decimal,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    pub manager_id: Option<Uuid>,
    pub description: Option<String>,
    pub terms: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateContractInput {
    #[validate(length(min = 1, max = 300), custom = "validate_not_blank")]
    pub title: Option<String>,
    pub customer_company_id: Option<Uuid>,
    pub contract_type: Option<ContractType>,
    pub priority: Option<TicketPriority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_renewal: Option<bool>,
    pub monthly_value: Option<Decimal>,
    pub total_value: Option<Decimal>,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    pub manager_id: Option<Uuid>,
    pub description: Option<String>,
    pub terms: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChangeContractStatusInput {
    pub status: ContractStatus,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RenewContractInput {
    pub new_end_date: NaiveDate,
    pub monthly_value: Option<Decimal>,
    pub total_value: Option<Decimal>,
}

#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
    pub contract_type: Option<ContractType>,
    pub customer_id: Option<Uuid>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

pub fn format_contract_number(year: i32, sequence: u32) -> String {
    format!("CTR-{}-{:04}", year, sequence)
}

fn contract_prefix(year: i32) -> String {
    format!("CTR-{}-", year)
}

fn parse_sequence(number: &str, year: i32) -> Option<u32> {
    number.strip_prefix(&contract_prefix(year))?.parse().ok()
}

/// Rejects inverted periods and negative amounts.
pub fn validate_terms(
    start: NaiveDate,
    end: NaiveDate,
    monthly_value: Decimal,
    total_value: Decimal,
) -> Result<(), ServiceError> {
    if end <= start {
        return Err(ServiceError::ValidationError(
            "end_date must be after start_date".to_string(),
        ));
    }
    if monthly_value < Decimal::ZERO || total_value < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Contract values cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn parse_status(model: &contract::Model) -> Result<ContractStatus, ServiceError> {
    model.status.parse().map_err(|_| {
        ServiceError::InternalError(format!(
            "Unknown status '{}' stored on contract {}",
            model.status, model.id
        ))
    })
}

async fn next_contract_number<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    year: i32,
) -> Result<String, ServiceError> {
    let prefix = contract_prefix(year);
    let last: Option<String> = contract::Entity::find()
        .select_only()
        .column(contract::Column::ContractNumber)
        .filter(contract::Column::TenantId.eq(tenant_id))
        .filter(contract::Column::ContractNumber.starts_with(prefix.as_str()))
        .order_by_desc(SimpleExpr::from(Func::char_length(Expr::col(
            contract::Column::ContractNumber,
        ))))
        .order_by_desc(contract::Column::ContractNumber)
        .into_tuple()
        .one(conn)
        .await?;
    let next = last
        .as_deref()
        .and_then(|n| parse_sequence(n, year))
        .unwrap_or(0)
        + 1;
    Ok(format_contract_number(year, next))
}

/// Service for customer contracts
#[derive(Clone)]
pub struct ContractService {
    schemas: Arc<TenantSchemas>,
}

impl ContractService {
    pub fn new(schemas: Arc<TenantSchemas>) -> Self {
        Self { schemas }
    }

    /// Creates a contract in `draft`
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn create_contract(
        &self,
        ctx: &TenantContext,
        input: CreateContractInput,
    ) -> Result<contract::Model, ServiceError> {
        input.validate()?;
        validate_terms(
            input.start_date,
            input.end_date,
            input.monthly_value,
            input.total_value,
        )?;

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let now = Utc::now();
        let number = next_contract_number(&txn, ctx.tenant_id, now.year()).await?;

        let created = contract::ActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(ctx.tenant_id),
            contract_number: Set(number),
            title: Set(input.title.trim().to_string()),
            customer_id: Set(input.customer_id),
            customer_company_id: Set(input.customer_company_id),
            contract_type: Set(input.contract_type.to_string()),
            status: Set(ContractStatus::Draft.to_string()),
            priority: Set(input.priority.unwrap_or(TicketPriority::Medium).to_string()),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            renewal_date: Set(None),
            auto_renewal: Set(input.auto_renewal),
            monthly_value: Set(input.monthly_value),
            total_value: Set(input.total_value),
            currency: Set(input.currency.unwrap_or_else(|| "BRL".to_string())),
            manager_id: Set(input.manager_id),
            description: Set(input.description),
            terms: Set(input.terms),
            is_active: Set(true),
            created_by: Set(ctx.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| map_unique_violation(e, "Contract number already taken, retry"))?;
        txn.commit().await?;

        counter!("helpdesk_contracts.created", 1);
        info!(contract_id = %created.id, number = %created.contract_number, "contract created");
        Ok(created)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn get_contract(
        &self,
        ctx: &TenantContext,
        id: Uuid,
    ) -> Result<contract::Model, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let found = find_contract(&txn, ctx.tenant_id, id).await?;
        txn.commit().await?;
        Ok(found)
    }

    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn list_contracts(
        &self,
        ctx: &TenantContext,
        filter: ContractFilter,
        page: Page,
    ) -> Result<(Vec<contract::Model>, u64), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let mut query =
            contract::Entity::find().filter(contract::Column::TenantId.eq(ctx.tenant_id));
        if !filter.include_inactive {
            query = query.filter(contract::Column::IsActive.eq(true));
        }
        if let Some(status) = filter.status {
            query = query.filter(contract::Column::Status.eq(status.to_string()));
        }
        if let Some(kind) = filter.contract_type {
            query = query.filter(contract::Column::ContractType.eq(kind.to_string()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(contract::Column::CustomerId.eq(customer_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(contract::Column::Title.contains(search))
                    .add(contract::Column::ContractNumber.contains(search)),
            );
        }

        let total = query.clone().count(&txn).await?;
        let rows = query
            .order_by_desc(contract::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok((rows, total))
    }

    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn update_contract(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: UpdateContractInput,
    ) -> Result<contract::Model, ServiceError> {
        input.validate()?;
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_contract(&txn, ctx.tenant_id, id).await?;
        if parse_status(&existing)?.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Contract {} is {} and can no longer be edited",
                existing.contract_number, existing.status
            )));
        }

        validate_terms(
            input.start_date.unwrap_or(existing.start_date),
            input.end_date.unwrap_or(existing.end_date),
            input.monthly_value.unwrap_or(existing.monthly_value),
            input.total_value.unwrap_or(existing.total_value),
        )?;

        let mut active: contract::ActiveModel = existing.into();
        if let Some(title) = input.title {
            active.title = Set(title.trim().to_string());
        }
        if input.customer_company_id.is_some() {
            active.customer_company_id = Set(input.customer_company_id);
        }
        if let Some(kind) = input.contract_type {
            active.contract_type = Set(kind.to_string());
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority.to_string());
        }
        if let Some(start) = input.start_date {
            active.start_date = Set(start);
        }
        if let Some(end) = input.end_date {
            active.end_date = Set(end);
        }
        if let Some(auto_renewal) = input.auto_renewal {
            active.auto_renewal = Set(auto_renewal);
        }
        if let Some(value) = input.monthly_value {
            active.monthly_value = Set(value);
        }
        if let Some(value) = input.total_value {
            active.total_value = Set(value);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if input.manager_id.is_some() {
            active.manager_id = Set(input.manager_id);
        }
        if input.description.is_some() {
            active.description = Set(input.description);
        }
        if input.terms.is_some() {
            active.terms = Set(input.terms);
        }

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(updated)
    }

    /// Soft deletes a contract
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn delete_contract(&self, ctx: &TenantContext, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_contract(&txn, ctx.tenant_id, id).await?;
        let mut active: contract::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Moves a contract along the status machine
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn change_status(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        next: ContractStatus,
    ) -> Result<contract::Model, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_contract(&txn, ctx.tenant_id, id).await?;
        let current = parse_status(&existing)?;
        if !current.can_transition_to(next) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot change contract status from {} to {}",
                current, next
            )));
        }

        let mut active: contract::ActiveModel = existing.into();
        active.status = Set(next.to_string());
        if next == ContractStatus::Renewed {
            active.renewal_date = Set(Some(Utc::now().date_naive()));
        }
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(contract_id = %id, from = %current, to = %next, "contract status changed");
        Ok(updated)
    }

    /// Extends an active or renewed contract and makes it active again
    #[instrument(skip(self, ctx, input), fields(tenant_id = %ctx.tenant_id))]
    pub async fn renew(
        &self,
        ctx: &TenantContext,
        id: Uuid,
        input: RenewContractInput,
    ) -> Result<contract::Model, ServiceError> {
        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let existing = find_active_contract(&txn, ctx.tenant_id, id).await?;
        let current = parse_status(&existing)?;
        if !matches!(current, ContractStatus::Active | ContractStatus::Renewed) {
            return Err(ServiceError::InvalidOperation(format!(
                "Only active or renewed contracts can be renewed, contract is {}",
                current
            )));
        }
        if input.new_end_date <= existing.end_date {
            return Err(ServiceError::ValidationError(format!(
                "new_end_date must be after the current end date {}",
                existing.end_date
            )));
        }
        let monthly = input.monthly_value.unwrap_or(existing.monthly_value);
        let total = input.total_value.unwrap_or(existing.total_value);
        validate_terms(existing.start_date, input.new_end_date, monthly, total)?;

        let mut active: contract::ActiveModel = existing.into();
        active.end_date = Set(input.new_end_date);
        active.monthly_value = Set(monthly);
        active.total_value = Set(total);
        active.status = Set(ContractStatus::Active.to_string());
        active.renewal_date = Set(Some(Utc::now().date_naive()));
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        counter!("helpdesk_contracts.renewed", 1);
        info!(contract_id = %id, end_date = %updated.end_date, "contract renewed");
        Ok(updated)
    }

    /// Active contracts whose end date falls within the next `days` days
    #[instrument(skip(self, ctx), fields(tenant_id = %ctx.tenant_id))]
    pub async fn expiring(
        &self,
        ctx: &TenantContext,
        days: Option<i64>,
    ) -> Result<Vec<contract::Model>, ServiceError> {
        let days = days.unwrap_or(DEFAULT_EXPIRING_WINDOW_DAYS);
        if !(0..=3650).contains(&days) {
            return Err(ServiceError::ValidationError(
                "days must be between 0 and 3650".to_string(),
            ));
        }
        let today = Utc::now().date_naive();
        let horizon = today + Duration::days(days);

        let txn = self.schemas.begin(ctx.tenant_id).await?;
        let rows = contract::Entity::find()
            .filter(contract::Column::TenantId.eq(ctx.tenant_id))
            .filter(contract::Column::IsActive.eq(true))
            .filter(contract::Column::Status.eq(ContractStatus::Active.to_string()))
            .filter(contract::Column::EndDate.gte(today))
            .filter(contract::Column::EndDate.lte(horizon))
            .order_by_asc(contract::Column::EndDate)
            .all(&txn)
            .await?;
        txn.commit().await?;
        Ok(rows)
    }
}

async fn find_contract<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<contract::Model, ServiceError> {
    contract::Entity::find_by_id(id)
        .filter(contract::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Contract", id))
}

async fn find_active_contract<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    id: Uuid,
) -> Result<contract::Model, ServiceError> {
    let found = find_contract(conn, tenant_id, id).await?;
    if !found.is_active {
        return Err(ServiceError::not_found("Contract", id));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use super::ContractStatus::*;

    #[test]
    fn contract_numbers_are_year_scoped() {
        assert_eq!(format_contract_number(2024, 7), "CTR-2024-0007");
        assert_eq!(parse_sequence("CTR-2024-0042", 2024), Some(42));
        assert_eq!(parse_sequence("CTR-2023-0042", 2024), None);
        assert_eq!(parse_sequence("CTR-2024-abcd", 2024), None);
    }

    #[rstest]
    #[case(Draft, Active, true)]
    #[case(Draft, Terminated, true)]
    #[case(Draft, Suspended, false)]
    #[case(Active, Renewed, true)]
    #[case(Active, Draft, false)]
    #[case(Suspended, Active, true)]
    #[case(Suspended, Expired, false)]
    #[case(Renewed, Expired, true)]
    #[case(Expired, Active, false)]
    #[case(Terminated, Active, false)]
    fn status_transitions(
        #[case] from: ContractStatus,
        #[case] to: ContractStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_statuses() {
        assert!(Expired.is_terminal());
        assert!(Terminated.is_terminal());
        assert!(!Renewed.is_terminal());
    }

    #[test]
    fn terms_require_ordered_dates_and_non_negative_values() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert!(validate_terms(start, end, dec!(100), dec!(1200)).is_ok());
        assert!(validate_terms(end, start, dec!(100), dec!(1200)).is_err());
        assert!(validate_terms(start, start, dec!(0), dec!(0)).is_err());
        assert!(validate_terms(start, end, dec!(-1), dec!(0)).is_err());
    }
}
