use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, page_for, paginate, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    entities::contract,
    services::contracts::{
        ChangeContractStatusInput, ContractFilter, ContractStatus, ContractType,
        CreateContractInput, RenewContractInput, UpdateContractInput,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contracts).post(create_contract))
        .route("/expiring", get(expiring_contracts))
        .route(
            "/:id",
            get(get_contract).put(update_contract).delete(delete_contract),
        )
        .route("/:id/status", post(change_status))
        .route("/:id/renew", post(renew_contract))
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContractListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<ContractStatus>,
    pub contract_type: Option<ContractType>,
    pub customer_id: Option<Uuid>,
    /// Matches title or contract number
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiringQuery {
    /// Window in days from today; defaults to 30
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "c2a4f6e8-0b1d-4e3f-8a5c-7d9e1f2a3b4c",
    "contract_number": "CTR-2024-0007",
    "title": "Printer fleet maintenance",
    "contract_type": "maintenance",
    "status": "active",
    "priority": "medium",
    "start_date": "2024-01-01",
    "end_date": "2024-12-31",
    "monthly_value": "1500.00",
    "currency": "BRL"
}))]
pub struct ContractSummary {
    pub id: Uuid,
    /// CTR-<year>-<sequence>, unique per tenant
    pub contract_number: String,
    pub title: String,
    pub customer_id: Uuid,
    pub customer_company_id: Option<Uuid>,
    pub contract_type: String,
    /// draft, active, suspended, expired, terminated or renewed
    pub status: String,
    pub priority: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub renewal_date: Option<NaiveDate>,
    pub auto_renewal: bool,
    pub monthly_value: Decimal,
    pub total_value: Decimal,
    pub currency: String,
    pub manager_id: Option<Uuid>,
    pub description: Option<String>,
    pub terms: Option<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<contract::Model> for ContractSummary {
    fn from(model: contract::Model) -> Self {
        Self {
            id: model.id,
            contract_number: model.contract_number,
            title: model.title,
            customer_id: model.customer_id,
            customer_company_id: model.customer_company_id,
            contract_type: model.contract_type,
            status: model.status,
            priority: model.priority,
            start_date: model.start_date,
            end_date: model.end_date,
            renewal_date: model.renewal_date,
            auto_renewal: model.auto_renewal,
            monthly_value: model.monthly_value,
            total_value: model.total_value,
            currency: model.currency,
            manager_id: model.manager_id,
            description: model.description,
            terms: model.terms,
            is_active: model.is_active,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/contracts",
    params(ContractListQuery),
    responses((status = 200, description = "Contracts listed", body = ApiResponse<PaginatedResponse<ContractSummary>>)),
    tag = "contracts"
)]
pub async fn list_contracts(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<ContractListQuery>,
) -> ApiResult<PaginatedResponse<ContractSummary>> {
    let page = page_for(&state.config, query.page, query.limit)?;
    let filter = ContractFilter {
        status: query.status,
        contract_type: query.contract_type,
        customer_id: query.customer_id,
        search: query.search,
        include_inactive: query.include_inactive,
    };
    let (rows, total) = state
        .services
        .contracts
        .list_contracts(&ctx, filter, page)
        .await?;
    Ok(ok(paginate(rows, total, page)))
}

#[utoipa::path(
    post,
    path = "/api/contracts",
    request_body = CreateContractInput,
    responses(
        (status = 201, description = "Contract created as draft", body = ApiResponse<ContractSummary>),
        (status = 400, description = "Invalid period or values", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn create_contract(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<CreateContractInput>,
) -> CreatedResult<ContractSummary> {
    let contract = state.services.contracts.create_contract(&ctx, payload).await?;
    Ok(created(contract.into()))
}

#[utoipa::path(
    get,
    path = "/api/contracts/expiring",
    params(ExpiringQuery),
    responses(
        (status = 200, description = "Active contracts ending inside the window", body = ApiResponse<Vec<ContractSummary>>),
        (status = 400, description = "Window out of range", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn expiring_contracts(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<ExpiringQuery>,
) -> ApiResult<Vec<ContractSummary>> {
    let rows = state.services.contracts.expiring(&ctx, query.days).await?;
    Ok(ok(rows.into_iter().map(ContractSummary::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/contracts/:id",
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 200, description = "Contract fetched", body = ApiResponse<ContractSummary>),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn get_contract(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ContractSummary> {
    let contract = state.services.contracts.get_contract(&ctx, id).await?;
    Ok(ok(contract.into()))
}

#[utoipa::path(
    put,
    path = "/api/contracts/:id",
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = UpdateContractInput,
    responses(
        (status = 200, description = "Contract updated", body = ApiResponse<ContractSummary>),
        (status = 400, description = "Invalid period or contract closed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn update_contract(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateContractInput>,
) -> ApiResult<ContractSummary> {
    let contract = state
        .services
        .contracts
        .update_contract(&ctx, id, payload)
        .await?;
    Ok(ok(contract.into()))
}

#[utoipa::path(
    delete,
    path = "/api/contracts/:id",
    params(("id" = Uuid, Path, description = "Contract ID")),
    responses(
        (status = 204, description = "Contract deactivated"),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn delete_contract(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.contracts.delete_contract(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/contracts/:id/status",
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = ChangeContractStatusInput,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<ContractSummary>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn change_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ChangeContractStatusInput>,
) -> ApiResult<ContractSummary> {
    let contract = state
        .services
        .contracts
        .change_status(&ctx, id, payload.status)
        .await?;
    Ok(ok(contract.into()))
}

#[utoipa::path(
    post,
    path = "/api/contracts/:id/renew",
    params(("id" = Uuid, Path, description = "Contract ID")),
    request_body = RenewContractInput,
    responses(
        (status = 200, description = "Contract renewed and active", body = ApiResponse<ContractSummary>),
        (status = 400, description = "End date not later or contract not renewable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Contract not found", body = crate::errors::ErrorResponse)
    ),
    tag = "contracts"
)]
pub async fn renew_contract(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<RenewContractInput>,
) -> ApiResult<ContractSummary> {
    let contract = state.services.contracts.renew(&ctx, id, payload).await?;
    Ok(ok(contract.into()))
}
