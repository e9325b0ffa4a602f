use super::extract::{AppJson, AppPath, AppQuery};
use super::common::{created, ok, CreatedResult, NoContent};
use crate::{
    auth::{AuthRouterExt, Role, TenantContext},
    entities::{ticket_action, ticket_category, ticket_subcategory},
    services::ticket_hierarchy::{
        CategoryTree, NodeFilter, NodeInput, NodeUpdate, SubcategoryTree,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Classification tree routes. Agents and tenant admins maintain the tree.
pub fn ticket_hierarchy_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route(
            "/subcategories",
            get(list_subcategories).post(create_subcategory),
        )
        .route(
            "/subcategories/:id",
            put(update_subcategory).delete(delete_subcategory),
        )
        .route("/actions", get(list_actions).post(create_action))
        .route("/actions/:id", put(update_action).delete(delete_action))
        .route("/tree", get(get_tree))
        .with_roles(&[Role::Agent, Role::TenantAdmin])
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NodeListQuery {
    /// Category for subcategories, subcategory for actions
    pub parent_id: Option<Uuid>,
    /// Nodes of this company plus the shared ones
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl From<NodeListQuery> for NodeFilter {
    fn from(query: NodeListQuery) -> Self {
        Self {
            parent_id: query.parent_id,
            company_id: query.company_id,
            include_inactive: query.include_inactive,
        }
    }
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TreeQuery {
    pub company_id: Option<Uuid>,
}

/// A category, subcategory or action
#[derive(Debug, Serialize, ToSchema)]
pub struct HierarchyNode {
    pub id: Uuid,
    /// Owning category or subcategory; absent for categories
    pub parent_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    #[schema(example = "Hardware")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "#3366FF")]
    pub color: Option<String>,
    pub icon: Option<String>,
    pub sort_order: i32,
    /// Actions only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time_minutes: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ticket_category::Model> for HierarchyNode {
    fn from(model: ticket_category::Model) -> Self {
        Self {
            id: model.id,
            parent_id: None,
            company_id: model.company_id,
            name: model.name,
            description: model.description,
            color: model.color,
            icon: model.icon,
            sort_order: model.sort_order,
            estimated_time_minutes: None,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ticket_subcategory::Model> for HierarchyNode {
    fn from(model: ticket_subcategory::Model) -> Self {
        Self {
            id: model.id,
            parent_id: Some(model.category_id),
            company_id: model.company_id,
            name: model.name,
            description: model.description,
            color: model.color,
            icon: model.icon,
            sort_order: model.sort_order,
            estimated_time_minutes: None,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<ticket_action::Model> for HierarchyNode {
    fn from(model: ticket_action::Model) -> Self {
        Self {
            id: model.id,
            parent_id: Some(model.subcategory_id),
            company_id: model.company_id,
            name: model.name,
            description: model.description,
            color: model.color,
            icon: model.icon,
            sort_order: model.sort_order,
            estimated_time_minutes: model.estimated_time_minutes,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubcategoryBranch {
    #[serde(flatten)]
    pub node: HierarchyNode,
    pub actions: Vec<HierarchyNode>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryBranch {
    #[serde(flatten)]
    pub node: HierarchyNode,
    pub subcategories: Vec<SubcategoryBranch>,
}

impl From<SubcategoryTree> for SubcategoryBranch {
    fn from(tree: SubcategoryTree) -> Self {
        Self {
            node: tree.subcategory.into(),
            actions: tree.actions.into_iter().map(HierarchyNode::from).collect(),
        }
    }
}

impl From<CategoryTree> for CategoryBranch {
    fn from(tree: CategoryTree) -> Self {
        Self {
            node: tree.category.into(),
            subcategories: tree
                .subcategories
                .into_iter()
                .map(SubcategoryBranch::from)
                .collect(),
        }
    }
}

fn nodes<M: Into<HierarchyNode>>(rows: Vec<M>) -> Vec<HierarchyNode> {
    rows.into_iter().map(Into::into).collect()
}

#[utoipa::path(
    get,
    path = "/api/ticket-hierarchy/categories",
    params(NodeListQuery),
    responses((status = 200, description = "Categories ordered by sort order", body = ApiResponse<Vec<HierarchyNode>>)),
    tag = "ticket-hierarchy"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<NodeListQuery>,
) -> ApiResult<Vec<HierarchyNode>> {
    let rows = state.services.hierarchy.list_categories(&ctx, query.into()).await?;
    Ok(ok(nodes(rows)))
}

#[utoipa::path(
    post,
    path = "/api/ticket-hierarchy/categories",
    request_body = NodeInput,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<HierarchyNode>),
        (status = 409, description = "Active sibling with the same name", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn create_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<NodeInput>,
) -> CreatedResult<HierarchyNode> {
    let category = state.services.hierarchy.create_category(&ctx, payload).await?;
    Ok(created(category.into()))
}

#[utoipa::path(
    put,
    path = "/api/ticket-hierarchy/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = NodeUpdate,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<HierarchyNode>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn update_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<NodeUpdate>,
) -> ApiResult<HierarchyNode> {
    let category = state
        .services
        .hierarchy
        .update_category(&ctx, id, payload)
        .await?;
    Ok(ok(category.into()))
}

#[utoipa::path(
    delete,
    path = "/api/ticket-hierarchy/categories/:id",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category and its descendants deactivated"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.hierarchy.delete_category(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/ticket-hierarchy/subcategories",
    params(NodeListQuery),
    responses((status = 200, description = "Subcategories", body = ApiResponse<Vec<HierarchyNode>>)),
    tag = "ticket-hierarchy"
)]
pub async fn list_subcategories(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<NodeListQuery>,
) -> ApiResult<Vec<HierarchyNode>> {
    let rows = state
        .services
        .hierarchy
        .list_subcategories(&ctx, query.into())
        .await?;
    Ok(ok(nodes(rows)))
}

#[utoipa::path(
    post,
    path = "/api/ticket-hierarchy/subcategories",
    request_body = NodeInput,
    responses(
        (status = 201, description = "Subcategory created", body = ApiResponse<HierarchyNode>),
        (status = 400, description = "Missing or inactive category", body = crate::errors::ErrorResponse),
        (status = 409, description = "Active sibling with the same name", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn create_subcategory(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<NodeInput>,
) -> CreatedResult<HierarchyNode> {
    let subcategory = state
        .services
        .hierarchy
        .create_subcategory(&ctx, payload)
        .await?;
    Ok(created(subcategory.into()))
}

#[utoipa::path(
    put,
    path = "/api/ticket-hierarchy/subcategories/:id",
    params(("id" = Uuid, Path, description = "Subcategory ID")),
    request_body = NodeUpdate,
    responses(
        (status = 200, description = "Subcategory updated", body = ApiResponse<HierarchyNode>),
        (status = 404, description = "Subcategory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn update_subcategory(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<NodeUpdate>,
) -> ApiResult<HierarchyNode> {
    let subcategory = state
        .services
        .hierarchy
        .update_subcategory(&ctx, id, payload)
        .await?;
    Ok(ok(subcategory.into()))
}

#[utoipa::path(
    delete,
    path = "/api/ticket-hierarchy/subcategories/:id",
    params(("id" = Uuid, Path, description = "Subcategory ID")),
    responses(
        (status = 204, description = "Subcategory and its actions deactivated"),
        (status = 404, description = "Subcategory not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn delete_subcategory(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.hierarchy.delete_subcategory(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/ticket-hierarchy/actions",
    params(NodeListQuery),
    responses((status = 200, description = "Actions", body = ApiResponse<Vec<HierarchyNode>>)),
    tag = "ticket-hierarchy"
)]
pub async fn list_actions(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<NodeListQuery>,
) -> ApiResult<Vec<HierarchyNode>> {
    let rows = state.services.hierarchy.list_actions(&ctx, query.into()).await?;
    Ok(ok(nodes(rows)))
}

#[utoipa::path(
    post,
    path = "/api/ticket-hierarchy/actions",
    request_body = NodeInput,
    responses(
        (status = 201, description = "Action created", body = ApiResponse<HierarchyNode>),
        (status = 400, description = "Missing or inactive subcategory", body = crate::errors::ErrorResponse),
        (status = 409, description = "Active sibling with the same name", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn create_action(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<NodeInput>,
) -> CreatedResult<HierarchyNode> {
    let action = state.services.hierarchy.create_action(&ctx, payload).await?;
    Ok(created(action.into()))
}

#[utoipa::path(
    put,
    path = "/api/ticket-hierarchy/actions/:id",
    params(("id" = Uuid, Path, description = "Action ID")),
    request_body = NodeUpdate,
    responses(
        (status = 200, description = "Action updated", body = ApiResponse<HierarchyNode>),
        (status = 404, description = "Action not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn update_action(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<NodeUpdate>,
) -> ApiResult<HierarchyNode> {
    let action = state
        .services
        .hierarchy
        .update_action(&ctx, id, payload)
        .await?;
    Ok(ok(action.into()))
}

#[utoipa::path(
    delete,
    path = "/api/ticket-hierarchy/actions/:id",
    params(("id" = Uuid, Path, description = "Action ID")),
    responses(
        (status = 204, description = "Action deactivated"),
        (status = 404, description = "Action not found", body = crate::errors::ErrorResponse)
    ),
    tag = "ticket-hierarchy"
)]
pub async fn delete_action(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppPath(id): AppPath<Uuid>,
) -> NoContent {
    state.services.hierarchy.delete_action(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/ticket-hierarchy/tree",
    params(TreeQuery),
    responses((status = 200, description = "Full active tree", body = ApiResponse<Vec<CategoryBranch>>)),
    tag = "ticket-hierarchy"
)]
pub async fn get_tree(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppQuery(query): AppQuery<TreeQuery>,
) -> ApiResult<Vec<CategoryBranch>> {
    let tree = state.services.hierarchy.hierarchy(&ctx, query.company_id).await?;
    Ok(ok(tree.into_iter().map(CategoryBranch::from).collect()))
}
