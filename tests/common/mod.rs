#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use helpdesk_api::{
    app_router,
    auth::{Role, TenantContext},
    config::AppConfig,
    db,
    services::tenants::CreateTenantInput,
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "helpdesk_test_secret_key_with_at_least_32_chars";

/// Application backed by a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

/// A provisioned tenant with tokens for each tenant role.
pub struct TestTenant {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub agent_id: Uuid,
    pub admin_token: String,
    pub agent_token: String,
    pub customer_token: String,
}

impl TestTenant {
    pub fn agent_context(&self) -> TenantContext {
        TenantContext::new(self.id, self.agent_id, Role::Agent)
    }
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        Self {
            router: app_router(state.clone()),
            state,
        }
    }

    pub fn token(&self, role: Role, tenant_id: Option<Uuid>, user_id: Uuid) -> String {
        self.state
            .auth
            .issue_token(user_id, tenant_id, Some(format!("{}@example.com", role)), role)
            .expect("token issued")
    }

    pub fn saas_admin_token(&self) -> String {
        self.token(Role::SaasAdmin, None, Uuid::new_v4())
    }

    /// Registers a tenant directly through the service layer.
    pub async fn create_tenant(&self, subdomain: &str) -> TestTenant {
        let tenant = self
            .state
            .services
            .tenants
            .create_tenant(CreateTenantInput {
                name: format!("{} support", subdomain),
                subdomain: subdomain.to_string(),
                settings: Some(json!({"timezone": "America/Sao_Paulo"})),
            })
            .await
            .expect("tenant created");

        let admin_id = Uuid::new_v4();
        let agent_id = Uuid::new_v4();
        TestTenant {
            id: tenant.id,
            admin_id,
            agent_id,
            admin_token: self.token(Role::TenantAdmin, Some(tenant.id), admin_id),
            agent_token: self.token(Role::Agent, Some(tenant.id), agent_id),
            customer_token: self.token(Role::Customer, Some(tenant.id), Uuid::new_v4()),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::USER_AGENT, "helpdesk-tests/1.0")
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request built");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responded")
    }

    /// Sends a request and decodes the JSON body; empty bodies decode to `Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: &str,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, Some(token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), token).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: &str) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body), token).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> StatusCode {
        self.request(Method::DELETE, uri, None, Some(token))
            .await
            .status()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

/// `data.<field>` as a UUID.
pub fn data_id(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .unwrap_or_else(|| panic!("response has no data.id: {}", body))
}

/// Decimal fields serialize as strings.
pub fn decimal(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("decimal string"),
        Value::Number(n) => n.as_f64().expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}
