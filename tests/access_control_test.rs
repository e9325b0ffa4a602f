//! Authentication, role gates and tenant isolation.

mod common;

use axum::http::Method;
use common::{data_id, response_json, TestApp, TEST_JWT_SECRET};
use helpdesk_api::{
    auth::{AuthConfig, AuthService, Role},
    middleware_helpers::REQUEST_ID_HEADER,
};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/tickets", None, None).await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["error"], "Unauthorized");

    let response = app
        .request(Method::GET, "/api/tickets", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let foreign = AuthService::new(AuthConfig::new(
        format!("{}-other", TEST_JWT_SECRET),
        helpdesk_api::config::DEFAULT_JWT_ISSUER.to_string(),
        Duration::from_secs(3600),
    ));
    let token = foreign
        .issue_token(Uuid::new_v4(), Some(tenant.id), None, Role::Agent)
        .expect("token issued");

    let response = app
        .request(Method::GET, "/api/tickets", None, Some(&token))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn role_gates_reject_lower_roles() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, _) = app.get("/api/saas-admin/tenants", &tenant.admin_token).await;
    assert_eq!(status, 403);

    let (status, _) = app.get("/api/tenant-admin/tenant", &tenant.agent_token).await;
    assert_eq!(status, 403);

    let (status, _) = app
        .get("/api/ticket-hierarchy/categories", &tenant.customer_token)
        .await;
    assert_eq!(status, 403);

    let (status, _) = app
        .get("/api/parts-services/items", &tenant.customer_token)
        .await;
    assert_eq!(status, 403);

    // Customers may still open tickets.
    let (status, _) = app
        .post(
            "/api/tickets",
            json!({"subject": "My screen is blank"}),
            &tenant.customer_token,
        )
        .await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn saas_admin_manages_tenants() {
    let app = TestApp::new().await;
    let admin = app.saas_admin_token();

    let (status, created) = app
        .post(
            "/api/saas-admin/tenants",
            json!({"name": "Initech", "subdomain": "initech"}),
            &admin,
        )
        .await;
    assert_eq!(status, 201, "{}", created);
    assert_eq!(created["data"]["subdomain"], "initech");
    assert_eq!(created["data"]["is_active"], true);
    let id = data_id(&created);

    let (status, _) = app
        .post(
            "/api/saas-admin/tenants",
            json!({"name": "Initech again", "subdomain": "initech"}),
            &admin,
        )
        .await;
    assert_eq!(status, 409);

    let (status, _) = app
        .post(
            "/api/saas-admin/tenants",
            json!({"name": "Bad", "subdomain": "Not A Slug"}),
            &admin,
        )
        .await;
    assert_eq!(status, 400);

    let (status, deactivated) = app
        .post(
            &format!("/api/saas-admin/tenants/{}/deactivate", id),
            json!({}),
            &admin,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(deactivated["data"]["is_active"], false);

    let (_, inactive) = app
        .get("/api/saas-admin/tenants?active=false", &admin)
        .await;
    assert_eq!(inactive["data"]["total"], 1);

    let (status, _) = app
        .get(&format!("/api/saas-admin/tenants/{}", Uuid::new_v4()), &admin)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn deactivated_tenant_is_forbidden() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    app.state
        .services
        .tenants
        .set_active(tenant.id, false)
        .await
        .expect("tenant deactivated");

    let (status, body) = app.get("/api/tickets", &tenant.agent_token).await;
    assert_eq!(status, 403, "{}", body);

    let (status, _) = app.get("/api/tenant-admin/tenant", &tenant.admin_token).await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn tenants_cannot_see_each_others_rows() {
    let app = TestApp::new().await;
    let acme = app.create_tenant("acme").await;
    let globex = app.create_tenant("globex").await;

    let (_, ticket) = app
        .post("/api/tickets", json!({"subject": "Acme only"}), &acme.agent_token)
        .await;
    let ticket_id = data_id(&ticket);

    let (status, _) = app
        .get(&format!("/api/tickets/{}", ticket_id), &globex.agent_token)
        .await;
    assert_eq!(status, 404);

    let (status, _) = app
        .put(
            &format!("/api/tickets/{}", ticket_id),
            json!({"subject": "hijacked"}),
            &globex.agent_token,
        )
        .await;
    assert_eq!(status, 404);

    let (status, _) = app
        .get(&format!("/api/ticket-history/{}", ticket_id), &globex.agent_token)
        .await;
    assert_eq!(status, 404);

    let (_, listed) = app.get("/api/tickets", &globex.agent_token).await;
    assert_eq!(listed["data"]["total"], 0);

    let (_, category) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Hardware"}),
            &acme.agent_token,
        )
        .await;
    let (status, _) = app
        .post(
            "/api/tickets",
            json!({"subject": "Borrowed category", "category_id": category["data"]["id"]}),
            &globex.agent_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn tenant_admin_merges_settings_and_reads_stats() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, updated) = app
        .put(
            "/api/tenant-admin/tenant",
            json!({"settings": {"language": "pt-BR", "timezone": null}}),
            &tenant.admin_token,
        )
        .await;
    assert_eq!(status, 200, "{}", updated);
    assert_eq!(updated["data"]["settings"]["language"], "pt-BR");
    assert!(updated["data"]["settings"].get("timezone").is_none());

    app.post("/api/tickets", json!({"subject": "One"}), &tenant.agent_token)
        .await;
    let (status, stats) = app.get("/api/tenant-admin/stats", &tenant.admin_token).await;
    assert_eq!(status, 200);
    assert_eq!(stats["data"]["tickets"], 1);
    assert_eq!(stats["data"]["open_tickets"], 1);
}

#[tokio::test]
async fn health_and_request_ids() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().get(REQUEST_ID_HEADER).is_some());
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "healthy");

    let response = app.request(Method::GET, "/status", None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["data"]["service"], "helpdesk-api");
    assert_eq!(body["data"]["environment"], "test");
}
