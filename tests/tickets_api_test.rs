//! Ticket lifecycle over HTTP: numbering, updates, history and soft deletes.

mod common;

use common::{data_id, TestApp};
use serde_json::json;

#[tokio::test]
async fn tickets_are_numbered_sequentially_per_tenant() {
    let app = TestApp::new().await;
    let acme = app.create_tenant("acme").await;
    let globex = app.create_tenant("globex").await;

    let (status, first) = app
        .post(
            "/api/tickets",
            json!({"subject": "Printer jam", "priority": "high"}),
            &acme.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", first);
    assert_eq!(first["data"]["number"], "T-000001");
    assert_eq!(first["data"]["status"], "new");
    assert_eq!(first["data"]["priority"], "high");

    let (_, second) = app
        .post("/api/tickets", json!({"subject": "VPN down"}), &acme.agent_token)
        .await;
    assert_eq!(second["data"]["number"], "T-000002");
    assert_eq!(second["data"]["priority"], "medium");

    let (_, other) = app
        .post("/api/tickets", json!({"subject": "Email"}), &globex.agent_token)
        .await;
    assert_eq!(other["data"]["number"], "T-000001");
}

#[tokio::test]
async fn ticket_creation_rejects_blank_subject() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, body) = app
        .post("/api/tickets", json!({"subject": ""}), &tenant.agent_token)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["details"]["subject"].is_array());

    let (status, body) = app
        .post("/api/tickets", json!({"subject": "   "}), &tenant.agent_token)
        .await;
    assert_eq!(status, 400, "{}", body);
    assert!(body["details"]["subject"].is_array());

    let (_, created) = app
        .post("/api/tickets", json!({"subject": "Printer jam"}), &tenant.agent_token)
        .await;
    let (status, _) = app
        .put(
            &format!("/api/tickets/{}", data_id(&created)),
            json!({"subject": " \t "}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn undecodable_payloads_use_the_error_envelope() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, body) = app
        .post(
            "/api/tickets",
            json!({"subject": "Printer jam", "status": "archived"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400, "{}", body);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["details"]["part"], "body");
    assert!(body["timestamp"].is_string());

    let (status, body) = app
        .post("/api/tickets", json!({"priority": "high"}), &tenant.agent_token)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["details"]["part"], "body");

    let (status, body) = app
        .get("/api/tickets?priority=whenever", &tenant.agent_token)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["details"]["part"], "query");

    let (status, body) = app.get("/api/tickets/not-a-uuid", &tenant.agent_token).await;
    assert_eq!(status, 400);
    assert_eq!(body["details"]["part"], "path");

    let (status, _) = app
        .get("/api/tickets?page=18446744073709551615", &tenant.agent_token)
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn updates_are_recorded_in_history() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (_, created) = app
        .post("/api/tickets", json!({"subject": "Printer jam"}), &tenant.agent_token)
        .await;
    let id = data_id(&created);

    let (status, updated) = app
        .put(
            &format!("/api/tickets/{}", id),
            json!({"status": "resolved", "priority": "critical"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 200, "{}", updated);
    assert_eq!(updated["data"]["status"], "resolved");
    assert!(updated["data"]["resolved_at"].is_string());

    let (status, history) = app
        .get(&format!("/api/ticket-history/{}", id), &tenant.agent_token)
        .await;
    assert_eq!(status, 200);
    let rows = history["data"].as_array().expect("history rows");
    let actions: Vec<&str> = rows
        .iter()
        .map(|row| row["action_type"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(actions[0], "created");
    assert!(actions.contains(&"status_changed"));
    assert!(actions.contains(&"priority_changed"));

    let status_row = rows
        .iter()
        .find(|row| row["action_type"] == "status_changed")
        .expect("status change row");
    assert_eq!(status_row["field_name"], "status");
    assert_eq!(status_row["old_value"], "new");
    assert_eq!(status_row["new_value"], "resolved");
    assert_eq!(status_row["ip_address"], "203.0.113.7");
    assert_eq!(status_row["user_agent"], "helpdesk-tests/1.0");

    let (_, only_status) = app
        .get(
            &format!("/api/ticket-history/{}?action_type=status_changed", id),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(only_status["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn notes_and_summary() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (_, created) = app
        .post("/api/tickets", json!({"subject": "Laptop"}), &tenant.agent_token)
        .await;
    let id = data_id(&created);

    let (status, note) = app
        .post(
            &format!("/api/ticket-history/{}/notes", id),
            json!({"note": "Called the customer"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", note);
    assert_eq!(note["data"]["action_type"], "note_added");
    assert_eq!(note["data"]["description"], "Called the customer");

    let (status, summary) = app
        .get(
            &format!("/api/ticket-history/{}/summary", id),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(summary["data"]["total"], 2);
    assert_eq!(summary["data"]["by_action"]["created"], 1);
    assert_eq!(summary["data"]["by_action"]["note_added"], 1);

    let (status, _) = app
        .post(
            &format!("/api/ticket-history/{}/notes", id),
            json!({"note": ""}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn deleted_tickets_leave_the_default_listing() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (_, created) = app
        .post("/api/tickets", json!({"subject": "Old"}), &tenant.agent_token)
        .await;
    let id = data_id(&created);
    app.post("/api/tickets", json!({"subject": "Current"}), &tenant.agent_token)
        .await;

    assert_eq!(
        app.delete(&format!("/api/tickets/{}", id), &tenant.agent_token)
            .await,
        204
    );
    assert_eq!(
        app.delete(&format!("/api/tickets/{}", id), &tenant.agent_token)
            .await,
        404
    );

    let (_, listed) = app.get("/api/tickets", &tenant.agent_token).await;
    assert_eq!(listed["data"]["total"], 1);
    assert_eq!(listed["data"]["items"][0]["subject"], "Current");

    let (_, all) = app
        .get("/api/tickets?include_inactive=true", &tenant.agent_token)
        .await;
    assert_eq!(all["data"]["total"], 2);

    let (status, _) = app
        .put(
            &format!("/api/tickets/{}", id),
            json!({"subject": "Revived"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 404);

    let (_, summary) = app
        .get(
            &format!("/api/ticket-history/{}/summary", id),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(summary["data"]["by_action"]["deleted"], 1);
}

#[tokio::test]
async fn listing_paginates_and_filters() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    for n in 0..5 {
        let priority = if n % 2 == 0 { "low" } else { "high" };
        app.post(
            "/api/tickets",
            json!({"subject": format!("Ticket {}", n), "priority": priority}),
            &tenant.agent_token,
        )
        .await;
    }

    let (_, page) = app
        .get("/api/tickets?page=2&limit=2", &tenant.agent_token)
        .await;
    assert_eq!(page["data"]["total"], 5);
    assert_eq!(page["data"]["page"], 2);
    assert_eq!(page["data"]["total_pages"], 3);
    assert_eq!(page["data"]["items"].as_array().map(Vec::len), Some(2));

    let (_, high) = app
        .get("/api/tickets?priority=high", &tenant.agent_token)
        .await;
    assert_eq!(high["data"]["total"], 2);

    let (_, search) = app
        .get("/api/tickets?search=T-000003", &tenant.agent_token)
        .await;
    assert_eq!(search["data"]["total"], 1);
}
