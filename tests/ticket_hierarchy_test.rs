//! Category / subcategory / action tree and its use in ticket classification.

mod common;

use common::{data_id, TestApp};
use serde_json::json;

#[tokio::test]
async fn tree_nests_active_nodes_and_deletes_cascade() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.agent_token;

    let (status, category) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Hardware", "color": "#FF8800", "sort_order": 1}),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", category);
    let category_id = data_id(&category);

    let (status, subcategory) = app
        .post(
            "/api/ticket-hierarchy/subcategories",
            json!({"name": "Printers", "parent_id": category_id}),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", subcategory);
    let subcategory_id = data_id(&subcategory);

    let (status, action) = app
        .post(
            "/api/ticket-hierarchy/actions",
            json!({
                "name": "Replace toner",
                "parent_id": subcategory_id,
                "estimated_time_minutes": 30
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", action);

    let (status, tree) = app.get("/api/ticket-hierarchy/tree", token).await;
    assert_eq!(status, 200);
    let categories = tree["data"].as_array().expect("tree");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["name"], "Hardware");
    assert_eq!(categories[0]["subcategories"][0]["name"], "Printers");
    assert_eq!(
        categories[0]["subcategories"][0]["actions"][0]["name"],
        "Replace toner"
    );

    assert_eq!(
        app.delete(
            &format!("/api/ticket-hierarchy/categories/{}", category_id),
            token
        )
        .await,
        204
    );

    let (_, tree) = app.get("/api/ticket-hierarchy/tree", token).await;
    assert_eq!(tree["data"].as_array().map(Vec::len), Some(0));

    let (_, subcategories) = app
        .get(
            &format!(
                "/api/ticket-hierarchy/subcategories?parent_id={}&include_inactive=true",
                category_id
            ),
            token,
        )
        .await;
    assert_eq!(subcategories["data"][0]["is_active"], false);
}

#[tokio::test]
async fn children_need_an_existing_parent() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, _) = app
        .post(
            "/api/ticket-hierarchy/subcategories",
            json!({"name": "Orphan"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .post(
            "/api/ticket-hierarchy/actions",
            json!({"name": "Orphan", "parent_id": uuid::Uuid::new_v4()}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Paint", "color": "orange"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn ticket_classification_must_follow_the_tree() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.agent_token;

    let (_, hardware) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Hardware"}),
            token,
        )
        .await;
    let (_, software) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Software"}),
            token,
        )
        .await;
    let (_, printers) = app
        .post(
            "/api/ticket-hierarchy/subcategories",
            json!({"name": "Printers", "parent_id": hardware["data"]["id"]}),
            token,
        )
        .await;

    let (status, _) = app
        .post(
            "/api/tickets",
            json!({
                "subject": "Mismatched",
                "category_id": software["data"]["id"],
                "subcategory_id": printers["data"]["id"]
            }),
            token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, ticket) = app
        .post(
            "/api/tickets",
            json!({
                "subject": "Printer offline",
                "category_id": hardware["data"]["id"],
                "subcategory_id": printers["data"]["id"]
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", ticket);
    assert_eq!(ticket["data"]["subcategory_id"], printers["data"]["id"]);

    let (_, filtered) = app
        .get(
            &format!(
                "/api/tickets?category_id={}",
                hardware["data"]["id"].as_str().unwrap_or_default()
            ),
            token,
        )
        .await;
    assert_eq!(filtered["data"]["total"], 1);
}

#[tokio::test]
async fn deactivated_nodes_cannot_be_edited_or_deleted_again() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.agent_token;

    let (_, category) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Network"}),
            token,
        )
        .await;
    let (_, subcategory) = app
        .post(
            "/api/ticket-hierarchy/subcategories",
            json!({"name": "Wi-Fi", "parent_id": category["data"]["id"]}),
            token,
        )
        .await;
    let (_, action) = app
        .post(
            "/api/ticket-hierarchy/actions",
            json!({"name": "Reset access point", "parent_id": subcategory["data"]["id"]}),
            token,
        )
        .await;
    let category_path = format!("/api/ticket-hierarchy/categories/{}", data_id(&category));
    let action_path = format!("/api/ticket-hierarchy/actions/{}", data_id(&action));

    assert_eq!(app.delete(&category_path, token).await, 204);

    let (status, _) = app
        .put(&category_path, json!({"name": "Networking"}), token)
        .await;
    assert_eq!(status, 404);
    assert_eq!(app.delete(&category_path, token).await, 404);

    let (status, _) = app
        .put(&action_path, json!({"name": "Reboot access point"}), token)
        .await;
    assert_eq!(status, 404);
    assert_eq!(app.delete(&action_path, token).await, 404);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.agent_token;

    let (status, _) = app
        .post("/api/ticket-hierarchy/categories", json!({"name": "  "}), token)
        .await;
    assert_eq!(status, 400);

    let (_, category) = app
        .post(
            "/api/ticket-hierarchy/categories",
            json!({"name": "Facilities"}),
            token,
        )
        .await;
    let (status, _) = app
        .put(
            &format!("/api/ticket-hierarchy/categories/{}", data_id(&category)),
            json!({"name": "\t"}),
            token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .post(
            "/api/ticket-hierarchy/subcategories",
            json!({"name": " ", "parent_id": category["data"]["id"]}),
            token,
        )
        .await;
    assert_eq!(status, 400);
}
