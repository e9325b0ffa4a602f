//! Items, warehouses, stock movements and service kits.

mod common;

use common::{data_id, decimal, TestApp, TestTenant};
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_item(app: &TestApp, tenant: &TestTenant, name: &str) -> Uuid {
    let (status, body) = app
        .post(
            "/api/parts-services/items",
            json!({"name": name, "item_type": "material", "measurement_unit": "UN"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", body);
    data_id(&body)
}

async fn create_warehouse(app: &TestApp, tenant: &TestTenant, code: &str) -> Uuid {
    let (status, body) = app
        .post(
            "/api/parts-services/warehouses",
            json!({"name": format!("Warehouse {}", code), "code": code}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", body);
    data_id(&body)
}

async fn movement(app: &TestApp, tenant: &TestTenant, body: Value) -> (u16, Value) {
    let (status, body) = app
        .post("/api/parts-services/stock/movements", body, &tenant.agent_token)
        .await;
    (status.as_u16(), body)
}

#[tokio::test]
async fn movements_keep_stock_levels_consistent() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Toner cartridge").await;
    let main = create_warehouse(&app, &tenant, "MAIN").await;
    let van = create_warehouse(&app, &tenant, "VAN-01").await;

    let (status, received) = movement(
        &app,
        &tenant,
        json!({
            "movement_type": "in",
            "item_id": item,
            "warehouse_id": main,
            "quantity": "10",
            "unit_cost": "25.50",
            "reference_document": "NF-1234"
        }),
    )
    .await;
    assert_eq!(status, 201, "{}", received);
    assert_eq!(decimal(&received["data"]["source"]["quantity"]), 10.0);
    assert_eq!(decimal(&received["data"]["source"]["unit_cost"]), 25.5);

    let (status, shipped) = movement(
        &app,
        &tenant,
        json!({"movement_type": "out", "item_id": item, "warehouse_id": main, "quantity": "3"}),
    )
    .await;
    assert_eq!(status, 201, "{}", shipped);
    assert_eq!(decimal(&shipped["data"]["source"]["quantity"]), 7.0);

    let (status, transferred) = movement(
        &app,
        &tenant,
        json!({
            "movement_type": "transfer",
            "item_id": item,
            "warehouse_id": main,
            "destination_warehouse_id": van,
            "quantity": "2"
        }),
    )
    .await;
    assert_eq!(status, 201, "{}", transferred);
    assert_eq!(decimal(&transferred["data"]["source"]["quantity"]), 5.0);
    let destination = &transferred["data"]["destination"];
    assert_eq!(decimal(&destination["quantity"]), 2.0);
    assert_eq!(decimal(&destination["unit_cost"]), 25.5);

    let (status, counted) = movement(
        &app,
        &tenant,
        json!({"movement_type": "adjustment", "item_id": item, "warehouse_id": van, "quantity": "1"}),
    )
    .await;
    assert_eq!(status, 201, "{}", counted);
    assert_eq!(decimal(&counted["data"]["source"]["quantity"]), 1.0);

    let (_, ledger) = app
        .get(
            &format!("/api/parts-services/stock/movements?item_id={}", item),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(ledger["data"]["total"], 4);

    let (_, levels) = app
        .get(
            &format!("/api/parts-services/stock?item_id={}", item),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(levels["data"]["total"], 2);
}

#[tokio::test]
async fn invalid_movements_are_rejected() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Fuse").await;
    let main = create_warehouse(&app, &tenant, "MAIN").await;

    let (status, _) = movement(
        &app,
        &tenant,
        json!({"movement_type": "out", "item_id": item, "warehouse_id": main, "quantity": "1"}),
    )
    .await;
    assert_eq!(status, 422);

    movement(
        &app,
        &tenant,
        json!({"movement_type": "in", "item_id": item, "warehouse_id": main, "quantity": "2"}),
    )
    .await;

    let (status, body) = movement(
        &app,
        &tenant,
        json!({"movement_type": "out", "item_id": item, "warehouse_id": main, "quantity": "5"}),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(body["error"], "Unprocessable Entity");

    let (status, _) = movement(
        &app,
        &tenant,
        json!({"movement_type": "in", "item_id": item, "warehouse_id": main, "quantity": "0"}),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = movement(
        &app,
        &tenant,
        json!({"movement_type": "transfer", "item_id": item, "warehouse_id": main, "quantity": "1"}),
    )
    .await;
    assert_eq!(status, 400);

    let (status, _) = movement(
        &app,
        &tenant,
        json!({"movement_type": "in", "item_id": Uuid::new_v4(), "warehouse_id": main, "quantity": "1"}),
    )
    .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn thresholds_drive_the_low_stock_report() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Filter").await;
    let main = create_warehouse(&app, &tenant, "MAIN").await;

    let (_, received) = movement(
        &app,
        &tenant,
        json!({"movement_type": "in", "item_id": item, "warehouse_id": main, "quantity": "4", "unit_cost": "10"}),
    )
    .await;
    let stock_id = received["data"]["source"]["id"]
        .as_str()
        .expect("stock id")
        .to_string();

    let (_, low) = app
        .get("/api/parts-services/stock/low", &tenant.agent_token)
        .await;
    assert_eq!(low["data"].as_array().map(Vec::len), Some(0));

    let (status, updated) = app
        .put(
            &format!("/api/parts-services/stock/{}/thresholds", stock_id),
            json!({"minimum_stock": "5", "maximum_stock": "50", "bin_location": "A-01"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 200, "{}", updated);
    assert_eq!(updated["data"]["low_stock"], true);

    let (_, low) = app
        .get("/api/parts-services/stock/low", &tenant.agent_token)
        .await;
    assert_eq!(low["data"].as_array().map(Vec::len), Some(1));

    let (_, stats) = app
        .get("/api/parts-services/stock/stats", &tenant.agent_token)
        .await;
    assert_eq!(stats["data"]["distinct_items"], 1);
    assert_eq!(stats["data"]["low_stock_count"], 1);
    assert_eq!(decimal(&stats["data"]["total_value"]), 40.0);

    let (status, _) = app
        .put(
            &format!("/api/parts-services/stock/{}/thresholds", stock_id),
            json!({"minimum_stock": "10", "maximum_stock": "5"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn oversized_movements_leave_stats_intact() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Copper wire").await;
    let main = create_warehouse(&app, &tenant, "MAIN").await;

    let (status, body) = movement(
        &app,
        &tenant,
        json!({
            "movement_type": "in",
            "item_id": item,
            "warehouse_id": main,
            "quantity": "50000000000000000000",
            "unit_cost": "10000000000"
        }),
    )
    .await;
    assert_eq!(status, 400, "{}", body);

    let (status, _) = movement(
        &app,
        &tenant,
        json!({"movement_type": "in", "item_id": item, "warehouse_id": main, "quantity": "1", "unit_cost": "10000000000"}),
    )
    .await;
    assert_eq!(status, 400);

    let bulk = json!({"movement_type": "in", "item_id": item, "warehouse_id": main, "quantity": "600000000"});
    let (status, body) = movement(&app, &tenant, bulk.clone()).await;
    assert_eq!(status, 201, "{}", body);
    let (status, _) = movement(&app, &tenant, bulk).await;
    assert_eq!(status, 400);

    let (status, stats) = app
        .get("/api/parts-services/stock/stats", &tenant.agent_token)
        .await;
    assert_eq!(status, 200, "{}", stats);
    assert_eq!(decimal(&stats["data"]["total_quantity"]), 600000000.0);
}

#[tokio::test]
async fn items_carry_customer_links_and_stats() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Split AC 12k").await;
    app.post(
        "/api/parts-services/items",
        json!({"name": "Installation", "item_type": "service"}),
        &tenant.agent_token,
    )
    .await;

    let customer = Uuid::new_v4();
    let (status, link) = app
        .post(
            &format!("/api/parts-services/items/{}/customers", item),
            json!({"customer_id": customer, "alias": "Lobby AC", "is_asset": true}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", link);
    let link_id = data_id(&link);

    assert_eq!(
        app.delete(
            &format!("/api/parts-services/items/{}/customers/{}", item, link_id),
            &tenant.agent_token,
        )
        .await,
        204
    );
    let (_, links) = app
        .get(
            &format!("/api/parts-services/items/{}/customers", item),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(links["data"].as_array().map(Vec::len), Some(0));

    let (_, stats) = app
        .get("/api/parts-services/items/stats", &tenant.agent_token)
        .await;
    assert_eq!(stats["data"]["total"], 2);
    assert_eq!(stats["data"]["by_type"]["material"], 1);
    assert_eq!(stats["data"]["by_type"]["service"], 1);
}

#[tokio::test]
async fn service_kits_reference_active_items() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let filter = create_item(&app, &tenant, "Filter").await;
    let gas = create_item(&app, &tenant, "R410A gas").await;

    let (status, kit) = app
        .post(
            "/api/parts-services/service-kits",
            json!({
                "name": "Preventive maintenance",
                "kit_type": "maintenance",
                "equipment_model": "Split 12k",
                "items": [
                    {"item_id": filter, "quantity": "2"},
                    {"item_id": gas, "quantity": "1", "is_optional": true}
                ]
            }),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", kit);
    assert_eq!(kit["data"]["items"].as_array().map(Vec::len), Some(2));
    let kit_id = data_id(&kit);

    let (status, _) = app
        .post(
            "/api/parts-services/service-kits",
            json!({
                "name": "Broken",
                "kit_type": "repair",
                "items": [{"item_id": Uuid::new_v4(), "quantity": "1"}]
            }),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = app
        .post(
            "/api/parts-services/service-kits",
            json!({
                "name": "Twice",
                "kit_type": "repair",
                "items": [
                    {"item_id": filter, "quantity": "1"},
                    {"item_id": filter, "quantity": "1"}
                ]
            }),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, fetched) = app
        .get(
            &format!("/api/parts-services/service-kits/{}", kit_id),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(fetched["data"]["name"], "Preventive maintenance");

    assert_eq!(
        app.delete(
            &format!("/api/parts-services/service-kits/{}", kit_id),
            &tenant.agent_token,
        )
        .await,
        204
    );
    let (_, listed) = app
        .get("/api/parts-services/service-kits", &tenant.agent_token)
        .await;
    assert_eq!(listed["data"]["total"], 0);
}

#[tokio::test]
async fn item_links_reject_self_links_and_duplicates() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let printer = create_item(&app, &tenant, "Laser printer").await;
    let toner = create_item(&app, &tenant, "Toner cartridge").await;
    let links = format!("/api/parts-services/items/{}/links", printer);

    let (status, _) = app
        .post(
            &links,
            json!({"linked_item_id": printer, "link_type": "accessory"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, link) = app
        .post(
            &links,
            json!({"linked_item_id": toner, "link_type": "kit", "quantity": "2"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", link);
    assert_eq!(link["data"]["link_type"], "kit");
    assert_eq!(decimal(&link["data"]["quantity"]), 2.0);

    let (status, body) = app
        .post(
            &links,
            json!({"linked_item_id": toner, "link_type": "replacement"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 409, "{}", body);

    let (_, listed) = app.get(&links, &tenant.agent_token).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

    let link_path = format!("{}/{}", links, data_id(&link));
    assert_eq!(app.delete(&link_path, &tenant.agent_token).await, 204);
    assert_eq!(app.delete(&link_path, &tenant.agent_token).await, 404);
}

#[tokio::test]
async fn supplier_links_round_trip() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Compressor").await;
    let suppliers = format!("/api/parts-services/items/{}/suppliers", item);
    let supplier = Uuid::new_v4();

    let (status, link) = app
        .post(
            &suppliers,
            json!({
                "supplier_id": supplier,
                "part_number": "CMP-220",
                "unit_price": "899.90",
                "lead_time_days": 15
            }),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", link);
    assert_eq!(link["data"]["supplier_id"], json!(supplier));
    assert_eq!(decimal(&link["data"]["unit_price"]), 899.9);

    let (status, _) = app
        .post(&suppliers, json!({"supplier_id": supplier}), &tenant.agent_token)
        .await;
    assert_eq!(status, 409);

    let (status, _) = app
        .post(
            &suppliers,
            json!({"supplier_id": Uuid::new_v4(), "unit_price": "-1"}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (_, listed) = app.get(&suppliers, &tenant.agent_token).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(listed["data"][0]["part_number"], "CMP-220");

    assert_eq!(
        app.delete(&format!("{}/{}", suppliers, data_id(&link)), &tenant.agent_token)
            .await,
        204
    );
    let (_, listed) = app.get(&suppliers, &tenant.agent_token).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(0));

    let (status, _) = app
        .post(&suppliers, json!({"supplier_id": supplier}), &tenant.agent_token)
        .await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn attachments_round_trip() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let item = create_item(&app, &tenant, "Air handler").await;
    let attachments = format!("/api/parts-services/items/{}/attachments", item);

    let (status, attachment) = app
        .post(
            &attachments,
            json!({
                "file_name": "manual.pdf",
                "file_url": "https://files.example.com/manual.pdf",
                "file_size": 52344,
                "content_type": "application/pdf"
            }),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", attachment);
    assert_eq!(attachment["data"]["file_name"], "manual.pdf");

    let (status, _) = app
        .post(
            &attachments,
            json!({"file_name": "broken.pdf", "file_url": "https://files.example.com/b.pdf", "file_size": -1}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (_, listed) = app.get(&attachments, &tenant.agent_token).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(listed["data"][0]["content_type"], "application/pdf");

    let path = format!("{}/{}", attachments, data_id(&attachment));
    assert_eq!(app.delete(&path, &tenant.agent_token).await, 204);
    assert_eq!(app.delete(&path, &tenant.agent_token).await, 404);
    let (_, listed) = app.get(&attachments, &tenant.agent_token).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(0));
}
