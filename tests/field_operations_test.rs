//! Contracts, schedule templates, form templates and agent geolocation.

mod common;

use chrono::{Duration, Utc};
use common::{data_id, decimal, TestApp};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn contract_lifecycle_and_renewal() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.agent_token;
    let today = Utc::now().date_naive();

    let (status, created) = app
        .post(
            "/api/contracts",
            json!({
                "title": "Printer fleet maintenance",
                "customer_id": Uuid::new_v4(),
                "contract_type": "maintenance",
                "start_date": today - Duration::days(300),
                "end_date": today + Duration::days(10),
                "monthly_value": "1500.00"
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", created);
    assert_eq!(created["data"]["status"], "draft");
    assert_eq!(created["data"]["currency"], "BRL");
    let number = created["data"]["contract_number"].as_str().unwrap_or_default();
    assert!(number.starts_with("CTR-") && number.ends_with("-0001"), "{}", number);
    let id = data_id(&created);

    // Drafts cannot be renewed or suspended.
    let (status, _) = app
        .post(
            &format!("/api/contracts/{}/renew", id),
            json!({"new_end_date": today + Duration::days(400)}),
            token,
        )
        .await;
    assert_eq!(status, 400);
    let (status, _) = app
        .post(
            &format!("/api/contracts/{}/status", id),
            json!({"status": "suspended"}),
            token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, active) = app
        .post(
            &format!("/api/contracts/{}/status", id),
            json!({"status": "active"}),
            token,
        )
        .await;
    assert_eq!(status, 200, "{}", active);
    assert_eq!(active["data"]["status"], "active");

    let (_, expiring) = app.get("/api/contracts/expiring", token).await;
    assert_eq!(expiring["data"].as_array().map(Vec::len), Some(1));
    let (status, _) = app.get("/api/contracts/expiring?days=5000", token).await;
    assert_eq!(status, 400);

    let (status, _) = app
        .post(
            &format!("/api/contracts/{}/renew", id),
            json!({"new_end_date": today}),
            token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, renewed) = app
        .post(
            &format!("/api/contracts/{}/renew", id),
            json!({"new_end_date": today + Duration::days(375), "monthly_value": "1650"}),
            token,
        )
        .await;
    assert_eq!(status, 200, "{}", renewed);
    assert_eq!(renewed["data"]["status"], "active");
    assert_eq!(decimal(&renewed["data"]["monthly_value"]), 1650.0);
    assert!(renewed["data"]["renewal_date"].is_string());

    let (_, expiring) = app.get("/api/contracts/expiring", token).await;
    assert_eq!(expiring["data"].as_array().map(Vec::len), Some(0));

    let (status, _) = app
        .post(
            &format!("/api/contracts/{}/status", id),
            json!({"status": "terminated"}),
            token,
        )
        .await;
    assert_eq!(status, 200);
    let (status, _) = app
        .post(
            &format!("/api/contracts/{}/status", id),
            json!({"status": "active"}),
            token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn contract_periods_must_be_ordered() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, _) = app
        .post(
            "/api/contracts",
            json!({
                "title": "Backwards",
                "customer_id": Uuid::new_v4(),
                "contract_type": "support",
                "start_date": "2024-12-31",
                "end_date": "2024-01-01"
            }),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn schedule_templates_report_working_hours() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.admin_token;

    let (status, office) = app
        .post(
            "/api/timecard/schedule-templates",
            json!({
                "name": "Office hours",
                "schedule_type": "5x2",
                "configuration": {
                    "work_days": [1, 2, 3, 4, 5],
                    "start_time": "08:00",
                    "end_time": "17:00",
                    "break_duration_minutes": 60
                }
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", office);
    assert_eq!(office["data"]["rotation_cycle_days"], 7);
    assert_eq!(office["data"]["daily_hours"], 8.0);
    assert_eq!(office["data"]["weekly_hours"], 40.0);

    let (status, plantao) = app
        .post(
            "/api/timecard/schedule-templates",
            json!({
                "name": "Night watch",
                "schedule_type": "12x36",
                "configuration": {
                    "work_days": [0, 1, 2, 3, 4, 5, 6],
                    "start_time": "19:00",
                    "end_time": "07:00"
                }
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", plantao);
    assert_eq!(plantao["data"]["daily_hours"], 12.0);
    assert_eq!(plantao["data"]["weekly_hours"], 42.0);

    let (status, _) = app
        .post(
            "/api/timecard/schedule-templates",
            json!({
                "name": "Broken",
                "schedule_type": "5x2",
                "configuration": {"work_days": [7], "start_time": "08:00", "end_time": "17:00"}
            }),
            token,
        )
        .await;
    assert_eq!(status, 400);

    let (status, rotating) = app
        .post(
            "/api/timecard/schedule-templates",
            json!({
                "name": "Fortnight rotation",
                "schedule_type": "custom",
                "rotation_cycle_days": 14,
                "configuration": {"work_days": [1, 2, 3], "start_time": "09:00", "end_time": "18:00"}
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", rotating);
    let (status, resent) = app
        .put(
            &format!("/api/timecard/schedule-templates/{}", data_id(&rotating)),
            json!({"schedule_type": "custom", "name": "Fortnight rotation B"}),
            token,
        )
        .await;
    assert_eq!(status, 200, "{}", resent);
    assert_eq!(resent["data"]["rotation_cycle_days"], 14);

    let id = data_id(&office);
    assert_eq!(
        app.delete(&format!("/api/timecard/schedule-templates/{}", id), token)
            .await,
        204
    );
    let (_, active) = app
        .get("/api/timecard/schedule-templates?active=true", token)
        .await;
    assert_eq!(active["data"]["total"], 2);
}

#[tokio::test]
async fn form_templates_validate_submissions() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let token = &tenant.agent_token;

    let (status, template) = app
        .post(
            "/api/form-templates",
            json!({
                "name": "Visit report",
                "target": "ticket",
                "fields": [
                    {"key": "technician", "label": "Technician", "field_type": "text", "required": true},
                    {"key": "hours", "label": "Hours", "field_type": "number"},
                    {"key": "outcome", "label": "Outcome", "field_type": "select",
                     "options": ["fixed", "pending"], "required": true}
                ]
            }),
            token,
        )
        .await;
    assert_eq!(status, 201, "{}", template);
    assert_eq!(template["data"]["version"], 1);
    let id = data_id(&template);

    let (status, result) = app
        .post(
            &format!("/api/form-templates/{}/validate", id),
            json!({"values": {"technician": "Ana", "hours": "2.5", "outcome": "fixed"}}),
            token,
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(result["data"]["valid"], true);

    let (_, result) = app
        .post(
            &format!("/api/form-templates/{}/validate", id),
            json!({"values": {"hours": "two", "outcome": "unknown", "extra": 1}}),
            token,
        )
        .await;
    assert_eq!(result["data"]["valid"], false);
    let errors = result["data"]["errors"].as_array().expect("errors");
    let fields: Vec<&str> = errors
        .iter()
        .map(|e| e["field"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(fields, vec!["technician", "hours", "outcome", "extra"]);
    assert_eq!(errors[0]["message"], "is required");

    let (status, updated) = app
        .put(
            &format!("/api/form-templates/{}", id),
            json!({"name": "Visit report v2"}),
            token,
        )
        .await;
    assert_eq!(status, 200, "{}", updated);
    assert_eq!(updated["data"]["version"], 2);

    let (status, _) = app
        .post(
            "/api/form-templates",
            json!({
                "name": "No options",
                "target": "general",
                "fields": [{"key": "pick", "label": "Pick", "field_type": "select"}]
            }),
            token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn agents_are_found_by_proximity() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;

    let (status, recorded) = app
        .post(
            "/api/geolocation/locations",
            json!({"latitude": -23.5505, "longitude": -46.6333, "accuracy_meters": 12.0}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 201, "{}", recorded);
    assert_eq!(recorded["data"]["user_id"], json!(tenant.agent_id));

    let (status, _) = app
        .post(
            "/api/geolocation/locations",
            json!({"latitude": 95.0, "longitude": 0.0}),
            &tenant.agent_token,
        )
        .await;
    assert_eq!(status, 400);

    let (_, near) = app
        .get(
            "/api/geolocation/nearby?latitude=-23.5600&longitude=-46.6400&radius_km=5",
            &tenant.agent_token,
        )
        .await;
    let agents = near["data"].as_array().expect("agents");
    assert_eq!(agents.len(), 1);
    assert!(agents[0]["distance_km"].as_f64().unwrap_or(f64::MAX) < 5.0);

    let (_, far) = app
        .get(
            "/api/geolocation/nearby?latitude=-22.9068&longitude=-43.1729&radius_km=50",
            &tenant.agent_token,
        )
        .await;
    assert_eq!(far["data"].as_array().map(Vec::len), Some(0));

    let (_, history) = app
        .get(
            &format!("/api/geolocation/history/{}", tenant.agent_id),
            &tenant.admin_token,
        )
        .await;
    assert_eq!(history["data"].as_array().map(Vec::len), Some(1));

    let (status, _) = app
        .get(
            &format!(
                "/api/geolocation/history/{}?from=2024-02-01T00:00:00Z&to=2024-01-01T00:00:00Z",
                tenant.agent_id
            ),
            &tenant.admin_token,
        )
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn only_the_newest_position_counts() {
    let app = TestApp::new().await;
    let tenant = app.create_tenant("acme").await;
    let now = Utc::now();

    for (latitude, longitude, minutes_ago) in [
        (-23.5505, -46.6333, 30),
        (-22.9068, -43.1729, 5),
        (-23.5510, -46.6340, 60),
    ] {
        let (status, body) = app
            .post(
                "/api/geolocation/locations",
                json!({
                    "latitude": latitude,
                    "longitude": longitude,
                    "recorded_at": now - Duration::minutes(minutes_ago)
                }),
                &tenant.agent_token,
            )
            .await;
        assert_eq!(status, 201, "{}", body);
    }
    app.post(
        "/api/geolocation/locations",
        json!({"latitude": -23.5600, "longitude": -46.6400}),
        &tenant.admin_token,
    )
    .await;

    let (status, latest) = app
        .get("/api/geolocation/latest", &tenant.admin_token)
        .await;
    assert_eq!(status, 200, "{}", latest);
    let rows = latest["data"].as_array().expect("latest");
    assert_eq!(rows.len(), 2);
    let agent = rows
        .iter()
        .find(|row| row["user_id"] == json!(tenant.agent_id))
        .expect("agent row");
    assert_eq!(agent["latitude"], -22.9068);

    let (_, near) = app
        .get(
            "/api/geolocation/nearby?latitude=-23.5505&longitude=-46.6333&radius_km=5",
            &tenant.agent_token,
        )
        .await;
    let agents = near["data"].as_array().expect("agents");
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["user_id"], json!(tenant.admin_id));
}
