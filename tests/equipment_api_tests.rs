mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn equipment_cannot_be_issued_twice() {
    let t = TestApp::new().await;
    let alice = t.user("alice@example.com").await;
    let bob = t.user("bob@example.com").await;
    let headset = t
        .create(
            "/api/equipment",
            json!({ "name": "Headset 3", "kind": "headset", "serial_number": "DC-1234" }),
        )
        .await;

    let issuance = t
        .create(
            &format!("/api/equipment/{headset}/issue"),
            json!({ "user_id": alice }),
        )
        .await;
    let (_, item) = t.get(&format!("/api/equipment/{headset}")).await;
    assert_eq!(item["status"], "issued");

    let (status, body) = t
        .post(
            &format!("/api/equipment/{headset}/issue"),
            json!({ "user_id": bob }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (status, outstanding) = t.get("/api/equipment_issuance?outstanding=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outstanding.as_array().map(Vec::len), Some(1));

    let (status, returned) = t
        .post(&format!("/api/equipment_issuance/{issuance}/return"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(returned["returned_at"].is_string());

    let (status, _) = t
        .post(&format!("/api/equipment_issuance/{issuance}/return"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = t
        .post(
            &format!("/api/equipment/{headset}/issue"),
            json!({ "user_id": bob }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, history) = t
        .get(&format!("/api/equipment_issuance?equipment_id={headset}"))
        .await;
    assert_eq!(history.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn equipment_in_maintenance_is_not_issued() {
    let t = TestApp::new().await;
    let alice = t.user("alice@example.com").await;
    let vest = t
        .create("/api/equipment", json!({ "name": "Life vest", "kind": "life_jacket" }))
        .await;
    let (status, _) = t
        .patch(
            &format!("/api/equipment/{vest}"),
            json!({ "status": "maintenance" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t
        .post(&format!("/api/equipment/{vest}/issue"), json!({ "user_id": alice }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn health_reports_database() {
    let t = TestApp::new().await;
    let (status, body) = t.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
}
