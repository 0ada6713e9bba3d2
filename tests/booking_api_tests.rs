mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{TestApp, d, dec, id_of};

#[tokio::test]
async fn overlapping_aircraft_booking_is_rejected_with_conflicts() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let other = t.user("other@example.com").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (status, first) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:00:00Z", "2026-03-01T11:00:00Z")
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = t
        .booking(other, Some(aircraft), None, "2026-03-01T10:00:00Z", "2026-03-01T12:00:00Z")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "BOOKING_CONFLICT");
    assert_eq!(body["conflicts"], json!([id_of(&first)]));
}

#[tokio::test]
async fn adjacent_bookings_do_not_conflict() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (status, _) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:00:00Z", "2026-03-01T10:00:00Z")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = t
        .booking(student, Some(aircraft), None, "2026-03-01T10:00:00Z", "2026-03-01T11:00:00Z")
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn instructor_cannot_be_double_booked_across_aircraft() {
    let t = TestApp::new().await;
    let a = t.user("a@example.com").await;
    let b = t.user("b@example.com").await;
    let instructor = t.instructor("cfi@example.com", "80").await;
    let first = t.aircraft("ZK-ABC").await;
    let second = t.aircraft("ZK-XYZ").await;

    let (status, _) = t
        .booking(a, Some(first), Some(instructor), "2026-03-01T09:00:00Z", "2026-03-01T11:00:00Z")
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = t
        .booking(b, Some(second), Some(instructor), "2026-03-01T10:30:00Z", "2026-03-01T11:30:00Z")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicts"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn cancelled_booking_frees_the_slot() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (_, first) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:00:00Z", "2026-03-01T11:00:00Z")
        .await;
    let first_id = id_of(&first);

    let (status, cancelled) = t
        .post(
            &format!("/api/bookings/{first_id}/cancel"),
            json!({ "reason": "weather" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["cancellation_reason"], "weather");

    let (status, _) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:30:00Z", "2026-03-01T10:30:00Z")
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // cancelled is terminal
    let (status, body) = t
        .post(&format!("/api/bookings/{first_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");
}

#[tokio::test]
async fn moving_a_booking_onto_another_is_rejected() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (_, first) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:00:00Z", "2026-03-01T10:00:00Z")
        .await;
    let (_, second) = t
        .booking(student, Some(aircraft), None, "2026-03-01T12:00:00Z", "2026-03-01T13:00:00Z")
        .await;

    let (status, body) = t
        .patch(
            &format!("/api/bookings/{}", id_of(&second)),
            json!({ "start_time": "2026-03-01T09:30:00Z", "end_time": "2026-03-01T10:30:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicts"], json!([id_of(&first)]));

    // resizing within its own slot does not conflict with itself
    let (status, updated) = t
        .patch(
            &format!("/api/bookings/{}", id_of(&second)),
            json!({ "end_time": "2026-03-01T13:30:00Z", "confirm": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "confirmed");
}

#[tokio::test]
async fn invalid_windows_are_rejected() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (status, body) = t
        .booking(student, Some(aircraft), None, "2026-03-01T11:00:00Z", "2026-03-01T09:00:00Z")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:00:00Z", "2026-03-02T10:00:00Z")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let t = TestApp::new().await;
    let (status, body) = t
        .send("POST", "/api/bookings", Some(json!({ "user_id": "nope" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let t = TestApp::new().await;
    let (status, body) = t.get("/api/bookings/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn solo_checkout_requires_approved_authorization() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let instructor = t.instructor("cfi@example.com", "80").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (_, booking) = t
        .booking(student, Some(aircraft), None, "2026-03-01T09:00:00Z", "2026-03-01T10:00:00Z")
        .await;
    let booking_id = id_of(&booking);

    let (status, body) = t
        .post(&format!("/api/bookings/{booking_id}/checkout"), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let auth_id = t
        .create(
            "/api/flight_authorizations",
            json!({ "booking_id": booking_id, "purpose": "solo circuits" }),
        )
        .await;
    let (status, auth) = t
        .post(
            &format!("/api/flight_authorizations/{auth_id}/approve"),
            json!({ "instructor_id": instructor }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(auth["status"], "approved");
    assert_eq!(auth["approved_by"], instructor);

    let (status, booking) = t
        .post(&format!("/api/bookings/{booking_id}/checkout"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["status"], "flying");
}

#[tokio::test]
async fn overdue_component_blocks_checkout() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let instructor = t.instructor("cfi@example.com", "80").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    // 100 hour check last done at 4800, aircraft is at 5000
    t.create(
        "/api/aircraft_components",
        json!({
            "aircraft_id": aircraft,
            "name": "100 hour inspection",
            "interval_hours": "100",
            "last_completed_hours": "4800",
        }),
    )
    .await;

    let (_, detail) = t.get(&format!("/api/aircraft/{aircraft}")).await;
    assert_eq!(detail["airworthy"], false);
    assert_eq!(detail["components"][0]["status"], "overdue");

    let (_, booking) = t
        .booking(
            student,
            Some(aircraft),
            Some(instructor),
            "2026-03-01T09:00:00Z",
            "2026-03-01T10:00:00Z",
        )
        .await;
    let (status, body) = t
        .post(&format!("/api/bookings/{}/checkout", id_of(&booking)), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("100 hour inspection"));
}

#[tokio::test]
async fn retyping_a_ground_booking_as_flight_needs_an_aircraft() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let booking_id = t
        .create(
            "/api/bookings",
            json!({
                "user_id": student,
                "booking_type": "groundwork",
                "start_time": "2026-03-01T09:00:00Z",
                "end_time": "2026-03-01T10:00:00Z",
            }),
        )
        .await;
    let uri = format!("/api/bookings/{booking_id}");

    let (status, body) = t.patch(&uri, json!({ "booking_type": "flight" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, updated) = t
        .patch(&uri, json!({ "booking_type": "flight", "aircraft_id": aircraft }))
        .await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["booking_type"], "flight");
    assert_eq!(updated["aircraft_id"], aircraft);
}

#[tokio::test]
async fn editing_a_booking_on_a_grounded_aircraft_is_refused() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let grounded = t.aircraft("ZK-ABC").await;
    let spare = t.aircraft("ZK-DEF").await;

    let (_, booking) = t
        .booking(student, Some(grounded), None, "2026-03-01T09:00:00Z", "2026-03-01T10:00:00Z")
        .await;
    let uri = format!("/api/bookings/{}", id_of(&booking));

    let (status, _) = t
        .patch(&format!("/api/aircraft/{grounded}"), json!({ "status": "grounded" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.patch(&uri, json!({ "remarks": "bring headset" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE");

    let (status, moved) = t.patch(&uri, json!({ "aircraft_id": spare })).await;
    assert_eq!(status, StatusCode::OK, "{moved}");
    assert_eq!(moved["aircraft_id"], spare);
}

#[tokio::test]
async fn lesson_progress_is_recorded_against_the_booking() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let instructor = t.instructor("cfi@example.com", "80").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let (_, booking) = t
        .booking(
            student,
            Some(aircraft),
            Some(instructor),
            "2026-03-01T09:00:00Z",
            "2026-03-01T10:00:00Z",
        )
        .await;
    let booking_id = id_of(&booking);

    let (status, lesson) = t
        .post(
            "/api/lesson_progress",
            json!({
                "booking_id": booking_id,
                "lesson": "Circuits",
                "status": "not_yet_competent",
                "comments": "flare high",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{lesson}");
    assert_eq!(lesson["user_id"], student);
    assert_eq!(lesson["instructor_id"], instructor);
    assert_eq!(lesson["status"], "not_yet_competent");

    let (status, updated) = t
        .patch(
            &format!("/api/lesson_progress/{}", id_of(&lesson)),
            json!({ "status": "pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "pass");
    assert_eq!(updated["lesson"], "Circuits");

    let (_, lessons) = t
        .get(&format!("/api/lesson_progress?user_id={student}"))
        .await;
    assert_eq!(lessons.as_array().map(Vec::len), Some(1));

    let (status, _) = t
        .patch("/api/lesson_progress/999", json!({ "status": "pass" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // no debriefs on cancelled bookings
    let (status, _) = t
        .post(&format!("/api/bookings/{booking_id}/cancel"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t
        .post(
            "/api/lesson_progress",
            json!({ "booking_id": booking_id, "lesson": "Stalls", "status": "incomplete" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn completing_a_component_clears_overdue_maintenance() {
    let t = TestApp::new().await;
    let student = t.user("student@example.com").await;
    let instructor = t.instructor("cfi@example.com", "80").await;
    let aircraft = t.aircraft("ZK-ABC").await;

    let component = t
        .create(
            "/api/aircraft_components",
            json!({
                "aircraft_id": aircraft,
                "name": "100 hour inspection",
                "interval_hours": "100",
                "last_completed_hours": "4800",
            }),
        )
        .await;

    // hours default to the aircraft's current total
    let (status, done) = t
        .post(&format!("/api/aircraft_components/{component}/complete"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{done}");
    assert_eq!(dec(&done["last_completed_hours"]), d("5000"));
    assert!(done["last_completed_at"].is_string());

    let (_, detail) = t.get(&format!("/api/aircraft/{aircraft}")).await;
    assert_eq!(detail["airworthy"], true);
    assert_eq!(detail["components"][0]["status"], "ok");
    assert_eq!(dec(&detail["components"][0]["due_at_hours"]), d("5100"));

    let (_, booking) = t
        .booking(
            student,
            Some(aircraft),
            Some(instructor),
            "2026-03-01T09:00:00Z",
            "2026-03-01T10:00:00Z",
        )
        .await;
    let (status, _) = t
        .post(&format!("/api/bookings/{}/checkout", id_of(&booking)), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t
        .post("/api/aircraft_components/999/complete", json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
