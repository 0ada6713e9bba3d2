#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use flightdesk::config::Config;
use flightdesk::db::Database;
use flightdesk::router::{DeskState, desk_router};

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    // dropped with the app
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(cfg: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let database_url = format!("sqlite:{}", dir.path().join("desk.sqlite").display());
        let db = Database::connect(&database_url)
            .await
            .expect("failed to open database");
        let app = desk_router(DeskState::new(db.clone(), cfg));
        Self {
            app,
            db,
            _dir: dir,
        }
    }

    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .app
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("request failed");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not json")
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(body)).await
    }

    /// POST that must return 201; yields the new row's id.
    pub async fn create(&self, uri: &str, body: Value) -> i64 {
        let (status, value) = self.post(uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {uri}: {value}");
        id_of(&value)
    }

    pub async fn user(&self, email: &str) -> i64 {
        self.create(
            "/api/users",
            json!({
                "first_name": "Sam",
                "last_name": "Pilot",
                "email": email,
                "role": "student",
            }),
        )
        .await
    }

    pub async fn instructor(&self, email: &str, hourly_rate: &str) -> i64 {
        let user_id = self.user(email).await;
        self.create(
            "/api/instructors",
            json!({
                "user_id": user_id,
                "rating": "B Cat",
                "hourly_rate": hourly_rate,
            }),
        )
        .await
    }

    /// Hobbs-billed aircraft credited on tacho time.
    pub async fn aircraft(&self, registration: &str) -> i64 {
        self.create(
            "/api/aircraft",
            json!({
                "registration": registration,
                "aircraft_type": "C172",
                "hourly_rate": "250",
                "charge_basis": "hobbs",
                "total_time_method": "tacho",
                "current_hobbs": "1000",
                "current_tacho": "800",
                "total_hours": "5000",
            }),
        )
        .await
    }

    pub async fn booking(
        &self,
        user_id: i64,
        aircraft_id: Option<i64>,
        instructor_id: Option<i64>,
        start: &str,
        end: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/api/bookings",
            json!({
                "user_id": user_id,
                "aircraft_id": aircraft_id,
                "instructor_id": instructor_id,
                "start_time": start,
                "end_time": end,
            }),
        )
        .await
    }
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().expect("response has no id")
}

/// Decimal fields are serialized as strings.
pub fn dec(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
        .parse()
        .expect("invalid decimal")
}

pub fn d(s: &str) -> Decimal {
    s.parse().expect("invalid decimal literal")
}
