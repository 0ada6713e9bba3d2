use axum::{
    Router,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::handlers::{
    aircraft, bookings, components, equipment, flight_logs, health, instructors, invoices,
    tax_rates, training, users,
};

#[derive(Clone)]
pub struct DeskState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl DeskState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

pub fn desk_router(state: DeskState) -> Router {
    let api = Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            get(users::show).patch(users::update).delete(users::remove),
        )
        .route(
            "/instructors",
            get(instructors::list).post(instructors::create),
        )
        .route(
            "/instructors/{id}",
            get(instructors::show)
                .patch(instructors::update)
                .delete(instructors::remove),
        )
        .route("/aircraft", get(aircraft::list).post(aircraft::create))
        .route(
            "/aircraft/{id}",
            get(aircraft::show).patch(aircraft::update),
        )
        .route("/aircraft/{id}/flight_logs", get(aircraft::flight_logs))
        .route(
            "/aircraft_components",
            get(components::list).post(components::create),
        )
        .route(
            "/aircraft_components/{id}",
            patch(components::update).delete(components::remove),
        )
        .route(
            "/aircraft_components/{id}/complete",
            post(components::complete),
        )
        .route("/equipment", get(equipment::list).post(equipment::create))
        .route(
            "/equipment/{id}",
            get(equipment::show)
                .patch(equipment::update)
                .delete(equipment::remove),
        )
        .route("/equipment/{id}/issue", post(equipment::issue))
        .route("/equipment_issuance", get(equipment::list_issuance))
        .route(
            "/equipment_issuance/{id}/return",
            post(equipment::return_item),
        )
        .route("/bookings", get(bookings::list).post(bookings::create))
        .route(
            "/bookings/{id}",
            get(bookings::show)
                .patch(bookings::update)
                .delete(bookings::remove),
        )
        .route("/bookings/{id}/cancel", post(bookings::cancel))
        .route("/bookings/{id}/checkout", post(bookings::checkout))
        .route("/bookings/{id}/calculate", post(bookings::calculate))
        .route("/bookings/{id}/complete", post(bookings::complete))
        .route(
            "/flight_logs/{id}",
            get(flight_logs::show).patch(flight_logs::correct),
        )
        .route("/invoices", get(invoices::list).post(invoices::create))
        .route("/invoices/{id}", get(invoices::show))
        .route("/invoices/{id}/items", post(invoices::add_item))
        .route(
            "/invoice_items/{id}",
            patch(invoices::update_item).delete(invoices::remove_item),
        )
        .route("/invoices/{id}/issue", post(invoices::issue))
        .route("/invoices/{id}/void", post(invoices::void))
        .route(
            "/invoices/{id}/payments",
            get(invoices::payments).post(invoices::record_payment),
        )
        .route("/tax_rates", get(tax_rates::list).post(tax_rates::create))
        .route(
            "/lesson_progress",
            get(training::list_lessons).post(training::record_lesson),
        )
        .route("/lesson_progress/{id}", patch(training::update_lesson))
        .route(
            "/flight_authorizations",
            post(training::request_authorization),
        )
        .route(
            "/flight_authorizations/{id}",
            get(training::show_authorization),
        )
        .route(
            "/flight_authorizations/{id}/approve",
            post(training::approve_authorization),
        )
        .route(
            "/flight_authorizations/{id}/reject",
            post(training::reject_authorization),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
