//! HTTP handlers, one module per resource.

pub mod aircraft;
pub mod bookings;
pub mod components;
pub mod equipment;
pub mod flight_logs;
pub mod health;
pub mod instructors;
pub mod invoices;
pub mod tax_rates;
pub mod training;
pub mod users;
