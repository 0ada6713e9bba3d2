//! Row structs, request payloads and queries, one module per table.

pub mod aircraft;
pub mod authorization;
pub mod booking;
pub mod component;
pub mod equipment;
pub mod flight_log;
pub mod instructor;
pub mod invoice;
pub mod lesson;
pub mod payment;
pub mod tax_rate;
pub mod user;
