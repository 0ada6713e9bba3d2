//! Due calculation for aircraft components.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use strum_macros::Display;

use crate::config::MaintenanceConfig;
use crate::db::models::component::AircraftComponent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DueStatus {
    Ok,
    DueSoon,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDue {
    pub component_id: i64,
    pub name: String,
    pub due_at_hours: Option<Decimal>,
    pub hours_remaining: Option<Decimal>,
    pub due_at: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
    pub status: DueStatus,
}

pub fn component_due(
    component: &AircraftComponent,
    aircraft_total_hours: Decimal,
    now: DateTime<Utc>,
    thresholds: &MaintenanceConfig,
) -> ComponentDue {
    let due_at_hours = component.interval_hours.map(|interval| {
        component.last_completed_hours.unwrap_or(Decimal::ZERO)
            + interval
            + component.extension_hours.unwrap_or(Decimal::ZERO)
    });
    let hours_remaining = due_at_hours.map(|due| due - aircraft_total_hours);

    let due_at = component.interval_days.map(|days| {
        component.last_completed_at.unwrap_or(component.created_at) + Duration::days(days)
    });
    let days_remaining = due_at.map(|due| (due - now).num_days());

    let overdue = hours_remaining.is_some_and(|h| h < Decimal::ZERO)
        || due_at.is_some_and(|due| due < now);
    let due_soon = hours_remaining.is_some_and(|h| h <= thresholds.due_soon_hours)
        || days_remaining.is_some_and(|d| d <= thresholds.due_soon_days);

    let status = if overdue {
        DueStatus::Overdue
    } else if due_soon {
        DueStatus::DueSoon
    } else {
        DueStatus::Ok
    };

    ComponentDue {
        component_id: component.id,
        name: component.name.clone(),
        due_at_hours,
        hours_remaining,
        due_at,
        days_remaining,
        status,
    }
}

pub fn airworthy(dues: &[ComponentDue]) -> bool {
    dues.iter().all(|d| d.status != DueStatus::Overdue)
}
