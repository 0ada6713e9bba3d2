//! Invoice arithmetic: line amounts, totals and generated flight charges.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::db::models::invoice::{InvoiceItem, InvoiceStatus};
use crate::service::meter::FlightTimes;
use crate::service::reconcile::DesiredItem;

pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineAmounts {
    pub amount: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    pub rate_inclusive: Decimal,
}

pub fn line_amounts(quantity: Decimal, unit_price: Decimal, tax_rate: Decimal) -> LineAmounts {
    let amount = round_money(quantity * unit_price);
    let tax_amount = round_money(amount * tax_rate);
    LineAmounts {
        amount,
        tax_amount,
        line_total: amount + tax_amount,
        rate_inclusive: round_money(unit_price * (Decimal::ONE + tax_rate)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total_amount: Decimal,
    pub total_paid: Decimal,
    pub balance_due: Decimal,
}

/// Totals over the invoice's live (non-deleted) items.
pub fn invoice_totals(items: &[InvoiceItem], total_paid: Decimal) -> InvoiceTotals {
    let live = || items.iter().filter(|i| i.deleted_at.is_none());
    let subtotal: Decimal = live().map(|i| i.amount).sum();
    let tax_total: Decimal = live().map(|i| i.tax_amount).sum();
    let total_amount: Decimal = live().map(|i| i.line_total).sum();
    InvoiceTotals {
        subtotal,
        tax_total,
        total_amount,
        total_paid,
        balance_due: total_amount - total_paid,
    }
}

pub fn status_after_payment(status: InvoiceStatus, totals: &InvoiceTotals) -> InvoiceStatus {
    if totals.total_amount > Decimal::ZERO && totals.balance_due <= Decimal::ZERO {
        InvoiceStatus::Paid
    } else {
        status
    }
}

pub fn invoice_number(prefix: &str, id: i64) -> String {
    format!("{prefix}-{id:06}")
}

/// Something billable by the hour on a flight.
#[derive(Debug, Clone)]
pub struct HourlyCharge {
    pub id: i64,
    pub label: String,
    pub hourly_rate: Decimal,
}

/// Generated line items for a completed flight. Zero-hour lines are omitted.
pub fn flight_charges(
    aircraft: &HourlyCharge,
    instructor: Option<&HourlyCharge>,
    times: &FlightTimes,
) -> Vec<DesiredItem> {
    let mut items = Vec::new();
    if times.dual_time > Decimal::ZERO {
        items.push(DesiredItem {
            source: format!("aircraft:{}:dual", aircraft.id),
            description: format!("{} hire - dual", aircraft.label),
            quantity: times.dual_time,
            unit_price: aircraft.hourly_rate,
        });
    }
    if times.solo_time > Decimal::ZERO {
        items.push(DesiredItem {
            source: format!("aircraft:{}:solo", aircraft.id),
            description: format!("{} hire - solo", aircraft.label),
            quantity: times.solo_time,
            unit_price: aircraft.hourly_rate,
        });
    }
    if let Some(instructor) = instructor
        && times.dual_time > Decimal::ZERO
    {
        items.push(DesiredItem {
            source: format!("instructor:{}", instructor.id),
            description: format!("Flight instruction - {}", instructor.label),
            quantity: times.dual_time,
            unit_price: instructor.hourly_rate,
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(id: i64, qty: &str, price: &str, deleted: bool) -> InvoiceItem {
        let a = line_amounts(d(qty), d(price), d("0.15"));
        InvoiceItem {
            id,
            invoice_id: 1,
            source: None,
            description: format!("line {id}"),
            quantity: d(qty),
            unit_price: d(price),
            rate_inclusive: a.rate_inclusive,
            amount: a.amount,
            tax_rate: d("0.15"),
            tax_amount: a.tax_amount,
            line_total: a.line_total,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: deleted.then(Utc::now),
        }
    }

    #[test]
    fn line_amounts_round_to_cents() {
        let a = line_amounts(d("1.3"), d("245.50"), d("0.15"));
        assert_eq!(a.amount, d("319.15"));
        assert_eq!(a.tax_amount, d("47.87"));
        assert_eq!(a.line_total, d("367.02"));
        assert_eq!(a.rate_inclusive, d("282.33"));
    }

    #[test]
    fn totals_ignore_deleted_items() {
        let items = vec![
            item(1, "1.5", "200", false),
            item(2, "1", "80", false),
            item(3, "10", "1000", true),
        ];
        let t = invoice_totals(&items, d("100"));
        let expected: Decimal = items[..2].iter().map(|i| i.line_total).sum();
        assert_eq!(t.total_amount, expected);
        assert_eq!(t.subtotal, d("380"));
        assert_eq!(t.tax_total, d("57"));
        assert_eq!(t.balance_due, expected - d("100"));
    }

    #[test]
    fn fully_paid_invoice_becomes_paid() {
        let items = vec![item(1, "1", "100", false)];
        let paid = invoice_totals(&items, d("115"));
        assert_eq!(
            status_after_payment(InvoiceStatus::Pending, &paid),
            InvoiceStatus::Paid
        );
        let partial = invoice_totals(&items, d("50"));
        assert_eq!(
            status_after_payment(InvoiceStatus::Pending, &partial),
            InvoiceStatus::Pending
        );
        let empty = invoice_totals(&[], Decimal::ZERO);
        assert_eq!(
            status_after_payment(InvoiceStatus::Draft, &empty),
            InvoiceStatus::Draft
        );
    }

    #[test]
    fn invoice_numbers_are_zero_padded() {
        assert_eq!(invoice_number("INV", 42), "INV-000042");
    }

    #[test]
    fn flight_charges_split_dual_and_solo() {
        let aircraft = HourlyCharge {
            id: 3,
            label: "ZK-ABC".into(),
            hourly_rate: d("250"),
        };
        let instructor = HourlyCharge {
            id: 7,
            label: "Jo Smith".into(),
            hourly_rate: d("90"),
        };
        let times = FlightTimes {
            hobbs_time: Some(d("2")),
            tacho_time: None,
            airswitch_time: None,
            billing_hours: d("2"),
            dual_time: d("0.8"),
            solo_time: d("1.2"),
            credited_hours: d("2"),
        };
        let items = flight_charges(&aircraft, Some(&instructor), &times);
        let sources: Vec<_> = items.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, ["aircraft:3:dual", "aircraft:3:solo", "instructor:7"]);
        assert_eq!(items[2].quantity, d("0.8"));

        let solo_only = FlightTimes {
            dual_time: Decimal::ZERO,
            solo_time: d("2"),
            ..times
        };
        let items = flight_charges(&aircraft, Some(&instructor), &solo_only);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source, "aircraft:3:solo");
    }
}
