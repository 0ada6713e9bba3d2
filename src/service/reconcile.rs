//! Matches generated line items against what an invoice already holds.
//!
//! Generated items carry a `source` key (`aircraft:3:dual`, `instructor:7`).
//! Items without a source were added by hand and are never touched here.

use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

use crate::db::models::invoice::InvoiceItem;

#[derive(Debug, Clone, PartialEq)]
pub struct DesiredItem {
    pub source: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemChange {
    Insert(DesiredItem),
    Update { id: i64, item: DesiredItem },
    Delete { id: i64 },
}

/// Produces the changes that turn `existing` into `desired`: deletes first,
/// then updates, then inserts, each in input order.
pub fn reconcile(
    desired: &[DesiredItem],
    existing: &[InvoiceItem],
    tax_rate: Decimal,
) -> Vec<ItemChange> {
    let wanted: HashMap<&str, &DesiredItem> =
        desired.iter().map(|d| (d.source.as_str(), d)).collect();

    let mut deletes = Vec::new();
    let mut updates = Vec::new();
    let mut matched: HashSet<&str> = HashSet::new();

    for item in existing.iter().filter(|i| i.deleted_at.is_none()) {
        let Some(source) = item.source.as_deref() else {
            continue;
        };
        match wanted.get(source) {
            Some(want) if matched.insert(source) => {
                if differs(item, want, tax_rate) {
                    updates.push(ItemChange::Update {
                        id: item.id,
                        item: (*want).clone(),
                    });
                }
            }
            // duplicate of an already matched source, or no longer wanted
            _ => deletes.push(ItemChange::Delete { id: item.id }),
        }
    }

    let inserts = desired
        .iter()
        .filter(|d| !matched.contains(d.source.as_str()))
        .map(|d| ItemChange::Insert(d.clone()));

    deletes.into_iter().chain(updates).chain(inserts).collect()
}

fn differs(item: &InvoiceItem, want: &DesiredItem, tax_rate: Decimal) -> bool {
    item.description != want.description
        || item.quantity != want.quantity
        || item.unit_price != want.unit_price
        || item.tax_rate != tax_rate
}
