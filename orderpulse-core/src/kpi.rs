//! # KPI Calculator
//!
//! Pure mapping from a window's [`Accumulator`] to the exported
//! [`KpiSnapshot`]. The same accumulator always yields the same snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::store::Accumulator;
use crate::types::to_utc;
use crate::window::{Grouping, WindowKey};

/// Decimal places kept for derived monetary averages.
pub const AVERAGE_SCALE: u32 = 2;

/// KPI values for one closed window of one grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub total_sales_count: u64,
    pub total_return_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub net_revenue: Decimal,
    /// Net revenue per NEW order.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_order_value: Decimal,
    pub return_rate: f64,
    pub unique_invoice_count: u64,
    /// Orders plus returns in the window.
    pub event_count: u64,
    pub total_items: u64,
    /// Net revenue per event, orders and returns alike.
    #[serde(with = "rust_decimal::serde::float")]
    pub average_transaction_size: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_unit_price: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_unit_price: Option<Decimal>,
}

impl KpiSnapshot {
    pub fn grouping(&self) -> Grouping {
        if self.country.is_some() {
            Grouping::TimeAndCountry
        } else {
            Grouping::Time
        }
    }
}

/// Compute the snapshot for `key` from its accumulator.
///
/// - `net_revenue = sum_total_cost`
/// - `average_order_value = sum_total_cost / max(count_new, 1)`
/// - `return_rate = count_return / max(count_new + count_return, 1)`
/// - `unique_invoice_count = |distinct invoices|`
pub fn compute(key: &WindowKey, acc: &Accumulator) -> KpiSnapshot {
    let net_revenue = acc.sum_total_cost();
    let orders = acc.count_new().max(1);
    let events = acc.event_count().max(1);

    KpiSnapshot {
        window_start: to_utc(key.window_start()),
        window_end: to_utc(key.window_end()),
        country: key.country.clone(),
        total_sales_count: acc.count_new(),
        total_return_count: acc.count_return(),
        net_revenue,
        average_order_value: average(net_revenue, orders),
        return_rate: acc.count_return() as f64 / events as f64,
        unique_invoice_count: acc.unique_invoice_count(),
        event_count: acc.event_count(),
        total_items: acc.total_items(),
        average_transaction_size: average(net_revenue, events),
        min_unit_price: acc.min_unit_price(),
        max_unit_price: acc.max_unit_price(),
    }
}

fn average(total: Decimal, count: u64) -> Decimal {
    (total / Decimal::from(count))
        .round_dp_with_strategy(AVERAGE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
#[path = "tests/kpi_tests.rs"]
mod tests;
