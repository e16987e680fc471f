use super::*;
use crate::types::{OrderEvent, OrderType};
use crate::window::TimeWindow;

const MINUTE: i64 = 60_000;

fn key() -> WindowKey {
    WindowKey::time(TimeWindow::new(0, 10 * MINUTE))
}

fn event(invoice: &str, order_type: OrderType, price_cents: i64, qty: u32) -> OrderEvent {
    OrderEvent::new(invoice, "US", MINUTE, order_type, "sku", "t", Decimal::new(price_cents, 2), qty).unwrap()
}

#[test]
fn test_order_and_return_in_one_window() {
    let mut acc = Accumulator::new();
    acc.add(&event("inv-1", OrderType::New, 500, 2)).unwrap();
    acc.add(&event("inv-2", OrderType::Return, 500, 1)).unwrap();

    let kpi = compute(&key(), &acc);
    assert_eq!(kpi.net_revenue, Decimal::new(500, 2));
    assert_eq!(kpi.return_rate, 0.5);
    assert_eq!(kpi.total_sales_count, 1);
    assert_eq!(kpi.total_return_count, 1);
    assert_eq!(kpi.average_order_value, Decimal::new(500, 2));
    assert_eq!(kpi.average_transaction_size, Decimal::new(250, 2));
    assert_eq!(kpi.unique_invoice_count, 2);
    assert_eq!(kpi.event_count, 2);
    assert_eq!(kpi.total_items, 3);
    assert_eq!(kpi.window_start.timestamp_millis(), 0);
    assert_eq!(kpi.window_end.timestamp_millis(), 10 * MINUTE);
    assert_eq!(kpi.grouping(), Grouping::Time);
}

#[test]
fn test_only_returns_does_not_divide_by_zero() {
    let mut acc = Accumulator::new();
    acc.add(&event("inv-1", OrderType::Return, 300, 1)).unwrap();

    let kpi = compute(&key(), &acc);
    assert_eq!(kpi.net_revenue, Decimal::new(-300, 2));
    assert_eq!(kpi.average_order_value, Decimal::new(-300, 2));
    assert_eq!(kpi.return_rate, 1.0);
}

#[test]
fn test_empty_accumulator_yields_zeros() {
    let kpi = compute(&key(), &Accumulator::new());
    assert!(kpi.net_revenue.is_zero());
    assert!(kpi.average_order_value.is_zero());
    assert_eq!(kpi.return_rate, 0.0);
    assert_eq!(kpi.unique_invoice_count, 0);
    assert_eq!(kpi.min_unit_price, None);
}

#[test]
fn test_average_is_rounded_to_cents() {
    let mut acc = Accumulator::new();
    for invoice in ["a", "b", "c"] {
        acc.add(&event(invoice, OrderType::New, 100, 1)).unwrap();
    }
    acc.add(&event("d", OrderType::New, 0, 1)).unwrap();
    acc.add(&event("e", OrderType::New, 0, 1)).unwrap();
    acc.add(&event("f", OrderType::New, 0, 1)).unwrap();
    // 3.00 / 6 = 0.50
    assert_eq!(compute(&key(), &acc).average_order_value, Decimal::new(50, 2));

    let mut acc = Accumulator::new();
    acc.add(&event("a", OrderType::New, 1000, 1)).unwrap();
    acc.add(&event("b", OrderType::New, 0, 1)).unwrap();
    acc.add(&event("c", OrderType::New, 0, 1)).unwrap();
    // 10.00 / 3 = 3.333.. -> 3.33
    assert_eq!(compute(&key(), &acc).average_order_value, Decimal::new(333, 2));
}

#[test]
fn test_compute_is_idempotent() {
    let mut acc = Accumulator::new();
    acc.add(&event("inv-1", OrderType::New, 1234, 3)).unwrap();
    acc.add(&event("inv-2", OrderType::Return, 99, 2)).unwrap();
    assert_eq!(compute(&key(), &acc), compute(&key(), &acc));
}

#[test]
fn test_country_key_carries_country() {
    let key = WindowKey::time_and_country(TimeWindow::new(0, 10 * MINUTE), "DE");
    let mut acc = Accumulator::new();
    acc.add(&event("inv-1", OrderType::New, 100, 1)).unwrap();
    let kpi = compute(&key, &acc);
    assert_eq!(kpi.country.as_deref(), Some("DE"));
    assert_eq!(kpi.grouping(), Grouping::TimeAndCountry);
}

#[test]
fn test_serialized_field_names() {
    let mut acc = Accumulator::new();
    acc.add(&event("inv-1", OrderType::New, 500, 2)).unwrap();
    let json = serde_json::to_value(compute(&key(), &acc)).unwrap();
    for field in [
        "window_start",
        "window_end",
        "total_sales_count",
        "total_return_count",
        "net_revenue",
        "average_order_value",
        "return_rate",
        "unique_invoice_count",
    ] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    assert!(json.get("country").is_none());
    assert_eq!(json["net_revenue"], serde_json::json!(10.0));
    assert_eq!(json["window_start"], serde_json::json!("1970-01-01T00:00:00Z"));
}
