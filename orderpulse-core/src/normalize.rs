//! # Event Normalizer
//!
//! Turns raw ingestion payloads into validated [`OrderEvent`]s.
//!
//! Two steps:
//! - [`decode_payload`] splits one JSON payload into flat [`RawRecord`]s. An
//!   invoice carrying an `items` array yields one record per line item.
//! - [`normalize`] validates a single record and derives the signed quantity
//!   and `total_cost`.
//!
//! Both are pure; failures are reported as [`NormalizeError`] and never panic.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::types::{EventTime, OrderEvent, OrderType};

/// A raw record: field name -> textual value.
pub type RawRecord = BTreeMap<String, String>;

const INVOICE_ID: &[&str] = &["invoice_id", "invoice_no"];
const COUNTRY: &[&str] = &["country"];
const TIMESTAMP: &[&str] = &["timestamp"];
const ORDER_TYPE: &[&str] = &["order_type", "type"];
const SKU: &[&str] = &["sku", "SKU"];
const TITLE: &[&str] = &["title"];
const UNIT_PRICE: &[&str] = &["unit_price"];
const QUANTITY: &[&str] = &["quantity"];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Decode one ingestion payload into raw records.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<RawRecord>, NormalizeError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| NormalizeError::malformed(format!("invalid json: {e}")))?;
    let mut records = Vec::new();
    decode_value(value, &mut records)?;
    Ok(records)
}

fn decode_value(value: Value, out: &mut Vec<RawRecord>) -> Result<(), NormalizeError> {
    match value {
        Value::Array(elements) => {
            for element in elements {
                decode_value(element, out)?;
            }
            Ok(())
        }
        Value::Object(mut fields) => match fields.remove("items") {
            None => {
                out.push(flatten(fields)?);
                Ok(())
            }
            Some(Value::Array(items)) if !items.is_empty() => {
                let header = flatten(fields)?;
                for item in items {
                    let Value::Object(item_fields) = item else {
                        return Err(NormalizeError::malformed("invoice item is not an object"));
                    };
                    let mut record = header.clone();
                    record.extend(flatten(item_fields)?);
                    out.push(record);
                }
                Ok(())
            }
            Some(_) => Err(NormalizeError::malformed("invoice has no items")),
        },
        other => Err(NormalizeError::malformed(format!(
            "expected a json object, got {other}"
        ))),
    }
}

fn flatten(fields: Map<String, Value>) -> Result<RawRecord, NormalizeError> {
    let mut record = RawRecord::new();
    for (name, value) in fields {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(NormalizeError::malformed(format!(
                    "field `{name}` is not a scalar"
                )));
            }
        };
        record.insert(name, text);
    }
    Ok(record)
}

/// Validate a raw record and build the [`OrderEvent`].
pub fn normalize(record: &RawRecord) -> Result<OrderEvent, NormalizeError> {
    let order_type = parse_order_type(required(record, ORDER_TYPE)?)?;
    let invoice_id = required(record, INVOICE_ID)?;
    let country = required(record, COUNTRY)?;
    let timestamp = parse_timestamp(required(record, TIMESTAMP)?)?;
    let unit_price = parse_unit_price(required(record, UNIT_PRICE)?)?;
    let quantity = parse_quantity(required(record, QUANTITY)?)?;
    let sku = field(record, SKU).unwrap_or_default();
    let title = field(record, TITLE).unwrap_or_default();

    OrderEvent::new(
        invoice_id, country, timestamp, order_type, sku, title, unit_price, quantity,
    )
}

fn field<'a>(record: &'a RawRecord, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| record.get(*name))
        .map(|v| v.trim())
}

fn required<'a>(record: &'a RawRecord, names: &[&str]) -> Result<&'a str, NormalizeError> {
    match field(record, names) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(NormalizeError::malformed(format!(
            "missing field `{}`",
            names[0]
        ))),
    }
}

/// `NEW` and the legacy `ORDER` map to [`OrderType::New`].
pub fn parse_order_type(raw: &str) -> Result<OrderType, NormalizeError> {
    match raw.to_ascii_uppercase().as_str() {
        "NEW" | "ORDER" => Ok(OrderType::New),
        "RETURN" => Ok(OrderType::Return),
        _ => Err(NormalizeError::UnknownOrderType(raw.to_string())),
    }
}

/// Accepts epoch milliseconds, RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` in UTC.
/// Epoch values outside the calendar range of [`DateTime<Utc>`] are malformed.
pub fn parse_timestamp(raw: &str) -> Result<EventTime, NormalizeError> {
    if let Ok(ms) = raw.parse::<i64>() {
        if Utc.timestamp_millis_opt(ms).single().is_none() {
            return Err(NormalizeError::malformed(format!(
                "timestamp `{raw}` is out of range"
            )));
        }
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    Err(NormalizeError::malformed(format!("unparseable timestamp `{raw}`")))
}

fn parse_unit_price(raw: &str) -> Result<Decimal, NormalizeError> {
    let price = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| NormalizeError::malformed(format!("unit_price `{raw}` is not numeric")))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(NormalizeError::malformed(format!(
            "unit_price `{raw}` is negative"
        )));
    }
    Ok(price)
}

/// Quantity magnitude; the sign is applied from the order type.
fn parse_quantity(raw: &str) -> Result<u32, NormalizeError> {
    let quantity: i64 = raw
        .parse()
        .map_err(|_| NormalizeError::malformed(format!("quantity `{raw}` is not an integer")))?;
    if quantity == 0 {
        return Err(NormalizeError::malformed("quantity is zero"));
    }
    u32::try_from(quantity.unsigned_abs())
        .map_err(|_| NormalizeError::malformed(format!("quantity `{raw}` is out of range")))
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
