use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;

/// Event time in milliseconds since epoch.
pub type EventTime = i64;

/// Minimum possible event time. Used as the "nothing observed yet" sentinel.
pub const EVENT_TIME_MIN: EventTime = i64::MIN;

/// Whether a record books revenue or reverses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    New,
    Return,
}

impl OrderType {
    /// Sign applied to quantities and costs of this order type.
    pub fn sign(self) -> i64 {
        match self {
            OrderType::New => 1,
            OrderType::Return => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::New => "NEW",
            OrderType::Return => "RETURN",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated order line.
///
/// `quantity` and `total_cost` carry the sign of `order_type`: positive for
/// [`OrderType::New`], negative for [`OrderType::Return`]. Construct through
/// [`OrderEvent::new`] so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub invoice_id: String,
    pub country: String,
    pub timestamp: EventTime,
    pub order_type: OrderType,
    pub sku: String,
    pub title: String,
    pub unit_price: Decimal,
    pub quantity: i64,
    pub total_cost: Decimal,
}

impl OrderEvent {
    /// Build an event from an unsigned quantity, applying the order-type sign
    /// and deriving `total_cost`. Fails if `unit_price * quantity` does not
    /// fit a `Decimal`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_id: impl Into<String>,
        country: impl Into<String>,
        timestamp: EventTime,
        order_type: OrderType,
        sku: impl Into<String>,
        title: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<Self, NormalizeError> {
        let quantity = i64::from(quantity) * order_type.sign();
        let total_cost = unit_price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| {
                NormalizeError::malformed(format!(
                    "total cost of {unit_price} x {quantity} is out of range"
                ))
            })?;
        Ok(Self {
            invoice_id: invoice_id.into(),
            country: country.into(),
            timestamp,
            order_type,
            sku: sku.into(),
            title: title.into(),
            unit_price,
            quantity,
            total_cost,
        })
    }

    pub fn is_order(&self) -> bool {
        self.order_type == OrderType::New
    }

    pub fn is_return(&self) -> bool {
        self.order_type == OrderType::Return
    }

    /// Item count of this line regardless of direction.
    pub fn item_count(&self) -> u64 {
        self.quantity.unsigned_abs()
    }
}

/// Convert an event time to a UTC instant, saturating at the representable range.
pub fn to_utc(ts: EventTime) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whole milliseconds in `d`, clamped to `i64::MAX`.
pub fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// Current processing time in milliseconds since epoch.
pub fn now_millis() -> EventTime {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
