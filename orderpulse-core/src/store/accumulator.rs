use super::*;

/// Running KPI state for one window.
///
/// Updates are commutative: the final state depends only on the multiset of
/// events added, not on their order. Re-delivered events are counted again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    count_new: u64,
    count_return: u64,
    sum_total_cost: Decimal,
    sum_quantity: i64,
    total_items: u64,
    invoices: AHashSet<String>,
    min_unit_price: Option<Decimal>,
    max_unit_price: Option<Decimal>,
}

struct Totals {
    count: u64,
    sum_total_cost: Decimal,
    sum_quantity: i64,
    total_items: u64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the accumulator. If any running total would
    /// overflow, the accumulator is left unchanged.
    pub fn add(&mut self, event: &OrderEvent) -> Result<(), AggregateOverflow> {
        let totals = self.totals_after(event)?;
        if event.is_return() {
            self.count_return = totals.count;
        } else {
            self.count_new = totals.count;
        }
        self.sum_total_cost = totals.sum_total_cost;
        self.sum_quantity = totals.sum_quantity;
        self.total_items = totals.total_items;
        if !self.invoices.contains(&event.invoice_id) {
            self.invoices.insert(event.invoice_id.clone());
        }
        self.min_unit_price = Some(match self.min_unit_price {
            Some(min) => min.min(event.unit_price),
            None => event.unit_price,
        });
        self.max_unit_price = Some(match self.max_unit_price {
            Some(max) => max.max(event.unit_price),
            None => event.unit_price,
        });
        Ok(())
    }

    /// Fail exactly when [`add`](Self::add) would, without mutating.
    pub fn check(&self, event: &OrderEvent) -> Result<(), AggregateOverflow> {
        self.totals_after(event).map(|_| ())
    }

    fn totals_after(&self, event: &OrderEvent) -> Result<Totals, AggregateOverflow> {
        let count = if event.is_return() {
            self.count_return
        } else {
            self.count_new
        };
        self.checked_totals(count, event)
            .ok_or_else(|| AggregateOverflow {
                invoice_id: event.invoice_id.clone(),
            })
    }

    fn checked_totals(&self, count: u64, event: &OrderEvent) -> Option<Totals> {
        Some(Totals {
            count: count.checked_add(1)?,
            sum_total_cost: self.sum_total_cost.checked_add(event.total_cost)?,
            sum_quantity: self.sum_quantity.checked_add(event.quantity)?,
            total_items: self.total_items.checked_add(event.item_count())?,
        })
    }

    pub fn count_new(&self) -> u64 {
        self.count_new
    }

    pub fn count_return(&self) -> u64 {
        self.count_return
    }

    /// NEW + RETURN events folded so far.
    pub fn event_count(&self) -> u64 {
        self.count_new + self.count_return
    }

    pub fn sum_total_cost(&self) -> Decimal {
        self.sum_total_cost
    }

    /// Signed: returns subtract.
    pub fn sum_quantity(&self) -> i64 {
        self.sum_quantity
    }

    /// Unsigned item count across orders and returns.
    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn unique_invoice_count(&self) -> u64 {
        self.invoices.len() as u64
    }

    pub fn min_unit_price(&self) -> Option<Decimal> {
        self.min_unit_price
    }

    pub fn max_unit_price(&self) -> Option<Decimal> {
        self.max_unit_price
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }
}
