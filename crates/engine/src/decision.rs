use common::OrderSide;

/// Relative move against the reference price that triggers an order.
pub const CHANGE_THRESHOLD: f64 = 0.01;

/// Outcome of one price comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Buy,
    Sell,
    Hold,
}

/// Fractional change from `last` to `current`.
pub fn price_change(last: f64, current: f64) -> f64 {
    (current - last) / last
}

impl Decision {
    /// Sell into a rise, buy into a drop. Both comparisons are strict, so a
    /// move of exactly `threshold` holds. A NaN change also holds.
    pub fn evaluate(change: f64, threshold: f64) -> Self {
        if change > threshold {
            Decision::Sell
        } else if change < -threshold {
            Decision::Buy
        } else {
            Decision::Hold
        }
    }

    pub fn side(self) -> Option<OrderSide> {
        match self {
            Decision::Buy => Some(OrderSide::Buy),
            Decision::Sell => Some(OrderSide::Sell),
            Decision::Hold => None,
        }
    }

    /// Text stored as `last_action` and in the trade record.
    pub fn label(self, price: f64) -> String {
        match self {
            Decision::Sell => format!("Sold at ${price}"),
            Decision::Buy => format!("Bought at ${price}"),
            Decision::Hold => "HOLD".to_string(),
        }
    }

    /// Running-sum profit contribution: sells add notional, buys subtract it.
    pub fn profit_delta(self, size: f64, price: f64) -> f64 {
        match self {
            Decision::Sell => size * price,
            Decision::Buy => -(size * price),
            Decision::Hold => 0.0,
        }
    }
}
