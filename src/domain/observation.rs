//! Raw market observations, the input to the statistics engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{LocationId, RegionId, TypeId};

/// Which side of the book an order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One buy/sell order snapshot for an (item, region) pair.
///
/// Immutable once recorded; a bounded window of these per pair feeds
/// [`crate::domain::statistics::compute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketObservation {
    pub type_id: TypeId,
    pub region: RegionId,
    pub side: OrderSide,
    pub price: Decimal,
    /// Units originally entered on the order.
    pub volume: u64,
    /// Units still open when the snapshot was taken.
    pub volume_remaining: u64,
    /// When the order was placed upstream.
    pub issued_at: DateTime<Utc>,
    /// When this snapshot was recorded locally.
    pub recorded_at: DateTime<Utc>,
    pub location: Option<LocationId>,
}

impl MarketObservation {
    /// ISK value of the open remainder.
    #[must_use]
    pub fn isk_remaining(&self) -> Decimal {
        self.price * Decimal::from(self.volume_remaining)
    }
}

/// Closed time window `[from, to]` a statistics query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ObservationWindow {
    #[must_use]
    pub const fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Window ending at `to` and reaching `days` back.
    #[must_use]
    pub fn trailing_days(to: DateTime<Utc>, days: i64) -> Self {
        Self {
            from: to - chrono::Duration::days(days),
            to,
        }
    }

    /// Calendar days the window spans, never less than 1.
    ///
    /// A same-day window still represents one day of trading, so daily
    /// averages divide by at least 1.
    #[must_use]
    pub fn days(&self) -> i64 {
        ((self.to - self.from).num_days() + 1).max(1)
    }

    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.from <= t && t <= self.to
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn zero_length_window_counts_one_day() {
        let t = at(10, 12);
        assert_eq!(ObservationWindow::new(t, t).days(), 1);
    }

    #[test]
    fn week_window_counts_eight_calendar_days() {
        // Seven elapsed days plus the starting day.
        let window = ObservationWindow::new(at(3, 0), at(10, 0));
        assert_eq!(window.days(), 8);
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let window = ObservationWindow::new(at(3, 0), at(10, 0));
        assert!(window.contains(at(3, 0)));
        assert!(window.contains(at(10, 0)));
        assert!(!window.contains(at(10, 1)));
    }

    #[test]
    fn isk_remaining_scales_price_by_open_volume() {
        let obs = MarketObservation {
            type_id: TypeId::new(34),
            region: RegionId::new(10_000_002),
            side: OrderSide::Sell,
            price: dec!(5.25),
            volume: 1_000,
            volume_remaining: 400,
            issued_at: at(9, 8),
            recorded_at: at(9, 9),
            location: Some(LocationId::new(60_003_760)),
        };
        assert_eq!(obs.isk_remaining(), dec!(2100.00));
    }
}
