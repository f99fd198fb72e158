//! Derived market statistics for one (item, region) pair.
//!
//! Everything here is a pure function of the input observations: no hidden
//! state, deterministic, safe to recompute or cache. Prices stay in
//! [`Decimal`]; dispersion and heuristic scores that need `sqrt`/`log10`
//! are computed in `f64`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{RegionId, TypeId};
use super::observation::{MarketObservation, ObservationWindow, OrderSide};

/// Statistics derived from a window of observations.
///
/// Not persisted by the core: recomputed on demand and, when cached, cached
/// as an ordinary snapshot payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatistics {
    pub type_id: TypeId,
    pub region: RegionId,
    pub window: ObservationWindow,
    pub order_count: usize,
    pub buy_order_count: usize,
    pub sell_order_count: usize,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub median_price: Decimal,
    pub mean_price: Decimal,
    /// Population standard deviation of prices.
    pub std_deviation: f64,
    /// Coefficient of variation: `std_deviation / mean_price`.
    pub volatility: f64,
    /// OLS slope of price against elapsed days, in price units per day.
    pub trend_slope: f64,
    /// Units still open across all observations.
    pub total_volume: u64,
    pub average_daily_volume: f64,
    /// ISK value of the open volume (`Σ price × volume_remaining`).
    pub total_isk_volume: Decimal,
    pub average_daily_isk_volume: Decimal,
    /// `log10(mean_volume_per_order + 1) × log10(order_count + 1)`,
    /// clamped to `[0, 100]`.
    pub liquidity_score: f64,
}

impl MarketStatistics {
    /// Zero-valued result for an empty window. Carries only the
    /// identifying keys; an empty market is an answer, not an error.
    #[must_use]
    pub fn empty(type_id: TypeId, region: RegionId, window: ObservationWindow) -> Self {
        Self {
            type_id,
            region,
            window,
            order_count: 0,
            buy_order_count: 0,
            sell_order_count: 0,
            min_price: Decimal::ZERO,
            max_price: Decimal::ZERO,
            median_price: Decimal::ZERO,
            mean_price: Decimal::ZERO,
            std_deviation: 0.0,
            volatility: 0.0,
            trend_slope: 0.0,
            total_volume: 0,
            average_daily_volume: 0.0,
            total_isk_volume: Decimal::ZERO,
            average_daily_isk_volume: Decimal::ZERO,
            liquidity_score: 0.0,
        }
    }
}

/// Compute statistics over `observations`, assumed ordered by recording
/// time and scoped to one (item, region) pair within `window`.
#[must_use]
pub fn compute(
    type_id: TypeId,
    region: RegionId,
    window: ObservationWindow,
    observations: &[MarketObservation],
) -> MarketStatistics {
    if observations.is_empty() {
        return MarketStatistics::empty(type_id, region, window);
    }

    let order_count = observations.len();
    let buy_order_count = observations
        .iter()
        .filter(|o| o.side == OrderSide::Buy)
        .count();
    let sell_order_count = order_count - buy_order_count;

    let prices: Vec<Decimal> = observations.iter().map(|o| o.price).collect();
    let mut min_price = prices[0];
    let mut max_price = prices[0];
    let mut price_sum = Decimal::ZERO;
    for price in &prices {
        min_price = min_price.min(*price);
        max_price = max_price.max(*price);
        price_sum += *price;
    }
    let mean_price = price_sum / Decimal::from(order_count as u64);
    let median_price = median(&prices);

    let float_prices: Vec<f64> = prices.iter().map(decimal_to_f64).collect();
    let float_mean = float_prices.iter().sum::<f64>() / order_count as f64;
    let std_deviation = population_std_dev(&float_prices, float_mean);
    let volatility = if float_mean == 0.0 {
        0.0
    } else {
        std_deviation / float_mean
    };

    let trend_slope = trend(observations, &float_prices);

    let total_volume: u64 = observations.iter().map(|o| o.volume_remaining).sum();
    let total_isk_volume: Decimal = observations.iter().map(MarketObservation::isk_remaining).sum();
    let days = window.days();
    let average_daily_volume = total_volume as f64 / days as f64;
    let average_daily_isk_volume = total_isk_volume / Decimal::from(days);

    let liquidity_score = liquidity(total_volume, order_count);

    MarketStatistics {
        type_id,
        region,
        window,
        order_count,
        buy_order_count,
        sell_order_count,
        min_price,
        max_price,
        median_price,
        mean_price,
        std_deviation,
        volatility,
        trend_slope,
        total_volume,
        average_daily_volume,
        total_isk_volume,
        average_daily_isk_volume,
        liquidity_score,
    }
}

/// Exact middle for an odd count, mean of the two middle values for an
/// even count. No interpolation.
fn median(prices: &[Decimal]) -> Decimal {
    let mut sorted = prices.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / Decimal::TWO
    }
}

/// Population standard deviation (divide by N, not N - 1).
fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// OLS slope of price against elapsed days since the first observation.
///
/// Needs at least two points; a window where every observation shares one
/// timestamp has zero time variance and reports slope 0 rather than NaN.
fn trend(observations: &[MarketObservation], float_prices: &[f64]) -> f64 {
    let n = observations.len();
    if n < 2 {
        return 0.0;
    }

    let t0 = observations[0].recorded_at;
    let xs: Vec<f64> = observations
        .iter()
        .map(|o| (o.recorded_at - t0).num_seconds() as f64 / 86_400.0)
        .collect();

    let x_mean = xs.iter().sum::<f64>() / n as f64;
    let y_mean = float_prices.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut x_variance = 0.0;
    for (x, y) in xs.iter().zip(float_prices) {
        covariance += (x - x_mean) * (y - y_mean);
        x_variance += (x - x_mean).powi(2);
    }
    if x_variance == 0.0 {
        return 0.0;
    }
    covariance / x_variance
}

/// Combined size-and-frequency score, clamped to `[0, 100]`.
fn liquidity(total_volume: u64, order_count: usize) -> f64 {
    if order_count == 0 {
        return 0.0;
    }
    let mean_volume_per_order = total_volume as f64 / order_count as f64;
    let score = (mean_volume_per_order + 1.0).log10() * (order_count as f64 + 1.0).log10();
    score.clamp(0.0, 100.0)
}

fn decimal_to_f64(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::id::LocationId;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap()
    }

    fn obs(price: Decimal, volume_remaining: u64, recorded_at: DateTime<Utc>) -> MarketObservation {
        MarketObservation {
            type_id: TypeId::new(34),
            region: RegionId::new(10_000_002),
            side: OrderSide::Sell,
            price,
            volume: volume_remaining * 2,
            volume_remaining,
            issued_at: recorded_at,
            recorded_at,
            location: Some(LocationId::new(60_003_760)),
        }
    }

    fn week_window() -> ObservationWindow {
        ObservationWindow::new(day(1), day(7))
    }

    fn compute_week(observations: &[MarketObservation]) -> MarketStatistics {
        compute(
            TypeId::new(34),
            RegionId::new(10_000_002),
            week_window(),
            observations,
        )
    }

    #[test]
    fn empty_input_yields_zeroed_result() {
        let stats = compute_week(&[]);
        assert_eq!(stats.order_count, 0);
        assert_eq!(stats.mean_price, Decimal::ZERO);
        assert_eq!(stats.median_price, Decimal::ZERO);
        assert_eq!(stats.liquidity_score, 0.0);
        assert_eq!(stats.type_id, TypeId::new(34));
    }

    #[test]
    fn median_odd_count_takes_exact_middle() {
        let observations = vec![
            obs(dec!(30), 10, day(1)),
            obs(dec!(10), 10, day(2)),
            obs(dec!(20), 10, day(3)),
        ];
        assert_eq!(compute_week(&observations).median_price, dec!(20));
    }

    #[test]
    fn median_even_count_averages_two_middles() {
        let observations = vec![
            obs(dec!(10), 10, day(1)),
            obs(dec!(40), 10, day(2)),
            obs(dec!(20), 10, day(3)),
            obs(dec!(30), 10, day(4)),
        ];
        assert_eq!(compute_week(&observations).median_price, dec!(25));
    }

    #[test]
    fn mean_min_max_over_mixed_prices() {
        let observations = vec![
            obs(dec!(4.00), 10, day(1)),
            obs(dec!(5.00), 10, day(2)),
            obs(dec!(6.00), 10, day(3)),
        ];
        let stats = compute_week(&observations);
        assert_eq!(stats.min_price, dec!(4.00));
        assert_eq!(stats.max_price, dec!(6.00));
        assert_eq!(stats.mean_price, dec!(5.00));
    }

    #[test]
    fn std_dev_uses_population_formula() {
        // Prices 2 and 4: mean 3, population variance 1, std dev 1.
        let observations = vec![obs(dec!(2), 10, day(1)), obs(dec!(4), 10, day(2))];
        let stats = compute_week(&observations);
        assert!((stats.std_deviation - 1.0).abs() < 1e-9);
    }

    #[test]
    fn volatility_zero_when_mean_price_zero() {
        let observations = vec![obs(dec!(0), 10, day(1)), obs(dec!(0), 10, day(2))];
        let stats = compute_week(&observations);
        assert_eq!(stats.volatility, 0.0);
    }

    #[test]
    fn trend_positive_on_rising_series() {
        let observations = vec![
            obs(dec!(10), 10, day(1)),
            obs(dec!(12), 10, day(2)),
            obs(dec!(14), 10, day(3)),
        ];
        let slope = compute_week(&observations).trend_slope;
        assert!((slope - 2.0).abs() < 1e-9, "slope was {slope}");
    }

    #[test]
    fn trend_negative_on_falling_series() {
        let observations = vec![
            obs(dec!(14), 10, day(1)),
            obs(dec!(12), 10, day(2)),
            obs(dec!(10), 10, day(3)),
        ];
        assert!(compute_week(&observations).trend_slope < 0.0);
    }

    #[test]
    fn trend_zero_on_constant_series() {
        let observations = vec![
            obs(dec!(10), 10, day(1)),
            obs(dec!(10), 10, day(2)),
            obs(dec!(10), 10, day(3)),
        ];
        assert_eq!(compute_week(&observations).trend_slope, 0.0);
    }

    #[test]
    fn trend_zero_when_all_timestamps_equal() {
        let observations = vec![obs(dec!(10), 10, day(1)), obs(dec!(20), 10, day(1))];
        assert_eq!(compute_week(&observations).trend_slope, 0.0);
    }

    #[test]
    fn trend_zero_with_single_point() {
        let observations = vec![obs(dec!(10), 10, day(1))];
        assert_eq!(compute_week(&observations).trend_slope, 0.0);
    }

    #[test]
    fn liquidity_stays_within_bounds() {
        let thin = vec![obs(dec!(5), 1, day(1))];
        let deep: Vec<_> = (0..200)
            .map(|i| obs(dec!(5), 1_000_000, day(1 + i % 7)))
            .collect();

        let thin_score = compute_week(&thin).liquidity_score;
        let deep_score = compute_week(&deep).liquidity_score;

        assert!((0.0..=100.0).contains(&thin_score));
        assert!((0.0..=100.0).contains(&deep_score));
        assert!(deep_score > thin_score);
    }

    #[test]
    fn daily_averages_divide_by_window_days() {
        // Seven calendar days spanned (day 1 through day 7).
        let observations = vec![obs(dec!(2.00), 700, day(1)), obs(dec!(2.00), 0, day(7))];
        let stats = compute_week(&observations);
        assert_eq!(stats.total_volume, 700);
        assert!((stats.average_daily_volume - 100.0).abs() < 1e-9);
        assert_eq!(stats.total_isk_volume, dec!(1400.00));
        assert_eq!(stats.average_daily_isk_volume, dec!(200));
    }

    #[test]
    fn buy_sell_split_counts_sides() {
        let mut observations = vec![obs(dec!(5), 10, day(1)), obs(dec!(5), 10, day(2))];
        observations[0].side = OrderSide::Buy;
        let stats = compute_week(&observations);
        assert_eq!(stats.buy_order_count, 1);
        assert_eq!(stats.sell_order_count, 1);
    }
}
