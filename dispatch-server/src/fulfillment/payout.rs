//! Delivery earnings computation using rust_decimal for precision
//!
//! All derived values are calculated with `Decimal` internally and rounded
//! half-up to 2 decimal places at each derived step, then converted to
//! `f64` for storage/serialization.

use chrono::Timelike;
use rust_decimal::prelude::*;
use shared::{EarningsBreakdown, GeoPoint};

use crate::utils::geo::haversine_km;

/// Flat base delivery fee
const BASE_FEE: f64 = 30.0;
/// Bonus per kilometer beyond the free radius
const PER_KM_RATE: f64 = 8.0;
/// Kilometers covered by the base fee alone
const FREE_KM: f64 = 3.0;
/// Multiplier applied to (base + distance bonus) during peak hours
const PEAK_HOUR_MULTIPLIER: f64 = 1.5;
/// Platform commission rate
const COMMISSION_RATE: f64 = 0.15;
/// Assumed distance when either endpoint has no coordinates
pub const DEFAULT_DISTANCE_KM: f64 = 5.0;

/// Peak delivery windows, local time: [12, 14) and [19, 22)
const PEAK_WINDOWS: [(u32, u32); 2] = [(12, 14), (19, 22)];

/// Whether the given local hour falls in a peak window
pub fn is_peak_hour(hour: u32) -> bool {
    PEAK_WINDOWS
        .iter()
        .any(|&(start, end)| hour >= start && hour < end)
}

/// Whether the current local time is a peak hour
pub fn is_peak_now() -> bool {
    is_peak_hour(chrono::Local::now().hour())
}

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Round to 2 decimal places (half-up) and convert back to f64
#[inline]
fn round2(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compute the agent's earnings breakdown for a completed delivery
///
/// - `base_amount` = flat base fee
/// - `distance_bonus` = max(0, distance − 3 km) × per-km rate
/// - `peak_hour_bonus` = (base + distance bonus) × 0.5 during peak hours
/// - `platform_commission` = 15% of the total
/// - `net_amount` = total − commission
pub fn quote(distance_km: f64, peak: bool) -> EarningsBreakdown {
    let base = to_decimal(BASE_FEE);

    let beyond_free = (distance_km - FREE_KM).max(0.0);
    let distance_bonus = to_decimal(beyond_free) * to_decimal(PER_KM_RATE);

    let mut total = base + distance_bonus;
    let peak_bonus = if peak {
        total * to_decimal(PEAK_HOUR_MULTIPLIER - 1.0)
    } else {
        Decimal::ZERO
    };
    total += peak_bonus;

    let commission = total * to_decimal(COMMISSION_RATE);
    let net = total - commission;

    EarningsBreakdown {
        base_amount: round2(base),
        distance_bonus: round2(distance_bonus),
        peak_hour_bonus: round2(peak_bonus),
        total_amount: round2(total),
        platform_commission: round2(commission),
        net_amount: round2(net),
    }
}

/// Delivery distance from pickup/delivery coordinates, falling back to the
/// default when either endpoint is unknown
pub fn delivery_distance_km(pickup: Option<GeoPoint>, delivery: Option<GeoPoint>) -> f64 {
    match (pickup, delivery) {
        (Some(a), Some(b)) => haversine_km(a, b),
        _ => DEFAULT_DISTANCE_KM,
    }
}
