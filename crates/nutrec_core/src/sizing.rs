//! Equipment counts.
//!
//! Counts always round up: a fractional tank still needs a whole tank.

/// Whole units of `capacity` needed to hold `required`.
///
/// Zero, negative and NaN requirements need no units.
#[must_use]
pub fn units_required(required: f64, capacity: f64) -> u64 {
    if required.is_nan() || required <= 0.0 {
        return 0;
    }
    (required / capacity).ceil() as u64
}

/// Tanks holding `storage_days` of urine for a whole toilet fleet (storage-only system)
#[must_use]
pub fn storage_tank_count(
    urine_volume_l: f64,
    units: f64,
    users_per_unit: f64,
    storage_days: f64,
    tank_capacity_l: f64,
) -> u64 {
    let volume = urine_volume_l * units * users_per_unit * storage_days;
    units_required(volume, tank_capacity_l)
}

/// Volume held by community tanks emptied every `days`.
///
/// Day `d` holds `fill * d` of a day's production, summed over the cycle.
#[must_use]
pub fn community_tank_volume(daily_volume_l: f64, days: u32, daily_fill_fraction: f64) -> f64 {
    (1..=days)
        .map(|d| daily_fill_fraction * f64::from(d) * daily_volume_l)
        .sum()
}

/// Leased plots needed for `tanks`
#[must_use]
pub fn land_plots(tanks: u64, tanks_per_plot: u64) -> u64 {
    tanks.div_ceil(tanks_per_plot.max(1))
}
