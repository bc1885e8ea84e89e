//! Decimal rounding.

/// Round to `decimals` places using round-half-to-even.
///
/// Half-to-even matches the rounding used by common dataframe tooling, so
/// exported values line up with datasets produced elsewhere.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}
