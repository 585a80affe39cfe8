//! "Nice" numbers for axis bounds and bin spacing.
//!
//! Nice numbers are `1`, `2` or `5` times a power of ten.

/// Rounds a positive span to a nice number.
///
/// With `round` the closest nice number is returned, otherwise the smallest nice number that is
/// not below `span`. Non-positive or non-finite spans are returned unchanged.
pub fn nice_number(span: f64, round: bool) -> f64 {
    if !span.is_finite() || span <= 0.0 {
        return span;
    }

    let exponent = span.log10().floor();
    let magnitude = 10f64.powf(exponent);
    let fraction = span / magnitude;

    let nice = if round {
        match fraction {
            f if f < 1.5 => 1.0,
            f if f < 3.0 => 2.0,
            f if f < 7.0 => 5.0,
            _ => 10.0,
        }
    } else {
        match fraction {
            f if f <= 1.0 => 1.0,
            f if f <= 2.0 => 2.0,
            f if f <= 5.0 => 5.0,
            _ => 10.0,
        }
    };

    nice * magnitude
}

/// The smallest nice number that is greater than or equal to `value`.
pub fn nice_ceil(value: f64) -> f64 {
    nice_number(value, false)
}

/// Computes a nice lower bound and bin spacing covering `[min, max]` with `bins` bins.
///
/// Returns a spacing of `0` if the range is empty.
pub fn nice_steps(min: f64, max: f64, bins: usize) -> (f64, f64) {
    let span = nice_number(max - min, false);
    if span <= 0.0 || !span.is_finite() {
        return (min, 0.0);
    }

    let spacing = nice_number(span / bins.saturating_sub(1).max(1) as f64, true);
    let minimum = (min / spacing).floor() * spacing;
    (minimum, spacing)
}
