//! Block power estimation
//!
//! One capture block of raw i16 samples becomes one decibel reading:
//! `10 * log10(mean(x^2))`, with everything below a mean power of 1.0
//! pinned to 0.0 dB. Samples are widened but not rescaled, so full scale
//! sits at ~90.3 dB.

/// Mean power below this value is reported as the silence floor
pub const SILENCE_FLOOR_POWER: f64 = 1.0;

/// Mean of squared samples over the block
pub fn mean_square(block: &[i16]) -> f64 {
    if block.is_empty() {
        return 0.0;
    }

    let sum: f64 = block
        .iter()
        .map(|&s| {
            let x = s as f64;
            x * x
        })
        .sum();

    sum / block.len() as f64
}

/// Power of one block in dB, rounded to tenths
pub fn block_power_db(block: &[i16]) -> f64 {
    let mean_sq = mean_square(block);

    let db = if mean_sq >= SILENCE_FLOOR_POWER {
        10.0 * mean_sq.log10()
    } else {
        0.0
    };

    round_tenths(db)
}

/// Round to one decimal digit.
///
/// Goes through the `{:.1}` text so the stored value formats to exactly the
/// digit that formatting the unrounded value would give (ties to even on the
/// exact binary value, no multiply error).
pub fn round_tenths(value: f64) -> f64 {
    format_reading(value).parse().unwrap_or(value)
}

/// Wire text for a reading (`42.3`)
pub fn format_reading(value: f64) -> String {
    format!("{:.1}", value)
}
