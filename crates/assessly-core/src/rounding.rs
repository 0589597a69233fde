//! Half-band rounding for overall essay scores.

/// Round to the nearest multiple of 0.5, with ties going up.
///
/// `5.24 -> 5.0`, `5.25 -> 5.5`, `5.75 -> 6.0`.
pub fn round_to_half(value: f64) -> f64 {
    let doubled = value * 2.0;
    let fraction = doubled - doubled.trunc();

    let rounded = if fraction >= 0.5 {
        doubled.ceil()
    } else {
        doubled.floor()
    };

    rounded / 2.0
}
