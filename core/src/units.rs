//! Enhetskonvertering mellom FIT-enheter og helselagerets enheter.
//!
//! Høyde, fart, effekt, kalorier og distanse kommer allerede i riktige
//! enheter; bare koordinatene må skaleres.

/// Semicircles per grad, slik enhetens koordinatsystem bruker dem.
pub const SEMICIRCLE_DIVISOR: f64 = 11_930_465.0;

#[inline]
pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    semicircles as f64 / SEMICIRCLE_DIVISOR
}

#[inline]
pub fn degrees_to_semicircles(degrees: f64) -> f64 {
    degrees * SEMICIRCLE_DIVISOR
}

#[inline]
pub fn mps_to_kmh(meters_per_second: f64) -> f64 {
    meters_per_second * 3.6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descale_rescale_recovers_integer() {
        for raw in [0, 1, -1, 714_206_015, -1_073_741_824, i32::MAX, i32::MIN] {
            let back = degrees_to_semicircles(semicircles_to_degrees(raw));
            assert!((back - raw as f64).abs() < 1e-5, "raw={raw} back={back}");
            assert_eq!(back.round() as i64, raw as i64);
        }
    }

    #[test]
    fn quarter_turn_is_roughly_ninety_degrees() {
        // 2^30 semicircles = 90° i den eksakte kodingen
        let deg = semicircles_to_degrees(1 << 30);
        assert!((deg - 90.0).abs() < 0.01, "deg={deg}");
    }
}
