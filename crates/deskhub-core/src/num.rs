//! Rounding shared by stats and weather output.

/// Round to one decimal place, half away from zero.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round to the nearest integer, half away from zero.
pub fn round_i64(v: f64) -> i64 {
    v.round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_decimal() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(round1(3.6 * 4.1), 14.8);
        assert_eq!(round1(66.666), 66.7);
    }

    #[test]
    fn halves_round_away_from_zero() {
        assert_eq!(round_i64(2.5), 3);
        assert_eq!(round_i64(-2.5), -3);
        assert_eq!(round_i64(14.49), 14);
    }
}
