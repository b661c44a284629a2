//! Rational time bases and presentation timestamps.

use std::fmt::{self, Display, Formatter};

/// A rational number, used for time bases (seconds per tick) and frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Whether this can be used as a time base (non-zero on both sides).
    pub fn is_valid(&self) -> bool {
        self.num != 0 && self.den != 0
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self { num, den }
    }
}

/// One microsecond, the unit pacing arithmetic is done in.
pub const MICROSECONDS: Rational = Rational::new(1, 1_000_000);

/// A presentation timestamp: a tick count in some time base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub value: i64,
    pub time_base: Rational,
}

impl Timestamp {
    pub const fn new(value: i64, time_base: Rational) -> Self {
        Self { value, time_base }
    }

    /// A timestamp that already counts microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self::new(micros, MICROSECONDS)
    }

    /// This timestamp converted to microseconds (see [rescale]).
    pub fn as_micros(&self) -> i64 {
        rescale(self.value, self.time_base, MICROSECONDS)
    }
}

/// Convert `value` ticks of time base `from` into ticks of time base `to`,
/// rounding to the nearest tick with halves rounded away from zero.
///
/// The product is computed in 128 bits so no stream timestamp can overflow it.
/// Results outside of `i64` saturate. Invalid time bases produce `0`.
pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    if !from.is_valid() || !to.is_valid() {
        return 0;
    }

    // value * (from.num / from.den) / (to.num / to.den)
    let mut num = value as i128 * from.num as i128 * to.den as i128;
    let mut den = from.den as i128 * to.num as i128;
    if den < 0 {
        num = -num;
        den = -den;
    }

    let half = den / 2;
    let rounded = if num >= 0 {
        (num + half) / den
    } else {
        (num - half) / den
    };

    rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescale_to_micros() {
        let tb = Rational::new(1, 90_000);
        assert_eq!(rescale(90_000, tb, MICROSECONDS), 1_000_000);
        assert_eq!(rescale(3_003, tb, MICROSECONDS), 33_367);
        assert_eq!(rescale(-3_003, tb, MICROSECONDS), -33_367);
    }

    #[test]
    fn rescale_rounds_half_away_from_zero() {
        let tb = Rational::new(1, 2_000_000);
        assert_eq!(rescale(1, tb, MICROSECONDS), 1);
        assert_eq!(rescale(-1, tb, MICROSECONDS), -1);
        assert_eq!(rescale(2, tb, MICROSECONDS), 1);
    }

    #[test]
    fn rescale_does_not_overflow() {
        let tb = Rational::new(1_001, 24_000);
        assert_eq!(
            rescale(i64::MAX / 2, tb, MICROSECONDS),
            i64::MAX,
            "Out of range results should saturate."
        );
    }

    #[test]
    fn invalid_time_base_is_zero() {
        assert_eq!(rescale(1_000, Rational::new(1, 0), MICROSECONDS), 0);
        assert_eq!(rescale(1_000, Rational::new(0, 1), MICROSECONDS), 0);
    }

    #[test]
    fn timestamp_as_micros() {
        assert_eq!(Timestamp::from_micros(33_000).as_micros(), 33_000);
        assert_eq!(Timestamp::new(3, Rational::new(1, 30)).as_micros(), 100_000);
    }
}
