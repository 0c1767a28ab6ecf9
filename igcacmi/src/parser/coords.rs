//! Coordinate and time conversion
//!
//! IGC stores positions as degrees plus thousandths of a minute, and times as
//! wall-clock `HHMMSS`. ACMI wants decimal degrees and integer second offsets
//! from a reference time.
//!
//! Decimal degrees are held as an integer count of 1e-5 degrees, which is the
//! precision ceiling of an IGC fix. The conversion is exact integer arithmetic:
//! `total_thousandths * 100_000 / 60_000` reduces to `total * 5 / 3`, so the
//! rounding step can never land on a tie. Rounding is half away from zero.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

/// Seconds in one day; every offset is kept below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Decimal degrees at 5 fractional digits of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Coordinate(i64);

impl Coordinate {
    pub fn e5(self) -> i64 {
        self.0
    }

    /// Split back into whole degrees and minutes (with fraction).
    pub fn to_degrees_minutes(self) -> (u32, f64) {
        let abs = self.0.unsigned_abs();
        let whole = (abs / 100_000) as u32;
        let frac = (abs % 100_000) as f64 / 100_000.0;
        (whole, frac * 60.0)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Coordinate {
    /// Shortest form with one to five fraction digits: `45.5`, `7.0`, `-0.12345`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        let whole = abs / 100_000;
        let frac = format!("{:05}", abs % 100_000);
        let frac = frac.trim_end_matches('0');
        let frac = if frac.is_empty() { "0" } else { frac };
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{}", sign, whole, frac)
    }
}

/// Convert an IGC degrees/minutes pair to decimal degrees.
///
/// `minutes_thousandths` is the raw 5-digit IGC minutes field (`MMmmm`, an
/// implicit decimal point after the second digit). The sign is applied to the
/// whole value, so a southern `12 30.000` becomes `-12.5`.
pub fn dm_to_decimal_degrees(degrees: u32, minutes_thousandths: u32, negative: bool) -> Coordinate {
    let total = degrees as i64 * 60_000 + minutes_thousandths as i64;
    // round(total * 5 / 3) == floor((10 * total + 3) / 6) for total >= 0
    let magnitude = (10 * total + 3) / 6;
    Coordinate(if negative { -magnitude } else { magnitude })
}

/// Seconds from `reference` forward to `target`, wrapping across midnight.
///
/// A target earlier in the day than the reference is taken to be on the next
/// day, so the result always lies in `[0, 86399]`.
pub fn time_diff_seconds(reference: NaiveTime, target: NaiveTime) -> u32 {
    let delta = target.num_seconds_from_midnight() as i64
        - reference.num_seconds_from_midnight() as i64;
    delta.rem_euclid(SECONDS_PER_DAY as i64) as u32
}
