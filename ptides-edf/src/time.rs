/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Fixed-point time arithmetic.
//!
//! Three value types model the two notions of time the director juggles:
//!
//! ```text
//! physical clock ──► Time        {secs, nsecs}      platform real time, deadlines
//! logical time   ──► Tag         {Time, microstep}  superdense event timestamp
//! latency budget ──► SignedTime  ±nanoseconds       per-actor offset
//! ```
//!
//! `Time` keeps the invariant `nsecs < 1_000_000_000` in every constructor and
//! operation, so the derived lexicographic `Ord` on `(secs, nsecs)` is the
//! correct time comparison.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Add;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Nanoseconds per second; `Time::nsecs` is always strictly below this.
pub const NSECS_PER_SEC: u32 = 1_000_000_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Subtraction `a − b` would be negative (`a < b`).
///
/// Carries both operands so the caller can log a useful message before
/// deciding its own policy (clamp, trap, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnderflow {
    pub minuend: Time,
    pub subtrahend: Time,
}

impl fmt::Display for TimeUnderflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "time underflow computing {} - {}",
            self.minuend, self.subtrahend
        )
    }
}

impl std::error::Error for TimeUnderflow {}

// ── Time ──────────────────────────────────────────────────────────────────────

/// Unsigned seconds + nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time {
    secs: u32,
    nsecs: u32,
}

impl Time {
    pub const ZERO: Time = Time { secs: 0, nsecs: 0 };

    /// Largest representable time.  Used as the "nothing armed" sentinel.
    pub const MAX: Time = Time {
        secs: u32::MAX,
        nsecs: NSECS_PER_SEC - 1,
    };

    /// Build a time, carrying any excess nanoseconds into the seconds field.
    ///
    /// Saturates at [`Time::MAX`].
    pub fn new(secs: u32, nsecs: u32) -> Self {
        let carry = nsecs / NSECS_PER_SEC;
        match secs.checked_add(carry) {
            Some(secs) => Time {
                secs,
                nsecs: nsecs % NSECS_PER_SEC,
            },
            None => Time::MAX,
        }
    }

    pub fn from_secs(secs: u32) -> Self {
        Time { secs, nsecs: 0 }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::from_nanos(millis.saturating_mul(1_000_000))
    }

    /// Convert a nanosecond count.  Saturates at [`Time::MAX`].
    pub fn from_nanos(nanos: u64) -> Self {
        let secs = nanos / u64::from(NSECS_PER_SEC);
        if secs > u64::from(u32::MAX) {
            return Time::MAX;
        }
        Time {
            secs: secs as u32,
            nsecs: (nanos % u64::from(NSECS_PER_SEC)) as u32,
        }
    }

    pub fn secs(self) -> u32 {
        self.secs
    }

    pub fn nsecs(self) -> u32 {
        self.nsecs
    }

    /// Total nanoseconds.  Cannot overflow: `u32::MAX` seconds fit in `u64` ns.
    pub fn as_nanos(self) -> u64 {
        u64::from(self.secs) * u64::from(NSECS_PER_SEC) + u64::from(self.nsecs)
    }

    /// `timeCompare`: lexicographic on `(secs, nsecs)`.
    pub fn compare(self, other: Time) -> Ordering {
        self.cmp(&other)
    }

    /// `timeAdd` with carry.  Returns `None` if the seconds field overflows.
    pub fn checked_add(self, other: Time) -> Option<Time> {
        let mut secs = self.secs.checked_add(other.secs)?;
        // Both operands are < 1e9, so the sum fits in u32 (< 2e9 < 4.29e9).
        let mut nsecs = self.nsecs + other.nsecs;
        if nsecs >= NSECS_PER_SEC {
            nsecs -= NSECS_PER_SEC;
            secs = secs.checked_add(1)?;
        }
        Some(Time { secs, nsecs })
    }

    /// `timeAdd`, saturating at [`Time::MAX`].
    pub fn saturating_add(self, other: Time) -> Time {
        self.checked_add(other).unwrap_or(Time::MAX)
    }

    /// `timeSub` with borrow.
    ///
    /// # Errors
    /// [`TimeUnderflow`] if `self < other`.
    pub fn checked_sub(self, other: Time) -> Result<Time, TimeUnderflow> {
        if self < other {
            return Err(TimeUnderflow {
                minuend: self,
                subtrahend: other,
            });
        }
        let mut secs = self.secs - other.secs;
        let nsecs = if self.nsecs < other.nsecs {
            // self >= other guarantees secs >= 1 here
            secs -= 1;
            self.nsecs + NSECS_PER_SEC - other.nsecs
        } else {
            self.nsecs - other.nsecs
        };
        Ok(Time { secs, nsecs })
    }

    /// `timeSub`, clamping a negative result to [`Time::ZERO`].
    pub fn saturating_sub(self, other: Time) -> Time {
        self.checked_sub(other).unwrap_or(Time::ZERO)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        self.saturating_add(rhs)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.secs, self.nsecs)
    }
}

// ── SignedTime ────────────────────────────────────────────────────────────────

/// Signed offset in nanoseconds (an actor's `offsetTime`).
///
/// Positive offsets move the safe-to-process time *earlier* than the event
/// timestamp, negative offsets move it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SignedTime(i64);

impl SignedTime {
    pub const ZERO: SignedTime = SignedTime(0);

    pub fn from_nanos(nanos: i64) -> Self {
        SignedTime(nanos)
    }

    pub fn from_secs(secs: i32) -> Self {
        SignedTime(i64::from(secs) * i64::from(NSECS_PER_SEC))
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `|self|` as an unsigned [`Time`].
    pub fn magnitude(self) -> Time {
        Time::from_nanos(self.0.unsigned_abs())
    }
}

impl fmt::Display for SignedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.magnitude())
        } else {
            write!(f, "{}", self.magnitude())
        }
    }
}

// ── Tag ───────────────────────────────────────────────────────────────────────

/// Superdense logical time.  Derived `Ord` compares timestamp, then microstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tag {
    pub timestamp: Time,
    pub microstep: u16,
}

impl Tag {
    pub fn new(timestamp: Time, microstep: u16) -> Self {
        Self {
            timestamp,
            microstep,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.timestamp, self.microstep)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: u32, nsecs: u32) -> Time {
        Time::new(secs, nsecs)
    }

    // ── construction ──────────────────────────────────────────────────────────

    #[test]
    fn new_carries_excess_nanoseconds() {
        let time = t(1, 2_500_000_000);
        assert_eq!(time.secs(), 3);
        assert_eq!(time.nsecs(), 500_000_000);
    }

    #[test]
    fn from_nanos_splits_fields() {
        let time = Time::from_nanos(5_000_000_123);
        assert_eq!((time.secs(), time.nsecs()), (5, 123));
        assert_eq!(time.as_nanos(), 5_000_000_123);
    }

    #[test]
    fn from_nanos_saturates() {
        assert_eq!(Time::from_nanos(u64::MAX), Time::MAX);
    }

    // ── timeAdd ───────────────────────────────────────────────────────────────

    #[test]
    fn add_without_carry() {
        assert_eq!(t(1, 100) + t(2, 200), t(3, 300));
    }

    #[test]
    fn add_carries_into_seconds() {
        let sum = t(1, 600_000_000) + t(0, 700_000_000);
        assert_eq!(sum, t(2, 300_000_000));
    }

    #[test]
    fn add_exact_second_boundary_carries() {
        assert_eq!(t(0, 500_000_000) + t(0, 500_000_000), t(1, 0));
    }

    #[test]
    fn checked_add_reports_overflow() {
        assert_eq!(Time::MAX.checked_add(t(0, 1)), None);
        assert_eq!(Time::MAX + t(1, 0), Time::MAX);
    }

    // ── timeSub ───────────────────────────────────────────────────────────────

    #[test]
    fn sub_borrows_one_second() {
        let diff = t(5, 100).checked_sub(t(2, 200)).unwrap();
        assert_eq!(diff, t(2, 999_999_900));
    }

    #[test]
    fn sub_equal_values_is_zero() {
        assert_eq!(t(7, 7).checked_sub(t(7, 7)).unwrap(), Time::ZERO);
    }

    #[test]
    fn sub_underflow_is_reported() {
        let err = t(1, 0).checked_sub(t(1, 1)).unwrap_err();
        assert_eq!(err.minuend, t(1, 0));
        assert_eq!(err.subtrahend, t(1, 1));
        assert!(err.to_string().contains("underflow"));
    }

    #[test]
    fn saturating_sub_clamps_to_zero() {
        assert_eq!(t(1, 0).saturating_sub(t(3, 0)), Time::ZERO);
    }

    // ── timeCompare ───────────────────────────────────────────────────────────

    #[test]
    fn compare_is_lexicographic() {
        assert_eq!(t(1, 999_999_999).compare(t(2, 0)), Ordering::Less);
        assert_eq!(t(2, 5).compare(t(2, 4)), Ordering::Greater);
        assert_eq!(t(3, 3).compare(t(3, 3)), Ordering::Equal);
    }

    // ── SignedTime / Tag ──────────────────────────────────────────────────────

    #[test]
    fn signed_time_magnitude_and_sign() {
        let neg = SignedTime::from_secs(-2);
        assert!(neg.is_negative());
        assert_eq!(neg.magnitude(), t(2, 0));
        assert_eq!(neg.to_string(), "-2.000000000s");
        assert!(!SignedTime::from_nanos(5).is_negative());
    }

    #[test]
    fn tag_orders_by_timestamp_then_microstep() {
        let a = Tag::new(t(1, 0), 5);
        let b = Tag::new(t(1, 0), 6);
        let c = Tag::new(t(1, 1), 0);
        assert!(a < b);
        assert!(b < c);
    }
}
