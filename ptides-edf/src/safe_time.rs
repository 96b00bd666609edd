/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Safe-to-process time.
//!
//! An event may fire once platform time reaches `timestamp − offset`: after
//! that point no upstream source with bounded latency can still deliver an
//! earlier-timestamped event.  A negative offset pushes the safe time past
//! the timestamp.
//!
//! When `offset > timestamp` the subtraction would go negative; the result is
//! clamped to zero (the event is immediately safe).

use tracing::trace;

use crate::event::Event;
use crate::time::{SignedTime, Time};

/// `timestamp − offset` for `offset ≥ 0`, `timestamp + |offset|` otherwise.
/// Clamped to [`Time::ZERO`] below and saturated at [`Time::MAX`] above.
pub fn offset_time(timestamp: Time, offset: SignedTime) -> Time {
    if offset.is_negative() {
        timestamp.saturating_add(offset.magnitude())
    } else {
        match timestamp.checked_sub(offset.magnitude()) {
            Ok(t) => t,
            Err(underflow) => {
                trace!(%underflow, "safe time clamped to zero");
                Time::ZERO
            }
        }
    }
}

/// Earliest platform time at which `event` may fire.
pub fn safe_to_process(event: &Event) -> Time {
    offset_time(event.tag.timestamp, event.offset)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Tag;

    fn event_at(ts_secs: u32, offset: SignedTime) -> Event {
        Event {
            tag: Tag::new(Time::from_secs(ts_secs), 0),
            offset,
            ..Default::default()
        }
    }

    #[test]
    fn positive_offset_moves_safe_time_earlier() {
        let e = event_at(5, SignedTime::from_secs(2));
        assert_eq!(safe_to_process(&e), Time::from_secs(3));
    }

    #[test]
    fn negative_offset_moves_safe_time_later() {
        let e = event_at(5, SignedTime::from_secs(-2));
        assert_eq!(safe_to_process(&e), Time::from_secs(7));
    }

    #[test]
    fn zero_offset_is_the_timestamp() {
        let e = event_at(5, SignedTime::ZERO);
        assert_eq!(safe_to_process(&e), Time::from_secs(5));
    }

    #[test]
    fn offset_larger_than_timestamp_clamps_to_zero() {
        let e = event_at(1, SignedTime::from_secs(3));
        assert_eq!(safe_to_process(&e), Time::ZERO);
    }

    #[test]
    fn sub_second_offsets_borrow() {
        let t = offset_time(Time::new(2, 100), SignedTime::from_nanos(200));
        assert_eq!(t, Time::new(1, 999_999_900));
    }
}
