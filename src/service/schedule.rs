use chrono::{DateTime, Duration, Utc};

use crate::db::models::booking::BookingStatus;
use crate::error::DeskError;

const MAX_BOOKING_HOURS: i64 = 24;

/// Half-open interval overlap: a booking ending at 10:00 does not clash with
/// one starting at 10:00.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), DeskError> {
    if end <= start {
        return Err(DeskError::validation("end_time must be after start_time"));
    }
    if end - start > Duration::hours(MAX_BOOKING_HOURS) {
        return Err(DeskError::validation(format!(
            "bookings cannot exceed {MAX_BOOKING_HOURS} hours"
        )));
    }
    Ok(())
}

pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    use BookingStatus::*;
    match (from, to) {
        (Unconfirmed, Confirmed) => true,
        (Unconfirmed | Confirmed, Flying) => true,
        (Flying, Complete) => true,
        (Unconfirmed | Confirmed | Flying, Cancelled) => true,
        _ => false,
    }
}

pub fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), DeskError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(DeskError::InvalidState(format!(
            "booking cannot move from {from} to {to}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn adjacent_bookings_do_not_overlap() {
        assert!(!overlaps(at(9, 0), at(10, 0), at(10, 0), at(11, 0)));
        assert!(overlaps(at(9, 0), at(10, 30), at(10, 0), at(11, 0)));
        assert!(overlaps(at(9, 0), at(12, 0), at(10, 0), at(11, 0)));
    }

    #[test]
    fn window_must_be_positive_and_bounded() {
        assert!(validate_window(at(9, 0), at(10, 0)).is_ok());
        assert!(validate_window(at(10, 0), at(10, 0)).is_err());
        assert!(validate_window(at(10, 0), at(10, 0) + Duration::hours(25)).is_err());
    }

    #[test]
    fn lifecycle_transitions() {
        use BookingStatus::*;
        assert!(can_transition(Confirmed, Flying));
        assert!(can_transition(Flying, Complete));
        assert!(!can_transition(Complete, Cancelled));
        assert!(!can_transition(Cancelled, Confirmed));
        assert!(ensure_transition(Unconfirmed, Complete).is_err());
    }
}
