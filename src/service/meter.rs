//! Meter arithmetic for flight completion.
//!
//! An aircraft is billed on one meter (its charge basis) and credited airframe
//! time on the meter named by its total-time method, optionally discounted.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Meter {
    Hobbs,
    Tacho,
    Airswitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum TotalTimeMethod {
    #[serde(rename = "hobbs")]
    #[strum(serialize = "hobbs")]
    Hobbs,
    #[serde(rename = "tacho")]
    #[strum(serialize = "tacho")]
    Tacho,
    #[serde(rename = "airswitch")]
    #[strum(serialize = "airswitch")]
    Airswitch,
    #[serde(rename = "hobbs less 5%")]
    #[strum(serialize = "hobbs less 5%")]
    HobbsLess5,
    #[serde(rename = "hobbs less 10%")]
    #[strum(serialize = "hobbs less 10%")]
    HobbsLess10,
    #[serde(rename = "tacho less 5%")]
    #[strum(serialize = "tacho less 5%")]
    TachoLess5,
    #[serde(rename = "tacho less 10%")]
    #[strum(serialize = "tacho less 10%")]
    TachoLess10,
}

impl TotalTimeMethod {
    pub fn meter(self) -> Meter {
        match self {
            Self::Hobbs | Self::HobbsLess5 | Self::HobbsLess10 => Meter::Hobbs,
            Self::Tacho | Self::TachoLess5 | Self::TachoLess10 => Meter::Tacho,
            Self::Airswitch => Meter::Airswitch,
        }
    }

    /// Fraction of the meter delta credited to airframe time.
    pub fn factor(self) -> Decimal {
        match self {
            Self::Hobbs | Self::Tacho | Self::Airswitch => Decimal::ONE,
            Self::HobbsLess5 | Self::TachoLess5 => Decimal::new(95, 2),
            Self::HobbsLess10 | Self::TachoLess10 => Decimal::new(90, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum MeterError {
    #[error("{0} start and end readings must both be provided")]
    IncompleteReading(Meter),

    #[error("{0} readings are required for this aircraft")]
    MissingReading(Meter),

    #[error("{0} readings cannot be negative")]
    NegativeReading(Meter),

    #[error("{meter} end reading {end} is before start reading {start}")]
    NegativeDelta {
        meter: Meter,
        start: Decimal,
        end: Decimal,
    },

    #[error("{meter} solo end reading {solo_end} is outside the flight's readings")]
    SoloEndOutOfRange { meter: Meter, solo_end: Decimal },

    #[error("a solo end reading requires an instructor on the booking")]
    SoloWithoutInstructor,
}

/// Readings captured at check-in. Solo end readings mark the point the
/// instructor left the aircraft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterReadings {
    #[serde(default)]
    pub hobbs_start: Option<Decimal>,
    #[serde(default)]
    pub hobbs_end: Option<Decimal>,
    #[serde(default)]
    pub tacho_start: Option<Decimal>,
    #[serde(default)]
    pub tacho_end: Option<Decimal>,
    #[serde(default)]
    pub airswitch_start: Option<Decimal>,
    #[serde(default)]
    pub airswitch_end: Option<Decimal>,
    #[serde(default)]
    pub solo_end_hobbs: Option<Decimal>,
    #[serde(default)]
    pub solo_end_tacho: Option<Decimal>,
}

impl MeterReadings {
    pub fn span(&self, meter: Meter) -> (Option<Decimal>, Option<Decimal>) {
        match meter {
            Meter::Hobbs => (self.hobbs_start, self.hobbs_end),
            Meter::Tacho => (self.tacho_start, self.tacho_end),
            Meter::Airswitch => (self.airswitch_start, self.airswitch_end),
        }
    }

    pub fn end(&self, meter: Meter) -> Option<Decimal> {
        self.span(meter).1
    }

    pub fn solo_end(&self, meter: Meter) -> Option<Decimal> {
        match meter {
            Meter::Hobbs => self.solo_end_hobbs,
            Meter::Tacho => self.solo_end_tacho,
            Meter::Airswitch => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightTimes {
    pub hobbs_time: Option<Decimal>,
    pub tacho_time: Option<Decimal>,
    pub airswitch_time: Option<Decimal>,
    /// Delta of the charge-basis meter.
    pub billing_hours: Decimal,
    pub dual_time: Decimal,
    pub solo_time: Decimal,
    /// Airframe time credited under the aircraft's total-time method.
    pub credited_hours: Decimal,
}

pub fn round_hours(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn delta(
    meter: Meter,
    start: Option<Decimal>,
    end: Option<Decimal>,
) -> Result<Option<Decimal>, MeterError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            if start.is_sign_negative() || end.is_sign_negative() {
                return Err(MeterError::NegativeReading(meter));
            }
            if end < start {
                return Err(MeterError::NegativeDelta { meter, start, end });
            }
            Ok(Some(end - start))
        }
        _ => Err(MeterError::IncompleteReading(meter)),
    }
}

pub fn compute_flight_times(
    readings: &MeterReadings,
    charge_basis: Meter,
    method: TotalTimeMethod,
    has_instructor: bool,
) -> Result<FlightTimes, MeterError> {
    let (hs, he) = readings.span(Meter::Hobbs);
    let (ts, te) = readings.span(Meter::Tacho);
    let (as_, ae) = readings.span(Meter::Airswitch);
    let hobbs_time = delta(Meter::Hobbs, hs, he)?;
    let tacho_time = delta(Meter::Tacho, ts, te)?;
    let airswitch_time = delta(Meter::Airswitch, as_, ae)?;

    let time_for = |meter: Meter| match meter {
        Meter::Hobbs => hobbs_time,
        Meter::Tacho => tacho_time,
        Meter::Airswitch => airswitch_time,
    };

    let billing_hours = time_for(charge_basis).ok_or(MeterError::MissingReading(charge_basis))?;

    let (dual_time, solo_time) = match readings.solo_end(charge_basis) {
        Some(solo_end) => {
            if !has_instructor {
                return Err(MeterError::SoloWithoutInstructor);
            }
            let (start, end) = readings.span(charge_basis);
            // span is complete: billing_hours exists for this meter
            let (Some(start), Some(end)) = (start, end) else {
                return Err(MeterError::MissingReading(charge_basis));
            };
            if solo_end < start || solo_end > end {
                return Err(MeterError::SoloEndOutOfRange {
                    meter: charge_basis,
                    solo_end,
                });
            }
            (solo_end - start, end - solo_end)
        }
        None if has_instructor => (billing_hours, Decimal::ZERO),
        None => (Decimal::ZERO, billing_hours),
    };

    let method_meter = method.meter();
    let credited_hours = time_for(method_meter)
        .map(|t| round_hours(t * method.factor()))
        .ok_or(MeterError::MissingReading(method_meter))?;

    Ok(FlightTimes {
        hobbs_time,
        tacho_time,
        airswitch_time,
        billing_hours,
        dual_time,
        solo_time,
        credited_hours,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HoursProgression {
    pub total_hours_start: Decimal,
    pub total_hours_end: Decimal,
}

/// What a flight log has already contributed to its aircraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppliedCredit {
    pub total_hours_start: Decimal,
    pub credited_hours: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditOutcome {
    pub aircraft_total_hours: Decimal,
    pub progression: HoursProgression,
}

/// Credits `credited` hours to an aircraft. A log that was applied before only
/// moves the aircraft by the difference, keeping its original start.
pub fn apply_credit(
    aircraft_total: Decimal,
    previous: Option<AppliedCredit>,
    credited: Decimal,
) -> CreditOutcome {
    match previous {
        Some(prev) => CreditOutcome {
            aircraft_total_hours: aircraft_total + (credited - prev.credited_hours),
            progression: HoursProgression {
                total_hours_start: prev.total_hours_start,
                total_hours_end: prev.total_hours_start + credited,
            },
        },
        None => CreditOutcome {
            aircraft_total_hours: aircraft_total + credited,
            progression: HoursProgression {
                total_hours_start: aircraft_total,
                total_hours_end: aircraft_total + credited,
            },
        },
    }
}

/// New value for an aircraft's current meter after a flight ending at
/// `new_end`. Older flights never move the meter backwards.
pub fn advance_meter(
    current: Decimal,
    previous_end: Option<Decimal>,
    new_end: Option<Decimal>,
) -> Decimal {
    let Some(new_end) = new_end else {
        return current;
    };
    match previous_end {
        Some(prev) if prev == current => new_end,
        Some(_) => current,
        None if new_end >= current => new_end,
        None => current,
    }
}

pub fn start_mismatch_warnings(
    readings: &MeterReadings,
    current_hobbs: Decimal,
    current_tacho: Decimal,
) -> Vec<String> {
    let mut warnings = Vec::new();
    for (meter, start, current) in [
        (Meter::Hobbs, readings.hobbs_start, current_hobbs),
        (Meter::Tacho, readings.tacho_start, current_tacho),
    ] {
        if let Some(start) = start
            && start != current
        {
            warnings.push(format!(
                "{meter} start {start} does not match aircraft current {current}"
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn hobbs_tacho(hs: &str, he: &str, ts: &str, te: &str) -> MeterReadings {
        MeterReadings {
            hobbs_start: Some(d(hs)),
            hobbs_end: Some(d(he)),
            tacho_start: Some(d(ts)),
            tacho_end: Some(d(te)),
            ..Default::default()
        }
    }

    #[test]
    fn dual_flight_bills_all_time_as_dual() {
        let r = hobbs_tacho("1000.0", "1001.5", "800.0", "801.2");
        let t = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::Tacho, true).unwrap();
        assert_eq!(t.billing_hours, d("1.5"));
        assert_eq!(t.dual_time, d("1.5"));
        assert_eq!(t.solo_time, Decimal::ZERO);
        assert_eq!(t.credited_hours, d("1.2"));
    }

    #[test]
    fn solo_flight_without_instructor() {
        let r = hobbs_tacho("10", "11.3", "5", "6");
        let t = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::Hobbs, false).unwrap();
        assert_eq!(t.dual_time, Decimal::ZERO);
        assert_eq!(t.solo_time, d("1.3"));
    }

    #[test]
    fn solo_end_splits_dual_and_solo() {
        let mut r = hobbs_tacho("100.0", "102.0", "50.0", "51.6");
        r.solo_end_hobbs = Some(d("100.8"));
        let t = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::Hobbs, true).unwrap();
        assert_eq!(t.dual_time, d("0.8"));
        assert_eq!(t.solo_time, d("1.2"));
        assert_eq!(t.dual_time + t.solo_time, t.billing_hours);
    }

    #[test]
    fn solo_end_outside_span_is_rejected() {
        let mut r = hobbs_tacho("100.0", "102.0", "50.0", "51.6");
        r.solo_end_hobbs = Some(d("102.5"));
        let err = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::Hobbs, true).unwrap_err();
        assert!(matches!(err, MeterError::SoloEndOutOfRange { .. }));
    }

    #[test]
    fn solo_end_needs_instructor() {
        let mut r = hobbs_tacho("100.0", "102.0", "50.0", "51.6");
        r.solo_end_hobbs = Some(d("101"));
        let err = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::Hobbs, false).unwrap_err();
        assert_eq!(err, MeterError::SoloWithoutInstructor);
    }

    #[test]
    fn negative_delta_is_rejected() {
        let r = hobbs_tacho("1001.5", "1000.0", "800.0", "801.2");
        let err = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::Hobbs, true).unwrap_err();
        assert!(matches!(
            err,
            MeterError::NegativeDelta {
                meter: Meter::Hobbs,
                ..
            }
        ));
    }

    #[test]
    fn half_entered_meter_is_rejected() {
        let r = MeterReadings {
            tacho_start: Some(d("1")),
            ..Default::default()
        };
        assert_eq!(
            delta(Meter::Tacho, r.tacho_start, r.tacho_end),
            Err(MeterError::IncompleteReading(Meter::Tacho))
        );
    }

    #[test]
    fn charge_basis_meter_is_required() {
        let r = MeterReadings {
            hobbs_start: Some(d("1")),
            hobbs_end: Some(d("2")),
            ..Default::default()
        };
        let err = compute_flight_times(&r, Meter::Tacho, TotalTimeMethod::Hobbs, true).unwrap_err();
        assert_eq!(err, MeterError::MissingReading(Meter::Tacho));
    }

    #[test]
    fn discounted_methods_credit_a_fraction() {
        let r = hobbs_tacho("0", "2.0", "0", "1.5");
        let less5 = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::HobbsLess5, true).unwrap();
        assert_eq!(less5.credited_hours, d("1.9"));
        let less10 = compute_flight_times(&r, Meter::Hobbs, TotalTimeMethod::TachoLess10, true).unwrap();
        assert_eq!(less10.credited_hours, d("1.35"));
    }

    #[test]
    fn method_names_round_trip_through_strum() {
        assert_eq!(
            "hobbs less 10%".parse::<TotalTimeMethod>().unwrap(),
            TotalTimeMethod::HobbsLess10
        );
        assert_eq!(TotalTimeMethod::TachoLess5.to_string(), "tacho less 5%");
    }

    #[test]
    fn correction_moves_total_by_delta_only() {
        let first = apply_credit(d("2000.0"), None, d("1.5"));
        assert_eq!(first.aircraft_total_hours, d("2001.5"));
        assert_eq!(first.progression.total_hours_start, d("2000.0"));

        // another flight happened in between
        let later_total = first.aircraft_total_hours + d("3.0");
        let corrected = apply_credit(
            later_total,
            Some(AppliedCredit {
                total_hours_start: d("2000.0"),
                credited_hours: d("1.5"),
            }),
            d("1.2"),
        );
        assert_eq!(corrected.aircraft_total_hours, later_total - d("0.3"));
        assert_eq!(corrected.progression.total_hours_end, d("2001.2"));
    }

    #[test]
    fn meters_only_advance_for_latest_flight() {
        assert_eq!(advance_meter(d("100"), None, Some(d("101.5"))), d("101.5"));
        assert_eq!(advance_meter(d("100"), None, Some(d("99"))), d("100"));
        assert_eq!(advance_meter(d("101.5"), Some(d("101.5")), Some(d("101.3"))), d("101.3"));
        assert_eq!(advance_meter(d("105"), Some(d("101.5")), Some(d("101.3"))), d("105"));
        assert_eq!(advance_meter(d("105"), None, None), d("105"));
    }

    #[test]
    fn start_mismatch_produces_warnings() {
        let r = hobbs_tacho("100.0", "101.0", "50.0", "50.8");
        assert!(start_mismatch_warnings(&r, d("100.0"), d("50.0")).is_empty());
        let w = start_mismatch_warnings(&r, d("99.5"), d("50.0"));
        assert_eq!(w.len(), 1);
        assert!(w[0].starts_with("hobbs start"));
    }
}
