//! Conversions between raw mission-elapsed seconds and absolute instants,
//! and the nearest-neighbour index search used by every slice operation.
use std::fmt;
use std::str::FromStr;

use hifitime::{Duration, Epoch, TimeScale};
use uom::si::f64::Time;
use uom::si::time::second;

use crate::errors::{Error, Result};
use crate::MISSION_EPOCH;

/// UTC instant of a mission-elapsed time in seconds.
pub fn met_to_epoch(met: f64) -> Epoch {
    (*MISSION_EPOCH + Duration::from_seconds(met)).to_time_scale(TimeScale::UTC)
}

/// Seconds elapsed since [`MISSION_EPOCH`] at `t`.
pub fn epoch_to_met(t: Epoch) -> f64 {
    (t.to_time_scale(TimeScale::TAI) - *MISSION_EPOCH).to_seconds()
}

/// `t` rounded to the nanosecond resolution of [`Duration`].
pub fn to_duration(t: Time) -> Duration {
    Duration::from_total_nanoseconds((t.get::<second>() * 1e9).round() as i128)
}

/// Time elapsed from `from` to `to`, leap seconds included.
pub fn elapsed(from: Epoch, to: Epoch) -> Duration {
    to.to_time_scale(TimeScale::TAI) - from.to_time_scale(TimeScale::TAI)
}

/// `n + 1` UTC instants spaced `step` apart, starting at `first`.
pub fn regular_edges(first: Epoch, step: Duration, n: usize) -> Vec<Epoch> {
    let first = first.to_time_scale(TimeScale::TAI);
    let step = step.total_nanoseconds();
    (0..=n)
        .map(|k| {
            let offset = Duration::from_total_nanoseconds(step * k as i128);
            (first + offset).to_time_scale(TimeScale::UTC)
        })
        .collect()
}

/// One end of a requested time window, either already an instant or an
/// ISO-8601 string such as `2022-03-31T12:00:00`.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeBound {
    Instant(Epoch),
    Iso(String),
}

impl TimeBound {
    pub fn resolve(&self) -> Result<Epoch> {
        match self {
            TimeBound::Instant(t) => Ok(*t),
            TimeBound::Iso(s) => parse_iso(s),
        }
    }
}

impl From<Epoch> for TimeBound {
    fn from(t: Epoch) -> Self {
        TimeBound::Instant(t)
    }
}

impl From<&str> for TimeBound {
    fn from(s: &str) -> Self {
        TimeBound::Iso(s.to_string())
    }
}

impl From<String> for TimeBound {
    fn from(s: String) -> Self {
        TimeBound::Iso(s)
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimeBound::Instant(t) => write!(f, "{}", t),
            TimeBound::Iso(s) => write!(f, "{}", s),
        }
    }
}

/// Parses an ISO-8601 instant, read as UTC when no time scale is given.
/// `HH:MM` without seconds is accepted.
pub fn parse_iso(s: &str) -> Result<Epoch> {
    let trimmed = s.trim();
    let normalized = match trimmed.split_once('T') {
        Some((date, clock)) if clock.matches(':').count() == 1 => {
            format!("{}T{}:00", date, clock)
        }
        _ => trimmed.to_string(),
    };
    Epoch::from_str(&normalized).map_err(|e| Error::TimeParse(format!("{}: {}", s, e)))
}

/// Index of the element of a non-decreasing slice nearest to `target`.
///
/// Equivalent to `argmin |values - target|`: ties resolve to the lower
/// index, and runs of equal values resolve to their first element. A target
/// outside the data range resolves to the first or last element; no range
/// check is made here. Returns `None` only for an empty slice.
pub fn nearest_sorted<T, D, F>(values: &[T], target: T, distance: F) -> Option<usize>
where
    T: PartialOrd + Copy,
    D: PartialOrd,
    F: Fn(T, T) -> D,
{
    if values.is_empty() {
        return None;
    }
    let upper = values.partition_point(|v| *v < target);
    if upper == 0 {
        return Some(0);
    }
    let below = values[upper - 1];
    let first_of = |v: T| values.partition_point(|x| *x < v);
    if upper == values.len() {
        return Some(first_of(below));
    }
    if distance(below, target) <= distance(values[upper], target) {
        Some(first_of(below))
    } else {
        Some(upper)
    }
}

pub(crate) fn met_distance(a: f64, b: f64) -> f64 {
    (a - b).abs()
}

pub(crate) fn epoch_distance(a: Epoch, b: Epoch) -> Duration {
    (a - b).abs()
}
