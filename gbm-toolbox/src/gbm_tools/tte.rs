use std::path::Path;

use hifitime::Epoch;
use log::{debug, info};
use ndarray::{Array1, Array2};
use uom::si::f64::{Energy, Time};
use uom::si::time::second;

use crate::errors::{Error, Result};
use crate::gbm_tools::{column_quantity, energy_edges, slice_window, SliceParams};
use crate::parsers::fits::FitsFile;
use crate::time::{epoch_to_met, met_distance, met_to_epoch, TimeBound};
use crate::{Table, TableSource};

/// Individually time-stamped detector events.
///
/// `events[i]` is the PHA channel code of the event recorded at `times[i]`
/// seconds after the mission epoch. Times stay as raw seconds so that
/// searching millions of events is a plain float search.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTaggedEventList {
    events: Vec<i64>,
    energy_bins: Array2<Energy>,
    channels: Vec<i64>,
    times: Vec<f64>,
}

impl TimeTaggedEventList {
    /// Fails with a Format error if events and times differ in length, times
    /// decrease, channel codes are not strictly increasing, or there is not
    /// one energy bin per channel.
    pub fn new(
        events: Vec<i64>,
        energy_bins: Array2<Energy>,
        channels: Vec<i64>,
        times: Vec<f64>,
    ) -> Result<Self> {
        if events.len() != times.len() {
            return Err(Error::Format(format!(
                "{} events but {} event times",
                events.len(),
                times.len()
            )));
        }
        if let Some(i) = times.windows(2).position(|w| w[1] < w[0]) {
            return Err(Error::Format(format!("event times decrease after event {}", i)));
        }
        if channels.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Format(String::from(
                "channel codes are not strictly increasing",
            )));
        }
        if energy_bins.dim() != (channels.len(), 2) {
            return Err(Error::Format(format!(
                "{} channels do not match energy bins of shape {:?}",
                channels.len(),
                energy_bins.dim()
            )));
        }
        Ok(Self {
            events,
            energy_bins,
            channels,
            times,
        })
    }

    pub fn from_fits<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = FitsFile::open(path)?;
        Self::from_source(&f)
    }

    /// Read `EBOUNDS` (`E_MIN`, `E_MAX`, `CHANNEL`) and `EVENTS` (`TIME`, `PHA`).
    pub fn from_source<S: TableSource>(source: &S) -> Result<Self> {
        let ebounds = source.table("EBOUNDS")?;
        let energy_bins = energy_edges(ebounds, "E_MIN", "E_MAX")?;
        let channels = ebounds.column_i64("CHANNEL")?;

        let table = source.table("EVENTS")?;
        let times: Array1<Time> = column_quantity(table, "TIME", "s")?;
        let times = times.iter().map(|t| t.get::<second>()).collect();
        let events = table.column_i64("PHA")?;
        debug!("EVENTS: {} events over {} channels", events.len(), channels.len());

        Self::new(events, energy_bins, channels, times)
    }

    pub fn events(&self) -> &[i64] {
        &self.events
    }

    /// `[channel][lo, hi]` energy bounds.
    pub fn energy_bins(&self) -> &Array2<Energy> {
        &self.energy_bins
    }

    pub fn channels(&self) -> &[i64] {
        &self.channels
    }

    /// Raw event times in seconds since the mission epoch.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// First and last event instants.
    pub fn time_range(&self) -> Option<(Epoch, Epoch)> {
        match (self.times.first(), self.times.last()) {
            (Some(a), Some(b)) => Some((met_to_epoch(*a), met_to_epoch(*b))),
            _ => None,
        }
    }

    /// Event times as absolute instants.
    pub fn pretty_times(&self) -> Vec<Epoch> {
        self.times.iter().map(|t| met_to_epoch(*t)).collect()
    }

    /// Keep the events from the one nearest `start` through the one nearest
    /// `end`, both included.
    ///
    /// Bounds are converted to raw seconds once and matched against the raw
    /// times. The list is consumed and handed back narrowed.
    pub fn slice<A, B>(mut self, start: A, end: B, params: &SliceParams) -> Result<Self>
    where
        A: Into<TimeBound>,
        B: Into<TimeBound>,
    {
        let start = epoch_to_met(start.into().resolve()?);
        let end = epoch_to_met(end.into().resolve()?);

        let (si, ei) = match slice_window(&self.times, start, end, params, met_distance)? {
            Some(window) => window,
            None => return Ok(self),
        };

        info!("slicing {} events to [{}, {}]", self.len(), si, ei);
        self.times.truncate(ei + 1);
        self.events.truncate(ei + 1);
        self.times.drain(..si);
        self.events.drain(..si);
        Ok(self)
    }
}
