use hifitime::Epoch;
use log::{info, warn};
use ndarray::Array2;
use uom::si::f64::Time;
use uom::si::time::second;

use crate::errors::{Error, Result};
use crate::gbm_tools::tte::TimeTaggedEventList;
use crate::time::{elapsed, epoch_to_met, regular_edges, to_duration};

/// Parameters for the spectrogram algorithm
///
/// ## Parameters
///   1. start: Left edge of the first time bin.
///   2. end: The window closes at the last whole bin that fits before `end`.
///   3. dt: Width of every time bin, kept to the nanosecond.
#[derive(Debug, Copy, Clone)]
pub struct SpectrogramParams {
    pub start: Epoch,
    pub end: Epoch,
    pub dt: Time,
}

/// Event counts per energy channel and time bin.
///
/// `counts` has one row per entry of the source channel list and one column
/// per time bin, so `time_bins` has one more element than `counts` has
/// columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    pub time_bins: Vec<Epoch>,
    pub counts: Array2<u64>,
}

struct SpectrogramBinner<'a> {
    events: &'a TimeTaggedEventList,
    params: SpectrogramParams,
}

impl<'a> SpectrogramBinner<'a> {
    fn compute(self) -> Result<Spectrogram> {
        let dt = self.params.dt.get::<second>();
        let empty = || Error::EmptyRange {
            start: self.params.start.to_string(),
            end: self.params.end.to_string(),
            dt,
        };

        let step = to_duration(self.params.dt);
        let step_ns = step.total_nanoseconds();
        let span_ns = elapsed(self.params.start, self.params.end).total_nanoseconds();
        if !dt.is_finite() || step_ns <= 0 || span_ns <= 0 {
            return Err(empty());
        }
        let n_bins = usize::try_from(span_ns / step_ns).map_err(|_| empty())?;
        if n_bins == 0 {
            return Err(empty());
        }

        let time_bins = regular_edges(self.params.start, step, n_bins);
        let edges: Vec<f64> = time_bins.iter().map(|t| epoch_to_met(*t)).collect();
        let times = self.events.times();
        let codes = self.events.events();
        let channels = self.events.channels();

        let mut counts = Array2::<u64>::zeros((channels.len(), n_bins));
        let mut unlisted = 0usize;
        let mut lo = times.partition_point(|t| *t < edges[0]);
        for (k, edge) in edges.iter().skip(1).enumerate() {
            let hi = lo + times[lo..].partition_point(|t| t < edge);
            for code in &codes[lo..hi] {
                match channels.binary_search(code) {
                    Ok(row) => counts[[row, k]] += 1,
                    Err(_) => unlisted += 1,
                }
            }
            lo = hi;
        }
        if unlisted > 0 {
            warn!("{} events carry a PHA code outside the channel list", unlisted);
        }

        info!(
            "binned {} events into {} channels x {} time bins",
            times.len(),
            channels.len(),
            n_bins
        );
        Ok(Spectrogram { time_bins, counts })
    }
}

impl TimeTaggedEventList {
    /// Count events per channel in consecutive bins of width `params.dt`.
    ///
    /// An event at `t` lands in bin `k` when `edge[k] <= t < edge[k + 1]`;
    /// events outside the binned window are ignored. Fails with an
    /// EmptyRange error when not even one whole bin fits the window.
    pub fn bin_to_spectrogram(&self, params: &SpectrogramParams) -> Result<Spectrogram> {
        let binner = SpectrogramBinner {
            events: self,
            params: *params,
        };
        binner.compute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gbm_tools::ctime::tests::kev;
    use crate::time::met_to_epoch;
    use hifitime::Duration;
    use ndarray::array;
    use uom::si::time::millisecond;

    fn events(times: Vec<f64>, pha: Vec<i64>) -> TimeTaggedEventList {
        TimeTaggedEventList::new(
            pha,
            kev(array![[4.0, 8.0], [8.0, 16.0], [16.0, 32.0]]),
            vec![0, 1, 2],
            times,
        )
        .unwrap()
    }

    fn params(start: f64, end: f64, dt: Time) -> SpectrogramParams {
        SpectrogramParams {
            start: met_to_epoch(start),
            end: met_to_epoch(end),
            dt,
        }
    }

    fn seconds(s: f64) -> Time {
        Time::new::<second>(s)
    }

    #[test]
    fn ten_events_fill_five_bins() {
        let list = events((0..10).map(|i| i as f64).collect(), vec![0; 10]);
        let spec = list.bin_to_spectrogram(&params(0.0, 10.0, seconds(2.0))).unwrap();
        assert_eq!(spec.time_bins.len(), 6);
        assert_eq!(spec.counts.dim(), (3, 5));
        assert_eq!(spec.counts.row(0), array![2, 2, 2, 2, 2]);
        assert_eq!(spec.counts.sum(), 10);
    }

    #[test]
    fn whole_bins_survive_at_mission_times() {
        let cases = [
            (700_000_000.3, 64.0, 33),
            (700_000_000.3, 16.0, 7),
            (700_000_000.3, 16.0, 33),
            (1234.5678, 16.0, 7),
        ];
        for (t0, dt_ms, n) in cases {
            let dt = Time::new::<millisecond>(dt_ms);
            let start = met_to_epoch(t0);
            let step = to_duration(dt).total_nanoseconds();
            let window = Duration::from_total_nanoseconds(step * n as i128);
            let end = start + window;
            let last = t0 + dt.get::<second>() * (n as f64 - 0.5);
            let list = events(vec![t0 + 0.001, last], vec![0, 2]);

            let spec = list
                .bin_to_spectrogram(&SpectrogramParams { start, end, dt })
                .unwrap();
            assert_eq!(spec.counts.ncols(), n, "t0 {} dt {} ms", t0, dt_ms);
            assert_eq!(spec.time_bins.len(), n + 1);
            assert_eq!(elapsed(spec.time_bins[0], spec.time_bins[n]), window);
            assert_eq!(spec.counts[[0, 0]], 1);
            assert_eq!(spec.counts[[2, n - 1]], 1);
        }
    }

    #[test]
    fn events_are_counted_per_channel() {
        let list = events(vec![0.1, 0.2, 0.3, 1.5, 1.6], vec![0, 2, 2, 1, 9]);
        let spec = list
            .bin_to_spectrogram(&params(0.0, 2.0, Time::new::<millisecond>(1000.0)))
            .unwrap();
        assert_eq!(spec.counts, array![[1, 0], [0, 1], [2, 0]]);
    }

    #[test]
    fn events_outside_the_window_are_ignored() {
        let list = events(vec![-1.0, 0.0, 2.9, 3.0, 7.0], vec![1; 5]);
        let spec = list.bin_to_spectrogram(&params(0.0, 3.5, seconds(1.0))).unwrap();
        assert_eq!(spec.counts.row(1), array![1, 0, 1]);
    }

    #[test]
    fn empty_windows_are_rejected() {
        let list = events(vec![0.0], vec![0]);
        for p in [
            params(0.0, 1.0, seconds(2.0)),
            params(5.0, 5.0, seconds(1.0)),
            params(5.0, 1.0, seconds(1.0)),
            params(0.0, 5.0, seconds(0.0)),
            params(0.0, 5.0, seconds(f64::NAN)),
        ] {
            assert!(matches!(
                list.bin_to_spectrogram(&p),
                Err(Error::EmptyRange { .. })
            ));
        }
    }
}
