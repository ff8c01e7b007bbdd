use log::{info, warn};
use ndarray::{s, Array1, Array2, Axis};
use uom::si::f64::Time;
use uom::si::time::second;

use crate::errors::{Error, Result};
use crate::gbm_tools::ctime::HistogramSeries;
use crate::time::{regular_edges, to_duration};
use crate::{NOMINAL_BURST_DT, NOMINAL_DT};

/// What to do when a merge starts with fewer than `merge_width` rows left.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum TailPolicy {
    /// Sum whatever rows remain into one output bin.
    #[default]
    ShortGroup,
    /// Keep each remaining row as its own output bin.
    CarryForward,
}

/// Parameters for the rebin algorithm
///
/// ## Parameters
///   1. nominal_dt: Target cadence of the output series.
///   2. livetime_threshold: Rows whose live-time deficit `1 - dt / nominal_dt`
///      is below this are kept as they are.
///   3. merge_width: Number of consecutive rows summed when the deficit is
///      at or above the threshold. Defaults to the number of burst-mode
///      rows in one nominal row.
///   4. tail: Handling of a merge that runs past the end of the data.
#[derive(Debug, Copy, Clone)]
pub struct RebinParams {
    pub nominal_dt: Time,
    pub livetime_threshold: f64,
    pub merge_width: usize,
    pub tail: TailPolicy,
}

impl Default for RebinParams {
    fn default() -> Self {
        let burst_rows = (NOMINAL_DT.get::<second>() / NOMINAL_BURST_DT.get::<second>()).round();
        Self {
            nominal_dt: *NOMINAL_DT,
            livetime_threshold: 0.75,
            merge_width: burst_rows as usize,
            tail: TailPolicy::ShortGroup,
        }
    }
}

struct Rebin<'a> {
    series: &'a HistogramSeries,
    params: RebinParams,
}

impl<'a> Rebin<'a> {
    fn compute(self) -> Result<HistogramSeries> {
        let nominal = self.params.nominal_dt.get::<second>();
        let step = to_duration(self.params.nominal_dt);
        if nominal.is_nan() || step.total_nanoseconds() <= 0 || self.params.merge_width == 0 {
            return Err(Error::InvalidParameter(format!(
                "rebin needs a positive cadence and merge width, got {} s and {}",
                nominal, self.params.merge_width
            )));
        }

        let counts = self.series.counts();
        if let Some(((row, channel), _)) = counts.indexed_iter().find(|(_, c)| !c.is_finite()) {
            return Err(Error::DataGap { row, channel });
        }
        let dt = self.series.dt();

        let rows = counts.nrows();
        let width = self.params.merge_width;
        let mut binned: Vec<Array1<f64>> = Vec::with_capacity(rows);
        let mut i = 0;
        while i < rows {
            if 1.0 - dt[i].get::<second>() / nominal < self.params.livetime_threshold {
                binned.push(counts.row(i).to_owned());
                i += 1;
            } else if i + width <= rows {
                binned.push(counts.slice(s![i..i + width, ..]).sum_axis(Axis(0)));
                i += width;
            } else {
                warn!(
                    "only {} of {} rows left to merge at row {}, applying {:?}",
                    rows - i,
                    width,
                    i,
                    self.params.tail
                );
                match self.params.tail {
                    TailPolicy::ShortGroup => {
                        binned.push(counts.slice(s![i.., ..]).sum_axis(Axis(0)));
                    }
                    TailPolicy::CarryForward => {
                        binned.extend(counts.rows().into_iter().skip(i).map(|r| r.to_owned()));
                    }
                }
                break;
            }
        }

        let channels = counts.ncols();
        let out_rows = binned.len();
        let flat: Vec<f64> = binned.iter().flat_map(|r| r.iter().copied()).collect();
        let counts = Array2::from_shape_vec((out_rows, channels), flat)
            .map_err(|e| Error::Format(format!("rebinned counts: {}", e)))?;

        let time_bins = regular_edges(self.series.time_bins()[0], step, out_rows);

        info!("rebinned {} rows to {} at {} s", rows, out_rows, nominal);
        HistogramSeries::new(
            counts,
            Array1::from_elem(out_rows, self.params.nominal_dt),
            time_bins,
            self.series.energy_bins().clone(),
        )
    }
}

/// Bin a histogram series down to a nominal cadence.
///
/// Rows exposed for most of the nominal cadence are kept. Runs of short
/// rows (burst-mode data) are summed in groups of `merge_width`. Counts are
/// conserved per channel, whatever the tail policy.
///
/// Fails with a DataGap error if any count is NaN or infinite.
pub fn rebin(series: &HistogramSeries, params: &RebinParams) -> Result<HistogramSeries> {
    let r = Rebin {
        series,
        params: *params,
    };
    r.compute()
}
