use std::path::Path;

use hifitime::Epoch;
use log::{debug, info};
use ndarray::{s, Array1, Array2, Axis};
use uom::si::area::square_centimeter;
use uom::si::f64::{Energy, Time};
use uom::si::time::second;

use crate::errors::{Error, Result};
use crate::gbm_tools::rebin::{rebin, RebinParams};
use crate::gbm_tools::{column_quantity, energy_edges, slice_window, SliceParams};
use crate::parsers::fits::FitsFile;
use crate::time::{epoch_distance, met_to_epoch, TimeBound};
use crate::{Table, TableSource, DETECTOR_AREA};

/// Binned counts of one detector in CTIME or CSPEC mode.
///
/// `counts[[i, j]]` holds the counts of channel `j` in row `i`.
/// `time_bins[i]` and `time_bins[i + 1]` bound row `i`, so there is always
/// exactly one more edge than there are rows. `dt` is the live exposure of
/// each row and may be shorter than the edge spacing.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    counts: Array2<f64>,
    dt: Array1<Time>,
    time_bins: Vec<Epoch>,
    energy_bins: Array2<Energy>,
}

impl HistogramSeries {
    /// Fails with a Format error when the shapes do not line up.
    pub fn new(
        counts: Array2<f64>,
        dt: Array1<Time>,
        time_bins: Vec<Epoch>,
        energy_bins: Array2<Energy>,
    ) -> Result<Self> {
        let (rows, channels) = counts.dim();
        if time_bins.len() != rows + 1 || dt.len() != rows {
            return Err(Error::Format(format!(
                "{} count rows need {} time edges and {} exposures, got {} and {}",
                rows,
                rows + 1,
                rows,
                time_bins.len(),
                dt.len()
            )));
        }
        if energy_bins.dim() != (channels, 2) {
            return Err(Error::Format(format!(
                "{} count channels do not match energy bins of shape {:?}",
                channels,
                energy_bins.dim()
            )));
        }

        Ok(Self {
            counts,
            dt,
            time_bins,
            energy_bins,
        })
    }

    pub fn from_fits<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = FitsFile::open(path)?;
        Self::from_source(&f)
    }

    /// Read `EBOUNDS` and `SPECTRUM` tables.
    ///
    /// The start times in `SPECTRUM` give all but the last edge; the last
    /// edge is the start of the final row plus its exposure.
    pub fn from_source<S: TableSource>(source: &S) -> Result<Self> {
        let energy_bins = energy_edges(source.table("EBOUNDS")?, "E_MIN", "E_MAX")?;

        let spectrum = source.table("SPECTRUM")?;
        if spectrum.is_empty() {
            return Err(Error::Format(String::from("SPECTRUM table has no rows")));
        }
        let counts = spectrum.column_f64_2d("COUNTS")?;
        let exposure: Array1<Time> = column_quantity(spectrum, "EXPOSURE", "s")?;
        let starts: Array1<Time> = column_quantity(spectrum, "TIME", "s")?;

        let n = starts.len();
        let mut time_bins: Vec<Epoch> = starts
            .iter()
            .map(|t| met_to_epoch(t.get::<second>()))
            .collect();
        time_bins.push(met_to_epoch((starts[n - 1] + exposure[n - 1]).get::<second>()));

        debug!(
            "SPECTRUM: {} rows x {} channels",
            counts.nrows(),
            counts.ncols()
        );
        Self::new(counts, exposure, time_bins, energy_bins)
    }

    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn dt(&self) -> &Array1<Time> {
        &self.dt
    }

    pub fn time_bins(&self) -> &[Epoch] {
        &self.time_bins
    }

    /// `[channel][lo, hi]` energy bounds.
    pub fn energy_bins(&self) -> &Array2<Energy> {
        &self.energy_bins
    }

    pub fn rows(&self) -> usize {
        self.counts.nrows()
    }

    pub fn channels(&self) -> usize {
        self.counts.ncols()
    }

    /// Summed counts of each energy channel over the whole series.
    pub fn total_counts(&self) -> Array1<f64> {
        self.counts.sum_axis(Axis(0))
    }

    /// Counts per second of live time, row by row.
    pub fn count_rate(&self) -> Array2<f64> {
        let dt = self.dt.mapv(|d| d.get::<second>()).insert_axis(Axis(1));
        &self.counts / &dt
    }

    /// Counts per second of live time per cm² of detector area.
    pub fn count_flux(&self) -> Array2<f64> {
        self.count_rate() / DETECTOR_AREA.get::<square_centimeter>()
    }

    /// Rows between the edges nearest `start` and `end`.
    ///
    /// The edge nearest `start` becomes the first edge of the result and the
    /// edge nearest `end` its last edge. A bound outside the data, or closer
    /// to a neighbouring edge than intended, still resolves to the nearest
    /// edge unless `params` asks for strict bounds.
    pub fn slice<A, B>(&self, start: A, end: B, params: &SliceParams) -> Result<HistogramSeries>
    where
        A: Into<TimeBound>,
        B: Into<TimeBound>,
    {
        let start = start.into().resolve()?;
        let end = end.into().resolve()?;

        let (si, ei) = slice_window(&self.time_bins, start, end, params, epoch_distance)?
            .unwrap_or((0, 0));

        info!("slicing {} rows to [{}, {})", self.rows(), si, ei);
        Ok(HistogramSeries {
            counts: self.counts.slice(s![si..ei, ..]).to_owned(),
            dt: self.dt.slice(s![si..ei]).to_owned(),
            time_bins: self.time_bins[si..=ei].to_vec(),
            energy_bins: self.energy_bins.clone(),
        })
    }

    /// Merge short-exposure rows back onto the nominal cadence.
    pub fn rebin(&self, params: &RebinParams) -> Result<HistogramSeries> {
        rebin(self, params)
    }
}

/// Load a CTIME or CSPEC file.
pub fn load_ctime<P: AsRef<Path>>(path: P) -> Result<HistogramSeries> {
    HistogramSeries::from_fits(path)
}

/// Slice a series by UTC instants or ISO-8601 strings, nearest edge wins.
pub fn slice_ctime<A, B>(series: &HistogramSeries, start: A, end: B) -> Result<HistogramSeries>
where
    A: Into<TimeBound>,
    B: Into<TimeBound>,
{
    series.slice(start, end, &SliceParams::default())
}

/// Bin a series down to the nominal 256 ms cadence.
///
/// Returns rebinned data whose `dt` is the nominal cadence for every row.
pub fn bin_down_ctime(series: &HistogramSeries) -> Result<HistogramSeries> {
    rebin(series, &RebinParams::default())
}
