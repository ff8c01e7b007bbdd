use std::fmt::Display;
use std::path::Path;

use log::warn;
use ndarray::{stack, Array1, Array2, Axis, Zip};
use uom::si::f64::Energy;

use crate::errors::{Error, Result};
use crate::headers::DataMode;
use crate::parsers::fits::FitsFile;
use crate::time::nearest_sorted;
use crate::units::ColumnQuantity;
use crate::Table;

pub mod ctime;
pub mod rebin;
pub mod spectrogram;
pub mod srm;
pub mod tte;

use self::ctime::HistogramSeries;
use self::tte::TimeTaggedEventList;

/// What to do with a slice bound that lies outside the data.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BoundsPolicy {
    /// Resolve to the nearest sample. A bound past either end silently
    /// lands on the first or last sample.
    #[default]
    Nearest,
    /// Fail with `Error::OutOfRange`.
    Strict,
}

/// Parameters for the slice algorithms
///
/// ## Parameters
///   1. bounds: How bounds outside of the data time range are treated.
#[derive(Debug, Copy, Clone, Default)]
pub struct SliceParams {
    pub bounds: BoundsPolicy,
}

/// Indices of the samples nearest to `start` and `end`, after the bounds
/// policy has been applied. `None` when `values` is empty.
pub(crate) fn slice_window<T, D, F>(
    values: &[T],
    start: T,
    end: T,
    params: &SliceParams,
    distance: F,
) -> Result<Option<(usize, usize)>>
where
    T: PartialOrd + Copy + Display,
    D: PartialOrd,
    F: Fn(T, T) -> D,
{
    let (first, last) = match (values.first(), values.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Ok(None),
    };

    for bound in [start, end] {
        if bound < first || bound > last {
            match params.bounds {
                BoundsPolicy::Strict => {
                    return Err(Error::OutOfRange {
                        requested: bound.to_string(),
                        first: first.to_string(),
                        last: last.to_string(),
                    })
                }
                BoundsPolicy::Nearest => {
                    warn!("{} is outside [{}, {}], using the nearest sample", bound, first, last)
                }
            }
        }
    }

    let si = nearest_sorted(values, start, &distance).unwrap_or(0);
    let ei = nearest_sorted(values, end, &distance).unwrap_or(0);
    if ei < si {
        return Err(Error::InvertedRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(Some((si, ei)))
}

/// A numeric column read as quantities of its declared unit, or of
/// `default` when it declares none.
pub(crate) fn column_quantity<Q: ColumnQuantity, T: Table>(
    table: &T,
    name: &str,
    default: &str,
) -> Result<Array1<Q>> {
    let unit = Q::from_symbol(table.column_unit(name)?.unwrap_or(default))?;
    Ok(table.column_f64(name)?.mapv(unit))
}

/// `[row][lo, hi]` energy edges from a pair of columns.
pub(crate) fn energy_edges<T: Table>(table: &T, lo: &str, hi: &str) -> Result<Array2<Energy>> {
    let lo: Array1<Energy> = column_quantity(table, lo, "keV")?;
    let hi: Array1<Energy> = column_quantity(table, hi, "keV")?;
    stack(Axis(1), &[lo.view(), hi.view()])
        .map_err(|e| Error::Format(format!("energy edges: {}", e)))
}

/// Arithmetic mean and width of each `[lo, hi]` pair.
pub(crate) fn edge_mids_and_widths(edges: &Array2<Energy>) -> (Array1<Energy>, Array1<Energy>) {
    let lo = edges.column(0);
    let hi = edges.column(1);
    (
        Zip::from(&lo).and(&hi).map_collect(|&l, &h| (l + h) / 2.0),
        Zip::from(&lo).and(&hi).map_collect(|&l, &h| h - l),
    )
}

/// A GBM data product of any supported readout mode.
#[derive(Debug, Clone)]
pub enum Product {
    Histogram(HistogramSeries),
    Events(TimeTaggedEventList),
}

/// Open a GBM file and load it according to its `DATATYPE`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Product> {
    let f = FitsFile::open(path)?;
    match f.data_mode() {
        mode if mode.is_histogram() => Ok(Product::Histogram(HistogramSeries::from_source(&f)?)),
        DataMode::Tte => Ok(Product::Events(TimeTaggedEventList::from_source(&f)?)),
        _ => Err(Error::NotImplemented(format!(
            "{} does not declare a supported DATATYPE",
            f.path.display()
        ))),
    }
}
