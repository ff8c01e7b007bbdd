#[macro_use]
extern crate num_derive;
extern crate byteorder;

pub mod errors;
pub mod export;
pub mod gbm_tools;
pub mod headers;
pub mod parsers;
#[cfg(feature = "python")]
mod python;
pub mod time;
pub mod units;

use std::sync::LazyLock;

use hifitime::{Epoch, TimeScale};
use ndarray::{Array1, Array2};
use uom::si::area::square_centimeter;
use uom::si::f64::{Area, Time};
use uom::si::time::millisecond;

use crate::parsers::fits::Header;

pub use crate::gbm_tools::ctime::{bin_down_ctime, load_ctime, slice_ctime, HistogramSeries};
pub use crate::gbm_tools::spectrogram::{Spectrogram, SpectrogramParams};
pub use crate::gbm_tools::srm::{srm_for_fit, ResponseGeometry};
pub use crate::gbm_tools::tte::TimeTaggedEventList;

/// Reference instant for every raw GBM time value (Fermi MET), held in TAI
/// so that offsets from it count leap seconds.
pub static MISSION_EPOCH: LazyLock<Epoch> = LazyLock::new(|| {
    Epoch::from_gregorian_utc_hms(2001, 1, 1, 0, 0, 0).to_time_scale(TimeScale::TAI)
});

/// Cadence of CTIME data outside of burst mode.
pub static NOMINAL_DT: LazyLock<Time> = LazyLock::new(|| Time::new::<millisecond>(256.0));
/// Cadence of CTIME data while the burst trigger is active.
pub static NOMINAL_BURST_DT: LazyLock<Time> = LazyLock::new(|| Time::new::<millisecond>(64.0));
/// Geometric area of one GBM NaI detector.
pub static DETECTOR_AREA: LazyLock<Area> =
    LazyLock::new(|| Area::new::<square_centimeter>(100.0));

/// A named table of equal-length columns plus its scalar header.
pub trait Table {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn header(&self) -> &Header;
    /// The `TUNIT` string of a column, if one is declared.
    fn column_unit(&self, name: &str) -> Result<Option<&str>, errors::Error>;
    fn column_f64(&self, name: &str) -> Result<Array1<f64>, errors::Error>;
    /// A vector-valued column as a `[row][element]` array.
    fn column_f64_2d(&self, name: &str) -> Result<Array2<f64>, errors::Error>;
    fn column_i64(&self, name: &str) -> Result<Vec<i64>, errors::Error>;
}

/// Anything that can hand out tables by name or by position. Index 0 is the
/// primary unit of the file.
pub trait TableSource {
    type Table: Table;
    fn table(&self, name: &str) -> Result<&Self::Table, errors::Error>;
    fn table_at(&self, index: usize) -> Result<&Self::Table, errors::Error>;
}
