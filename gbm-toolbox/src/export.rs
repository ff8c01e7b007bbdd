//! NumPy `.npz` archives of derived products.
//!
//! Instants are written as seconds since the mission epoch, durations in
//! seconds, energies in keV and areas in cm².
use std::fs::File;
use std::path::Path;

use hifitime::Epoch;
use ndarray::{arr0, Array1};
use ndarray_npy::NpzWriter;
use uom::si::area::square_centimeter;
use uom::si::energy::kiloelectronvolt;
use uom::si::time::second;

use crate::errors::{Error, Result};
use crate::gbm_tools::ctime::HistogramSeries;
use crate::gbm_tools::spectrogram::Spectrogram;
use crate::gbm_tools::srm::ResponseGeometry;
use crate::time::epoch_to_met;

fn met_array(instants: &[Epoch]) -> Array1<f64> {
    instants.iter().map(|t| epoch_to_met(*t)).collect()
}

fn npz_writer<P: AsRef<Path>>(path: P) -> Result<NpzWriter<File>> {
    Ok(NpzWriter::new(File::create(path)?))
}

macro_rules! add_arrays {
    ($npz:expr, $($name:literal => $array:expr),+ $(,)?) => {
        $(
            $npz
                .add_array($name, $array)
                .map_err(|e| Error::Export(format!("{}: {}", $name, e)))?;
        )+
    };
}

/// Arrays `counts`, `dt`, `time_bins` and `energy_bins`.
pub fn write_series_npz<P: AsRef<Path>>(series: &HistogramSeries, path: P) -> Result<()> {
    let mut npz = npz_writer(path)?;
    add_arrays!(npz,
        "counts" => series.counts(),
        "dt" => &series.dt().mapv(|d| d.get::<second>()),
        "time_bins" => &met_array(series.time_bins()),
        "energy_bins" => &series.energy_bins().mapv(|e| e.get::<kiloelectronvolt>()),
    );
    npz.finish().map_err(|e| Error::Export(e.to_string()))?;
    Ok(())
}

/// Arrays `spectrogram` and `time_bins`.
pub fn write_spectrogram_npz<P: AsRef<Path>>(spectrogram: &Spectrogram, path: P) -> Result<()> {
    let mut npz = npz_writer(path)?;
    add_arrays!(npz,
        "spectrogram" => &spectrogram.counts,
        "time_bins" => &met_array(&spectrogram.time_bins),
    );
    npz.finish().map_err(|e| Error::Export(e.to_string()))?;
    Ok(())
}

pub fn write_response_npz<P: AsRef<Path>>(response: &ResponseGeometry, path: P) -> Result<()> {
    let mut npz = npz_writer(path)?;
    add_arrays!(npz,
        "srm" => &response.srm,
        "photon_channel_bins" => &response.photon_channel_bins,
        "photon_channel_mids" => &response.photon_channel_mids,
        "photon_channel_binning" => &response.photon_channel_binning,
        "count_channel_bins" => &response.count_channel_bins,
        "count_channel_mids" => &response.count_channel_mids,
        "count_channel_binning" => &response.count_channel_binning,
        "area" => &arr0(response.area.get::<square_centimeter>()),
    );
    npz.finish().map_err(|e| Error::Export(e.to_string()))?;
    Ok(())
}
