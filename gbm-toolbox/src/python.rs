//! Python bindings, built with the `python` feature.
//!
//! Instants cross the boundary as ISO-8601 UTC strings and arrays as numpy
//! arrays.
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::errors::Error;
use crate::gbm_tools::ctime::{self, HistogramSeries};
use crate::gbm_tools::spectrogram::SpectrogramParams;
use crate::gbm_tools::srm;
use crate::gbm_tools::tte::TimeTaggedEventList;
use crate::gbm_tools::{BoundsPolicy, SliceParams};
use crate::time::parse_iso;
use hifitime::Epoch;
use uom::si::area::square_centimeter;
use uom::si::energy::kiloelectronvolt;
use uom::si::f64::Time;
use uom::si::time::second;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        match err {
            Error::IOError(e) => PyIOError::new_err(e.to_string()),
            Error::FileNotAvailable(_) => PyIOError::new_err(err.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

fn iso_strings(instants: &[Epoch]) -> Vec<String> {
    instants.iter().map(|t| t.to_string()).collect()
}

/// Binned CTIME/CSPEC counts.
#[pyclass(name = "HistogramSeries", frozen)]
#[derive(Clone)]
pub struct PyHistogramSeries {
    inner: HistogramSeries,
}

#[pymethods]
impl PyHistogramSeries {
    #[getter]
    fn counts<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner.counts().clone().into_pyarray(py)
    }

    /// Live exposure of each row in seconds.
    #[getter]
    fn dt<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        self.inner.dt().mapv(|d| d.get::<second>()).into_pyarray(py)
    }

    #[getter]
    fn time_bins(&self) -> Vec<String> {
        iso_strings(self.inner.time_bins())
    }

    /// `[channel][lo, hi]` in keV.
    #[getter]
    fn energy_bins<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        self.inner
            .energy_bins()
            .mapv(|e| e.get::<kiloelectronvolt>())
            .into_pyarray(py)
    }

    fn __len__(&self) -> usize {
        self.inner.rows()
    }

    fn __repr__(&self) -> String {
        format!(
            "HistogramSeries(rows={}, channels={})",
            self.inner.rows(),
            self.inner.channels()
        )
    }
}

#[pyfunction]
fn load_ctime(path: &str) -> PyResult<PyHistogramSeries> {
    Ok(PyHistogramSeries {
        inner: ctime::load_ctime(path)?,
    })
}

/// Rows between the edges nearest `start` and `end` (ISO-8601 strings).
#[pyfunction]
#[pyo3(signature = (series, start, end, strict=false))]
fn slice_ctime(
    series: &PyHistogramSeries,
    start: &str,
    end: &str,
    strict: bool,
) -> PyResult<PyHistogramSeries> {
    let params = SliceParams {
        bounds: if strict {
            BoundsPolicy::Strict
        } else {
            BoundsPolicy::Nearest
        },
    };
    Ok(PyHistogramSeries {
        inner: series.inner.slice(start, end, &params)?,
    })
}

#[pyfunction]
fn bin_down_ctime(series: &PyHistogramSeries) -> PyResult<PyHistogramSeries> {
    Ok(PyHistogramSeries {
        inner: ctime::bin_down_ctime(&series.inner)?,
    })
}

/// Load a TTE file, optionally narrow it, and bin it into a spectrogram.
///
/// Returns a dict with `time_bins` (ISO strings) and `spectrogram`
/// (`[channel][time]` counts).
#[pyfunction]
#[pyo3(signature = (path, start, end, dt, slice=false))]
fn bin_tte_to_spectrogram<'py>(
    py: Python<'py>,
    path: &str,
    start: &str,
    end: &str,
    dt: f64,
    slice: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let (start_t, end_t) = (parse_iso(start)?, parse_iso(end)?);
    let mut events = TimeTaggedEventList::from_fits(path)?;
    if slice {
        events = events.slice(start_t, end_t, &SliceParams::default())?;
    }
    let spectrogram = events.bin_to_spectrogram(&SpectrogramParams {
        start: start_t,
        end: end_t,
        dt: Time::new::<second>(dt),
    })?;

    let dict = PyDict::new(py);
    dict.set_item("time_bins", iso_strings(&spectrogram.time_bins))?;
    dict.set_item("spectrogram", spectrogram.counts.into_pyarray(py))?;
    Ok(dict)
}

/// Response matrix and binning for spectral fitting, as a dict.
#[pyfunction]
#[pyo3(signature = (path, which="unattenuated"))]
fn srm_for_fit<'py>(py: Python<'py>, path: &str, which: &str) -> PyResult<Bound<'py, PyDict>> {
    let r = srm::srm_for_fit(path, which)?;
    let dict = PyDict::new(py);
    dict.set_item("srm", r.srm.into_pyarray(py))?;
    dict.set_item("photon_channel_bins", r.photon_channel_bins.into_pyarray(py))?;
    dict.set_item("photon_channel_mids", r.photon_channel_mids.into_pyarray(py))?;
    dict.set_item("photon_channel_binning", r.photon_channel_binning.into_pyarray(py))?;
    dict.set_item("count_channel_bins", r.count_channel_bins.into_pyarray(py))?;
    dict.set_item("count_channel_mids", r.count_channel_mids.into_pyarray(py))?;
    dict.set_item("count_channel_binning", r.count_channel_binning.into_pyarray(py))?;
    dict.set_item("area", r.area.get::<square_centimeter>())?;
    Ok(dict)
}

#[pymodule]
fn gbm_toolbox(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyHistogramSeries>()?;
    m.add_function(wrap_pyfunction!(load_ctime, m)?)?;
    m.add_function(wrap_pyfunction!(slice_ctime, m)?)?;
    m.add_function(wrap_pyfunction!(bin_down_ctime, m)?)?;
    m.add_function(wrap_pyfunction!(bin_tte_to_spectrogram, m)?)?;
    m.add_function(wrap_pyfunction!(srm_for_fit, m)?)?;
    Ok(())
}
