use std::path::Path;

use log::{debug, info};
use ndarray::{Array, Array1, Array2, Dimension};
use uom::si::area::square_centimeter;
use uom::si::energy::kiloelectronvolt;
use uom::si::f64::{Area, Energy};

use crate::errors::{Error, Result};
use crate::gbm_tools::{edge_mids_and_widths, energy_edges};
use crate::headers::Attenuation;
use crate::parsers::fits::{FitsFile, HeaderValue};
use crate::{Table, TableSource};

/// A spectral response matrix ready for forward-folding photon models.
///
/// `srm[[i, j]]` is the effective area in cm² ct/ph for photons in photon
/// bin `i` to be counted in count channel `j`. Bins, mids and binning are
/// in keV.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseGeometry {
    pub srm: Array2<f64>,
    pub photon_channel_bins: Array2<f64>,
    pub photon_channel_mids: Array1<f64>,
    pub photon_channel_binning: Array1<f64>,
    pub count_channel_bins: Array2<f64>,
    pub count_channel_mids: Array1<f64>,
    pub count_channel_binning: Array1<f64>,
    /// Geometric area of the detector.
    pub area: Area,
}

fn in_kev<D: Dimension>(energies: &Array<Energy, D>) -> Array<f64, D> {
    energies.mapv(|e| e.get::<kiloelectronvolt>())
}

impl ResponseGeometry {
    pub fn from_fits<P: AsRef<Path>>(path: P, attenuation: Attenuation) -> Result<Self> {
        let f = FitsFile::open(path)?;
        Self::from_source(&f, attenuation)
    }

    /// Read the matrix table of the given attenuator state and `EBOUNDS`.
    ///
    /// The stored matrix, in ct/keV/ph, is scaled by the geometric area and
    /// by the width of each count channel.
    pub fn from_source<S: TableSource>(source: &S, attenuation: Attenuation) -> Result<Self> {
        let table = source.table_at(attenuation.hdu_index())?;
        let geoarea = table
            .header()
            .get("GEOAREA")
            .and_then(HeaderValue::as_f64)
            .ok_or_else(|| Error::Format(String::from("response table has no numeric GEOAREA")))?;

        // the matrix column unit is fixed, whatever TUNIT says
        let matrix = table.column_f64_2d("MATRIX")?;
        let photon_edges = energy_edges(table, "ENERG_LO", "ENERG_HI")?;
        let count_edges = energy_edges(source.table("EBOUNDS")?, "E_MIN", "E_MAX")?;

        if matrix.dim() != (photon_edges.nrows(), count_edges.nrows()) {
            return Err(Error::Format(format!(
                "MATRIX of shape {:?} does not map {} photon bins onto {} count channels",
                matrix.dim(),
                photon_edges.nrows(),
                count_edges.nrows()
            )));
        }
        debug!(
            "{} response: {} photon bins x {} count channels, GEOAREA {} cm2",
            attenuation,
            matrix.nrows(),
            matrix.ncols(),
            geoarea
        );

        let (photon_mids, photon_widths) = edge_mids_and_widths(&photon_edges);
        let (count_mids, count_widths) = edge_mids_and_widths(&count_edges);

        // MATRIX is in ct/keV/ph; scaling by cm2 and keV leaves cm2 ct/ph
        let scale = count_widths.mapv(|w| geoarea * w.get::<kiloelectronvolt>());
        let srm = &matrix * &scale;

        info!("loaded {} response matrix {:?}", attenuation, srm.dim());
        Ok(Self {
            srm,
            photon_channel_bins: in_kev(&photon_edges),
            photon_channel_mids: in_kev(&photon_mids),
            photon_channel_binning: in_kev(&photon_widths),
            count_channel_bins: in_kev(&count_edges),
            count_channel_mids: in_kev(&count_mids),
            count_channel_binning: in_kev(&count_widths),
            area: Area::new::<square_centimeter>(geoarea),
        })
    }
}

/// Load a STIX response matrix for spectral fitting.
///
/// `which` is `"unattenuated"` or `"attenuated"`; anything else fails with
/// an InvalidChoice error before the file is opened.
pub fn srm_for_fit<P: AsRef<Path>>(path: P, which: &str) -> Result<ResponseGeometry> {
    let attenuation: Attenuation = which.parse()?;
    ResponseGeometry::from_fits(path, attenuation)
}
