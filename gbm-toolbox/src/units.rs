//! Physical quantities read from table columns.
//!
//! Energies and times are `uom` quantities. A column declares its unit with
//! an OGIP `TUNIT` string, which is resolved once per column into a
//! constructor for the matching quantity.
use uom::si::energy::{electronvolt, kiloelectronvolt, megaelectronvolt};
use uom::si::f64::{Energy, Time};
use uom::si::time::{microsecond, millisecond, second};

use crate::errors::{Error, Result};

/// A quantity that a numeric column can be read as.
pub trait ColumnQuantity: Sized {
    /// Name of the physical dimension, for error messages.
    const DIMENSION: &'static str;

    /// Constructor taking a value in the unit named by `symbol`.
    fn constructor(symbol: &str) -> Option<fn(f64) -> Self>;

    /// Like [`ColumnQuantity::constructor`], failing with
    /// [`Error::IncompatibleUnits`] for a symbol of another dimension.
    fn from_symbol(symbol: &str) -> Result<fn(f64) -> Self> {
        Self::constructor(symbol.trim()).ok_or_else(|| Error::IncompatibleUnits {
            from: symbol.to_string(),
            to: Self::DIMENSION.to_string(),
        })
    }
}

impl ColumnQuantity for Energy {
    const DIMENSION: &'static str = "energy";

    fn constructor(symbol: &str) -> Option<fn(f64) -> Self> {
        match symbol.to_ascii_lowercase().as_str() {
            "kev" => Some(Energy::new::<kiloelectronvolt>),
            "ev" => Some(Energy::new::<electronvolt>),
            "mev" => Some(Energy::new::<megaelectronvolt>),
            _ => None,
        }
    }
}

impl ColumnQuantity for Time {
    const DIMENSION: &'static str = "time";

    fn constructor(symbol: &str) -> Option<fn(f64) -> Self> {
        match symbol.to_ascii_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => Some(Time::new::<second>),
            "ms" => Some(Time::new::<millisecond>),
            "us" => Some(Time::new::<microsecond>),
            _ => None,
        }
    }
}
