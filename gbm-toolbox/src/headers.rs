use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Detector readout mode of a GBM file, from the primary `DATATYPE` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Ctime,
    Cspec,
    Tte,
    NotImplemented,
}

impl DataMode {
    pub fn from_keyword(datatype: &str) -> Self {
        match datatype.trim().to_ascii_uppercase().as_str() {
            "CTIME" => DataMode::Ctime,
            "CSPEC" => DataMode::Cspec,
            "TTE" => DataMode::Tte,
            _ => DataMode::NotImplemented,
        }
    }

    /// Whether the file stores binned counts in a `SPECTRUM` table.
    pub fn is_histogram(&self) -> bool {
        matches!(self, DataMode::Ctime | DataMode::Cspec)
    }
}

/// Attenuator state of a STIX response file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    Unattenuated,
    Attenuated,
}

impl Attenuation {
    /// HDU holding the response matrix for this state.
    pub fn hdu_index(&self) -> usize {
        match self {
            Attenuation::Unattenuated => 1,
            Attenuation::Attenuated => 4,
        }
    }
}

impl FromStr for Attenuation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "unattenuated" => Ok(Attenuation::Unattenuated),
            "attenuated" => Ok(Attenuation::Attenuated),
            other => Err(Error::InvalidChoice {
                choice: other.to_string(),
                expected: String::from("attenuated, unattenuated"),
            }),
        }
    }
}

impl fmt::Display for Attenuation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Attenuation::Unattenuated => write!(f, "unattenuated"),
            Attenuation::Attenuated => write!(f, "attenuated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attenuation_choices() {
        assert_eq!("unattenuated".parse::<Attenuation>().unwrap().hdu_index(), 1);
        assert_eq!("attenuated".parse::<Attenuation>().unwrap().hdu_index(), 4);
        assert!(matches!(
            "bogus".parse::<Attenuation>(),
            Err(Error::InvalidChoice { .. })
        ));
    }

    #[test]
    fn data_mode_from_datatype() {
        assert_eq!(DataMode::from_keyword("CTIME "), DataMode::Ctime);
        assert_eq!(DataMode::from_keyword("tte"), DataMode::Tte);
        assert!(DataMode::from_keyword("CSPEC").is_histogram());
        assert_eq!(DataMode::from_keyword("POSHIST"), DataMode::NotImplemented);
    }
}
