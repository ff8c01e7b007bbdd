use std::io;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("File {0} does not exist.")]
    FileNotAvailable(String),
    #[error("IO error.")]
    IOError(#[from] io::Error),
    #[error("A different enum variant was expected.")]
    WrongEnumVariant,
    #[error("{0}")]
    InvalidHeader(String),
    #[error("{0}")]
    NotImplemented(String),
    /// A required table, column or keyword is missing or malformed.
    #[error("format error: {0}")]
    Format(String),
    #[error("{choice} is not a valid attenuator choice (choose from {expected})")]
    InvalidChoice { choice: String, expected: String },
    /// Rebinning across non-finite counts is refused.
    #[error("can only rebin when there are no data gaps (non-finite counts at row {row}, channel {channel})")]
    DataGap { row: usize, channel: usize },
    #[error("no whole bin of {dt} s fits between {start} and {end}")]
    EmptyRange { start: String, end: String, dt: f64 },
    #[error("requested time {requested} is outside the data range [{first}, {last}]")]
    OutOfRange {
        requested: String,
        first: String,
        last: String,
    },
    #[error("slice end {end} resolves before slice start {start}")]
    InvertedRange { start: String, end: String },
    #[error("cannot convert {from} to {to}")]
    IncompatibleUnits { from: String, to: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("could not parse time: {0}")]
    TimeParse(String),
    #[error("npz export failed: {0}")]
    Export(String),
}
