pub mod bintable;
pub mod header;

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::Error;
use crate::headers::DataMode;
use crate::TableSource;

use self::bintable::BinTable;
use self::header::{data_size, read_header, BLOCK_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Empty,
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl HeaderValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(x) => Some(*x as f64),
            HeaderValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Keyword/value pairs of one header unit, in file order.
#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later cards with the same keyword replace earlier ones.
    pub fn insert(&mut self, key: String, value: HeaderValue) {
        let key = key.to_ascii_uppercase();
        match self.cards.iter_mut().find(|(k, _)| *k == key) {
            Some(card) => card.1 = value,
            None => self.cards.push((key, value)),
        }
    }

    pub fn get<K: AsRef<str>>(&self, key: K) -> Option<&HeaderValue> {
        let key = key.as_ref();
        self.cards
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, HeaderValue)> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// One header-data unit. Only binary table extensions keep their data.
#[derive(Debug)]
pub struct Hdu {
    pub index: usize,
    pub header: Header,
    pub table: Option<BinTable>,
}

impl Hdu {
    pub fn name(&self) -> Option<&str> {
        self.header.get("EXTNAME").and_then(HeaderValue::as_str)
    }
}

/// Contents of a FITS file, read in full when opened.
#[derive(Debug)]
pub struct FitsFile {
    pub path: PathBuf,
    pub hdus: Vec<Hdu>,
}

impl FitsFile {
    /// Read every header-data unit of a FITS file.
    ///
    /// If the file does not exist a FileNotAvailable error will be returned.
    /// The file handle is closed before this returns, on success or failure.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self, Error> {
        let filename = filename.as_ref().to_path_buf();
        if !filename.exists() {
            return Err(Error::FileNotAvailable(filename.display().to_string()));
        }

        let mut buffered = BufReader::new(fs::File::open(&filename)?);
        if !buffered.fill_buf()?.starts_with(b"SIMPLE  =") {
            return Err(Error::InvalidHeader(format!(
                "{} is not a FITS file",
                filename.display()
            )));
        }
        let mut hdus = Vec::new();

        while !buffered.fill_buf()?.is_empty() {
            let index = hdus.len();
            let header = read_header(&mut buffered)?;
            if index == 0 && header.get("SIMPLE") != Some(&HeaderValue::Logical(true)) {
                return Err(Error::InvalidHeader(format!(
                    "{} is not a FITS file (missing SIMPLE = T)",
                    filename.display()
                )));
            }

            let size = data_size(&header)?;
            let padded = size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
            let is_table = header.get("XTENSION").and_then(HeaderValue::as_str) == Some("BINTABLE");

            let table = if is_table {
                let mut data = vec![0; size];
                buffered.read_exact(&mut data)?;
                // the final block of a file is sometimes written without padding
                std::io::copy(&mut (&mut buffered).take((padded - size) as u64), &mut std::io::sink())?;
                Some(BinTable::new(&header, data)?)
            } else {
                std::io::copy(&mut (&mut buffered).take(padded as u64), &mut std::io::sink())?;
                None
            };

            let hdu = Hdu {
                index,
                header,
                table,
            };
            debug!(
                "{}: HDU {} {:?} ({} data bytes)",
                filename.display(),
                index,
                hdu.name().unwrap_or("PRIMARY"),
                size
            );
            hdus.push(hdu);
        }

        if hdus.is_empty() {
            return Err(Error::InvalidHeader(format!("{} is empty", filename.display())));
        }
        Ok(Self {
            path: filename,
            hdus,
        })
    }

    pub fn primary_header(&self) -> &Header {
        &self.hdus[0].header
    }

    pub fn hdu(&self, name: &str) -> Option<&Hdu> {
        self.hdus
            .iter()
            .find(|h| h.name().map_or(false, |n| n.eq_ignore_ascii_case(name)))
    }

    /// Readout mode from the `DATATYPE` keyword of the primary header.
    pub fn data_mode(&self) -> DataMode {
        self.primary_header()
            .get("DATATYPE")
            .and_then(HeaderValue::as_str)
            .map(DataMode::from_keyword)
            .unwrap_or(DataMode::NotImplemented)
    }
}

impl TableSource for FitsFile {
    type Table = BinTable;

    fn table(&self, name: &str) -> Result<&BinTable, Error> {
        let hdu = self
            .hdu(name)
            .ok_or_else(|| Error::Format(format!("no {} table in {}", name, self.path.display())))?;
        hdu.table
            .as_ref()
            .ok_or_else(|| Error::Format(format!("{} is not a binary table", name)))
    }

    fn table_at(&self, index: usize) -> Result<&BinTable, Error> {
        let hdu = self.hdus.get(index).ok_or_else(|| {
            Error::Format(format!("{} has no HDU {}", self.path.display(), index))
        })?;
        hdu.table
            .as_ref()
            .ok_or_else(|| Error::Format(format!("HDU {} is not a binary table", index)))
    }
}

impl std::fmt::Display for FitsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut string = String::from("");
        for hdu in &self.hdus {
            string.push_str(&format!("HDU {} {}\n", hdu.index, hdu.name().unwrap_or("PRIMARY")));
            for (key, value) in hdu.header.iter() {
                string.push_str(&format!("  {:<8}: {}\n", key, value));
            }
        }
        write!(f, "{}", string)
    }
}
