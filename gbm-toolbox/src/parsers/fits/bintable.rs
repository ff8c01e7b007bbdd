use byteorder::{BigEndian, ReadBytesExt};
use ndarray::{Array1, Array2};
use num_traits::FromPrimitive;

use gbm_toolbox_proc_macros::read_fits_key;

use crate::errors::Error;
use crate::parsers::fits::{Header, HeaderValue};
use crate::Table;

/// Data type letter of a `TFORMn` keyword.
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Logical = 0x4C,         // L
    Bit = 0x58,             // X
    Byte = 0x42,            // B
    Short = 0x49,           // I
    Int = 0x4A,             // J
    Long = 0x4B,            // K
    Char = 0x41,            // A
    Float = 0x45,           // E
    Double = 0x44,          // D
    Complex = 0x43,         // C
    DoubleComplex = 0x4D,   // M
    ArrayDescriptor = 0x50, // P
    LongDescriptor = 0x51,  // Q
}

impl ColumnType {
    fn element_size(&self) -> usize {
        match self {
            ColumnType::Logical | ColumnType::Byte | ColumnType::Char | ColumnType::Bit => 1,
            ColumnType::Short => 2,
            ColumnType::Int | ColumnType::Float => 4,
            ColumnType::Long | ColumnType::Double | ColumnType::Complex => 8,
            ColumnType::ArrayDescriptor => 8,
            ColumnType::DoubleComplex | ColumnType::LongDescriptor => 16,
        }
    }

    fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::Byte | ColumnType::Short | ColumnType::Int | ColumnType::Long
        )
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
    pub repeat: usize,
    pub unit: Option<String>,
    pub scale: f64,
    pub zero: f64,
    offset: usize,
}

impl Column {
    fn width(&self) -> usize {
        match self.kind {
            ColumnType::Bit => self.repeat.div_ceil(8),
            kind => self.repeat * kind.element_size(),
        }
    }
}

/// Parses `rT...`: an optional repeat count followed by the type letter.
fn parse_tform(tform: &str) -> Result<(usize, ColumnType), Error> {
    let tform = tform.trim();
    let split = tform
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| Error::InvalidHeader(format!("Invalid TFORM {}", tform)))?;
    let repeat = if split == 0 {
        1
    } else {
        tform[..split]
            .parse::<usize>()
            .map_err(|_| Error::InvalidHeader(format!("Invalid TFORM {}", tform)))?
    };
    let letter = tform.as_bytes()[split].to_ascii_uppercase();
    let kind: ColumnType = FromPrimitive::from_u8(letter)
        .ok_or_else(|| Error::InvalidHeader(format!("Invalid TFORM type {}", tform)))?;
    Ok((repeat, kind))
}

/// A decoded `BINTABLE` extension: its header, column layout and row bytes.
#[derive(Debug)]
pub struct BinTable {
    header: Header,
    columns: Vec<Column>,
    row_width: usize,
    rows: usize,
    data: Vec<u8>,
}

impl BinTable {
    pub(crate) fn new(header: &Header, data: Vec<u8>) -> Result<Self, Error> {
        let row_width: i64 = read_fits_key!(header["NAXIS1"] as Integer);
        let rows: i64 = read_fits_key!(header["NAXIS2"] as Integer);
        let fields: i64 = read_fits_key!(header["TFIELDS"] as Integer);

        let field_count = usize::try_from(fields)
            .map_err(|_| Error::InvalidHeader(format!("TFIELDS = {}", fields)))?;

        let mut columns = Vec::with_capacity(field_count);
        let mut offset = 0;
        for i in 1..=fields {
            let name: String = read_fits_key!(header[format!("TTYPE{}", i)] as Text);
            let tform: String = read_fits_key!(header[format!("TFORM{}", i)] as Text);
            let (repeat, kind) = parse_tform(&tform)?;
            let unit = header
                .get(format!("TUNIT{}", i))
                .and_then(HeaderValue::as_str)
                .filter(|u| !u.is_empty())
                .map(String::from);
            let scale = header.get(format!("TSCAL{}", i)).and_then(HeaderValue::as_f64);
            let zero = header.get(format!("TZERO{}", i)).and_then(HeaderValue::as_f64);

            let column = Column {
                name,
                kind,
                repeat,
                unit,
                scale: scale.unwrap_or(1.0),
                zero: zero.unwrap_or(0.0),
                offset,
            };
            offset += column.width();
            columns.push(column);
        }

        if offset != row_width as usize {
            return Err(Error::InvalidHeader(format!(
                "columns span {} bytes but NAXIS1 is {}",
                offset, row_width
            )));
        }
        let rows = usize::try_from(rows)
            .map_err(|_| Error::InvalidHeader(format!("NAXIS2 = {}", rows)))?;
        if data.len() < rows.saturating_mul(offset) {
            return Err(Error::InvalidHeader(format!(
                "table holds {} bytes, expected {}",
                data.len(),
                rows.saturating_mul(offset)
            )));
        }

        Ok(Self {
            header: header.clone(),
            columns,
            row_width: offset,
            rows,
            data,
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Result<&Column, Error> {
        let extname = self
            .header
            .get("EXTNAME")
            .and_then(HeaderValue::as_str)
            .unwrap_or("table");
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Format(format!("{} has no {} column", extname, name)))
    }

    fn cell(&self, column: &Column, row: usize) -> &[u8] {
        let start = row * self.row_width + column.offset;
        &self.data[start..start + column.width()]
    }

    /// Physical element values of one cell, with TSCAL/TZERO applied.
    fn read_cell(&self, column: &Column, row: usize, out: &mut [f64]) -> Result<(), Error> {
        let mut cell = self.cell(column, row);
        match column.kind {
            ColumnType::Byte => {
                for x in out.iter_mut() {
                    *x = cell.read_u8()? as f64;
                }
            }
            ColumnType::Short => {
                for x in out.iter_mut() {
                    *x = cell.read_i16::<BigEndian>()? as f64;
                }
            }
            ColumnType::Int => {
                for x in out.iter_mut() {
                    *x = cell.read_i32::<BigEndian>()? as f64;
                }
            }
            ColumnType::Long => {
                for x in out.iter_mut() {
                    *x = cell.read_i64::<BigEndian>()? as f64;
                }
            }
            ColumnType::Float => {
                for x in out.iter_mut() {
                    *x = cell.read_f32::<BigEndian>()? as f64;
                }
            }
            ColumnType::Double => cell.read_f64_into::<BigEndian>(out)?,
            ColumnType::Logical => {
                for x in out.iter_mut() {
                    *x = if cell.read_u8()? == b'T' { 1.0 } else { 0.0 };
                }
            }
            kind => {
                return Err(Error::NotImplemented(format!(
                    "column {} has unsupported type {:?}",
                    column.name, kind
                )))
            }
        }
        if column.kind != ColumnType::Logical && (column.scale != 1.0 || column.zero != 0.0) {
            for x in out.iter_mut() {
                *x = column.zero + column.scale * *x;
            }
        }
        Ok(())
    }

    fn read_column(&self, column: &Column) -> Result<Vec<f64>, Error> {
        let mut values = vec![0.0; self.rows * column.repeat];
        if column.repeat == 0 {
            return Ok(values);
        }
        for (row, chunk) in values.chunks_mut(column.repeat).enumerate() {
            self.read_cell(column, row, chunk)?;
        }
        Ok(values)
    }
}

impl Table for BinTable {
    fn len(&self) -> usize {
        self.rows
    }

    fn header(&self) -> &Header {
        &self.header
    }

    fn column_unit(&self, name: &str) -> Result<Option<&str>, Error> {
        Ok(self.column(name)?.unit.as_deref())
    }

    fn column_f64(&self, name: &str) -> Result<Array1<f64>, Error> {
        let column = self.column(name)?;
        if column.repeat != 1 {
            return Err(Error::Format(format!(
                "{} holds {} values per row, expected a scalar column",
                column.name, column.repeat
            )));
        }
        Ok(Array1::from(self.read_column(column)?))
    }

    fn column_f64_2d(&self, name: &str) -> Result<Array2<f64>, Error> {
        let column = self.column(name)?;
        let values = self.read_column(column)?;
        Array2::from_shape_vec((self.rows, column.repeat), values)
            .map_err(|e| Error::Format(format!("{}: {}", column.name, e)))
    }

    fn column_i64(&self, name: &str) -> Result<Vec<i64>, Error> {
        let column = self.column(name)?;
        let integral_zero = column.zero.fract() == 0.0 && column.scale == 1.0;
        if !column.kind.is_integer() || !integral_zero || column.repeat != 1 {
            return Err(Error::Format(format!(
                "{} is not a scalar integer column ({}{:?})",
                column.name, column.repeat, column.kind
            )));
        }
        let zero = column.zero as i64;
        let mut values = Vec::with_capacity(self.rows);
        for row in 0..self.rows {
            let mut cell = self.cell(column, row);
            let raw = match column.kind {
                ColumnType::Byte => cell.read_u8()? as i64,
                ColumnType::Short => cell.read_i16::<BigEndian>()? as i64,
                ColumnType::Int => cell.read_i32::<BigEndian>()? as i64,
                _ => cell.read_i64::<BigEndian>()?,
            };
            values.push(raw + zero);
        }
        Ok(values)
    }
}
