//! Writes small synthetic FITS files with binary-table extensions.
#![allow(dead_code)]

use std::fs;
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};

const BLOCK: usize = 2880;

pub struct Column {
    name: String,
    tform: String,
    unit: Option<String>,
    rows: Vec<Vec<u8>>,
}

impl Column {
    pub fn f64(name: &str, values: &[f64]) -> Self {
        Self::build(name, "D", values, |b, v| b.write_f64::<BigEndian>(*v))
    }

    pub fn f32(name: &str, values: &[f32]) -> Self {
        Self::build(name, "E", values, |b, v| b.write_f32::<BigEndian>(*v))
    }

    pub fn i16(name: &str, values: &[i16]) -> Self {
        Self::build(name, "I", values, |b, v| b.write_i16::<BigEndian>(*v))
    }

    pub fn i32(name: &str, values: &[i32]) -> Self {
        Self::build(name, "J", values, |b, v| b.write_i32::<BigEndian>(*v))
    }

    /// A vector column holding `rows[i]` in row `i`; every row has the same width.
    pub fn f32_vec(name: &str, rows: &[Vec<f32>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let rows = rows
            .iter()
            .map(|r| {
                let mut b = Vec::new();
                for v in r {
                    b.write_f32::<BigEndian>(*v).unwrap();
                }
                b
            })
            .collect();
        Self {
            name: name.to_string(),
            tform: format!("{}E", width),
            unit: None,
            rows,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }

    fn build<T>(
        name: &str,
        tform: &str,
        values: &[T],
        write: impl Fn(&mut Vec<u8>, &T) -> std::io::Result<()>,
    ) -> Self {
        let rows = values
            .iter()
            .map(|v| {
                let mut b = Vec::new();
                write(&mut b, v).unwrap();
                b
            })
            .collect();
        Self {
            name: name.to_string(),
            tform: tform.to_string(),
            unit: None,
            rows,
        }
    }
}

pub struct Table {
    name: String,
    keys: Vec<(String, String)>,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            keys: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// A header keyword with its value written exactly as given.
    pub fn key(mut self, key: &str, raw: &str) -> Self {
        self.keys.push((key.to_string(), raw.to_string()));
        self
    }
}

#[derive(Default)]
pub struct FitsWriter {
    primary: Vec<(String, String)>,
    tables: Vec<Table>,
}

impl FitsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_key(mut self, key: &str, raw: &str) -> Self {
        self.primary.push((key.to_string(), raw.to_string()));
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) {
        let mut out = Vec::new();

        let mut cards = vec![
            card("SIMPLE", "T"),
            card("BITPIX", "8"),
            card("NAXIS", "0"),
            card("EXTEND", "T"),
        ];
        cards.extend(self.primary.iter().map(|(k, v)| card(k, v)));
        push_header(&mut out, cards);

        for table in &self.tables {
            let rows = table.columns.first().map_or(0, |c| c.rows.len());
            let width: usize = table
                .columns
                .iter()
                .map(|c| c.rows.first().map_or(0, Vec::len))
                .sum();

            let mut cards = vec![
                card("XTENSION", "'BINTABLE'"),
                card("BITPIX", "8"),
                card("NAXIS", "2"),
                card("NAXIS1", &width.to_string()),
                card("NAXIS2", &rows.to_string()),
                card("PCOUNT", "0"),
                card("GCOUNT", "1"),
                card("TFIELDS", &table.columns.len().to_string()),
                card("EXTNAME", &text(&table.name)),
            ];
            for (i, c) in table.columns.iter().enumerate() {
                cards.push(card(&format!("TTYPE{}", i + 1), &text(&c.name)));
                cards.push(card(&format!("TFORM{}", i + 1), &text(&c.tform)));
                if let Some(unit) = &c.unit {
                    cards.push(card(&format!("TUNIT{}", i + 1), &text(unit)));
                }
            }
            cards.extend(table.keys.iter().map(|(k, v)| card(k, v)));
            push_header(&mut out, cards);

            let start = out.len();
            for row in 0..rows {
                for c in &table.columns {
                    out.extend_from_slice(&c.rows[row]);
                }
            }
            pad(&mut out, start, 0);
        }

        fs::write(path, out).unwrap();
    }
}

pub fn text(s: &str) -> String {
    format!("'{:<8}'", s.replace('\'', "''"))
}

fn card(key: &str, raw: &str) -> String {
    format!("{:<8}= {:>20}", key, raw)
}

fn push_header(out: &mut Vec<u8>, cards: Vec<String>) {
    let start = out.len();
    for c in cards.iter().map(String::as_str).chain(["END"]) {
        out.extend_from_slice(format!("{:<80}", c).as_bytes());
    }
    pad(out, start, b' ');
}

fn pad(out: &mut Vec<u8>, start: usize, fill: u8) {
    let len = out.len() - start;
    let padded = len.div_ceil(BLOCK) * BLOCK;
    out.resize(start + padded, fill);
}

/// Write a GBM CTIME file whose row `i` holds `counts[i]` for `dt[i]`
/// seconds, the first row starting at `start_met`.
pub fn ctime_file<P: AsRef<Path>>(path: P, start_met: f64, dt: &[f64], counts: &[Vec<f32>]) {
    let channels = counts.first().map_or(0, Vec::len);
    let e_min: Vec<f32> = (0..channels).map(|c| 4.0 * (c + 1) as f32).collect();
    let e_max: Vec<f32> = (0..channels).map(|c| 4.0 * (c + 2) as f32).collect();
    let channel_ids: Vec<i16> = (0..channels as i16).collect();

    let mut starts = Vec::with_capacity(dt.len());
    let mut t = start_met;
    for d in dt {
        starts.push(t);
        t += d;
    }

    FitsWriter::new()
        .primary_key("DATATYPE", &text("CTIME"))
        .table(
            Table::new("EBOUNDS")
                .column(Column::i16("CHANNEL", &channel_ids))
                .column(Column::f32("E_MIN", &e_min).with_unit("keV"))
                .column(Column::f32("E_MAX", &e_max).with_unit("keV")),
        )
        .table(
            Table::new("SPECTRUM")
                .column(Column::f32_vec("COUNTS", counts).with_unit("count"))
                .column(Column::f64("EXPOSURE", dt).with_unit("s"))
                .column(Column::f64("TIME", &starts).with_unit("s")),
        )
        .write(path);
}
