use std::fmt;
use std::io::BufRead;
use std::str;

use gbm_toolbox_proc_macros::read_fits_key;

use crate::errors::Error;
use crate::parsers::fits::{Header, HeaderValue};

pub const BLOCK_SIZE: usize = 2880;
pub const CARD_SIZE: usize = 80;

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HeaderValue::Empty => write!(f, ""),
            HeaderValue::Logical(x) => write!(f, "{}", if *x { "T" } else { "F" }),
            HeaderValue::Integer(x) => write!(f, "{}", x),
            HeaderValue::Float(x) => write!(f, "{}", x),
            HeaderValue::Text(x) => write!(f, "'{}'", x),
        }
    }
}

/// Read header blocks up to and including the one holding the `END` card.
pub(crate) fn read_header<R: BufRead>(buffered: &mut R) -> Result<Header, Error> {
    let mut header = Header::new();
    let mut block: [u8; BLOCK_SIZE] = [0; BLOCK_SIZE];

    loop {
        buffered.read_exact(&mut block)?;
        for card in block.chunks(CARD_SIZE) {
            if !card.is_ascii() {
                return Err(Error::InvalidHeader(String::from("Non-ASCII card in header.")));
            }
            let card = str::from_utf8(card)
                .ok()
                .ok_or_else(|| Error::InvalidHeader(String::from("Invalid utf8 string in header.")))?;
            let keyword = card[..8].trim_end();
            if keyword == "END" {
                return Ok(header);
            }
            if let Some((key, value)) = parse_card(card)? {
                header.insert(key, value);
            }
        }
    }
}

/// Keyword and value of a value card; commentary cards yield `None`.
fn parse_card(card: &str) -> Result<Option<(String, HeaderValue)>, Error> {
    let keyword = card[..8].trim_end();
    if keyword.is_empty() || &card[8..10] != "= " {
        return Ok(None);
    }
    let value = parse_value(&card[10..]).ok_or_else(|| {
        Error::InvalidHeader(format!("cannot parse value of {}: {}", keyword, card[10..].trim()))
    })?;
    Ok(Some((keyword.to_string(), value)))
}

fn parse_value(field: &str) -> Option<HeaderValue> {
    let field = field.trim_start();
    if let Some(rest) = field.strip_prefix('\'') {
        return parse_string(rest).map(HeaderValue::Text);
    }

    let raw = field.split('/').next().unwrap_or("").trim();
    match raw {
        "" => Some(HeaderValue::Empty),
        "T" => Some(HeaderValue::Logical(true)),
        "F" => Some(HeaderValue::Logical(false)),
        _ => {
            if let Ok(x) = raw.parse::<i64>() {
                return Some(HeaderValue::Integer(x));
            }
            raw.replace(['D', 'd'], "E").parse::<f64>().ok().map(HeaderValue::Float)
        }
    }
}

// Quotes inside a string are written twice; trailing blanks are not significant.
fn parse_string(rest: &str) -> Option<String> {
    let mut out = String::new();
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
            } else {
                return Some(out.trim_end().to_string());
            }
        } else {
            out.push(c);
        }
    }
    None
}

/// Size in bytes of the data unit described by `header`, before padding.
pub(crate) fn data_size(header: &Header) -> Result<usize, Error> {
    let bitpix: i64 = read_fits_key!(header["BITPIX"] as Integer);
    let naxis: i64 = read_fits_key!(header["NAXIS"] as Integer);
    if naxis == 0 {
        return Ok(0);
    }

    let overflow = || Error::InvalidHeader(String::from("data unit size overflows"));
    let mut elements: i64 = 1;
    for axis in 1..=naxis {
        let length: i64 = read_fits_key!(header[format!("NAXIS{}", axis)] as Integer);
        elements = elements.checked_mul(length).ok_or_else(overflow)?;
    }
    let pcount = header.get("PCOUNT").and_then(HeaderValue::as_f64).unwrap_or(0.0) as i64;
    let gcount = header.get("GCOUNT").and_then(HeaderValue::as_f64).unwrap_or(1.0) as i64;

    let size = pcount
        .checked_add(elements)
        .and_then(|n| n.checked_mul(gcount))
        .and_then(|n| n.checked_mul(bitpix.abs() / 8))
        .ok_or_else(overflow)?;
    usize::try_from(size).map_err(|_| Error::InvalidHeader(format!("negative data size {}", size)))
}
