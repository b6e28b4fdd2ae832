//! Degree-minute positions as printed on chart catalogues.
//!
//! The accepted form is `D°MM,dddd'H - D°MM,dddd'H`, latitude first:
//! `43°20,00'N - 2°00,50'W`. A dot is accepted as the decimal separator.

use once_cell::sync::Lazy;
use projection::Position;
use regex::Regex;

use crate::error::{ChartError, ChartResult};

static DMS_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d{1,2})\s*°\s*(\d{1,2}(?:[.,]\d+)?)\s*'\s*([NSns])\s*-\s*(\d{1,3})\s*°\s*(\d{1,2}(?:[.,]\d+)?)\s*'\s*([EWOewo])\s*$",
    )
    .expect("valid DMS regex")
});

fn angle(degrees: &str, minutes: &str) -> Option<f64> {
    let degrees: f64 = degrees.parse().ok()?;
    let minutes: f64 = minutes.replace(',', ".").parse().ok()?;
    if minutes >= 60.0 {
        return None;
    }
    Some(degrees + minutes / 60.0)
}

/// Parse a `lat - lon` degree-minute pair into a lon/lat position.
pub fn parse_dms_pair(s: &str) -> ChartResult<Position> {
    let invalid = || ChartError::configuration(format!("invalid degree-minute position: {:?}", s));
    let caps = DMS_PAIR.captures(s).ok_or_else(invalid)?;

    let lat = angle(&caps[1], &caps[2]).ok_or_else(invalid)?;
    let lon = angle(&caps[4], &caps[5]).ok_or_else(invalid)?;
    if lat > 90.0 || lon > 180.0 {
        return Err(invalid());
    }

    let lat = match &caps[3] {
        "S" | "s" => -lat,
        _ => lat,
    };
    // "O" is the French abbreviation for west.
    let lon = match &caps[6] {
        "W" | "w" | "O" | "o" => -lon,
        _ => lon,
    };
    Ok(Position::new(lon, lat))
}
