//! IGC Flight Recorder Parser
//!
//! This module reads the two record types the converter needs from an IGC
//! flight log:
//!
//! - **H records** (header): `HFDTE150721` fixed-width or
//!   `HFGTYGLIDERTYPE:ASK 21` colon-delimited. The key is always the first
//!   five characters.
//! - **B records** (fix): fixed-width GPS samples,
//!   `B HHMMSS DDMMmmmN DDDMMmmmE V PPPPP GGGGG`.
//!
//! Every other record type is ignored.

use std::collections::HashMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;

use crate::parser::coords::{dm_to_decimal_degrees, Coordinate};

const KEY_DATE: &str = "HFDTE";
const KEY_GLIDER_TYPE: &str = "HFGTY";
const KEY_GLIDER_ID: &str = "HFGID";
const KEY_PILOT: &str = "HFPLT";
const KEY_CREW_2: &str = "HFCM2";

pub const DEFAULT_AIRCRAFT_TYPE: &str = "Glider";
pub const DEFAULT_CALLSIGN: &str = "NoCallsign";

/// Shortest B record that still carries the GNSS altitude field.
const FIX_LINE_LEN: usize = 35;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IgcError {
    #[error("no valid date header (HFDTE) found")]
    MissingDate,
    #[error("no fix (B) record follows the header")]
    MissingFix,
    #[error("invalid coordinate flag '{flag}' in fix line: {line}")]
    InvalidCoordinate { flag: char, line: String },
    #[error("malformed fix line ({reason}): {line}")]
    MalformedFix { reason: String, line: String },
}

/// Flight metadata taken from the H records plus the first fix time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightHeader {
    pub aircraft_type: String,
    pub callsign: String,
    pub pilot: String,
    pub first_fix: NaiveDateTime,
}

impl FlightHeader {
    pub fn date(&self) -> NaiveDate {
        self.first_fix.date()
    }

    pub fn first_fix_time(&self) -> NaiveTime {
        self.first_fix.time()
    }
}

/// One decoded B record, before it is placed on an offset timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixLine {
    pub time: NaiveTime,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    pub altitude: i32,
}

/// Parser for IGC flight logs
pub struct IgcParser;

impl IgcParser {
    /// Parse the header records and the time of the first fix.
    pub fn parse_header(content: &str) -> Result<FlightHeader, IgcError> {
        let mut fields: HashMap<String, String> = HashMap::new();
        let mut first_fix_time = None;

        for line in content.lines() {
            if line.starts_with('B') {
                first_fix_time = Some(Self::parse_fix_time(line)?);
                break;
            }
            if line.starts_with('H') {
                if let Some((key, value)) = Self::split_header_line(line) {
                    fields.insert(key, value);
                }
            }
        }

        let date = fields
            .get(KEY_DATE)
            .and_then(|v| Self::parse_date_value(v))
            .ok_or(IgcError::MissingDate)?;
        let first_fix_time = first_fix_time.ok_or(IgcError::MissingFix)?;

        let value_or = |key: &str, default: &str| -> String {
            match fields.get(key) {
                Some(v) if !v.is_empty() => v.clone(),
                _ => default.to_string(),
            }
        };

        let mut pilot = value_or(KEY_PILOT, "");
        if let Some(second) = fields.get(KEY_CREW_2).filter(|v| !v.is_empty()) {
            pilot = format!("{} | {}", pilot, second);
        }

        Ok(FlightHeader {
            aircraft_type: value_or(KEY_GLIDER_TYPE, DEFAULT_AIRCRAFT_TYPE),
            callsign: value_or(KEY_GLIDER_ID, DEFAULT_CALLSIGN),
            pilot,
            first_fix: date.and_time(first_fix_time),
        })
    }

    /// Decode a single B record.
    pub fn parse_fix(line: &str) -> Result<FixLine, IgcError> {
        if !line.starts_with('B') {
            return Err(Self::malformed(line, "not a B record"));
        }
        if line.len() < FIX_LINE_LEN {
            return Err(Self::malformed(line, "line too short"));
        }

        let time = Self::parse_fix_time(line)?;

        let lat_negative = match Self::flag_at(line, 14)? {
            'N' => false,
            'S' => true,
            flag => {
                return Err(IgcError::InvalidCoordinate {
                    flag,
                    line: line.to_string(),
                })
            }
        };
        let lon_negative = match Self::flag_at(line, 23)? {
            'E' => false,
            'W' => true,
            flag => {
                return Err(IgcError::InvalidCoordinate {
                    flag,
                    line: line.to_string(),
                })
            }
        };

        let latitude = dm_to_decimal_degrees(
            Self::number(line, 7..9, "latitude degrees")?,
            Self::number(line, 9..14, "latitude minutes")?,
            lat_negative,
        );
        let longitude = dm_to_decimal_degrees(
            Self::number(line, 15..18, "longitude degrees")?,
            Self::number(line, 18..23, "longitude minutes")?,
            lon_negative,
        );

        let altitude = line
            .get(30..35)
            .and_then(|s| s.trim().parse::<i32>().ok())
            .ok_or_else(|| Self::malformed(line, "GNSS altitude"))?;

        Ok(FixLine {
            time,
            latitude,
            longitude,
            altitude,
        })
    }

    /// Time of day of a B record (`HHMMSS` at columns 1..7).
    pub fn parse_fix_time(line: &str) -> Result<NaiveTime, IgcError> {
        let h = Self::number(line, 1..3, "hour")?;
        let m = Self::number(line, 3..5, "minute")?;
        let s = Self::number(line, 5..7, "second")?;
        NaiveTime::from_hms_opt(h, m, s).ok_or_else(|| Self::malformed(line, "time of day"))
    }

    /// Time of the first B record in the file, ignoring every header field.
    pub fn first_fix_time(content: &str) -> Result<NaiveTime, IgcError> {
        content
            .lines()
            .find(|l| l.starts_with('B'))
            .ok_or(IgcError::MissingFix)
            .and_then(Self::parse_fix_time)
    }

    /// Header date only, or `None` when absent or unreadable.
    pub fn flight_date(content: &str) -> Option<NaiveDate> {
        content
            .lines()
            .take_while(|l| !l.starts_with('B'))
            .filter(|l| l.starts_with('H'))
            .filter_map(Self::split_header_line)
            .filter(|(k, _)| k == KEY_DATE)
            .last()
            .and_then(|(_, v)| Self::parse_date_value(&v))
    }

    /// Split an H record into its 5-character key and value.
    fn split_header_line(line: &str) -> Option<(String, String)> {
        let line = line.trim_end();
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.get(..5)?, value),
            None => (line.get(..5)?, line.get(5..)?),
        };
        let value = value.trim();
        let value = if value == "undefined" { "" } else { value };
        Some((key.to_string(), value.to_string()))
    }

    /// `ddmmyy` (optionally followed by `,nn`) to a calendar date in 20yy.
    fn parse_date_value(value: &str) -> Option<NaiveDate> {
        let digits = value.trim().get(..6)?;
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let day: u32 = digits[0..2].parse().ok()?;
        let month: u32 = digits[2..4].parse().ok()?;
        let year: i32 = digits[4..6].parse().ok()?;
        NaiveDate::from_ymd_opt(2000 + year, month, day)
    }

    fn number(line: &str, range: std::ops::Range<usize>, what: &str) -> Result<u32, IgcError> {
        line.get(range)
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Self::malformed(line, what))
    }

    fn flag_at(line: &str, index: usize) -> Result<char, IgcError> {
        line.get(index..index + 1)
            .and_then(|s| s.chars().next())
            .ok_or_else(|| Self::malformed(line, "coordinate flag"))
    }

    fn malformed(line: &str, reason: &str) -> IgcError {
        IgcError::MalformedFix {
            reason: reason.to_string(),
            line: line.to_string(),
        }
    }
}

/// Read an IGC file as text.
///
/// Loggers write header values in whatever code page the pilot's PC used, so
/// content that is not valid UTF-8 is decoded as Latin-1.
pub fn read_igc(path: &Path) -> std::io::Result<String> {
    Ok(decode_igc(std::fs::read(path)?))
}

pub fn decode_igc(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Read the header date of an IGC file.
pub fn flight_date(path: &Path) -> std::io::Result<Option<NaiveDate>> {
    Ok(IgcParser::flight_date(&read_igc(path)?))
}

/// Date as a sortable `yyyymmdd` integer.
pub fn date_ordinal(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}
