//! Bucketing IGC files by flight date.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::parser::flight_date;

/// A file that cannot take part in any date-group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorruptInput {
    pub path: PathBuf,
    pub reason: String,
}

/// Files grouped by header date, in discovery order within each date.
#[derive(Debug, Clone, Default)]
pub struct FlightGroups {
    pub groups: BTreeMap<NaiveDate, Vec<PathBuf>>,
    pub corrupt: Vec<CorruptInput>,
}

/// Group `paths` by the date in their `HFDTE` header.
///
/// Files without a usable date, or that cannot be read, are collected in
/// `corrupt` and kept out of every group.
pub fn group_by_date<P: AsRef<Path>>(paths: &[P]) -> FlightGroups {
    let mut result = FlightGroups::default();
    for path in paths {
        let path = path.as_ref();
        match flight_date(path) {
            Ok(Some(date)) => result
                .groups
                .entry(date)
                .or_default()
                .push(path.to_path_buf()),
            Ok(None) => result.corrupt.push(CorruptInput {
                path: path.to_path_buf(),
                reason: "no valid date header line".to_string(),
            }),
            Err(e) => result.corrupt.push(CorruptInput {
                path: path.to_path_buf(),
                reason: format!("unreadable: {}", e),
            }),
        }
    }
    result
}
