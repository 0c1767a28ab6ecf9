//! Multi-track merge engine
//!
//! Several IGC tracks recorded on the same day are placed on one shared
//! offset timeline. The reference time is the earliest first fix of any
//! track; every fix is keyed by its wrapped second offset from it.
//!
//! Aircraft are ordered by first appearance and receive identifiers from
//! [`FIRST_MERGED_ID`] upward in that order. Each tick then lists, per
//! aircraft in identifier order, an optional "flight started" event, the
//! position, an optional "flight ended" event and an optional removal.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;
use thiserror::Error;

use crate::acmi::{AcmiWriter, Record};
use crate::parser::{time_diff_seconds, Coordinate, FlightHeader, IgcError, IgcParser};

/// First identifier handed out in a merged session.
pub const FIRST_MERGED_ID: u32 = 1001;
/// Identifier of the only object in a single-file conversion.
pub const SINGLE_TRACK_ID: u32 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("no tracks to merge")]
    Empty,
    #[error("track #{index}: {source}")]
    Track {
        index: usize,
        #[source]
        source: IgcError,
    },
}

/// A fix placed on the session timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FixRecord {
    pub offset: u32,
    pub latitude: Coordinate,
    pub longitude: Coordinate,
    pub altitude: i32,
}

/// One parsed IGC file with fixes keyed by offset from a reference time.
#[derive(Debug, Clone)]
pub struct Track {
    pub header: FlightHeader,
    pub fixes: BTreeMap<u32, FixRecord>,
}

/// First, second-to-last and last offsets of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lifespan {
    pub first: u32,
    /// Absent for a track with a single fix.
    pub second_to_last: Option<u32>,
    pub last: u32,
}

impl Track {
    /// Parse a track with offsets measured from `reference`.
    ///
    /// Fixes that land on an already used offset replace the earlier one.
    pub fn parse(content: &str, reference: NaiveTime) -> Result<Self, IgcError> {
        let header = IgcParser::parse_header(content)?;
        Self::with_header(header, content, reference)
    }

    /// Parse a track with offsets measured from its own first fix.
    pub fn parse_standalone(content: &str) -> Result<Self, IgcError> {
        let header = IgcParser::parse_header(content)?;
        let reference = header.first_fix_time();
        Self::with_header(header, content, reference)
    }

    fn with_header(
        header: FlightHeader,
        content: &str,
        reference: NaiveTime,
    ) -> Result<Self, IgcError> {
        let mut fixes = BTreeMap::new();
        for line in content.lines().filter(|l| l.starts_with('B')) {
            let fix = IgcParser::parse_fix(line)?;
            let offset = time_diff_seconds(reference, fix.time);
            fixes.insert(
                offset,
                FixRecord {
                    offset,
                    latitude: fix.latitude,
                    longitude: fix.longitude,
                    altitude: fix.altitude,
                },
            );
        }
        Ok(Self { header, fixes })
    }

    pub fn lifespan(&self) -> Option<Lifespan> {
        let mut keys = self.fixes.keys().rev();
        let last = *keys.next()?;
        let second_to_last = keys.next().copied();
        let first = *self.fixes.keys().next()?;
        Some(Lifespan {
            first,
            second_to_last,
            last,
        })
    }
}

/// How lifecycle events are framed around positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Framing {
    /// Start/end events and object removal (merged sessions).
    Lifecycle,
    /// Positions only (single-file conversion).
    Bare,
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id: u32,
    pub track: Track,
    pub lifespan: Lifespan,
}

/// All records sharing one offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub offset: u32,
    pub records: Vec<Record>,
}

/// Tracks of one flight date aligned on a shared reference time.
#[derive(Debug, Clone)]
pub struct MergedSession {
    reference: NaiveDateTime,
    aircraft: Vec<Aircraft>,
    framing: Framing,
    altitude_offset: i32,
}

impl MergedSession {
    /// Merge the contents of several IGC files, given in discovery order.
    pub fn merge<S: AsRef<str>>(contents: &[S]) -> Result<Self, MergeError> {
        if contents.is_empty() {
            return Err(MergeError::Empty);
        }

        // The earliest raw first fix, independent of any header field.
        let mut reference_time: Option<NaiveTime> = None;
        for (index, content) in contents.iter().enumerate() {
            let time = IgcParser::first_fix_time(content.as_ref())
                .map_err(|source| MergeError::Track { index, source })?;
            reference_time = Some(match reference_time {
                Some(current) if current <= time => current,
                _ => time,
            });
        }
        let reference_time = reference_time.ok_or(MergeError::Empty)?;

        let mut tracks = Vec::with_capacity(contents.len());
        for (index, content) in contents.iter().enumerate() {
            let track = Track::parse(content.as_ref(), reference_time)
                .map_err(|source| MergeError::Track { index, source })?;
            let lifespan = track.lifespan().ok_or(MergeError::Track {
                index,
                source: IgcError::MissingFix,
            })?;
            tracks.push((track, lifespan));
        }

        let date = tracks[0].0.header.date();

        // sort_by_key is stable: equal first offsets keep discovery order
        tracks.sort_by_key(|(_, lifespan)| lifespan.first);

        let aircraft = tracks
            .into_iter()
            .zip(FIRST_MERGED_ID..)
            .map(|((track, lifespan), id)| Aircraft {
                id,
                track,
                lifespan,
            })
            .collect();

        Ok(Self {
            reference: date.and_time(reference_time),
            aircraft,
            framing: Framing::Lifecycle,
            altitude_offset: 0,
        })
    }

    /// A session holding one track, timed from its own first fix.
    pub fn single(content: &str) -> Result<Self, IgcError> {
        let track = Track::parse_standalone(content)?;
        let lifespan = track.lifespan().ok_or(IgcError::MissingFix)?;
        Ok(Self {
            reference: track.header.first_fix,
            aircraft: vec![Aircraft {
                id: SINGLE_TRACK_ID,
                track,
                lifespan,
            }],
            framing: Framing::Bare,
            altitude_offset: 0,
        })
    }

    /// Shift every emitted altitude by `meters`.
    pub fn with_altitude_offset(mut self, meters: i32) -> Self {
        self.altitude_offset = meters;
        self
    }

    pub fn reference(&self) -> NaiveDateTime {
        self.reference
    }

    /// Aircraft in ascending identifier order.
    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Highest last-fix offset over all aircraft.
    pub fn last_offset(&self) -> u32 {
        self.aircraft
            .iter()
            .map(|a| a.lifespan.last)
            .max()
            .unwrap_or(0)
    }

    /// Callsigns in identifier order with exact duplicates dropped.
    pub fn callsigns(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.aircraft
            .iter()
            .map(|a| a.track.header.callsign.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// The sparse timeline: only offsets where some aircraft has a fix.
    pub fn ticks(&self) -> Vec<Tick> {
        let offsets: BTreeSet<u32> = self
            .aircraft
            .iter()
            .flat_map(|a| a.track.fixes.keys().copied())
            .collect();

        offsets
            .into_iter()
            .map(|offset| Tick {
                offset,
                records: self.records_at(offset),
            })
            .filter(|tick| !tick.records.is_empty())
            .collect()
    }

    fn records_at(&self, offset: u32) -> Vec<Record> {
        let mut records = Vec::new();
        for aircraft in &self.aircraft {
            let Some(fix) = aircraft.track.fixes.get(&offset) else {
                continue;
            };
            let id = aircraft.id;
            let lifecycle = self.framing == Framing::Lifecycle;
            let span = aircraft.lifespan;

            if lifecycle && offset == span.first {
                records.push(Record::Started(id));
            }
            records.push(Record::Position {
                id,
                fix: FixRecord {
                    altitude: fix.altitude.saturating_add(self.altitude_offset),
                    ..*fix
                },
            });
            if lifecycle && span.second_to_last == Some(offset) {
                records.push(Record::Ended(id));
            }
            if lifecycle && offset == span.last {
                records.push(Record::Removed(id));
            }
        }
        records
    }

    /// Stream the whole session as an ACMI document.
    pub fn write_acmi<W: Write>(&self, writer: &mut AcmiWriter<W>) -> io::Result<()> {
        writer.write_header(self.reference)?;
        for aircraft in &self.aircraft {
            writer.write_object_init(&aircraft.track.header, aircraft.id)?;
        }
        for tick in self.ticks() {
            writer.write_tick(tick.offset, &tick.records)?;
        }
        writer.flush()
    }

    /// The ACMI document as a string.
    pub fn to_acmi_string(&self) -> String {
        let mut writer = AcmiWriter::new(Vec::new());
        // writing into a Vec cannot fail
        let _ = self.write_acmi(&mut writer);
        String::from_utf8_lossy(&writer.into_inner()).into_owned()
    }
}
