//! ACMI text emitter
//!
//! Output is a single forward pass: a three line preamble, one init line per
//! object, then `#<offset>` tick blocks in increasing offset order.

use std::fmt;
use std::io::{self, Write};

use chrono::NaiveDateTime;

use crate::merge::FixRecord;
use crate::parser::FlightHeader;

pub const FILE_TYPE: &str = "text/acmi/tacview";
pub const FILE_VERSION: &str = "2.1";

/// One line inside a tick block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Started(u32),
    Position { id: u32, fix: FixRecord },
    Ended(u32),
    Removed(u32),
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Started(id) => write!(f, "0,Event=Message|{}|flight started", id),
            Record::Position { id, fix } => write!(
                f,
                "{},T={}|{}|{}",
                id, fix.longitude, fix.latitude, fix.altitude
            ),
            Record::Ended(id) => write!(f, "0,Event=Message|{}|flight ended", id),
            Record::Removed(id) => write!(f, "-{}", id),
        }
    }
}

/// File preamble with the absolute reference time in UTC.
pub fn header_block(reference: NaiveDateTime) -> String {
    format!(
        "FileType={}\nFileVersion={}\n0,ReferenceTime={}\n",
        FILE_TYPE,
        FILE_VERSION,
        reference.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

pub fn object_init_line(header: &FlightHeader, id: u32) -> String {
    format!(
        "{},Name={},CallSign={},Pilot={}\n",
        id, header.aircraft_type, header.callsign, header.pilot
    )
}

/// `#<offset>` followed by the records; empty when there is nothing to write.
pub fn tick_block(offset: u32, records: &[Record]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut out = format!("#{}\n", offset);
    for record in records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out
}

/// Append-only ACMI writer over any byte sink.
pub struct AcmiWriter<W: Write> {
    inner: W,
}

impl<W: Write> AcmiWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_header(&mut self, reference: NaiveDateTime) -> io::Result<()> {
        self.inner.write_all(header_block(reference).as_bytes())
    }

    pub fn write_object_init(&mut self, header: &FlightHeader, id: u32) -> io::Result<()> {
        self.inner.write_all(object_init_line(header, id).as_bytes())
    }

    pub fn write_tick(&mut self, offset: u32, records: &[Record]) -> io::Result<()> {
        self.inner.write_all(tick_block(offset, records).as_bytes())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
