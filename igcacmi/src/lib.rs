//! igcacmi - IGC flight log to ACMI recording conversion library
//!
//! This library turns IGC logs written by glider GPS loggers into ACMI
//! documents for flight replay, either one file at a time or by merging every
//! flight of a day into a single time-synchronized recording.
//!
//! # Quick Start
//!
//! ```no_run
//! use igcacmi::MergedSession;
//!
//! let a = std::fs::read_to_string("pilot_a.igc").unwrap();
//! let b = std::fs::read_to_string("pilot_b.igc").unwrap();
//! let session = MergedSession::merge(&[a, b]).unwrap();
//!
//! for aircraft in session.aircraft() {
//!     println!("{}: {}", aircraft.id, aircraft.track.header.callsign);
//! }
//! print!("{}", session.to_acmi_string());
//! ```
//!
//! # Features
//!
//! - **IGC parsing**: H (header) and B (fix) records
//! - **Merging**: shared reference clock, first-appearance ordering, lifecycle events
//! - **Output**: staged writes, `.zip.acmi` compression, crash dump archives

pub mod acmi;
pub mod console;
pub mod core;
pub mod crashdump;
pub mod grouper;
pub mod merge;
pub mod output;
pub mod parser;
pub mod paths;

// Re-export main types
pub use crate::core::{ConvertError, ConvertOptions, IgcAcmiCore, Mode, RunSummary};
pub use console::{Console, TracingConsole};
pub use grouper::{group_by_date, FlightGroups};
pub use merge::{FixRecord, MergedSession, Track};
pub use parser::{FlightHeader, IgcError, IgcParser};

/// Parse the header of an IGC file (convenience wrapper).
pub fn parse_header(path: &std::path::Path) -> Result<FlightHeader, ConvertError> {
    let content = parser::read_igc(path)?;
    Ok(IgcParser::parse_header(&content)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Console, ConvertError, ConvertOptions, IgcAcmiCore, MergedSession, Mode, RunSummary,
        TracingConsole,
    };
}
