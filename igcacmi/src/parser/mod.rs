pub mod coords;
pub mod igc;

// Re-export for convenience
pub use coords::{dm_to_decimal_degrees, time_diff_seconds, Coordinate, SECONDS_PER_DAY};
pub use igc::{
    date_ordinal, decode_igc, flight_date, read_igc, FixLine, FlightHeader, IgcError, IgcParser,
    DEFAULT_AIRCRAFT_TYPE, DEFAULT_CALLSIGN,
};
