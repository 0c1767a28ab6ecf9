//! Merge example: combine IGC files given on the command line and print the ACMI.

use igcacmi::prelude::*;
use std::path::Path;

fn main() -> Result<(), ConvertError> {
    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("Usage: cargo run --example merge_flights <a.igc> [b.igc ...]");
        std::process::exit(1);
    }

    let mut contents = Vec::new();
    for path in &paths {
        let path = Path::new(path);
        if !path.exists() {
            eprintln!("File not found: {}", path.display());
            std::process::exit(1);
        }
        contents.push(std::fs::read_to_string(path)?);
    }

    let session = MergedSession::merge(&contents)?;

    eprintln!("Reference time: {}", session.reference());
    for aircraft in session.aircraft() {
        eprintln!(
            "  {} {} (first fix at +{}s, last at +{}s)",
            aircraft.id,
            aircraft.track.header.callsign,
            aircraft.lifespan.first,
            aircraft.lifespan.last
        );
    }

    print!("{}", session.to_acmi_string());
    Ok(())
}
