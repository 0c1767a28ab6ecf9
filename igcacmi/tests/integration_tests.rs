//! Integration tests for the igcacmi conversion runs

use igcacmi::console::{Level, MemoryConsole};
use igcacmi::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_text(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture should exist")
}

/// Copy the named fixtures into a fresh directory.
fn workspace(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        fs::copy(fixture_path(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn plain_options(dir: &Path) -> ConvertOptions {
    ConvertOptions {
        compress: false,
        crash_dir: dir.to_path_buf(),
        ..ConvertOptions::default()
    }
}

fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(suffix))
        .collect();
    names.sort();
    names
}

const MERGED_ALPHA_BRAVO: &str = "\
FileType=text/acmi/tacview
FileVersion=2.1
0,ReferenceTime=2021-07-15T10:00:00Z
1001,Name=ASK 21,CallSign=ALPHA,Pilot=Anna Alpha
1002,Name=Glider,CallSign=BRAVO,Pilot=Bert Bravo | Carl Crew
#0
0,Event=Message|1001|flight started
1001,T=7.5|45.5|1000
#1
1001,T=7.51|45.51|1010
0,Event=Message|1001|flight ended
0,Event=Message|1002|flight started
1002,T=8.0|46.0|900
0,Event=Message|1002|flight ended
#2
1001,T=7.52|45.52|1020
-1001
1002,T=8.01|46.01|910
-1002
";

const SINGLE_SOLO: &str = "\
FileType=text/acmi/tacview
FileVersion=2.1
0,ReferenceTime=2021-07-16T12:00:00Z
1000,Name=Glider,CallSign=NoCallsign,Pilot=Solo Pilot
#0
1000,T=-11.0|-47.0|1500
#5
1000,T=-11.01|-47.01|1510
#10
1000,T=-11.02|-47.02|1520
";

#[test]
fn test_merge_orders_by_first_appearance() {
    // discovery order puts the later starter first
    let session = MergedSession::merge(&[
        fixture_text("1_bravo_late.igc"),
        fixture_text("2_alpha_early.igc"),
    ])
    .expect("Should merge");

    assert_eq!(session.to_acmi_string(), MERGED_ALPHA_BRAVO);
}

#[test]
fn test_single_file_has_no_framing() {
    let session = MergedSession::single(&fixture_text("solo_gaps.igc")).expect("Should parse");
    let acmi = session.to_acmi_string();

    assert_eq!(acmi, SINGLE_SOLO);
    assert!(!acmi.contains("Event="));
    assert!(!acmi.contains("\n-1000"));
}

#[test]
fn test_combine_run_writes_one_file_per_date() {
    let dir = workspace(&["1_bravo_late.igc", "2_alpha_early.igc", "solo_gaps.igc"]);
    let console = MemoryConsole::new();
    let options = plain_options(dir.path());

    let summary = IgcAcmiCore::run_combine(dir.path(), dir.path(), &options, &console)
        .expect("Run should complete");

    assert!(summary.is_success());
    assert_eq!(summary.converted.len(), 2);
    assert_eq!(
        files_with_suffix(dir.path(), ".txt.acmi"),
        vec!["2021-07-15_ALPHA_BRAVO.txt.acmi", "2021-07-16_NoCallsign.txt.acmi"]
    );

    let merged = fs::read_to_string(dir.path().join("2021-07-15_ALPHA_BRAVO.txt.acmi")).unwrap();
    assert_eq!(merged, MERGED_ALPHA_BRAVO);

    // a merged single track is framed, unlike single-file mode
    let solo = fs::read_to_string(dir.path().join("2021-07-16_NoCallsign.txt.acmi")).unwrap();
    assert!(solo.contains("0,Event=Message|1001|flight started"));
    assert!(solo.ends_with("-1001\n"));

    assert!(files_with_suffix(dir.path(), ".tmpacmi").is_empty());
    assert!(console
        .at(Level::Info)
        .iter()
        .any(|m| m == "Handling flights of date: 15 Jul 2021"));
}

#[test]
fn test_failing_date_group_is_isolated() {
    let dir = workspace(&["1_bravo_late.igc", "2_alpha_early.igc", "bad_flag.igc"]);
    let console = MemoryConsole::new();
    let options = ConvertOptions {
        debug: true,
        ..plain_options(dir.path())
    };

    let summary = IgcAcmiCore::run_combine(dir.path(), dir.path(), &options, &console)
        .expect("Run should complete");

    assert!(!summary.is_success());
    assert_eq!(summary.converted.len(), 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].subject, "2021-07-17");
    assert!(summary.failed[0].message.contains("invalid coordinate flag 'X'"));

    let errors = console.at(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Unable to combine flights of date 17 Jul 2021, error:"));

    // no staging or partial output for the failed date
    assert!(files_with_suffix(dir.path(), ".tmpacmi").is_empty());
    assert_eq!(
        files_with_suffix(dir.path(), ".acmi"),
        vec!["2021-07-15_ALPHA_BRAVO.txt.acmi"]
    );
}

#[test]
fn test_failure_archived_without_debug() {
    let dir = workspace(&["bad_flag.igc"]);
    let console = MemoryConsole::new();
    let options = plain_options(dir.path());

    let summary = IgcAcmiCore::run_combine(dir.path(), dir.path(), &options, &console)
        .expect("Run should complete");

    let archive = summary.failed[0]
        .crash_archive
        .clone()
        .expect("Should archive the failure");
    assert!(archive.starts_with("combine-igcs_Crashdump_"));
    assert!(dir.path().join(&archive).exists());

    let errors = console.at(Level::Error);
    assert!(errors[0].contains("a crashlog for it has been saved in"));
}

#[test]
fn test_dateless_files_are_reported_not_converted() {
    let dir = workspace(&["no_date.igc"]);
    let console = MemoryConsole::new();
    let options = plain_options(dir.path());

    let summary = IgcAcmiCore::run_combine(dir.path(), dir.path(), &options, &console)
        .expect("Run should complete");

    assert!(summary.converted.is_empty());
    assert!(summary.failed.is_empty());
    assert_eq!(summary.corrupt.len(), 1);
    assert!(files_with_suffix(dir.path(), ".acmi").is_empty());

    let warnings = console.at(Level::Warn);
    assert!(warnings[0].contains("no valid date header line"));
    assert!(warnings[1].contains("no_date.igc"));
}

#[test]
fn test_requested_name_applies_once() {
    let dir = workspace(&["2_alpha_early.igc", "solo_gaps.igc"]);
    let console = MemoryConsole::new();
    let options = ConvertOptions {
        requested_name: Some("club_day".to_string()),
        ..plain_options(dir.path())
    };

    IgcAcmiCore::run_combine(dir.path(), dir.path(), &options, &console).unwrap();

    assert_eq!(
        files_with_suffix(dir.path(), ".txt.acmi"),
        vec!["2021-07-16_NoCallsign.txt.acmi", "club_day.txt.acmi"]
    );
}

#[test]
fn test_convert_all_compressed_and_removed() {
    let dir = workspace(&["solo_gaps.igc", "2_alpha_early.igc"]);
    let out = tempfile::tempdir().unwrap();
    let console = MemoryConsole::new();
    let options = ConvertOptions {
        remove_sources: true,
        crash_dir: dir.path().to_path_buf(),
        ..ConvertOptions::default()
    };

    let summary = IgcAcmiCore::run_convert_all(dir.path(), out.path(), &options, &console)
        .expect("Run should complete");

    assert_eq!(summary.converted.len(), 2);
    assert_eq!(
        files_with_suffix(out.path(), ".zip.acmi"),
        vec!["2_alpha_early.zip.acmi", "solo_gaps.zip.acmi"]
    );
    assert!(files_with_suffix(dir.path(), ".igc").is_empty());
}

#[test]
fn test_single_run_reports_conversion() {
    let dir = workspace(&["solo_gaps.igc"]);
    let console = MemoryConsole::new();
    let options = ConvertOptions {
        altitude_offset: 10,
        ..plain_options(dir.path())
    };

    let summary = IgcAcmiCore::run_single(
        &dir.path().join("solo_gaps.igc"),
        dir.path(),
        &options,
        &console,
    );

    assert!(summary.is_success());
    let text = fs::read_to_string(dir.path().join("solo_gaps.txt.acmi")).unwrap();
    assert!(text.contains("#10\n1000,T=-11.02|-47.02|1530\n"));
    assert!(console.at(Level::Info)[0].starts_with("Converted: "));
}

#[test]
fn test_latin1_header_still_combines() {
    let dir = workspace(&["latin1_pilot.igc"]);
    let console = MemoryConsole::new();
    let options = plain_options(dir.path());

    let summary = IgcAcmiCore::run_combine(dir.path(), dir.path(), &options, &console)
        .expect("Run should complete");

    assert!(summary.corrupt.is_empty());
    assert_eq!(summary.converted.len(), 1);
    let text = fs::read_to_string(dir.path().join("2021-07-18_CHARLIE.txt.acmi")).unwrap();
    assert!(text.contains("1001,Name=LS4,CallSign=CHARLIE,Pilot=J\u{fc}rgen M\u{fc}ller\n"));
    assert!(text.contains("#1\n1001,T=8.01|46.01|505\n"));
}

#[test]
fn test_latin1_header_single_conversion() {
    let dir = workspace(&["latin1_pilot.igc"]);
    let console = MemoryConsole::new();
    let options = plain_options(dir.path());

    let summary = IgcAcmiCore::run_single(
        &dir.path().join("latin1_pilot.igc"),
        dir.path(),
        &options,
        &console,
    );

    assert!(summary.is_success());
    let text = fs::read_to_string(dir.path().join("latin1_pilot.txt.acmi")).unwrap();
    assert!(text.contains("Pilot=J\u{fc}rgen M\u{fc}ller"));
}
