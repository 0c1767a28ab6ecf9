//! Conversion driver shared by every CLI mode.
//! No argument parsing or terminal handling lives here.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::acmi::AcmiWriter;
use crate::console::Console;
use crate::crashdump::{error_chain, CrashArchive};
use crate::grouper::{group_by_date, CorruptInput};
use crate::merge::{MergeError, MergedSession};
use crate::output::{session_file_name, StagingFile};
use crate::parser::{read_igc, IgcError};
use crate::paths::{discover_igc_files, file_stem};

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Parse error: {0}")]
    Parse(#[from] IgcError),
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Compression error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to process {}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<ConvertError>,
    },
}

impl ConvertError {
    fn in_file(path: &Path, source: impl Into<ConvertError>) -> Self {
        ConvertError::File {
            path: path.to_path_buf(),
            source: Box::new(source.into()),
        }
    }
}

/// Which program a run belongs to; names its crash dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Single,
    ConvertAll,
    Combine,
}

impl Mode {
    pub fn program_name(self) -> &'static str {
        match self {
            Mode::Single => "igc2acmi",
            Mode::ConvertAll => "conv-all-igcs",
            Mode::Combine => "combine-igcs",
        }
    }
}

/// Options for conversion runs.
#[derive(Clone, Debug, Serialize)]
pub struct ConvertOptions {
    /// Delete the IGC sources after a successful conversion.
    pub remove_sources: bool,
    /// Write `.zip.acmi` instead of `.txt.acmi`.
    pub compress: bool,
    /// Report failures in full instead of archiving them.
    pub debug: bool,
    /// Meters added to every altitude.
    pub altitude_offset: i32,
    /// Output name for the first merged file (when not already taken).
    pub requested_name: Option<String>,
    /// Where crash dump archives go.
    pub crash_dir: PathBuf,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            remove_sources: false,
            compress: true,
            debug: false,
            altitude_offset: 0,
            requested_name: None,
            crash_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Converted {
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub subject: String,
    pub message: String,
    pub crash_archive: Option<String>,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub converted: Vec<Converted>,
    pub failed: Vec<Failure>,
    pub corrupt: Vec<CorruptInput>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Core conversion API used by the CLI.
pub struct IgcAcmiCore;

impl IgcAcmiCore {
    /// Convert one IGC file into `<stem>.zip.acmi` / `<stem>.txt.acmi`.
    pub fn convert_file(
        path: &Path,
        out_dir: &Path,
        options: &ConvertOptions,
    ) -> Result<PathBuf, ConvertError> {
        let content = read_igc(path).map_err(|e| ConvertError::in_file(path, e))?;
        let session = MergedSession::single(&content)
            .map_err(|e| ConvertError::in_file(path, e))?
            .with_altitude_offset(options.altitude_offset);
        write_session(&session, out_dir, &file_stem(path), options.compress)
    }

    /// Merge all tracks of one flight date into a single document.
    pub fn combine_group(
        paths: &[PathBuf],
        out_dir: &Path,
        options: &ConvertOptions,
    ) -> Result<PathBuf, ConvertError> {
        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            contents.push(read_igc(path).map_err(|e| ConvertError::in_file(path, e))?);
        }

        let session = MergedSession::merge(&contents)
            .map_err(|e| match e {
                MergeError::Track { index, source } => ConvertError::in_file(&paths[index], source),
                other => other.into(),
            })?
            .with_altitude_offset(options.altitude_offset);

        let name = session_file_name(
            session.reference().date(),
            &session.callsigns(),
            options.requested_name.as_deref(),
            out_dir,
        );
        write_session(&session, out_dir, &name, options.compress)
    }

    /// Single-file mode with console reporting.
    pub fn run_single(
        path: &Path,
        out_dir: &Path,
        options: &ConvertOptions,
        console: &dyn Console,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        Self::convert_one_reported(Mode::Single, path, out_dir, options, console, &mut summary);
        summary
    }

    /// Convert every IGC file in `in_dir` to its own document.
    pub fn run_convert_all(
        in_dir: &Path,
        out_dir: &Path,
        options: &ConvertOptions,
        console: &dyn Console,
    ) -> Result<RunSummary, ConvertError> {
        let mut summary = RunSummary::default();
        let files = discover_igc_files(in_dir)?;
        if files.is_empty() {
            console.warn(&format!("No .igc files found in \"{}\"", in_dir.display()));
            return Ok(summary);
        }
        for path in &files {
            Self::convert_one_reported(Mode::ConvertAll, path, out_dir, options, console, &mut summary);
        }
        Ok(summary)
    }

    /// Merge the IGC files in `in_dir` into one document per flight date.
    ///
    /// A failing date-group is reported and skipped; the other groups still
    /// run. Files without a date header are reported and left out.
    pub fn run_combine(
        in_dir: &Path,
        out_dir: &Path,
        options: &ConvertOptions,
        console: &dyn Console,
    ) -> Result<RunSummary, ConvertError> {
        let mut summary = RunSummary::default();
        let files = discover_igc_files(in_dir)?;
        if files.is_empty() {
            console.warn(&format!("No .igc files found in \"{}\"", in_dir.display()));
            return Ok(summary);
        }

        let grouped = group_by_date(&files);
        if !grouped.corrupt.is_empty() {
            console.warn(
                "The following files have no valid date header line and will not be converted:",
            );
            for input in &grouped.corrupt {
                console.warn(&format!("\"{}\" ({})", input.path.display(), input.reason));
            }
        }
        summary.corrupt = grouped.corrupt;

        for (date, paths) in &grouped.groups {
            let day = date.format("%d %b %Y").to_string();
            console.info(&format!("Handling flights of date: {}", day));

            match Self::combine_group(paths, out_dir, options) {
                Ok(output) => {
                    console.info(&format!(
                        "Combined the following files into \"{}\":",
                        output.display()
                    ));
                    for path in paths {
                        console.info(&format!("\"{}\"", path.display()));
                    }
                    remove_sources(paths, options, console);
                    summary.converted.push(Converted {
                        output,
                        sources: paths.clone(),
                    });
                }
                Err(e) => {
                    let failure = report_failure(
                        Mode::Combine,
                        &group_subject(*date),
                        &format!("Unable to combine flights of date {}", day),
                        &e,
                        options,
                        console,
                    );
                    summary.failed.push(failure);
                }
            }
        }
        Ok(summary)
    }

    fn convert_one_reported(
        mode: Mode,
        path: &Path,
        out_dir: &Path,
        options: &ConvertOptions,
        console: &dyn Console,
        summary: &mut RunSummary,
    ) {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match Self::convert_file(path, out_dir, options) {
            Ok(output) => {
                remove_sources(std::slice::from_ref(&path.to_path_buf()), options, console);
                console.info(&format!("Converted: \"{}\"", output.display()));
                summary.converted.push(Converted {
                    output,
                    sources: vec![path.to_path_buf()],
                });
            }
            Err(e) => {
                let failure = report_failure(
                    mode,
                    &file_name,
                    &format!("Unable to convert \"{}\"", file_name),
                    &e,
                    options,
                    console,
                );
                summary.failed.push(failure);
            }
        }
    }
}

/// Write a session through a staging file and move it into place.
pub fn write_session(
    session: &MergedSession,
    out_dir: &Path,
    name: &str,
    compress: bool,
) -> Result<PathBuf, ConvertError> {
    let mut staging = StagingFile::create(out_dir, name)?;
    session.write_acmi(&mut AcmiWriter::new(staging.writer()?))?;
    staging.commit(compress)
}

fn group_subject(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn remove_sources(paths: &[PathBuf], options: &ConvertOptions, console: &dyn Console) {
    if !options.remove_sources {
        return;
    }
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match fs::remove_file(path) {
            Ok(()) => console.info(&format!("Removed {}", name)),
            Err(e) => console.warn(&format!("Could not remove {}: {}", name, e)),
        }
    }
}

/// Print a failure in full (debug) or archive it and print a short notice.
pub fn report_failure(
    mode: Mode,
    subject: &str,
    headline: &str,
    error: &ConvertError,
    options: &ConvertOptions,
    console: &dyn Console,
) -> Failure {
    let details = error_chain(error);
    if options.debug {
        console.error(&format!("{}, error:\n{}", headline, details));
        return Failure {
            subject: subject.to_string(),
            message: details,
            crash_archive: None,
        };
    }

    let archive = CrashArchive::new(&options.crash_dir, mode.program_name());
    match archive.file_dump(subject, error) {
        Ok(name) => {
            console.error(&format!(
                "{}, a crashlog for it has been saved in \"{}\"",
                headline, name
            ));
            Failure {
                subject: subject.to_string(),
                message: details,
                crash_archive: Some(name),
            }
        }
        Err(dump_error) => {
            console.error(&format!(
                "{}, and the crashlog could not be written ({}), error:\n{}",
                headline, dump_error, details
            ));
            Failure {
                subject: subject.to_string(),
                message: details,
                crash_archive: None,
            }
        }
    }
}
