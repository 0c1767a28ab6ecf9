//! Crash dump archives
//!
//! Instead of printing a full error report, failures can be stored in a
//! `<program>_Crashdump_<YYYY-MM-DD_HH-MM-SS>.zip` archive. Dumps written
//! within the same second share an archive.

use std::error::Error as StdError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::ConvertError;

/// Writer for crash dump archives of one program.
#[derive(Debug, Clone)]
pub struct CrashArchive {
    dir: PathBuf,
    program: String,
}

impl CrashArchive {
    pub fn new(dir: impl Into<PathBuf>, program: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
        }
    }

    /// Dump for a failure of the whole run, with the run configuration.
    pub fn program_dump<C: Serialize>(
        &self,
        config: &C,
        error: &(dyn StdError + 'static),
    ) -> Result<String, ConvertError> {
        let now = Local::now();
        let archive = self.archive_name(&now);
        let config = serde_json::to_string_pretty(config)
            .unwrap_or_else(|e| format!("<unserializable configuration: {}>", e));
        let body = format!(
            "ERROR LOG {}\n\nARGS:\n{}\n\nERROR TRACEBACK:\n{}\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            config,
            error_chain(error)
        );
        self.append_entry(&archive, &format!("{}.log", archive.trim_end_matches(".zip")), &body)?;
        Ok(archive)
    }

    /// Dump for a failure while handling one file or date-group.
    pub fn file_dump(
        &self,
        subject: &str,
        error: &(dyn StdError + 'static),
    ) -> Result<String, ConvertError> {
        let archive = self.archive_name(&Local::now());
        let body = format!(
            "Handled File Name:\n{}\n\nError:\n{}\n",
            subject,
            error_chain(error)
        );
        self.append_entry(&archive, &format!("{}_Exception.log", subject), &body)?;
        Ok(archive)
    }

    fn archive_name(&self, now: &chrono::DateTime<Local>) -> String {
        format!(
            "{}_Crashdump_{}.zip",
            self.program,
            now.format("%Y-%m-%d_%H-%M-%S")
        )
    }

    fn append_entry(&self, archive: &str, entry: &str, body: &str) -> Result<(), ConvertError> {
        let path = self.dir.join(archive);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut zip = if path.exists() {
            let existing: Vec<String> = ZipArchive::new(File::open(&path)?)?
                .file_names()
                .map(str::to_string)
                .collect();
            let file = OpenOptions::new().read(true).write(true).open(&path)?;
            let mut zip = ZipWriter::new_append(file)?;
            zip.start_file(unique_entry(entry, &existing), options)?;
            zip
        } else {
            let mut zip = ZipWriter::new(File::create(&path)?);
            zip.start_file(entry, options)?;
            zip
        };

        zip.write_all(body.as_bytes())?;
        zip.finish()?;
        Ok(())
    }
}

/// `entry`, or `entry.N` for the first free N when the name is taken.
fn unique_entry(entry: &str, existing: &[String]) -> String {
    if !existing.iter().any(|e| e == entry) {
        return entry.to_string();
    }
    (1..)
        .map(|n| format!("{}.{}", entry, n))
        .find(|candidate| !existing.iter().any(|e| e == candidate))
        .unwrap_or_else(|| entry.to_string())
}

/// An error followed by each of its sources on its own line.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut out = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
