//! Output file staging, naming and compression
//!
//! Every document is first written to `<name>.tmpacmi`. Only a successful
//! [`StagingFile::commit`] turns it into `<name>.zip.acmi` or
//! `<name>.txt.acmi`; dropping an uncommitted staging file deletes it, so
//! errors and unwinding both leave the output directory clean.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::ConvertError;

pub const STAGING_EXT: &str = "tmpacmi";
pub const ZIP_EXT: &str = "zip.acmi";
pub const TEXT_EXT: &str = "txt.acmi";

/// A `.tmpacmi` file that is removed unless committed.
pub struct StagingFile {
    dir: PathBuf,
    name: String,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl StagingFile {
    pub fn create(dir: &Path, name: &str) -> Result<Self, ConvertError> {
        let path = dir.join(format!("{}.{}", name, STAGING_EXT));
        let file = File::create(&path)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.name, STAGING_EXT))
    }

    /// Final path the staging file will be committed to.
    pub fn final_path(&self, compress: bool) -> PathBuf {
        let ext = if compress { ZIP_EXT } else { TEXT_EXT };
        self.dir.join(format!("{}.{}", self.name, ext))
    }

    pub fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "staging file already closed"))
    }

    /// Close the staging file and move it to its final name.
    pub fn commit(mut self, compress: bool) -> Result<PathBuf, ConvertError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let staging = self.path();
        let target = self.final_path(compress);
        if compress {
            let entry = format!("{}.{}", self.name, TEXT_EXT);
            compress_into(&staging, &target, &entry)?;
            fs::remove_file(&staging)?;
        } else {
            fs::rename(&staging, &target)?;
        }

        self.committed = true;
        Ok(target)
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // close the handle before unlinking
        self.writer.take();
        let path = self.path();
        if path.exists() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Could not remove staging file {:?}: {}", path, e);
            }
        }
    }
}

/// Wrap `source` into a one-entry zip archive at `target`.
pub fn compress_into(source: &Path, target: &Path, entry_name: &str) -> Result<(), ConvertError> {
    let result = (|| -> Result<(), ConvertError> {
        let mut zip = ZipWriter::new(File::create(target)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(entry_name, options)?;
        let mut input = File::open(source)?;
        io::copy(&mut input, &mut zip)?;
        zip.finish()?;
        Ok(())
    })();

    if result.is_err() && target.exists() {
        let _ = fs::remove_file(target);
    }
    result
}

/// Name for a merged session file.
///
/// A requested name wins when no `<name>.*` file exists yet in `out_dir`;
/// otherwise the name is `YYYY-MM-DD_<Callsign1>_<Callsign2>...`.
pub fn session_file_name(
    date: NaiveDate,
    callsigns: &[&str],
    requested: Option<&str>,
    out_dir: &Path,
) -> String {
    if let Some(name) = requested.filter(|n| !n.is_empty()) {
        if !name_taken(out_dir, name) {
            return name.to_string();
        }
        tracing::debug!("Requested name {:?} already in use, synthesizing one", name);
    }

    let mut name = date.format("%Y-%m-%d").to_string();
    let mut used: Vec<&str> = Vec::new();
    for &callsign in callsigns {
        if used.contains(&callsign) {
            continue;
        }
        used.push(callsign);
        name.push('_');
        name.push_str(callsign);
    }
    name
}

/// Whether any file named `<name>.<something>` exists in `dir`.
pub fn name_taken(dir: &Path, name: &str) -> bool {
    let prefix = format!("{}.", name);
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 7, 15).unwrap()
    }

    #[test]
    fn test_duplicate_callsigns_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let name = session_file_name(date(), &["ALPHA", "ALPHA"], None, dir.path());
        assert_eq!(name, "2021-07-15_ALPHA");
        assert_eq!(name.matches("ALPHA").count(), 1);
    }

    #[test]
    fn test_requested_name_used_when_free() {
        let dir = tempfile::tempdir().unwrap();
        let name = session_file_name(date(), &["A", "B"], Some("contest"), dir.path());
        assert_eq!(name, "contest");

        fs::write(dir.path().join("contest.zip.acmi"), b"x").unwrap();
        let name = session_file_name(date(), &["A", "B"], Some("contest"), dir.path());
        assert_eq!(name, "2021-07-15_A_B");
    }

    #[test]
    fn test_dropped_staging_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let staging_path;
        {
            let mut staging = StagingFile::create(dir.path(), "partial").unwrap();
            staging.writer().unwrap().write_all(b"FileType=").unwrap();
            staging_path = staging.path();
            assert!(staging_path.exists());
        }
        assert!(!staging_path.exists());
    }

    #[test]
    fn test_commit_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingFile::create(dir.path(), "flight").unwrap();
        staging.writer().unwrap().write_all(b"hello\n").unwrap();
        let out = staging.commit(false).unwrap();
        assert_eq!(out, dir.path().join("flight.txt.acmi"));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
        assert!(!dir.path().join("flight.tmpacmi").exists());
    }

    #[test]
    fn test_commit_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = StagingFile::create(dir.path(), "flight").unwrap();
        staging.writer().unwrap().write_all(b"hello\n").unwrap();
        let out = staging.commit(true).unwrap();
        assert_eq!(out, dir.path().join("flight.zip.acmi"));
        assert!(!dir.path().join("flight.tmpacmi").exists());

        let mut archive = zip::ZipArchive::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_name("flight.txt.acmi").unwrap();
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert_eq!(text, "hello\n");
    }
}
