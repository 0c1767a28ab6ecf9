//! Input/output directory handling and IGC file discovery.

use std::path::{Path, PathBuf};

use crate::console::Console;
use crate::core::ConvertError;

/// Resolve a directory argument.
///
/// An existing directory is used as is and an existing file stands for its
/// parent directory. A missing argument means the current directory; an
/// invalid one falls back to it with a warning.
pub fn resolve_dir(arg: Option<&Path>, label: &str, console: &dyn Console) -> PathBuf {
    let fallback = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(arg) = arg.filter(|p| !p.as_os_str().is_empty()) else {
        return fallback();
    };

    match arg.canonicalize() {
        Ok(path) if path.is_dir() => path,
        Ok(path) if path.is_file() => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(fallback),
        _ => {
            console.warn(&format!(
                "{} path is not valid, defaulting to current directory",
                label
            ));
            fallback()
        }
    }
}

/// IGC files directly inside `dir`, sorted by file name.
pub fn discover_igc_files(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_igc(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn is_igc(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("igc"))
        .unwrap_or(false)
}

/// File name without its extension, for output naming.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flight".to_string())
}
