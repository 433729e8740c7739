//! Listing and opening weekly pattern and panel files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::SourceError;

/// Files directly under `dir` whose names end with `suffix`, sorted by name.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the directory cannot be read.
pub fn sorted_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SourceError::io(dir.display(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SourceError::io(dir.display(), e))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    log::debug!(
        "Found {} '*{suffix}' files in {}",
        files.len(),
        dir.display()
    );
    Ok(files)
}

/// Opens `path` for reading, decompressing when the name ends in `.gz`.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be opened.
pub fn open_decoded(path: &Path) -> Result<Box<dyn Read>, SourceError> {
    let file = File::open(path).map_err(|e| SourceError::io(path.display(), e))?;
    let reader = BufReader::new(file);

    let gzipped = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if gzipped {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}
