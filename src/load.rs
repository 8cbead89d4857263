//! Log file loading: read a whole file line by line through an extractor.

use crate::extract::Extractor;
use crate::record::LogRecord;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Records extracted from one log file, plus line accounting.
#[derive(Debug, Default)]
pub struct ParsedLog {
    pub records: Vec<LogRecord>,
    /// Non-empty lines seen.
    pub lines_read: usize,
    /// Non-empty lines that produced no record.
    pub lines_skipped: usize,
}

/// Errors produced while loading a log file.
#[derive(Debug)]
pub enum LoadError {
    NotFound { path: PathBuf },
    Read { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound { path } => write!(f, "log file not found: {}", path.display()),
            LoadError::Read { path, source } => {
                write!(f, "failed to read log file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::NotFound { .. } => None,
            LoadError::Read { source, .. } => Some(source),
        }
    }
}

/// Read every line of `path` and keep the ones the extractor accepts.
pub fn load_log(path: &Path, extractor: &dyn Extractor) -> Result<ParsedLog, LoadError> {
    let file = open(path)?;
    let parsed = read_records(std::io::BufReader::new(file), extractor).map_err(|e| {
        LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        }
    })?;

    tracing::debug!(
        path = %path.display(),
        kind = %extractor.kind(),
        layout = extractor.name(),
        records = parsed.records.len(),
        skipped = parsed.lines_skipped,
        "loaded log file"
    );
    if parsed.lines_read > 0 && parsed.records.is_empty() {
        tracing::warn!(
            path = %path.display(),
            lines = parsed.lines_read,
            "no line matched the expected format"
        );
    }
    Ok(parsed)
}

/// Read the non-empty lines of a file that has no record extractor (the loss log).
pub fn load_lines(path: &Path) -> Result<Vec<String>, LoadError> {
    let file = open(path)?;
    let mut lines = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line.map_err(|e| LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let line = line.trim_end();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

/// Extract records from any buffered reader.
pub fn read_records<R: BufRead>(reader: R, extractor: &dyn Extractor) -> std::io::Result<ParsedLog> {
    let mut parsed = ParsedLog::default();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        parsed.lines_read += 1;
        match extractor.extract(line) {
            Some(record) => parsed.records.push(record),
            None => parsed.lines_skipped += 1,
        }
    }
    Ok(parsed)
}
