use crate::logparse::{LineFormat, Severity};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read run log '{path}': {source}")]
    ReadLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write archive in '{dir}': {source}")]
    Write {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Archive file path for one entity on one calendar day.
pub fn archive_path(dir: &Path, entity_name: &str, day: NaiveDate) -> PathBuf {
    dir.join(format!("{}-{}.log", entity_name, day.format("%Y%m%d")))
}

/// Write the audit archive for one run.
///
/// Keeps only ERROR/WARN/INFO lines of the raw log, in original order.
/// One artifact per entity per calendar day; a
/// same-day rerun replaces the previous artifact atomically, so the archive
/// never holds a half-written file.
pub fn write_archive(
    format: &LineFormat,
    raw_log: &Path,
    dir: &Path,
    entity_name: &str,
    day: NaiveDate,
) -> Result<PathBuf, ArchiveError> {
    let file = File::open(raw_log).map_err(|source| ArchiveError::ReadLog {
        path: raw_log.to_path_buf(),
        source,
    })?;

    std::fs::create_dir_all(dir).map_err(|source| ArchiveError::Write {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|source| ArchiveError::Write {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut retained = 0usize;
    for record in format.parse(BufReader::new(file)) {
        let keep = matches!(
            record.severity,
            Severity::Error | Severity::Warn | Severity::Info
        );
        if keep {
            tmp.write_all(record.raw.as_bytes())
                .and_then(|_| tmp.write_all(b"\n"))
                .map_err(|source| ArchiveError::Write {
                    dir: dir.to_path_buf(),
                    source,
                })?;
            retained += 1;
        }
    }

    let target = archive_path(dir, entity_name, day);
    tmp.persist(&target).map_err(|e| ArchiveError::Write {
        dir: dir.to_path_buf(),
        source: e.error,
    })?;

    info!(
        entity = %entity_name,
        archive = %target.display(),
        retained,
        "run log archived"
    );
    Ok(target)
}
