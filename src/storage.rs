//! Listings file and run-report persistence.

use crate::models::{ListingRecord, RunReport};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("listings file {path} is not a JSON array of records: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode run report: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn load_listings(path: &Path) -> Result<Vec<ListingRecord>, StorageError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StorageError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StorageError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Writes the report atomically (write-then-rename) so a crash mid-write
/// never leaves a truncated checkpoint behind.
pub fn checkpoint_report(path: &Path, report: &RunReport) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(report)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|source| StorageError::Write {
        path: tmp.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StorageError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// `listings.json` → `listings.report.json`, next to the input file.
pub fn default_report_path(listings: &Path) -> PathBuf {
    listings.with_extension("report.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemOutcome;

    #[test]
    fn listings_round_trip_through_the_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("listings.json");
        std::fs::write(
            &path,
            r#"[{"image_paths": ["front.jpg"], "price": 60.0, "department": "Menswear"}]"#,
        )
        .expect("write");

        let records = load_listings(&path).expect("load");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].department.as_deref(), Some("Menswear"));
        assert_eq!(records[0].price, Some(60.0));
    }

    #[test]
    fn non_array_files_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("listings.json");
        std::fs::write(&path, r#"{"image_paths": []}"#).expect("write");

        let err = load_listings(&path).unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_listings(Path::new("/no/such/listings.json")).unwrap_err();
        assert!(matches!(err, StorageError::Read { .. }));
    }

    #[test]
    fn checkpoint_writes_a_readable_report() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("listings.report.json");

        let mut report = RunReport::new(false);
        report.push(ItemOutcome::succeeded(0, 900));
        checkpoint_report(&path, &report).expect("checkpoint");

        let raw = std::fs::read_to_string(&path).expect("read back");
        let parsed: RunReport = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed.outcomes.len(), 1);
        assert_eq!(parsed.run_id, report.run_id);
    }

    #[test]
    fn report_path_sits_next_to_the_listings_file() {
        let path = default_report_path(Path::new("/data/listings.json"));
        assert_eq!(path, PathBuf::from("/data/listings.report.json"));
    }
}
