//! Persistence for generated STAC documents and failure reports.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::assembler::RunFailure;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::Path;

/// Writes a STAC document as pretty-printed JSON, creating parent
/// directories as needed.
pub fn write_json<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "Document written");
    Ok(())
}

/// Appends failed-run rows to a CSV report.
///
/// Creates the file with headers if it does not already exist.
pub fn append_failures(path: &Path, failures: &[RunFailure]) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = failures.len(), "Appending failure report");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for failure in failures {
        writer.serialize(failure)?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CloudProvider, Product, Region};
    use chrono::{TimeZone, Utc};
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn failure() -> RunFailure {
        RunFailure {
            region: Region::Conus,
            product: Product::Surface,
            cloud_provider: CloudProvider::Azure,
            reference_datetime: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            forecast_hour: 5,
            category: "asset_unavailable".to_string(),
            message: "asset not found".to_string(),
        }
    }

    #[test]
    fn test_write_json_creates_parent_dirs() {
        let dir = temp_path("hrrr_stac_test_json_dir");
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("item.json");

        write_json(&path, &serde_json::json!({"id": "x"})).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"id\""));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_append_failures_writes_header_once() {
        let path = temp_path("hrrr_stac_test_failures.csv");
        let _ = fs::remove_file(&path);

        append_failures(&path, &[failure()]).unwrap();
        append_failures(&path, &[failure()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("category")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failure_rows_are_self_describing() {
        let path = temp_path("hrrr_stac_test_failure_fields.csv");
        let _ = fs::remove_file(&path);

        append_failures(&path, &[failure()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert!(row.contains("conus"));
        assert!(row.contains("sfc"));
        assert!(row.contains("2024-05-01T12:00:00"));
        assert!(row.contains("asset_unavailable"));

        fs::remove_file(&path).unwrap();
    }
}
