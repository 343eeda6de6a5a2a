use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use csv::Writer;
use log::info;

use crate::errors::{QuantError, Result};
use crate::results::QuantificationResult;

/// Name of the plain-text summary written on export
pub const SUMMARY_FILE_NAME: &str = "percentages.txt";
pub const CSV_SUMMARY_FILE_NAME: &str = "percentages.csv";

/// Export the summary text and a copy of every result image to `destination`.
///
/// Each copy is named after its source image. Existing files of the same
/// name are overwritten. Files already written stay in place if a later
/// write fails.
pub fn export<P: AsRef<Path>>(results: &[QuantificationResult], destination: P) -> Result<()> {
    if results.is_empty() {
        return Err(QuantError::NoResults);
    }

    let destination = destination.as_ref();
    fs::create_dir_all(destination)?;

    let summary_path = destination.join(SUMMARY_FILE_NAME);
    let mut summary = BufWriter::new(File::create(&summary_path)?);

    for result in results {
        let name = result.source_name();
        writeln!(summary, "{}: {}% ", name, result.percentage_text())?;
        fs::copy(&result.result_image_path, destination.join(&name))?;
    }

    summary.flush()?;

    info!("Exported {} results to {}", results.len(), destination.display());
    Ok(())
}

/// Write the results as CSV to `destination/percentages.csv`
pub fn write_results_csv<P: AsRef<Path>>(
    results: &[QuantificationResult],
    destination: P,
) -> Result<PathBuf> {
    if results.is_empty() {
        return Err(QuantError::NoResults);
    }

    let output_path = destination.as_ref().join(CSV_SUMMARY_FILE_NAME);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;
    writer.write_record(["Image", "Result_Image", "Percentage"])?;

    for result in results {
        writer.write_record([
            result.source_name(),
            result.result_image_path.display().to_string(),
            format!("{:.3}", result.percentage),
        ])?;
    }

    writer.flush()?;

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_results(scratch: &Path) -> Vec<QuantificationResult> {
        [("a.png", 12.5, b"first".as_slice()), ("b.tif", 0.0, b"second".as_slice())]
            .iter()
            .map(|(name, percentage, bytes)| {
                let result_image_path = scratch.join(format!("{}_result.png", name));
                fs::write(&result_image_path, bytes).unwrap();
                QuantificationResult {
                    source_path: PathBuf::from("/data").join(name),
                    result_image_path,
                    percentage: *percentage,
                }
            })
            .collect()
    }

    #[test]
    fn test_export_without_results_writes_nothing() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("export");

        assert!(matches!(export(&[], &destination), Err(QuantError::NoResults)));
        assert!(!destination.exists());
    }

    #[test]
    fn test_export_writes_summary_and_copies() {
        let scratch = tempdir().unwrap();
        let destination = tempdir().unwrap();
        let results = fake_results(scratch.path());

        export(&results, destination.path()).unwrap();

        let summary = fs::read_to_string(destination.path().join(SUMMARY_FILE_NAME)).unwrap();
        assert_eq!(summary, "a.png: 12.5% \nb.tif: 0.0% \n");
        assert_eq!(fs::read(destination.path().join("a.png")).unwrap(), b"first");
        assert_eq!(fs::read(destination.path().join("b.tif")).unwrap(), b"second");
    }

    #[test]
    fn test_export_twice_is_idempotent() {
        let scratch = tempdir().unwrap();
        let destination = tempdir().unwrap();
        let results = fake_results(scratch.path());
        fs::write(destination.path().join("a.png"), b"an older file").unwrap();

        export(&results, destination.path()).unwrap();
        let first = fs::read(destination.path().join(SUMMARY_FILE_NAME)).unwrap();
        export(&results, destination.path()).unwrap();
        let second = fs::read(destination.path().join(SUMMARY_FILE_NAME)).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(destination.path().join("a.png")).unwrap(), b"first");
        assert_eq!(fs::read_dir(destination.path()).unwrap().count(), 3);
    }

    #[test]
    fn test_export_missing_result_image_is_io_error() {
        let destination = tempdir().unwrap();
        let results = vec![QuantificationResult {
            source_path: PathBuf::from("/data/x.png"),
            result_image_path: destination.path().join("gone_result.png"),
            percentage: 1.0,
        }];

        assert!(matches!(export(&results, destination.path()), Err(QuantError::Io(_))));
    }

    #[test]
    fn test_write_results_csv() {
        let scratch = tempdir().unwrap();
        let destination = tempdir().unwrap();
        let results = fake_results(scratch.path());

        let path = write_results_csv(&results, destination.path()).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "a.png");
        assert_eq!(&rows[0][2], "12.500");
        assert_eq!(&rows[1][2], "0.000");
    }
}
