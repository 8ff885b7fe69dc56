//! Staging of report files before a multipart upload.

use crate::error::{QaHubError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A report file accepted for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedReport {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

/// Result of filtering a set of paths down to uploadable reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedUpload {
    pub staged: Vec<StagedReport>,
    pub skipped: Vec<PathBuf>,
}

impl StagedUpload {
    pub fn total_bytes(&self) -> u64 {
        self.staged.iter().map(|r| r.size_bytes).sum()
    }

    /// Total staged size in kilobytes with one decimal, e.g. "12.5 KB".
    pub fn total_size_label(&self) -> String {
        format!("{:.1} KB", self.total_bytes() as f64 / 1024.0)
    }

    /// Warning for dropped files, if any were dropped.
    pub fn skipped_message(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        Some(format!(
            "{} file(s) skipped. Only XML files are allowed.",
            self.skipped.len()
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}

/// Only the name suffix is checked, the content is not inspected.
pub fn is_report_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".xml"))
}

/// Keep `.xml` files, skip everything else.
///
/// Accepted files must exist; skipped ones are never touched.
pub fn stage_reports(paths: &[PathBuf]) -> Result<StagedUpload> {
    let mut upload = StagedUpload::default();
    for path in paths {
        if !is_report_file(path) {
            upload.skipped.push(path.clone());
            continue;
        }
        let metadata =
            fs::metadata(path).map_err(|_| QaHubError::ReportNotFound(path.clone()))?;
        if !metadata.is_file() {
            return Err(QaHubError::ReportNotFound(path.clone()));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        upload.staged.push(StagedReport {
            path: path.clone(),
            file_name,
            size_bytes: metadata.len(),
        });
    }
    Ok(upload)
}

/// "3 report(s) processed".
pub fn processed_message(run_ids: &[i64]) -> String {
    format!("{} report(s) processed", run_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: usize) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, vec![b'x'; bytes]).unwrap();
        path
    }

    #[test]
    fn test_stage_keeps_only_xml_suffix() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "TEST-auth.xml", 1024),
            write(&dir, "notes.txt", 10),
            write(&dir, "TEST-cart.xml", 512),
            write(&dir, "report.XML", 10),
            write(&dir, "results.json", 10),
        ];

        let upload = stage_reports(&paths).unwrap();
        assert_eq!(upload.staged.len(), 2);
        assert_eq!(upload.skipped.len(), 3);
        assert_eq!(upload.staged[0].file_name, "TEST-auth.xml");
        assert_eq!(
            upload.skipped_message().unwrap(),
            "3 file(s) skipped. Only XML files are allowed."
        );
        assert_eq!(upload.total_size_label(), "1.5 KB");
    }

    #[test]
    fn test_stage_all_valid_has_no_skip_message() {
        let dir = TempDir::new().unwrap();
        let upload = stage_reports(&[write(&dir, "a.xml", 0)]).unwrap();
        assert!(upload.skipped_message().is_none());
        assert_eq!(upload.total_size_label(), "0.0 KB");
    }

    #[test]
    fn test_missing_xml_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.xml");
        assert!(matches!(
            stage_reports(&[missing]),
            Err(QaHubError::ReportNotFound(_))
        ));
    }

    #[test]
    fn test_missing_non_xml_file_is_just_skipped() {
        let upload = stage_reports(&[PathBuf::from("/nonexistent/readme.md")]).unwrap();
        assert!(upload.is_empty());
        assert_eq!(upload.skipped.len(), 1);
    }

    #[test]
    fn test_processed_message() {
        assert_eq!(processed_message(&[4, 5, 6]), "3 report(s) processed");
    }
}
