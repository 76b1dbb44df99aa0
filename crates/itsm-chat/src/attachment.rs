//! Attachment validation.
//!
//! Files picked by the operator are checked here before they can enter a
//! draft or an outgoing message. Rejections are reported as data.

use std::fmt;
use std::path::Path;

// =============================================================================
// RawFile
// =============================================================================

/// A file selected by the operator, bytes included.
///
/// The bytes travel with the outgoing request only. Transcripts keep an
/// [`AttachmentRef`] instead.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFile {
    name: String,
    content: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, naming it after the last path component.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn byte_size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Transcript descriptor for this file. `None` for an empty file.
    pub fn descriptor(&self) -> Option<AttachmentRef> {
        AttachmentRef::new(self.name.clone(), self.byte_size())
    }
}

impl fmt::Debug for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFile")
            .field("name", &self.name)
            .field("byte_size", &self.byte_size())
            .finish()
    }
}

// =============================================================================
// AttachmentRef
// =============================================================================

/// Name and size of an attached file, as recorded in a transcript.
///
/// Invariant: `byte_size > 0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRef {
    name: String,
    byte_size: u64,
}

impl AttachmentRef {
    /// Returns `None` when `byte_size` is zero.
    pub fn new(name: impl Into<String>, byte_size: u64) -> Option<Self> {
        if byte_size == 0 {
            return None;
        }
        Some(Self {
            name: name.into(),
            byte_size,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Size in kilobytes with one decimal, e.g. `"12.3KB"`.
    pub fn size_label(&self) -> String {
        format!("{:.1}KB", self.byte_size as f64 / 1024.0)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Why a selected file was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The file has zero bytes.
    EmptyFile,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyFile => f.write_str("file is empty (0 bytes)"),
        }
    }
}

/// A file refused by the validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: RejectReason,
}

/// Outcome of validating a batch of selected files, in selection order.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub accepted: Vec<RawFile>,
    pub rejected: Vec<RejectedFile>,
}

/// Checks operator-selected files before they may be attached.
///
/// Policy: zero-byte files are rejected, everything else passes unmodified.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttachmentValidator;

impl AttachmentValidator {
    pub fn validate(&self, files: Vec<RawFile>) -> ValidationReport {
        let mut report = ValidationReport::default();
        for file in files {
            if file.byte_size() == 0 {
                tracing::warn!(file = %file.name(), "Rejected empty attachment");
                report.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectReason::EmptyFile,
                });
            } else {
                report.accepted.push(file);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_rejected() {
        let report = AttachmentValidator.validate(vec![RawFile::new("empty.log", Vec::new())]);
        assert!(report.accepted.is_empty());
        assert_eq!(
            report.rejected,
            vec![RejectedFile {
                name: "empty.log".to_string(),
                reason: RejectReason::EmptyFile,
            }]
        );
    }

    #[test]
    fn test_non_empty_files_pass_unmodified_in_order() {
        let files = vec![
            RawFile::new("a.txt", b"alpha".to_vec()),
            RawFile::new("b.txt", b"b".to_vec()),
        ];
        let report = AttachmentValidator.validate(files.clone());
        assert_eq!(report.accepted, files);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_mixed_batch_splits_by_size() {
        let report = AttachmentValidator.validate(vec![
            RawFile::new("blank.csv", Vec::new()),
            RawFile::new("trace.log", b"panic at line 3".to_vec()),
            RawFile::new("none.txt", Vec::new()),
        ]);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].name(), "trace.log");
        let names: Vec<&str> = report.rejected.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["blank.csv", "none.txt"]);
    }

    #[test]
    fn test_empty_selection() {
        let report = AttachmentValidator.validate(Vec::new());
        assert!(report.accepted.is_empty());
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn test_attachment_ref_refuses_zero_size() {
        assert!(AttachmentRef::new("x", 0).is_none());
        assert!(RawFile::new("x", Vec::new()).descriptor().is_none());

        let r = RawFile::new("dump.txt", vec![0u8; 2048]).descriptor().unwrap();
        assert_eq!(r.name(), "dump.txt");
        assert_eq!(r.byte_size(), 2048);
        assert_eq!(r.size_label(), "2.0KB");
    }

    #[test]
    fn test_reject_reason_display() {
        assert_eq!(RejectReason::EmptyFile.to_string(), "file is empty (0 bytes)");
    }

    #[test]
    fn test_raw_file_debug_hides_bytes() {
        let file = RawFile::new("secret.env", b"TOKEN=abc".to_vec());
        let dbg = format!("{:?}", file);
        assert!(dbg.contains("secret.env"));
        assert!(!dbg.contains("TOKEN"));
    }

    #[tokio::test]
    async fn test_from_path_reads_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let file = RawFile::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "screenshot.png");
        assert_eq!(file.byte_size(), 3);
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = RawFile::from_path(Path::new("/nonexistent/file.bin")).await;
        assert!(result.is_err());
    }
}
