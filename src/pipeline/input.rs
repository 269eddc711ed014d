//! Input discovery: list the scans to process and sanity-check each one.
//!
//! Validation happens before pdfium ever sees the file. A directory full of
//! printer output routinely contains half-written or mislabelled files, and
//! a clear `NotAPdf` error in the report beats a pdfium crash message.

use crate::error::SplitError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Regular files directly inside `dir` whose extension matches `extension`
/// (case-insensitive), sorted by path.
///
/// Subdirectories are not descended into.
pub async fn discover_inputs(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SplitError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(SplitError::InputDirNotFound {
                path: dir.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SplitError::InputDirNotFound {
                path: dir.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(SplitError::InputDirUnreadable {
                path: dir.to_path_buf(),
                source,
            })
        }
    }

    let unreadable = |source| SplitError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut inputs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        // Follows symlinks, so a link to a scan counts as a scan.
        let is_file = tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file && has_extension(&path, extension) {
            inputs.push(path);
        }
    }

    inputs.sort();
    debug!(
        "Found {} input file(s) in {}",
        inputs.len(),
        dir.display()
    );
    Ok(inputs)
}

/// Case-insensitive extension match.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Check that `path` exists, is readable, and starts with the `%PDF` magic.
pub fn validate_pdf(path: &Path) -> Result<(), SplitError> {
    if !path.exists() {
        return Err(SplitError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            match f.read_exact(&mut magic) {
                Ok(()) if &magic == b"%PDF" => Ok(()),
                Ok(()) => Err(SplitError::NotAPdf {
                    path: path.to_path_buf(),
                    magic,
                }),
                // Shorter than the magic itself.
                Err(_) => Err(SplitError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: "file is truncated".into(),
                }),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(SplitError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(_) => Err(SplitError::FileNotFound {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, bytes).unwrap();
        p
    }

    #[tokio::test]
    async fn lists_matching_files_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.pdf", b"%PDF");
        touch(dir.path(), "A.PDF", b"%PDF");
        touch(dir.path(), "notes.txt", b"hi");
        touch(dir.path(), "pdf", b"%PDF");
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        touch(&dir.path().join("nested.pdf"), "inner.pdf", b"%PDF");

        let found = discover_inputs(dir.path(), "pdf").await.unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[tokio::test]
    async fn empty_directory_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover_inputs(dir.path(), "pdf").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = discover_inputs(&dir.path().join("nope"), "pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, SplitError::InputDirNotFound { .. }));
    }

    #[tokio::test]
    async fn file_instead_of_directory() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "scan.pdf", b"%PDF");
        let err = discover_inputs(&file, "pdf").await.unwrap_err();
        assert!(matches!(err, SplitError::InputDirNotFound { .. }));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("x/SCAN.Pdf"), "pdf"));
        assert!(!has_extension(Path::new("x/scan.pdf.txt"), "pdf"));
        assert!(!has_extension(Path::new("x/scan"), "pdf"));
    }

    #[test]
    fn validate_accepts_pdf_magic() {
        let dir = TempDir::new().unwrap();
        let p = touch(dir.path(), "ok.pdf", b"%PDF-1.7\n...");
        assert!(validate_pdf(&p).is_ok());
    }

    #[test]
    fn validate_rejects_other_files() {
        let dir = TempDir::new().unwrap();
        let p = touch(dir.path(), "fake.pdf", b"PK\x03\x04zip");
        match validate_pdf(&p) {
            Err(SplitError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("expected NotAPdf, got {other:?}"),
        }
    }

    #[test]
    fn validate_reports_truncated_and_missing() {
        let dir = TempDir::new().unwrap();
        let p = touch(dir.path(), "short.pdf", b"%P");
        assert!(matches!(
            validate_pdf(&p),
            Err(SplitError::CorruptPdf { .. })
        ));
        assert!(matches!(
            validate_pdf(&dir.path().join("gone.pdf")),
            Err(SplitError::FileNotFound { .. })
        ));
    }
}
