use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AttachmentError, ExtractError};

/// Where an attachment's bytes come from.
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    Bytes(Arc<[u8]>),
    /// Read lazily when the attachment is extracted.
    Path(PathBuf),
}

/// A user-selected file pending inclusion in the next outbound message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub source: AttachmentSource,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            source: AttachmentSource::Bytes(bytes.into()),
        }
    }

    /// Select a file from disk. Only `.pdf` files are accepted; the file is
    /// not opened until extraction.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AttachmentError::NoFileName {
                path: path.display().to_string(),
            })?;

        if !is_pdf_name(&name) {
            return Err(AttachmentError::NotPdf { name });
        }

        Ok(Self {
            name,
            source: AttachmentSource::Path(path.to_path_buf()),
        })
    }

    pub async fn load_bytes(&self) -> Result<Arc<[u8]>, ExtractError> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(Arc::clone(bytes)),
            AttachmentSource::Path(path) => tokio::fs::read(path)
                .await
                .map(Arc::from)
                .map_err(|source| ExtractError::Read {
                    name: self.name.clone(),
                    source,
                }),
        }
    }
}

fn is_pdf_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_accepts_pdf_extension_any_case() {
        let lower = Attachment::from_path("/tmp/report.pdf").unwrap();
        assert_eq!(lower.name, "report.pdf");

        let upper = Attachment::from_path("notes/SCAN.PDF").unwrap();
        assert_eq!(upper.name, "SCAN.PDF");
    }

    #[test]
    fn test_from_path_rejects_other_files() {
        let err = Attachment::from_path("/tmp/photo.png").unwrap_err();
        assert!(matches!(err, AttachmentError::NotPdf { ref name } if name == "photo.png"));

        assert!(Attachment::from_path("/tmp/pdf").is_err());
    }

    #[tokio::test]
    async fn test_load_bytes_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let attachment = Attachment::from_path(dir.path().join("gone.pdf")).unwrap();

        let err = attachment.load_bytes().await.unwrap_err();
        assert!(matches!(err, ExtractError::Read { ref name, .. } if name == "gone.pdf"));
    }

    #[tokio::test]
    async fn test_load_bytes_reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let attachment = Attachment::from_path(&path).unwrap();
        let bytes = attachment.load_bytes().await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-1.4");
    }
}
