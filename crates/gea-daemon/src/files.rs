//! Local file store for uploaded documents, CPD evidence and templates

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Which directory a stored file lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileArea {
    /// Project documents and CPD evidence
    Upload,
    /// Phase templates
    Template,
}

/// Flat directories addressed by stored file name
#[derive(Debug, Clone)]
pub struct FileStore {
    upload_dir: PathBuf,
    template_dir: PathBuf,
}

impl FileStore {
    pub fn new(upload_dir: impl Into<PathBuf>, template_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            template_dir: template_dir.into(),
        }
    }

    /// Create both directories if missing
    pub async fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(&self.upload_dir).await?;
        fs::create_dir_all(&self.template_dir).await
    }

    fn dir(&self, area: FileArea) -> &Path {
        match area {
            FileArea::Upload => &self.upload_dir,
            FileArea::Template => &self.template_dir,
        }
    }

    fn path(&self, area: FileArea, stored_name: &str) -> io::Result<PathBuf> {
        if stored_name.is_empty()
            || stored_name.contains(['/', '\\'])
            || stored_name.starts_with('.')
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid stored file name: {}", stored_name),
            ));
        }
        Ok(self.dir(area).join(stored_name))
    }

    pub async fn save(&self, area: FileArea, stored_name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path(area, stored_name)?;
        fs::create_dir_all(self.dir(area)).await?;
        fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored file");
        Ok(())
    }

    pub async fn read(&self, area: FileArea, stored_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(area, stored_name)?).await
    }
}

/// Content type for a download, by extension
pub fn content_type(filename: &str) -> &'static str {
    match gea_workflow::upload::extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some("xls") => "application/vnd.ms-excel",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> FileStore {
        let root = std::env::temp_dir().join(format!("gea-files-{}", uuid::Uuid::new_v4()));
        FileStore::new(root.join("uploads"), root.join("templates"))
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let store = store();
        store.ensure_dirs().await.unwrap();
        store
            .save(FileArea::Upload, "abc_report.pdf", b"%PDF-1.7")
            .await
            .unwrap();
        let bytes = store.read(FileArea::Upload, "abc_report.pdf").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        assert!(store.read(FileArea::Template, "abc_report.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_path_components() {
        let store = store();
        let err = store
            .save(FileArea::Upload, "../escape.pdf", b"x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a.PDF"), "application/pdf");
        assert_eq!(content_type("scan.jpeg"), "image/jpeg");
        assert_eq!(content_type("unknown"), "application/octet-stream");
    }
}
