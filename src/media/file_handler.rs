//! File handling for podcast uploads.

use crate::error::ServiceError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Errors that can occur during file handling.
#[derive(Debug, Error)]
pub enum FileHandlerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("File too large (max: {0} bytes)")]
    FileTooLarge(u64),

    #[error("Empty file")]
    EmptyFile,
}

impl From<FileHandlerError> for ServiceError {
    fn from(err: FileHandlerError) -> Self {
        match err {
            FileHandlerError::UnsupportedMediaType(_) => {
                ServiceError::InvalidMedia("Only audio and video files are allowed.".to_string())
            }
            FileHandlerError::EmptyFile => {
                ServiceError::InvalidMedia("The uploaded file is empty.".to_string())
            }
            FileHandlerError::FileTooLarge(max) => ServiceError::PayloadTooLarge { max },
            FileHandlerError::InvalidFilename(name) => {
                ServiceError::Internal(anyhow::anyhow!("Invalid stored filename {}", name))
            }
            FileHandlerError::Io(err) => ServiceError::Internal(err.into()),
        }
    }
}

const MAX_SANITIZED_LEN: usize = 100;
const FALLBACK_NAME: &str = "media";
const PARTIAL_SUFFIX: &str = ".part";
const PARTIAL_DIR_SUFFIX: &str = ".partial";
/// How many leading bytes are kept for content sniffing.
const SNIFF_LEN: usize = 8192;

/// Whether a declared content type is audio or video.
pub fn is_media_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    !subtype.is_empty() && (kind == "audio" || kind == "video")
}

/// Sanitize a client supplied filename so it can never leave the uploads
/// directory or hide itself.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    let mapped: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_control() {
                None
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                Some('_')
            }
        })
        .collect();

    let sanitized: String = mapped
        .trim_start_matches('.')
        .chars()
        .take(MAX_SANITIZED_LEN)
        .collect();

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// `<unix-millis>-<8 hex random>-<sanitized original>`
pub fn generate_stored_name(original_filename: &str) -> String {
    format!(
        "{}-{:08x}-{}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>(),
        sanitize_filename(original_filename)
    )
}

/// Where in-progress uploads are written: a hidden sibling of the uploads
/// directory, so they share its filesystem without being served with it.
fn partial_dir_for(uploads_dir: &Path) -> PathBuf {
    let name = uploads_dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "uploads".to_string());
    let parent = uploads_dir.parent().unwrap_or(uploads_dir);
    parent.join(format!(".{}{}", name, PARTIAL_DIR_SUFFIX))
}

/// Owns the uploads directory and its partial-upload sibling.
#[derive(Debug, Clone)]
pub struct MediaFileHandler {
    uploads_dir: PathBuf,
    partial_dir: PathBuf,
    /// Maximum file size in bytes.
    max_file_size: u64,
}

impl MediaFileHandler {
    pub fn new(uploads_dir: impl Into<PathBuf>, max_file_size: u64) -> Self {
        let uploads_dir = uploads_dir.into();
        Self {
            partial_dir: partial_dir_for(&uploads_dir),
            uploads_dir,
            max_file_size,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn partial_dir(&self) -> &Path {
        &self.partial_dir
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Creates the uploads and partial-upload directories.
    pub async fn init(&self) -> Result<(), FileHandlerError> {
        fs::create_dir_all(&self.uploads_dir).await?;
        fs::create_dir_all(&self.partial_dir).await?;
        Ok(())
    }

    /// Resolves a stored name to its path, refusing anything that is not a
    /// plain file name inside the uploads directory.
    pub fn path_for(&self, stored_name: &str) -> Result<PathBuf, FileHandlerError> {
        if stored_name.is_empty()
            || stored_name.starts_with('.')
            || stored_name.contains(['/', '\\', '\0'])
        {
            return Err(FileHandlerError::InvalidFilename(stored_name.to_string()));
        }
        Ok(self.uploads_dir.join(stored_name))
    }

    /// Opens a temporary file that becomes `stored_name` once finished.
    pub async fn begin(&self, stored_name: &str) -> Result<PendingMediaFile, FileHandlerError> {
        let final_path = self.path_for(stored_name)?;
        let part_path = self
            .partial_dir
            .join(format!("{}{}", stored_name, PARTIAL_SUFFIX));
        let file = fs::File::create(&part_path).await?;

        Ok(PendingMediaFile {
            file: Some(file),
            part_path,
            final_path,
            stored_name: stored_name.to_string(),
            written: 0,
            max_file_size: self.max_file_size,
            head: Vec::new(),
            committed: false,
        })
    }

    pub async fn remove(&self, stored_name: &str) -> Result<(), FileHandlerError> {
        let path = self.path_for(stored_name)?;
        fs::remove_file(&path).await?;
        debug!("Removed media file {}", path.display());
        Ok(())
    }

    pub fn exists(&self, stored_name: &str) -> bool {
        self.path_for(stored_name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }
}

/// An upload being streamed to disk. Dropping it before [`finish`] removes
/// the temporary file.
///
/// [`finish`]: PendingMediaFile::finish
pub struct PendingMediaFile {
    file: Option<fs::File>,
    part_path: PathBuf,
    final_path: PathBuf,
    stored_name: String,
    written: u64,
    max_file_size: u64,
    head: Vec<u8>,
    committed: bool,
}

impl PendingMediaFile {
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), FileHandlerError> {
        self.written += chunk.len() as u64;
        if self.written > self.max_file_size {
            return Err(FileHandlerError::FileTooLarge(self.max_file_size));
        }

        if self.head.len() < SNIFF_LEN {
            let take = (SNIFF_LEN - self.head.len()).min(chunk.len());
            self.head.extend_from_slice(&chunk[..take]);
        }

        let Some(file) = self.file.as_mut() else {
            return Err(std::io::Error::other("upload already closed").into());
        };
        file.write_all(chunk).await?;
        Ok(())
    }

    /// Checks the content, syncs the file and moves it into place.
    /// Returns the size in bytes.
    pub async fn finish(mut self) -> Result<u64, FileHandlerError> {
        if self.written == 0 {
            return Err(FileHandlerError::EmptyFile);
        }
        if let Some(kind) = infer::get(&self.head) {
            if !matches!(
                kind.matcher_type(),
                infer::MatcherType::Audio | infer::MatcherType::Video
            ) {
                return Err(FileHandlerError::UnsupportedMediaType(
                    kind.mime_type().to_string(),
                ));
            }
        }

        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        fs::rename(&self.part_path, &self.final_path).await?;
        self.committed = true;
        Ok(self.written)
    }
}

impl Drop for PendingMediaFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close the handle first, open files cannot be removed everywhere.
        drop(self.file.take());
        if let Err(err) = std::fs::remove_file(&self.part_path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove partial upload {}: {}",
                    self.part_path.display(),
                    err
                );
            }
        }
    }
}
