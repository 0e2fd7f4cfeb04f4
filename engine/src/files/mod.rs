//! Upload storage
//!
//! Files sent to the bot are saved under the uploads directory with a
//! sanitized, timestamped name and linked through the file server. Text files
//! can be read back for `/analyze`.

use dashmap::DashMap;
use futures::StreamExt;
use regex::Regex;
use sdk::errors::EngineError;
use sdk::types::SessionKey;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::io::AsyncWriteExt;

/// Largest file `read_file_content` accepts
pub const MAX_READ_SIZE_MB: u64 = 10;

/// Extensions read as UTF-8 text
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "json", "csv", "js", "py", "html", "css", "xml", "log",
];

static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();

fn unsafe_chars() -> &'static Regex {
    UNSAFE_CHARS.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]").expect("Invalid file name pattern"))
}

/// Local name for a stored upload: `<base>_<millis><.ext>`
///
/// Every non-alphanumeric character of `base` becomes `_`. `ext` is taken
/// verbatim (with its leading dot) and may be empty.
pub fn safe_file_name(base: &str, ext: &str, timestamp_millis: i64) -> String {
    format!(
        "{}_{}{}",
        unsafe_chars().replace_all(base, "_"),
        timestamp_millis,
        ext
    )
}

/// Extension of `path` with its leading dot, or an empty string
pub fn dotted_extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// A file saved in the uploads directory
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// Last document uploaded in a chat, kept for `/analyze`
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
    pub mime_type: Option<String>,
}

/// Uploads directory plus the public URL it is served under
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    public_url: String,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Public URL of a stored file
    pub fn file_url(&self, file_name: &str) -> String {
        format!("{}/uploads/{}", self.public_url, file_name)
    }

    /// Stream an HTTP response body into a new file
    ///
    /// `remote_path` only contributes its extension.
    pub async fn save_response(
        &self,
        base_name: &str,
        remote_path: &str,
        response: reqwest::Response,
    ) -> Result<StoredFile, EngineError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = safe_file_name(
            base_name,
            &dotted_extension(remote_path),
            chrono::Utc::now().timestamp_millis(),
        );
        let path = self.dir.join(&file_name);

        let mut file = tokio::fs::File::create(&path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                EngineError::Network(crate::secrets::scrub(&format!(
                    "Download interrupted: {}",
                    e
                )))
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!("Stored upload {:?}", path);
        Ok(StoredFile { path, file_name })
    }
}

/// Read a stored file for analysis
///
/// Text files are returned verbatim; other files yield a one-line
/// description.
///
/// # Errors
///
/// `EngineError::FileTooLarge` above `MAX_READ_SIZE_MB`, `EngineError::Io`
/// if the file cannot be read.
pub async fn read_file_content(path: &Path) -> Result<String, EngineError> {
    let metadata = tokio::fs::metadata(path).await?;
    let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);

    if size_mb > MAX_READ_SIZE_MB as f64 {
        return Err(EngineError::FileTooLarge {
            size_mb,
            limit_mb: MAX_READ_SIZE_MB,
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        let bytes = tokio::fs::read(path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        let dotted = if ext.is_empty() {
            String::new()
        } else {
            format!(".{}", ext)
        };
        Ok(format!(
            "This is a binary or non-text file ({}). File size: {:.2}MB.",
            dotted, size_mb
        ))
    }
}

/// Last uploaded document per chat
#[derive(Debug, Default)]
pub struct UploadRegistry {
    uploads: DashMap<SessionKey, UploadedFile>,
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, key: SessionKey, file: UploadedFile) {
        self.uploads.insert(key, file);
    }

    pub fn last(&self, key: &SessionKey) -> Option<UploadedFile> {
        self.uploads.get(key).map(|f| f.clone())
    }
}
