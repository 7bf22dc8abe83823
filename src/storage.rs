use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::ApiError;

/// FileStore
///
/// Abstract contract for the attachment storage layer. The concrete
/// implementation writes to the local content directory in production and is
/// swapped for the in-memory mock in handler tests.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Validates the file's extension against `allowed`, writes the content
    /// under `<root>/<subdir>/`, and returns the stable reference path the
    /// client can resolve as a relative URL. Rejection writes nothing.
    async fn save(
        &self,
        filename: &str,
        data: &[u8],
        allowed: &[&str],
        subdir: &str,
    ) -> Result<String, ApiError>;
}

/// The concrete type used to share the attachment store across the
/// application state.
pub type StorageState = Arc<dyn FileStore>;

/// URL prefix under which stored attachments are exposed. Reference paths
/// always start here regardless of where the root directory lives on disk,
/// so an absolute upload root cannot leak into client-facing URLs.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Strips directory components from a client-supplied filename so a name
/// like "../../etc/passwd" cannot escape the upload directory.
fn sanitize_filename(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim_matches('.')
        .to_string()
}

/// Extension after the last `.`, lowercased, checked against the allow-list.
fn check_extension(filename: &str, allowed: &[&str]) -> Result<(), ApiError> {
    let extension = filename
        .rsplit('.')
        .next()
        .filter(|ext| *ext != filename)
        .unwrap_or("")
        .to_lowercase();
    if !allowed.contains(&extension.as_str()) {
        return Err(ApiError::UnsupportedType {
            extension,
            allowed: allowed.join(", "),
        });
    }
    Ok(())
}

/// LocalFileStore
///
/// Writes attachments under a configured root directory, prefixing each
/// filename with a UTC creation timestamp to avoid collisions. The
/// destination subdirectory is created on demand. Overwritten references do
/// not remove the previously stored file.
#[derive(Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        filename: &str,
        data: &[u8],
        allowed: &[&str],
        subdir: &str,
    ) -> Result<String, ApiError> {
        let name = sanitize_filename(filename);
        check_extension(&name, allowed)?;

        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;

        let stamped = format!("{}_{}", Utc::now().format("%Y%m%d%H%M%S"), name);
        tokio::fs::write(dir.join(&stamped), data).await?;

        Ok(format!("{PUBLIC_PREFIX}/{subdir}/{stamped}"))
    }
}

/// MockFileStore
///
/// Test double: performs the same extension validation as the real store but
/// keeps content in memory and returns deterministic reference paths.
#[derive(Clone, Default)]
pub struct MockFileStore {
    pub should_fail: bool,
    saved: Arc<Mutex<Vec<String>>>,
}

impl MockFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            saved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reference paths handed out so far, for test assertions.
    pub fn saved_paths(&self) -> Vec<String> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FileStore for MockFileStore {
    async fn save(
        &self,
        filename: &str,
        _data: &[u8],
        allowed: &[&str],
        subdir: &str,
    ) -> Result<String, ApiError> {
        if self.should_fail {
            return Err(ApiError::Validation(
                "Mock storage error: simulation requested".to_string(),
            ));
        }

        let name = sanitize_filename(filename);
        check_extension(&name, allowed)?;

        let path = format!("/uploads/{}/mock_{}", subdir, name);
        if let Ok(mut saved) = self.saved.lock() {
            saved.push(path.clone());
        }
        Ok(path)
    }
}
