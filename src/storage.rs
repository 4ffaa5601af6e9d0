use async_trait::async_trait;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::validation::UploadedFile;

/// Namespace product images are written under.
pub const PRODUCT_NAMESPACE: &str = "products";

/// File-backed storage for product images.
///
/// References are opaque relative paths; callers only hand them back to
/// `resolve`, `remove` and `replace`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Writes the upload and returns its reference.
    async fn store(&self, file: &UploadedFile) -> Result<String, ServiceError>;

    /// Public URL for a reference; `None` when there is no image.
    fn resolve(&self, reference: Option<&str>) -> Option<String>;

    async fn remove(&self, reference: &str) -> Result<(), ServiceError>;

    /// Removes a file, logging instead of failing.
    async fn remove_best_effort(&self, reference: &str) {
        if let Err(e) = self.remove(reference).await {
            warn!(reference, error = %e, "failed to remove stored image");
        }
    }
}

/// Swaps the image a record points at.
///
/// The new file is stored first and its reference handed to `commit`, which
/// persists it on the owning record. Once that succeeds the old file is
/// removed on a best-effort basis; if it fails the new file is removed
/// instead and the record keeps its previous image.
pub async fn replace<T, F, Fut>(
    store: &dyn ImageStore,
    old: Option<&str>,
    file: &UploadedFile,
    commit: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(String) -> Fut + Send,
    Fut: Future<Output = Result<T, ServiceError>> + Send,
{
    let reference = store.store(file).await?;
    match commit(reference.clone()).await {
        Ok(value) => {
            if let Some(old) = old.filter(|old| !old.is_empty() && *old != reference) {
                store.remove_best_effort(old).await;
            }
            Ok(value)
        }
        Err(e) => {
            store.remove_best_effort(&reference).await;
            Err(e)
        }
    }
}

/// Writes images to `{root}/products/{uuid}.{ext}` and serves them under a
/// public URL prefix.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Creates the namespace directory so the first upload cannot race it.
    pub async fn ensure_layout(&self) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(self.root.join(PRODUCT_NAMESPACE))
            .await
            .map_err(|e| ServiceError::Storage(format!("{}: {}", self.root.display(), e)))
    }

    fn path_for(&self, reference: &str) -> Result<PathBuf, ServiceError> {
        let relative = Path::new(reference);
        let confined = relative.starts_with(PRODUCT_NAMESPACE)
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !confined {
            return Err(ServiceError::Storage(format!(
                "refusing image reference outside the store: {}",
                reference
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, file: &UploadedFile) -> Result<String, ServiceError> {
        let kind = file.kind().ok_or_else(|| {
            ServiceError::Storage("upload is not a recognised image".to_string())
        })?;
        let reference = format!(
            "{}/{}.{}",
            PRODUCT_NAMESPACE,
            Uuid::new_v4().simple(),
            kind.extension()
        );

        self.ensure_layout().await?;
        let path = self.path_for(&reference)?;
        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| ServiceError::Storage(format!("{}: {}", path.display(), e)))?;

        info!(
            reference = %reference,
            bytes = file.len(),
            original = file.file_name.as_deref().unwrap_or_default(),
            "stored image"
        );
        Ok(reference)
    }

    fn resolve(&self, reference: Option<&str>) -> Option<String> {
        reference
            .filter(|r| !r.is_empty())
            .map(|r| format!("{}/{}", self.public_prefix, r))
    }

    async fn remove(&self, reference: &str) -> Result<(), ServiceError> {
        let path = self.path_for(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Storage(format!("{}: {}", path.display(), e))),
        }
    }
}
