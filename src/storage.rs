use std::path::{Path, PathBuf};

use anyhow::anyhow;
use async_trait::async_trait;
use log::{log, Level};

pub const PROOF_BUCKET: &str = "proof-files";

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `name` and returns the public URL.
    async fn upload(&self, bucket: &str, name: &str, bytes: &[u8]) -> anyhow::Result<String>;

    async fn download(&self, bucket: &str, name: &str) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Blob store backed by a directory, one sub-directory per bucket.
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn path_of(&self, bucket: &str, name: &str) -> anyhow::Result<PathBuf> {
        if !is_plain_name(bucket) || !is_plain_name(name) {
            return Err(anyhow!("Refusing blob path {bucket}/{name}"));
        }
        Ok(self.root.join(bucket).join(name))
    }
}

/// A single path component that cannot escape the bucket directory.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && Path::new(name).components().count() == 1
        && !name.contains(['/', '\\'])
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, bucket: &str, name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        let path = self.path_of(bucket, name)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        log!(Level::Debug, "Stored {} bytes at {}", bytes.len(), path.display());
        Ok(format!("{}/api/{bucket}/{name}", self.public_url))
    }

    async fn download(&self, bucket: &str, name: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path_of(bucket, name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Content type served for a stored proof file.
pub fn content_type_for(name: &str) -> mime::Mime {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    let essence = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => return mime::APPLICATION_OCTET_STREAM,
    };
    essence.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}
