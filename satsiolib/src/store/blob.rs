//! Объектное хранилище на файловой системе: `<root>/<bucket>/<key>`.

use crate::{
    error::{Result, SatsError},
    traits::BlobStore,
};
use std::{
    fs,
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};
use tracing::debug;

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBlobStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Путь объекта; bucket и key не могут выходить за пределы корня.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        check_segment(bucket, "bucket")?;
        if key.is_empty() || key.ends_with('/') || key.split('/').any(str::is_empty) {
            return Err(SatsError::InvalidKey(format!("bad object key {key:?}")));
        }
        let rel = Path::new(key);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(SatsError::InvalidKey(format!("object key {key:?} escapes the bucket")));
        }
        Ok(self.root.join(bucket).join(rel))
    }
}

fn check_segment(s: &str, what: &str) -> Result<()> {
    if s.is_empty() || s == "." || s == ".." || s.contains(['/', '\\']) {
        return Err(SatsError::InvalidKey(format!("bad {what} name {s:?}")));
    }
    Ok(())
}

impl BlobStore for LocalBlobStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        debug!(bucket, key, "get object");
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SatsError::NotFound(format!("{bucket}/{key}")),
            _ => SatsError::Io(e),
        })
    }

    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        debug!(bucket, key, size = bytes.len(), "put object");
        fs::write(&path, bytes)?;
        Ok(())
    }
}
