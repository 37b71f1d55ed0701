//! Artifact store: write-once binary storage for pipeline images.
//!
//! Artifacts are keyed by `(job id, kind)` and addressed through an opaque
//! [`ArtifactRef`]. [`LocalArtifactStore`] is the filesystem backend.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::types::JobId;

// ---------------------------------------------------------------------------
// Artifact kind and reference
// ---------------------------------------------------------------------------

/// Pipeline stage that produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Initial,
    Cropped,
    Final,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Cropped => "cropped",
            Self::Final => "final",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initial" => Some(Self::Initial),
            "cropped" => Some(Self::Cropped),
            "final" => Some(Self::Final),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque artifact reference, stored in the job's `result_ref` column.
///
/// Format: `{job_id}/{kind}.png`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef(String);

impl ArtifactRef {
    pub fn new(job_id: JobId, kind: ArtifactKind) -> Self {
        Self(format!("{job_id}/{kind}.png"))
    }

    /// Parse a stored reference, rejecting anything not produced by [`ArtifactRef::new`].
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let invalid = || StorageError::InvalidRef(raw.to_string());
        let (job, file) = raw.split_once('/').ok_or_else(invalid)?;
        let job_id: JobId = job.parse().map_err(|_| invalid())?;
        let kind = file
            .strip_suffix(".png")
            .and_then(ArtifactKind::from_name)
            .ok_or_else(invalid)?;
        Ok(Self::new(job_id, kind))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Artifact already exists: {0}")]
    AlreadyExists(ArtifactRef),

    #[error("Artifact not found: {0}")]
    NotFound(ArtifactRef),

    #[error("Invalid artifact reference '{0}'")]
    InvalidRef(String),

    #[error("Artifact storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable, write-once key/blob storage for generated images.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` for `(job_id, kind)`. Fails with
    /// [`StorageError::AlreadyExists`] if that key was already written.
    async fn put(
        &self,
        job_id: JobId,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<ArtifactRef, StorageError>;

    /// Read back a previously stored artifact.
    async fn get(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, StorageError>;
}

// ---------------------------------------------------------------------------
// Local filesystem backend
// ---------------------------------------------------------------------------

/// Stores artifacts as `{root}/{job_id}/{kind}.png`.
///
/// Writes go to a uniquely named temporary file first and are published
/// with a hard link, which fails if the target exists. Readers never see a
/// partially written artifact and a key can only be written once.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if missing.
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, artifact: &ArtifactRef) -> PathBuf {
        // ArtifactRef is always `{uuid}/{kind}.png`, so this cannot escape root.
        self.root.join(artifact.as_str())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(
        &self,
        job_id: JobId,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> Result<ArtifactRef, StorageError> {
        let artifact = ArtifactRef::new(job_id, kind);
        let target = self.path_for(&artifact);
        let dir = self.root.join(job_id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".{kind}.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, bytes).await?;

        let linked = tokio::fs::hard_link(&tmp, &target).await;
        let _ = tokio::fs::remove_file(&tmp).await;

        match linked {
            Ok(()) => Ok(artifact),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(artifact))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn get(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(self.path_for(artifact)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(artifact.clone()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- ArtifactRef --

    #[test]
    fn artifact_ref_format() {
        let id = JobId::nil();
        let r = ArtifactRef::new(id, ArtifactKind::Final);
        assert_eq!(r.as_str(), "00000000-0000-0000-0000-000000000000/final.png");
    }

    #[test]
    fn artifact_ref_parse_accepts_own_output() {
        let id = JobId::new_v4();
        let r = ArtifactRef::new(id, ArtifactKind::Cropped);
        assert_eq!(ArtifactRef::parse(r.as_str()).unwrap(), r);
    }

    #[test]
    fn artifact_ref_parse_rejects_traversal_and_unknown_kinds() {
        assert!(ArtifactRef::parse("../../etc/passwd").is_err());
        assert!(ArtifactRef::parse("not-a-uuid/final.png").is_err());
        let id = JobId::new_v4();
        assert!(ArtifactRef::parse(&format!("{id}/thumbnail.png")).is_err());
        assert!(ArtifactRef::parse(&format!("{id}/final.jpg")).is_err());
    }

    // -- LocalArtifactStore --

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let id = JobId::new_v4();

        let r = store.put(id, ArtifactKind::Initial, b"png-bytes").await.unwrap();
        assert_eq!(store.get(&r).await.unwrap(), b"png-bytes");
        assert!(dir.path().join(id.to_string()).join("initial.png").exists());
    }

    #[tokio::test]
    async fn second_put_for_same_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let id = JobId::new_v4();

        store.put(id, ArtifactKind::Final, b"first").await.unwrap();
        let err = store.put(id, ArtifactKind::Final, b"second").await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // The original content is untouched.
        let r = ArtifactRef::new(id, ArtifactKind::Final);
        assert_eq!(store.get(&r).await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn kinds_are_independent_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let id = JobId::new_v4();

        store.put(id, ArtifactKind::Initial, b"a").await.unwrap();
        store.put(id, ArtifactKind::Cropped, b"b").await.unwrap();
        store.put(id, ArtifactKind::Final, b"c").await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let r = ArtifactRef::new(JobId::new_v4(), ArtifactKind::Final);
        assert!(matches!(
            store.get(&r).await.unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let id = JobId::new_v4();
        store.put(id, ArtifactKind::Final, b"x").await.unwrap();
        let _ = store.put(id, ArtifactKind::Final, b"y").await;

        let mut entries = tokio::fs::read_dir(dir.path().join(id.to_string()))
            .await
            .unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["final.png".to_string()]);
    }
}
