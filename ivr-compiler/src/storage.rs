//! Persisted finalized trees (`<root>/builds/<build_id>.json`)
//!
//! Lets tree retrieval survive a process restart. Files are written to a
//! temporary sibling and renamed into place so readers never see a partial
//! record.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::models::IvrNode;
use ivr_common::{Error, Result};

#[derive(Debug, Clone)]
pub struct TreeStore {
    dir: PathBuf,
}

impl TreeStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, build_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", build_id))
    }

    pub async fn save(&self, build_id: Uuid, tree: &IvrNode) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let json = serde_json::to_vec_pretty(tree)
            .map_err(|e| Error::Internal(format!("Failed to serialize tree: {}", e)))?;

        let final_path = self.path_for(build_id);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", build_id));
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;

        tracing::debug!(%build_id, path = %final_path.display(), "Tree persisted");
        Ok(final_path)
    }

    /// Load a persisted tree; `None` when the build was never persisted
    pub async fn load(&self, build_id: Uuid) -> Result<Option<IvrNode>> {
        let path = self.path_for(build_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let tree = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Internal(format!("Corrupt tree record {}: {}", path.display(), e)))?;
        Ok(Some(tree))
    }
}
