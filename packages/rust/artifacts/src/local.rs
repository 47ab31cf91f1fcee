use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use migrationplanner_shared::{PlannerError, Result};

use crate::ArtifactStore;

/// Objects as files under a root directory. Keys map to relative paths.
///
/// Each file is written to a hidden temp file next to the target and then
/// renamed over it, so readers never see a partial artifact.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target path for `key`. Absolute keys and `..` segments are rejected.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(PlannerError::Storage(format!("invalid artifact key {key:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let target = self.path_for(key)?;
        let parent = target.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| PlannerError::io(&parent, e))?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp = parent.join(format!(".{file_name}.tmp"));

        tokio::fs::write(&temp, &body)
            .await
            .map_err(|e| PlannerError::io(&temp, e))?;
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| PlannerError::io(&target, e))?;

        debug!(path = %target.display(), size = body.len(), "wrote local artifact");
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        self.root.join(key).display().to_string()
    }
}
