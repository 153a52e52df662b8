//! Obtaining a working copy for a run.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::provider::{CloneUrl, SourceControl};
use crate::error::FetchError;
use crate::types::{RepositoryReference, WorkingCopy};

/// Resolves a project and clones it unless a checkout is already present.
pub struct RepositoryFetcher {
    provider: Arc<dyn SourceControl>,
}

impl RepositoryFetcher {
    pub fn new(provider: Arc<dyn SourceControl>) -> Self {
        Self { provider }
    }

    /// Fetch the working copy for `reference`.
    ///
    /// The target is `local_path/<project path>`. When it already exists and
    /// is non-empty nothing is cloned and the existing path is returned, so
    /// repeated triggers are harmless.
    pub async fn fetch(&self, reference: &RepositoryReference) -> Result<WorkingCopy, FetchError> {
        let metadata = self.provider.project_metadata(reference).await?;
        let target = reference
            .local_path()
            .join(checked_project_dir(&metadata.path)?);
        let url = CloneUrl::authenticated(&metadata.http_url_to_repo, reference.access_token())?;

        tokio::fs::create_dir_all(&target).await?;

        if !is_empty_dir(&target).await? {
            info!(path = %target.display(), "Project already present, skipping clone");
            return Ok(WorkingCopy::new(
                target,
                reference.local_path().to_path_buf(),
                false,
            ));
        }

        info!(project = %metadata.path, url = %url, "Cloning project");
        let handle = self
            .provider
            .clone_repository(&url, reference.branch(), &target)
            .await
            .map_err(|e| FetchError::Clone {
                path: target.clone(),
                source: Box::new(e),
            })?;
        info!(project = %metadata.path, "Clone complete");

        let working_copy = WorkingCopy::new(target, reference.local_path().to_path_buf(), true);
        Ok(match handle {
            Some(repository) => working_copy.with_repository(repository),
            None => working_copy,
        })
    }
}

/// The provider's project path must be a single plain directory name.
fn checked_project_dir(path: &str) -> Result<PathBuf, FetchError> {
    let mut components = Path::new(path).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Ok(PathBuf::from(name)),
        _ => Err(FetchError::Provider(format!(
            "project path {:?} is not a plain directory name",
            path
        ))),
    }
}

async fn is_empty_dir(path: &Path) -> Result<bool, FetchError> {
    let mut entries = tokio::fs::read_dir(path).await?;
    let first = entries.next_entry().await?;
    debug!(path = %path.display(), empty = first.is_none(), "Checked clone target");
    Ok(first.is_none())
}
