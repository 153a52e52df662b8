//! GitLab provider: REST metadata lookup plus a git2 clone.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{Cred, ErrorClass, ErrorCode, FetchOptions, RemoteCallbacks, Repository};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info};

use super::provider::{CloneUrl, ProjectMetadata, SourceControl};
use crate::error::FetchError;
use crate::types::RepositoryReference;

/// Client for a GitLab instance.
pub struct GitLabProvider {
    client: Client,
}

impl Default for GitLabProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl GitLabProvider {
    /// Create a provider whose API requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    /// `{remote}/api/v4/projects/{id}` with the id percent-encoded.
    fn project_url(reference: &RepositoryReference) -> Result<Url, FetchError> {
        let mut url = Url::parse(reference.remote_url())
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(format!("{} cannot be a base", reference.remote_url())))?
            .pop_if_empty()
            .extend(["api", "v4", "projects", reference.project_id()]);
        Ok(url)
    }
}

#[async_trait]
impl SourceControl for GitLabProvider {
    async fn project_metadata(
        &self,
        reference: &RepositoryReference,
    ) -> Result<ProjectMetadata, FetchError> {
        let url = Self::project_url(reference)?;
        debug!(url = %url, "Fetching project metadata");

        let response = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", reference.access_token())
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<ProjectMetadata>()
                .await
                .map_err(|e| FetchError::Provider(format!("malformed project metadata: {}", e))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Auth(format!(
                "GitLab returned {} for project {}",
                response.status(),
                reference.project_id()
            ))),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(reference.project_id().to_string())),
            status => Err(FetchError::Provider(format!("GitLab returned {}", status))),
        }
    }

    async fn clone_repository(
        &self,
        url: &CloneUrl,
        branch: Option<&str>,
        destination: &Path,
    ) -> Result<Option<Repository>, FetchError> {
        let url = url.clone();
        let branch = branch.map(String::from);
        let destination = destination.to_path_buf();

        info!(url = %url, branch = ?branch, "Cloning repository");
        let repository = tokio::task::spawn_blocking(move || {
            clone_blocking(&url, branch.as_deref(), &destination)
        })
        .await
        .map_err(|e| FetchError::Provider(format!("clone task failed: {}", e)))??;

        Ok(Some(repository))
    }
}

fn clone_blocking(
    url: &CloneUrl,
    branch: Option<&str>,
    destination: &Path,
) -> Result<Repository, FetchError> {
    let username = url.username().to_string();
    let password = url.password().map(String::from);
    let mut offered = false;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed| {
        // libgit2 asks again after a rejection; offering the same pair twice loops.
        if offered {
            return Err(git2::Error::from_str("credentials rejected by remote"));
        }
        offered = true;
        match &password {
            Some(password) => Cred::userpass_plaintext(&username, password),
            None => Cred::default(),
        }
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    builder
        .clone(url.expose(), destination)
        .map_err(|e| classify_git_error(&e))
}

fn classify_git_error(e: &git2::Error) -> FetchError {
    let message = e.message().to_string();
    if e.code() == ErrorCode::Auth || message.contains("credentials") || message.contains("authentication") {
        FetchError::Auth(message)
    } else if e.code() == ErrorCode::NotFound {
        FetchError::NotFound(message)
    } else if matches!(e.class(), ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssl) {
        FetchError::Network(message)
    } else {
        FetchError::Provider(message)
    }
}
