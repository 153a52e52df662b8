//! Repository references, working copies and visited files.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::error::FetchError;
use crate::processing::Language;

/// Everything needed to fetch one project for one run.
///
/// Immutable once built. The access token is never printed: `Debug` redacts it.
#[derive(Clone)]
pub struct RepositoryReference {
    remote_url: String,
    access_token: String,
    project_id: String,
    branch: Option<String>,
    local_path: PathBuf,
}

impl RepositoryReference {
    /// Create a reference that clones below `local_path`.
    pub fn new(
        remote_url: impl Into<String>,
        access_token: impl Into<String>,
        project_id: impl Into<String>,
        local_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote_url: remote_url.into(),
            access_token: access_token.into(),
            project_id: project_id.into(),
            branch: None,
            local_path: local_path.into(),
        }
    }

    /// Create a reference whose local path is `clone_root/<project_id>`.
    ///
    /// The id must be a relative path of plain components so the local path
    /// stays strictly inside `clone_root`.
    pub fn under(
        clone_root: &Path,
        remote_url: impl Into<String>,
        access_token: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let project_id = project_id.into();
        let relative = Path::new(&project_id);
        let plain = relative.components().next().is_some()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(FetchError::InvalidProjectId(project_id));
        }

        let local_path = clone_root.join(relative);
        Ok(Self::new(remote_url, access_token, project_id, local_path))
    }

    /// Request a specific branch instead of the remote default.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Base URL of the source-control provider.
    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Directory that holds this project's working copy and output.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }
}

impl fmt::Debug for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryReference")
            .field("remote_url", &self.remote_url)
            .field("access_token", &"***")
            .field("project_id", &self.project_id)
            .field("branch", &self.branch)
            .field("local_path", &self.local_path)
            .finish()
    }
}

/// A local checkout owned by exactly one run.
///
/// Deliberately not `Clone`: handing it to the cleaner consumes it, so the
/// working copy cannot be used after removal.
pub struct WorkingCopy {
    root: PathBuf,
    local_path: PathBuf,
    freshly_cloned: bool,
    repository: Option<Mutex<git2::Repository>>,
}

impl WorkingCopy {
    pub fn new(root: PathBuf, local_path: PathBuf, freshly_cloned: bool) -> Self {
        Self {
            root,
            local_path,
            freshly_cloned,
            repository: None,
        }
    }

    /// Wrap whatever a failed fetch left behind so it can be cleaned.
    pub fn abandoned(root: &Path) -> Self {
        let local_path = root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.to_path_buf());
        Self::new(root.to_path_buf(), local_path, false)
    }

    /// Keep the git handle that produced this checkout open until cleanup.
    pub fn with_repository(mut self, repository: git2::Repository) -> Self {
        self.repository = Some(Mutex::new(repository));
        self
    }

    /// Root of the checked-out tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent directory the output subdirectory is relocated into.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Whether this run performed the clone.
    pub fn freshly_cloned(&self) -> bool {
        self.freshly_cloned
    }

    /// Whether a git handle is still held open.
    pub fn holds_repository(&self) -> bool {
        self.repository.is_some()
    }

    /// Drop the git handle, closing its files. Returns whether one was held.
    pub fn release_repository(&mut self) -> bool {
        self.repository.take().is_some()
    }
}

impl fmt::Debug for WorkingCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingCopy")
            .field("root", &self.root)
            .field("local_path", &self.local_path)
            .field("freshly_cloned", &self.freshly_cloned)
            .field("holds_repository", &self.holds_repository())
            .finish()
    }
}

/// One file seen during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute (or root-joined) path of the file
    pub path: PathBuf,
    /// Path relative to the working copy root
    pub relative: PathBuf,
    /// Detected language, `None` when the extension is not supported
    pub language: Option<Language>,
}

impl FileRecord {
    /// Language tag for logs, `"unknown"` when undetected.
    pub fn language_tag(&self) -> &'static str {
        self.language.map(|l| l.as_str()).unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let reference = RepositoryReference::new(
            "https://gitlab.example.com",
            "glpat-secret",
            "42",
            "/tmp/clones/42",
        );
        let printed = format!("{:?}", reference);
        assert!(!printed.contains("glpat-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_under_joins_project_id() {
        let reference =
            RepositoryReference::under(Path::new("/srv/clones"), "https://gitlab.com", "t", "77")
                .unwrap()
                .with_branch("develop");
        assert_eq!(reference.local_path(), Path::new("/srv/clones/77"));
        assert_eq!(reference.branch(), Some("develop"));
    }

    #[test]
    fn test_under_rejects_ids_escaping_clone_root() {
        let root = Path::new("/srv/clones");
        for id in ["/home/user", "../etc", "77/../../etc", "", ".", "./77"] {
            let result = RepositoryReference::under(root, "https://gitlab.com", "t", id);
            assert!(
                matches!(result, Err(FetchError::InvalidProjectId(_))),
                "accepted {:?}",
                id
            );
        }

        let nested = RepositoryReference::under(root, "https://gitlab.com", "t", "team/app").unwrap();
        assert_eq!(nested.local_path(), Path::new("/srv/clones/team/app"));
    }

    #[test]
    fn test_abandoned_uses_parent_as_local_path() {
        let copy = WorkingCopy::abandoned(Path::new("/srv/clones/77/project"));
        assert_eq!(copy.local_path(), Path::new("/srv/clones/77"));
        assert!(!copy.freshly_cloned());
        assert!(!copy.holds_repository());
    }

    #[test]
    fn test_release_repository_drops_handle() {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        let mut copy = WorkingCopy::new(dir.path().to_path_buf(), dir.path().to_path_buf(), true)
            .with_repository(repo);

        assert!(copy.holds_repository());
        assert!(copy.release_repository());
        assert!(!copy.release_repository());
    }

    #[test]
    fn test_unknown_language_tag() {
        let record = FileRecord {
            path: PathBuf::from("/w/README.md"),
            relative: PathBuf::from("README.md"),
            language: None,
        };
        assert_eq!(record.language_tag(), "unknown");
    }
}
