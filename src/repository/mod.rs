//! Repository access: provider lookup, cloning and working-copy removal.

mod cleaner;
mod fetcher;
mod gitlab;
mod provider;

pub use cleaner::{force_remove_dir, CleanupReport, RetryPolicy, WorkspaceCleaner};
pub use fetcher::RepositoryFetcher;
pub use gitlab::GitLabProvider;
pub use provider::{CloneUrl, ProjectMetadata, SourceControl, TOKEN_USERNAME};
