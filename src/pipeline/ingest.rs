//! One ingestion run: fetch, walk, clean.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::walker::TreeWalker;
use crate::output::ChunkSink;
use crate::repository::{RepositoryFetcher, SourceControl, WorkspaceCleaner};
use crate::types::{IngestConfig, RepositoryReference, WorkingCopy};

/// Composes fetcher, walker and cleaner into a run.
pub struct IngestionPipeline {
    fetcher: RepositoryFetcher,
    walker: TreeWalker,
    cleaner: WorkspaceCleaner,
}

impl IngestionPipeline {
    pub fn new(provider: Arc<dyn SourceControl>, config: &IngestConfig) -> Self {
        let mut cleaner = WorkspaceCleaner::new(config.settle_delay(), config.retry_policy());
        if config.preserve_output {
            cleaner = cleaner.preserving(config.output_dir_name.clone());
        }
        Self::from_parts(RepositoryFetcher::new(provider), TreeWalker::new(config), cleaner)
    }

    pub fn from_parts(fetcher: RepositoryFetcher, walker: TreeWalker, cleaner: WorkspaceCleaner) -> Self {
        Self {
            fetcher,
            walker,
            cleaner,
        }
    }

    /// Run one ingestion and report overall success.
    ///
    /// Chunks reach `sink` as they are extracted. The working copy, or whatever
    /// a failed clone left behind, is always removed before returning.
    pub async fn run(&self, reference: &RepositoryReference, sink: &dyn ChunkSink) -> bool {
        let span = tracing::info_span!(
            "ingest",
            run_id = %Uuid::new_v4(),
            project_id = %reference.project_id()
        );
        self.run_inner(reference, sink).instrument(span).await
    }

    async fn run_inner(&self, reference: &RepositoryReference, sink: &dyn ChunkSink) -> bool {
        info!(remote = reference.remote_url(), branch = ?reference.branch(), "Starting ingestion");

        let working_copy = match self.fetcher.fetch(reference).await {
            Ok(working_copy) => working_copy,
            Err(e) => {
                error!(error = %e, "Fetch failed");
                if let Some(residue) = e.residue() {
                    self.cleaner.clean(WorkingCopy::abandoned(residue)).await;
                }
                return false;
            }
        };

        let walked = AssertUnwindSafe(self.walker.walk(&working_copy, reference.project_id(), sink))
            .catch_unwind()
            .await;

        let succeeded = match walked {
            Ok(Ok(summary)) => {
                info!(
                    files = summary.files_visited,
                    skipped = summary.files_skipped,
                    failed = summary.files_failed,
                    chunks = summary.chunks,
                    sink_failures = summary.sink_failures,
                    "Walk complete"
                );
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "Walk failed");
                false
            }
            Err(_) => {
                error!("Walk panicked");
                false
            }
        };

        let report = self.cleaner.clean(working_copy).await;
        if !report.errors.is_empty() {
            warn!(errors = report.errors.len(), "Cleanup incomplete");
        }

        succeeded
    }
}
