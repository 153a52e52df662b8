//! Walking a working copy and running complete ingestions.

mod ingest;
mod walker;

pub use ingest::IngestionPipeline;
pub use walker::{TreeWalker, WalkSummary};
