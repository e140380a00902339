//! Distributed batch prediction.
//!
//! The driver publishes an artifact once; each worker process materializes
//! and loads it at most once, then serves every batch from memory.

mod broadcast;
mod cache;
mod executor;
mod udf;

pub use broadcast::{ArchiveRef, ArtifactBroadcast, SharedDirBroadcast};
pub use cache::ModelCache;
pub use executor::{BatchExecutor, ExecutorConfig};
pub use udf::{positional_frame, PredictUdf, ResultType};
