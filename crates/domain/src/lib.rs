mod error;
mod models;
pub mod digest;
pub mod ingest;
pub mod loyalty;
pub mod trend;

pub use error::PipelineError;
pub use models::{
    ClassifiedComment, Comment, EnrichedComment, EpisodeDraft, EpisodeKey, EpisodeRecord,
    PipelineStage, ReaderLoyalty,
};
pub use trend::{TrendEntry, TrendMap, TrendMetric};
