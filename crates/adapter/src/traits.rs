use anyhow::Result;
use async_trait::async_trait;
use domain::ingest::RawEpisodeBatch;
use domain::EpisodeKey;
use std::collections::BTreeMap;

/// Produces the crawler's raw comment batch for one episode.
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// `Ok(None)` when nothing was collected for this episode.
    async fn load_batch(&self, key: &EpisodeKey) -> Result<Option<RawEpisodeBatch>>;
}

/// External sentiment model.
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Score in `[-1, 1]`; negative means negative sentiment.
    async fn score(&self, text: &str) -> Result<f64>;
}

/// Per-title episode listing with star ratings.
#[async_trait]
pub trait EpisodeCatalog: Send + Sync {
    /// `Ok(None)` when the title has no listing.
    async fn ratings(&self, title: &str) -> Result<Option<BTreeMap<i64, f64>>>;
}
