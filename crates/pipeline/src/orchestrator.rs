use adapter::{CommentSource, EpisodeCatalog, SentimentScorer};
use chrono::Utc;
use domain::ingest::{normalize_batch, NormalizedEpisode};
use domain::loyalty::classify_batch;
use domain::{
    ClassifiedComment, EnrichedComment, EpisodeDraft, EpisodeKey, EpisodeRecord, PipelineError,
    PipelineStage, TrendMap,
};
use storage::Db;
use tracing::{error, info, warn};

use crate::annotator::annotate;
use crate::trend::TrendAggregator;

/// Runs one `(title, episode)` through
/// `RAW_COLLECTED -> CLASSIFIED -> ANNOTATED -> TREND_COMPUTED -> PERSISTED`.
///
/// Every step is public so a failed run can be resumed by hand. The store is
/// written only by [`persist`](Self::persist).
pub struct Orchestrator {
    db: Db,
    source: Box<dyn CommentSource>,
    scorer: Box<dyn SentimentScorer>,
    catalog: Box<dyn EpisodeCatalog>,
}

#[derive(Debug, Default, PartialEq)]
pub struct BackfillReport {
    pub processed: Vec<i64>,
    pub skipped: Vec<i64>,
}

impl Orchestrator {
    pub fn new(
        db: Db,
        source: Box<dyn CommentSource>,
        scorer: Box<dyn SentimentScorer>,
        catalog: Box<dyn EpisodeCatalog>,
    ) -> Self {
        Self {
            db,
            source,
            scorer,
            catalog,
        }
    }

    pub fn trend_aggregator(&self) -> TrendAggregator<'_> {
        TrendAggregator::new(&self.db, self.catalog.as_ref())
    }

    pub async fn collect(&self, key: &EpisodeKey) -> Result<NormalizedEpisode, PipelineError> {
        let raw = self
            .source
            .load_batch(key)
            .await
            .map_err(PipelineError::Source)?
            .ok_or_else(|| PipelineError::MissingInput {
                title: key.title().to_string(),
                episode: key.episode(),
            })?;

        let episode = normalize_batch(&raw)?;
        if &episode.key != key {
            return Err(PipelineError::InvalidKey(format!(
                "batch for {} was requested but {} was found",
                key, episode.key
            )));
        }
        Ok(episode)
    }

    pub fn classify(
        &self,
        mut episode: NormalizedEpisode,
    ) -> Result<EpisodeDraft<ClassifiedComment>, PipelineError> {
        let comments = classify_batch(std::mem::take(&mut episode.comments))?;
        Ok(episode.with_comments(comments))
    }

    pub async fn annotate(
        &self,
        mut episode: EpisodeDraft<ClassifiedComment>,
    ) -> Result<EpisodeDraft<EnrichedComment>, PipelineError> {
        let comments =
            annotate(self.scorer.as_ref(), std::mem::take(&mut episode.comments)).await?;
        Ok(episode.with_comments(comments))
    }

    pub async fn compute_trend(&self, episode: &EpisodeDraft<EnrichedComment>) -> TrendMap {
        self.trend_aggregator()
            .compute_trend_with_current(
                episode.key.title(),
                episode.key.episode(),
                &episode.comments,
            )
            .await
    }

    /// Upserts the record and returns it as stored, with the original
    /// `created_at` when the key already existed.
    pub async fn persist(&self, record: &EpisodeRecord) -> Result<EpisodeRecord, PipelineError> {
        self.db
            .upsert_episode(record)
            .await
            .map_err(PipelineError::Storage)?;

        self.db
            .get_episode(&record.title, record.episode)
            .await
            .map_err(PipelineError::Storage)?
            .ok_or_else(|| {
                PipelineError::Storage(anyhow::anyhow!(
                    "{} #{} missing right after upsert",
                    record.title,
                    record.episode
                ))
            })
    }

    pub async fn run(&self, title: &str, episode: i64) -> Result<EpisodeRecord, PipelineError> {
        let key = EpisodeKey::new(title, episode)?;
        let result = self.run_steps(&key).await;
        if let Err(e) = &result {
            error!("Run for {} aborted: {}", key, e);
        }
        result
    }

    async fn run_steps(&self, key: &EpisodeKey) -> Result<EpisodeRecord, PipelineError> {
        let collected = self.collect(key).await?;
        info!(
            "[{}] {} with {} comments",
            PipelineStage::RawCollected,
            key,
            collected.comments.len()
        );

        let classified = self.classify(collected)?;
        info!("[{}] {}", PipelineStage::Classified, key);

        let annotated = self.annotate(classified).await?;
        info!("[{}] {}", PipelineStage::Annotated, key);

        let trend = self.compute_trend(&annotated).await;
        info!(
            "[{}] {} covering episodes {:?}",
            PipelineStage::TrendComputed,
            key,
            trend.episodes()
        );

        let record = annotated.into_record(trend, Utc::now().naive_utc());
        let stored = self.persist(&record).await?;
        info!("[{}] {}", PipelineStage::Persisted, key);

        Ok(stored)
    }

    /// Runs every episode in `from..=to`, oldest first, so each trend sees the
    /// episodes stored before it. Episodes with no raw batch are skipped.
    pub async fn backfill(
        &self,
        title: &str,
        from: i64,
        to: i64,
    ) -> Result<BackfillReport, PipelineError> {
        let mut report = BackfillReport::default();
        for episode in from..=to {
            match self.run(title, episode).await {
                Ok(_) => report.processed.push(episode),
                Err(e) if e.is_missing_input() => {
                    warn!("Skipping {} #{}: {}", title, episode, e);
                    report.skipped.push(episode);
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "Backfill of '{}' done: {} processed, {} skipped",
            title,
            report.processed.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}
