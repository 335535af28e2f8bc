use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;
use crate::trend::TrendMap;

/// Natural key of an episode record: `(title, episode)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    title: String,
    episode: i64,
}

impl EpisodeKey {
    pub fn new(title: impl Into<String>, episode: i64) -> Result<Self, PipelineError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(PipelineError::InvalidKey("title is empty".to_string()));
        }
        // Titles end up in file names of the crawler output.
        if title.contains(['/', '\\']) {
            return Err(PipelineError::InvalidKey(format!(
                "title contains a path separator: {}",
                title
            )));
        }
        if matches!(title.trim(), "." | "..") {
            return Err(PipelineError::InvalidKey(format!(
                "title is not a name: {}",
                title
            )));
        }
        if episode < 0 {
            return Err(PipelineError::InvalidKey(format!(
                "episode must not be negative: {}",
                episode
            )));
        }
        Ok(Self { title, episode })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn episode(&self) -> i64 {
        self.episode
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.title, self.episode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReaderLoyalty {
    Loyal,
    Casual,
}

impl ReaderLoyalty {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderLoyalty::Loyal => "LOYAL",
            ReaderLoyalty::Casual => "CASUAL",
        }
    }
}

impl fmt::Display for ReaderLoyalty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reader comment as collected, after boundary coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub author_ref: Option<String>,
    pub text: String,
    pub recommend_count: i64,
    pub unrecommend_count: i64,
    pub posted_at: DateTime<FixedOffset>,
}

impl Comment {
    pub fn classify(self, reader_loyalty: ReaderLoyalty) -> ClassifiedComment {
        ClassifiedComment {
            comment: self,
            reader_loyalty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedComment {
    pub comment: Comment,
    pub reader_loyalty: ReaderLoyalty,
}

impl ClassifiedComment {
    pub fn enrich(self, sentiment_score: f64) -> EnrichedComment {
        EnrichedComment {
            comment: self.comment,
            sentiment_score,
            reader_loyalty: self.reader_loyalty,
        }
    }
}

/// Comment with both enrichment fields set. Stored flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub sentiment_score: f64,
    pub reader_loyalty: ReaderLoyalty,
}

impl EnrichedComment {
    pub fn is_negative(&self) -> bool {
        self.sentiment_score <= crate::trend::NEGATIVE_SCORE_CUTOFF
    }
}

/// An episode on its way through the pipeline; `C` is the comment stage.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeDraft<C> {
    pub key: EpisodeKey,
    pub interest_count: i64,
    pub like_count: i64,
    pub rating: f64,
    /// Newest-first, as collected.
    pub comments: Vec<C>,
}

impl<C> EpisodeDraft<C> {
    pub fn with_comments<D>(self, comments: Vec<D>) -> EpisodeDraft<D> {
        EpisodeDraft {
            key: self.key,
            interest_count: self.interest_count,
            like_count: self.like_count,
            rating: self.rating,
            comments,
        }
    }
}

impl EpisodeDraft<EnrichedComment> {
    pub fn into_record(self, trend: TrendMap, created_at: NaiveDateTime) -> EpisodeRecord {
        EpisodeRecord {
            title: self.key.title().to_string(),
            episode: self.key.episode(),
            interest_count: self.interest_count,
            like_count: self.like_count,
            rating: self.rating,
            comments: self.comments,
            trend,
            created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub title: String,
    pub episode: i64,
    pub interest_count: i64,
    pub like_count: i64,
    pub rating: f64,
    pub comments: Vec<EnrichedComment>,
    pub trend: TrendMap,
    pub created_at: NaiveDateTime,
}

/// Linear run states of one `(title, episode)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    RawCollected,
    Classified,
    Annotated,
    TrendComputed,
    Persisted,
}

impl PipelineStage {
    pub fn next(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::RawCollected => Some(PipelineStage::Classified),
            PipelineStage::Classified => Some(PipelineStage::Annotated),
            PipelineStage::Annotated => Some(PipelineStage::TrendComputed),
            PipelineStage::TrendComputed => Some(PipelineStage::Persisted),
            PipelineStage::Persisted => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStage::RawCollected => "RAW_COLLECTED",
            PipelineStage::Classified => "CLASSIFIED",
            PipelineStage::Annotated => "ANNOTATED",
            PipelineStage::TrendComputed => "TREND_COMPUTED",
            PipelineStage::Persisted => "PERSISTED",
        };
        f.write_str(s)
    }
}
