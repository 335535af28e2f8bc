//! Read-side summary of a stored episode, the input for reports and charts.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{EnrichedComment, EpisodeRecord, ReaderLoyalty};
use crate::trend::{negative_comment_ratio, round2, TrendMap};

pub const DEFAULT_POLARITY_THRESHOLD: f64 = 0.5;

/// Number of negative comment texts quoted in a digest.
pub const NEGATIVE_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl Polarity {
    pub fn of(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Polarity::Positive
        } else if score >= -threshold {
            Polarity::Neutral
        } else {
            Polarity::Negative
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolarityShare {
    pub total: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
}

impl PolarityShare {
    fn add(&mut self, polarity: Polarity) {
        self.total += 1;
        match polarity {
            Polarity::Positive => self.positive += 1,
            Polarity::Neutral => self.neutral += 1,
            Polarity::Negative => self.negative += 1,
        }
    }

    fn finish(mut self) -> Self {
        if self.total > 0 {
            let pct = |n: usize| round2(n as f64 / self.total as f64 * 100.0);
            self.positive_pct = pct(self.positive);
            self.neutral_pct = pct(self.neutral);
            self.negative_pct = pct(self.negative);
        }
        self
    }
}

/// Polarity split per reader group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentBreakdown {
    pub threshold: f64,
    pub loyal: PolarityShare,
    pub casual: PolarityShare,
}

impl SentimentBreakdown {
    pub fn from_comments(comments: &[EnrichedComment], threshold: f64) -> Self {
        let mut loyal = PolarityShare::default();
        let mut casual = PolarityShare::default();
        for c in comments {
            let polarity = Polarity::of(c.sentiment_score, threshold);
            match c.reader_loyalty {
                ReaderLoyalty::Loyal => loyal.add(polarity),
                ReaderLoyalty::Casual => casual.add(polarity),
            }
        }
        Self {
            threshold,
            loyal: loyal.finish(),
            casual: casual.finish(),
        }
    }
}

pub fn negative_samples(comments: &[EnrichedComment], limit: usize) -> Vec<String> {
    comments
        .iter()
        .filter(|c| c.is_negative())
        .take(limit)
        .map(|c| c.comment.text.clone())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeDigest {
    pub title: String,
    pub episode: i64,
    pub interest_count: i64,
    pub like_count: i64,
    pub rating: f64,
    pub comment_count: usize,
    pub negative_comment_ratio: f64,
    pub trend: TrendMap,
    pub breakdown: SentimentBreakdown,
    pub negative_samples: Vec<String>,
    pub created_at: NaiveDateTime,
}

impl EpisodeDigest {
    pub fn build(record: &EpisodeRecord, threshold: f64) -> Self {
        Self {
            title: record.title.clone(),
            episode: record.episode,
            interest_count: record.interest_count,
            like_count: record.like_count,
            rating: record.rating,
            comment_count: record.comments.len(),
            negative_comment_ratio: negative_comment_ratio(&record.comments),
            trend: record.trend.clone(),
            breakdown: SentimentBreakdown::from_comments(&record.comments, threshold),
            negative_samples: negative_samples(&record.comments, NEGATIVE_SAMPLE_LIMIT),
            created_at: record.created_at,
        }
    }
}
