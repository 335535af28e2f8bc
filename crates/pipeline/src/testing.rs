//! In-memory collaborators for pipeline tests.

use adapter::{CommentSource, EpisodeCatalog, SentimentScorer};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use domain::ingest::{RawComment, RawEpisodeBatch};
use domain::EpisodeKey;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use storage::Db;
use tempfile::TempDir;

pub async fn setup_test_db() -> (TempDir, Db) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let url = format!("sqlite://{}", dir.path().join("episodes.db").display());
    let db = Db::new(&url).await.expect("open db");
    (dir, db)
}

/// Raw batch whose comments are `(text, date)` pairs, newest first.
pub fn raw_batch(title: &str, episode: i64, comments: &[(&str, &str)]) -> RawEpisodeBatch {
    RawEpisodeBatch {
        webtoon: title.to_string(),
        episode,
        interest_count: Some("12,345".into()),
        like_count: Some("678".into()),
        rating: Some("9.87".into()),
        comments: comments
            .iter()
            .map(|(text, date)| RawComment {
                nickname: Some(format!("{text}***")),
                text: text.to_string(),
                recomm: Some("1,024".into()),
                unrecomm: Some("2".into()),
                date: date.to_string(),
            })
            .collect(),
    }
}

#[derive(Default, Clone)]
pub struct FakeSource {
    batches: Arc<Mutex<HashMap<(String, i64), RawEpisodeBatch>>>,
}

impl FakeSource {
    pub fn put(&self, batch: RawEpisodeBatch) {
        self.batches
            .lock()
            .unwrap()
            .insert((batch.webtoon.clone(), batch.episode), batch);
    }
}

#[async_trait]
impl CommentSource for FakeSource {
    async fn load_batch(&self, key: &EpisodeKey) -> Result<Option<RawEpisodeBatch>> {
        Ok(self
            .batches
            .lock()
            .unwrap()
            .get(&(key.title().to_string(), key.episode()))
            .cloned())
    }
}

/// Scores by exact text lookup, default 0.0. Records every call.
#[derive(Default, Clone)]
pub struct FakeScorer {
    scores: Arc<Mutex<HashMap<String, f64>>>,
    failing: Arc<Mutex<Option<String>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeScorer {
    pub fn with_scores(scores: &[(&str, f64)]) -> Self {
        let scorer = Self::default();
        scorer
            .scores
            .lock()
            .unwrap()
            .extend(scores.iter().map(|(t, s)| (t.to_string(), *s)));
        scorer
    }

    pub fn fail_on(&self, text: &str) {
        *self.failing.lock().unwrap() = Some(text.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SentimentScorer for FakeScorer {
    async fn score(&self, text: &str) -> Result<f64> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.lock().unwrap().as_deref() == Some(text) {
            return Err(anyhow!("model server unavailable"));
        }
        Ok(self.scores.lock().unwrap().get(text).copied().unwrap_or(0.0))
    }
}

#[derive(Default, Clone)]
pub struct FakeCatalog {
    ratings: Arc<Mutex<HashMap<String, BTreeMap<i64, f64>>>>,
    broken: bool,
}

impl FakeCatalog {
    pub fn with_ratings(title: &str, ratings: &[(i64, f64)]) -> Self {
        let catalog = Self::default();
        catalog
            .ratings
            .lock()
            .unwrap()
            .insert(title.to_string(), ratings.iter().copied().collect());
        catalog
    }

    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EpisodeCatalog for FakeCatalog {
    async fn ratings(&self, title: &str) -> Result<Option<BTreeMap<i64, f64>>> {
        if self.broken {
            return Err(anyhow!("listing unreadable"));
        }
        Ok(self.ratings.lock().unwrap().get(title).cloned())
    }
}
