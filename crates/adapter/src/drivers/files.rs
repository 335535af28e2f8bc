use anyhow::{Context, Result};
use async_trait::async_trait;
use domain::ingest::{parse_count, parse_rating, NumericField, RawEpisodeBatch};
use domain::EpisodeKey;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::traits::{CommentSource, EpisodeCatalog};

/// Reads `None` for a missing file, errors for anything else.
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Crawler output laid out as `{raw_dir}/{title}_{episode}.json`.
#[derive(Clone)]
pub struct JsonCommentSource {
    raw_dir: PathBuf,
}

impl JsonCommentSource {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
        }
    }

    pub fn path_for(&self, key: &EpisodeKey) -> PathBuf {
        self.raw_dir
            .join(format!("{}_{}.json", key.title(), key.episode()))
    }
}

#[async_trait]
impl CommentSource for JsonCommentSource {
    async fn load_batch(&self, key: &EpisodeKey) -> Result<Option<RawEpisodeBatch>> {
        let path = self.path_for(key);
        debug!("loading raw comments from {}", path.display());
        let Some(body) = read_optional(&path).await? else {
            return Ok(None);
        };
        let batch = serde_json::from_str(&body)
            .with_context(|| format!("invalid comment batch in {}", path.display()))?;
        Ok(Some(batch))
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    episodes: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    episode: NumericField,
    #[serde(default)]
    rating: Option<NumericField>,
}

/// Episode listings laid out as `{episode_dir}/{title}.json`.
#[derive(Clone)]
pub struct JsonEpisodeCatalog {
    episode_dir: PathBuf,
}

impl JsonEpisodeCatalog {
    pub fn new(episode_dir: impl Into<PathBuf>) -> Self {
        Self {
            episode_dir: episode_dir.into(),
        }
    }
}

#[async_trait]
impl EpisodeCatalog for JsonEpisodeCatalog {
    async fn ratings(&self, title: &str) -> Result<Option<BTreeMap<i64, f64>>> {
        let path = self.episode_dir.join(format!("{}.json", title));
        let Some(body) = read_optional(&path).await? else {
            return Ok(None);
        };
        let file: CatalogFile = serde_json::from_str(&body)
            .with_context(|| format!("invalid episode listing in {}", path.display()))?;

        let mut ratings = BTreeMap::new();
        for entry in file.episodes {
            // Listings without a star rating (e.g. paid previews) are skipped.
            let Some(rating) = entry.rating.as_ref() else {
                continue;
            };
            match (
                parse_count("episode", Some(&entry.episode)),
                parse_rating("rating", Some(rating)),
            ) {
                (Ok(episode), Ok(rating)) => {
                    ratings.insert(episode, rating);
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!("skipping listing entry in {}: {}", path.display(), e);
                }
            }
        }
        Ok(Some(ratings))
    }
}
