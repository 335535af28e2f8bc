use adapter::EpisodeCatalog;
use domain::trend::{negative_comment_ratio, window};
use domain::{EnrichedComment, TrendEntry, TrendMap, TrendMetric};
use std::collections::BTreeMap;
use storage::Db;
use tracing::{debug, warn};

/// Rolling rating / negative-ratio summary over the last five episodes.
///
/// Missing inputs are the normal case early in a title's run, so nothing in
/// here fails: absent data is logged and left out.
pub struct TrendAggregator<'a> {
    db: &'a Db,
    catalog: &'a dyn EpisodeCatalog,
}

impl<'a> TrendAggregator<'a> {
    pub fn new(db: &'a Db, catalog: &'a dyn EpisodeCatalog) -> Self {
        Self { db, catalog }
    }

    /// Trend of `current_episode` built from stored records only.
    pub async fn compute_trend(&self, title: &str, current_episode: i64) -> TrendMap {
        self.compute(title, current_episode, None).await
    }

    /// Same as [`compute_trend`](Self::compute_trend), but the current
    /// episode's ratio comes from `current_comments` rather than the store.
    pub async fn compute_trend_with_current(
        &self,
        title: &str,
        current_episode: i64,
        current_comments: &[EnrichedComment],
    ) -> TrendMap {
        self.compute(title, current_episode, Some(current_comments))
            .await
    }

    async fn compute(
        &self,
        title: &str,
        current_episode: i64,
        current_comments: Option<&[EnrichedComment]>,
    ) -> TrendMap {
        let ratings = self.ratings(title).await;
        let mut trend = TrendMap::new();

        for episode in window(current_episode).rev() {
            let Some(rating) = ratings.get(&episode) else {
                debug!("no rating for {} #{}, left out of trend", title, episode);
                continue;
            };

            let ratio = match current_comments {
                Some(comments) if episode == current_episode => {
                    Some(negative_comment_ratio(comments))
                }
                _ => self.stored_ratio(title, episode).await,
            };

            trend.insert(
                episode,
                TrendEntry {
                    rating: TrendMetric::Value(*rating),
                    negative_comment_ratio: ratio.into(),
                },
            );
        }

        trend
    }

    async fn ratings(&self, title: &str) -> BTreeMap<i64, f64> {
        match self.catalog.ratings(title).await {
            Ok(Some(ratings)) => ratings,
            Ok(None) => {
                warn!("no episode listing for '{}', trend has no ratings", title);
                BTreeMap::new()
            }
            Err(e) => {
                warn!("episode listing for '{}' unavailable: {:#}", title, e);
                BTreeMap::new()
            }
        }
    }

    async fn stored_ratio(&self, title: &str, episode: i64) -> Option<f64> {
        match self.db.get_episode_comments(title, episode).await {
            Ok(Some(comments)) => Some(negative_comment_ratio(&comments)),
            Ok(None) => {
                warn!("no stored record for {} #{}", title, episode);
                None
            }
            Err(e) => {
                warn!("could not read {} #{}: {:#}", title, episode, e);
                None
            }
        }
    }
}
