use anyhow::Context;
use domain::{EnrichedComment, EpisodeRecord};
use sqlx::Row;
use tracing::debug;

use crate::models::{decode_comments, SqlEpisode};
use crate::Db;

impl Db {
    /// Insert or fully replace the record for `(title, episode)`.
    ///
    /// `created_at` is only written on first insert.
    pub async fn upsert_episode(&self, record: &EpisodeRecord) -> anyhow::Result<()> {
        let trend = serde_json::to_string(&record.trend)?;
        let comments = serde_json::to_string(&record.comments)?;

        sqlx::query(
            r#"
            INSERT INTO webtoon_episodes (
                webtoon, episode, interest_count, like_count,
                rating, trend, comments, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(webtoon, episode) DO UPDATE SET
                interest_count = excluded.interest_count,
                like_count = excluded.like_count,
                rating = excluded.rating,
                trend = excluded.trend,
                comments = excluded.comments
            "#,
        )
        .bind(&record.title)
        .bind(record.episode)
        .bind(record.interest_count)
        .bind(record.like_count)
        .bind(record.rating)
        .bind(trend)
        .bind(comments)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("upsert failed for {} #{}", record.title, record.episode))?;

        debug!(
            "stored {} #{} ({} comments)",
            record.title,
            record.episode,
            record.comments.len()
        );
        Ok(())
    }

    pub async fn get_episode(
        &self,
        title: &str,
        episode: i64,
    ) -> anyhow::Result<Option<EpisodeRecord>> {
        let row = sqlx::query_as::<_, SqlEpisode>(
            r#"
            SELECT
                webtoon, episode, interest_count, like_count,
                rating, trend, comments, created_at
            FROM webtoon_episodes
            WHERE webtoon = ? AND episode = ?
            "#,
        )
        .bind(title)
        .bind(episode)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EpisodeRecord::try_from).transpose()
    }

    /// Enriched comments of a stored episode, `None` when no record exists.
    pub async fn get_episode_comments(
        &self,
        title: &str,
        episode: i64,
    ) -> anyhow::Result<Option<Vec<EnrichedComment>>> {
        let row = sqlx::query(
            "SELECT comments FROM webtoon_episodes WHERE webtoon = ? AND episode = ?",
        )
        .bind(title)
        .bind(episode)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let raw: String = r.try_get("comments")?;
                let comments = decode_comments(&raw)
                    .with_context(|| format!("corrupt comments for {} #{}", title, episode))?;
                Ok(Some(comments))
            }
            None => Ok(None),
        }
    }

    /// Stored episode numbers of a title, newest first.
    pub async fn list_episodes(&self, title: &str) -> anyhow::Result<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT episode FROM webtoon_episodes WHERE webtoon = ? ORDER BY episode DESC",
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get::<i64, _>("episode").map_err(anyhow::Error::from))
            .collect()
    }
}
