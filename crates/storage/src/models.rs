use anyhow::Context;
use chrono::NaiveDateTime;
use domain::{EnrichedComment, EpisodeRecord, TrendMap};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlEpisode {
    pub webtoon: String,
    pub episode: i64,
    pub interest_count: i64,
    pub like_count: i64,
    pub rating: f64,
    // JSON blobs, shape owned by the pipeline
    pub trend: String,
    pub comments: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<SqlEpisode> for EpisodeRecord {
    type Error = anyhow::Error;

    fn try_from(sql: SqlEpisode) -> anyhow::Result<Self> {
        let trend: TrendMap = serde_json::from_str(&sql.trend)
            .with_context(|| format!("corrupt trend for {} #{}", sql.webtoon, sql.episode))?;
        let comments = decode_comments(&sql.comments)
            .with_context(|| format!("corrupt comments for {} #{}", sql.webtoon, sql.episode))?;

        Ok(EpisodeRecord {
            title: sql.webtoon,
            episode: sql.episode,
            interest_count: sql.interest_count,
            like_count: sql.like_count,
            rating: sql.rating,
            comments,
            trend,
            created_at: sql.created_at,
        })
    }
}

pub fn decode_comments(raw: &str) -> anyhow::Result<Vec<EnrichedComment>> {
    Ok(serde_json::from_str(raw)?)
}
