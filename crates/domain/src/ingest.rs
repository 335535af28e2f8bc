//! Boundary between the crawler's loosely typed JSON and the typed model.
//!
//! Upstream writes counts and ratings as display strings ("1,234", "9.95") and
//! sometimes as plain numbers. Everything is coerced here, once, and anything
//! that does not parse is an error rather than a silent default.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{Comment, EpisodeDraft, EpisodeKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for NumericField {
    fn from(s: &str) -> Self {
        NumericField::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub nickname: Option<String>,
    pub text: String,
    #[serde(default)]
    pub recomm: Option<NumericField>,
    #[serde(default)]
    pub unrecomm: Option<NumericField>,
    pub date: String,
}

/// One crawler output file: `{raw_dir}/{title}_{episode}.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEpisodeBatch {
    pub webtoon: String,
    pub episode: i64,
    #[serde(default)]
    pub interest_count: Option<NumericField>,
    #[serde(default)]
    pub like_count: Option<NumericField>,
    #[serde(default)]
    pub rating: Option<NumericField>,
    #[serde(default)]
    pub comments: Vec<RawComment>,
}

pub type NormalizedEpisode = EpisodeDraft<Comment>;

fn clean(s: &str) -> String {
    s.trim().replace(',', "")
}

fn malformed(field: &str, value: impl ToString) -> PipelineError {
    PipelineError::MalformedNumber {
        field: field.to_string(),
        value: value.to_string(),
    }
}

pub fn parse_count(field: &str, value: Option<&NumericField>) -> Result<i64, PipelineError> {
    match value {
        None => Ok(0),
        Some(NumericField::Int(n)) => Ok(*n),
        Some(NumericField::Float(f)) => {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range
            if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Ok(*f as i64)
            } else {
                Err(malformed(field, f))
            }
        }
        Some(NumericField::Text(s)) => {
            let cleaned = clean(s);
            if cleaned.is_empty() {
                return Ok(0);
            }
            cleaned.parse::<i64>().map_err(|_| malformed(field, s))
        }
    }
}

pub fn parse_rating(field: &str, value: Option<&NumericField>) -> Result<f64, PipelineError> {
    let parsed = match value {
        None => return Ok(0.0),
        Some(NumericField::Int(n)) => *n as f64,
        Some(NumericField::Float(f)) => *f,
        Some(NumericField::Text(s)) => {
            let cleaned = clean(s);
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            cleaned.parse::<f64>().map_err(|_| malformed(field, s))?
        }
    };
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(malformed(field, parsed))
    }
}

/// Accepts RFC 3339, ISO-8601 with a compact offset (`+0900`), and
/// offset-less ISO-8601, which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.fix().from_utc_datetime(&naive));
        }
    }
    None
}

pub fn normalize_comment(index: usize, raw: &RawComment) -> Result<Comment, PipelineError> {
    let posted_at =
        parse_timestamp(&raw.date).ok_or_else(|| PipelineError::MalformedTimestamp {
            index,
            value: raw.date.clone(),
        })?;

    Ok(Comment {
        author_ref: raw.nickname.clone().filter(|n| !n.trim().is_empty()),
        text: raw.text.clone(),
        recommend_count: parse_count("recomm", raw.recomm.as_ref())?,
        unrecommend_count: parse_count("unrecomm", raw.unrecomm.as_ref())?,
        posted_at,
    })
}

pub fn normalize_batch(raw: &RawEpisodeBatch) -> Result<NormalizedEpisode, PipelineError> {
    let key = EpisodeKey::new(raw.webtoon.clone(), raw.episode)?;
    let comments = raw
        .comments
        .iter()
        .enumerate()
        .map(|(i, c)| normalize_comment(i, c))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NormalizedEpisode {
        key,
        interest_count: parse_count("interest_count", raw.interest_count.as_ref())?,
        like_count: parse_count("like_count", raw.like_count.as_ref())?,
        rating: parse_rating("rating", raw.rating.as_ref())?,
        comments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_strip_thousands_separators() {
        assert_eq!(parse_count("x", Some(&"1,234,567".into())).unwrap(), 1_234_567);
        assert_eq!(parse_count("x", Some(&" 42 ".into())).unwrap(), 42);
        assert_eq!(parse_count("x", Some(&NumericField::Int(7))).unwrap(), 7);
        assert_eq!(parse_count("x", None).unwrap(), 0);
        assert_eq!(parse_count("x", Some(&"".into())).unwrap(), 0);
    }

    #[test]
    fn non_numeric_count_is_an_error() {
        let err = parse_count("like_count", Some(&"1.2만".into())).unwrap_err();
        match err {
            PipelineError::MalformedNumber { field, value } => {
                assert_eq!(field, "like_count");
                assert_eq!(value, "1.2만");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(parse_count("x", Some(&NumericField::Float(1.5))).is_err());
        assert!(parse_count("x", Some(&NumericField::Float(1e300))).is_err());
        assert!(parse_count("x", Some(&NumericField::Float(-1e19))).is_err());
        assert_eq!(parse_count("x", Some(&NumericField::Float(3000.0))).unwrap(), 3000);
    }

    #[test]
    fn ratings_parse_from_text_and_numbers() {
        assert_eq!(parse_rating("rating", Some(&"9.95".into())).unwrap(), 9.95);
        assert_eq!(parse_rating("rating", Some(&NumericField::Float(9.1))).unwrap(), 9.1);
        assert_eq!(parse_rating("rating", Some(&NumericField::Int(10))).unwrap(), 10.0);
        assert_eq!(parse_rating("rating", None).unwrap(), 0.0);
        assert!(parse_rating("rating", Some(&"별점".into())).is_err());
        assert!(parse_rating("rating", Some(&"NaN".into())).is_err());
    }

    #[test]
    fn timestamps_accept_crawler_formats() {
        let compact = parse_timestamp("2024-03-14T23:31:12+0900").unwrap();
        let rfc = parse_timestamp("2024-03-14T23:31:12+09:00").unwrap();
        assert_eq!(compact, rfc);

        let naive = parse_timestamp("2024-03-14 14:31:12").unwrap();
        assert_eq!(naive, rfc);

        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    fn raw_comment(date: &str) -> RawComment {
        RawComment {
            nickname: Some("reader".to_string()),
            text: "hello".to_string(),
            recomm: Some("1,024".into()),
            unrecomm: Some("3".into()),
            date: date.to_string(),
        }
    }

    #[test]
    fn normalize_batch_coerces_every_field() {
        let raw = RawEpisodeBatch {
            webtoon: "김부장".to_string(),
            episode: 167,
            interest_count: Some("231,402".into()),
            like_count: Some("12,311".into()),
            rating: Some("9.98".into()),
            comments: vec![raw_comment("2024-03-14T23:31:12+0900")],
        };

        let episode = normalize_batch(&raw).unwrap();
        assert_eq!(episode.key.title(), "김부장");
        assert_eq!(episode.key.episode(), 167);
        assert_eq!(episode.interest_count, 231_402);
        assert_eq!(episode.like_count, 12_311);
        assert_eq!(episode.rating, 9.98);
        assert_eq!(episode.comments[0].recommend_count, 1024);
        assert_eq!(episode.comments[0].unrecommend_count, 3);
    }

    #[test]
    fn malformed_timestamp_fails_the_batch_with_its_index() {
        let raw = RawEpisodeBatch {
            webtoon: "t".to_string(),
            episode: 1,
            interest_count: None,
            like_count: None,
            rating: None,
            comments: vec![
                raw_comment("2024-03-14T23:31:12+0900"),
                raw_comment("not a date"),
            ],
        };

        match normalize_batch(&raw).unwrap_err() {
            PipelineError::MalformedTimestamp { index, value } => {
                assert_eq!(index, 1);
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn raw_batch_deserializes_crawler_json() {
        let json = r#"{
            "webtoon": "퀘스트지상주의",
            "episode": 152,
            "interest_count": "1,024,000",
            "like_count": "8,812",
            "rating": "9.91",
            "comments": [
                {"nickname": "abc***", "text": "최고", "recomm": "120", "unrecomm": "2",
                 "date": "2025-02-10T00:00:12+0900"}
            ]
        }"#;
        let raw: RawEpisodeBatch = serde_json::from_str(json).unwrap();
        let episode = normalize_batch(&raw).unwrap();
        assert_eq!(episode.interest_count, 1_024_000);
        assert_eq!(episode.comments.len(), 1);
        assert_eq!(episode.comments[0].author_ref.as_deref(), Some("abc***"));
    }
}
