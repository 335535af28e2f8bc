use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use crate::models::EnrichedComment;

/// Current episode plus the four before it.
pub const TREND_WINDOW: i64 = 5;

pub const NEGATIVE_SCORE_CUTOFF: f64 = -0.5;

const NOT_AVAILABLE: &str = "N/A";

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Episode numbers considered for the trend of `current`.
pub fn window(current: i64) -> RangeInclusive<i64> {
    (current - (TREND_WINDOW - 1))..=current
}

/// Share of comments at or below the negative cutoff, in percent.
/// An episode without comments has a ratio of 0.
pub fn negative_comment_ratio(comments: &[EnrichedComment]) -> f64 {
    if comments.is_empty() {
        return 0.0;
    }
    let negatives = comments.iter().filter(|c| c.is_negative()).count();
    round2(negatives as f64 / comments.len() as f64 * 100.0)
}

/// A trend value, serialized as a number or as `"N/A"` when the data is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrendMetric {
    Value(f64),
    NotAvailable,
}

impl From<Option<f64>> for TrendMetric {
    fn from(v: Option<f64>) -> Self {
        v.map_or(TrendMetric::NotAvailable, TrendMetric::Value)
    }
}

impl Serialize for TrendMetric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TrendMetric::Value(v) => serializer.serialize_f64(*v),
            TrendMetric::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for TrendMetric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(TrendMetric::Value(v)),
            Repr::Text(s) if s == NOT_AVAILABLE => Ok(TrendMetric::NotAvailable),
            Repr::Text(s) => s
                .replace(',', "")
                .trim()
                .parse::<f64>()
                .map(TrendMetric::Value)
                .map_err(|_| de::Error::custom(format!("invalid trend value: {s:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub rating: TrendMetric,
    pub negative_comment_ratio: TrendMetric,
}

/// Episode number to trend entry. Serialized as a JSON object whose keys are
/// the episode numbers as strings, newest episode first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendMap(BTreeMap<i64, TrendEntry>);

impl TrendMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, episode: i64, entry: TrendEntry) {
        self.0.insert(episode, entry);
    }

    pub fn get(&self, episode: i64) -> Option<&TrendEntry> {
        self.0.get(&episode)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Newest episode first.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &TrendEntry)> {
        self.0.iter().rev().map(|(ep, entry)| (*ep, entry))
    }

    pub fn episodes(&self) -> Vec<i64> {
        self.iter().map(|(ep, _)| ep).collect()
    }
}

impl Serialize for TrendMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (episode, entry) in self.iter() {
            map.serialize_entry(&episode.to_string(), entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TrendMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TrendMapVisitor;

        impl<'de> Visitor<'de> for TrendMapVisitor {
            type Value = TrendMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of episode numbers to trend entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TrendMap, A::Error> {
                let mut map = TrendMap::new();
                while let Some((key, entry)) = access.next_entry::<String, TrendEntry>()? {
                    let episode = key.parse::<i64>().map_err(|_| {
                        de::Error::custom(format!("invalid episode key: {key:?}"))
                    })?;
                    map.insert(episode, entry);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(TrendMapVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comment, ReaderLoyalty};
    use chrono::DateTime;

    fn scored(score: f64) -> EnrichedComment {
        Comment {
            author_ref: None,
            text: String::new(),
            recommend_count: 0,
            unrecommend_count: 0,
            posted_at: DateTime::parse_from_rfc3339("2025-02-10T00:00:00+09:00").unwrap(),
        }
        .classify(ReaderLoyalty::Loyal)
        .enrich(score)
    }

    #[test]
    fn three_of_ten_negative_is_thirty_percent() {
        let mut comments: Vec<_> = (0..7).map(|_| scored(0.4)).collect();
        comments.extend([scored(-0.5), scored(-0.9), scored(-1.0)]);
        assert_eq!(negative_comment_ratio(&comments), 30.0);
    }

    #[test]
    fn ratio_is_rounded_and_bounded() {
        let comments = vec![scored(-0.6), scored(0.1), scored(-0.49)];
        assert_eq!(negative_comment_ratio(&comments), 33.33);
        assert_eq!(negative_comment_ratio(&[]), 0.0);
        assert_eq!(negative_comment_ratio(&[scored(-0.7)]), 100.0);
    }

    #[test]
    fn window_spans_five_episodes_ending_at_current() {
        let eps: Vec<_> = window(100).collect();
        assert_eq!(eps, vec![96, 97, 98, 99, 100]);
    }

    #[test]
    fn trend_map_serializes_newest_first_with_sentinels() {
        let mut trend = TrendMap::new();
        trend.insert(
            98,
            TrendEntry {
                rating: TrendMetric::Value(9.8),
                negative_comment_ratio: TrendMetric::Value(0.0),
            },
        );
        trend.insert(
            99,
            TrendEntry {
                rating: TrendMetric::Value(9.7),
                negative_comment_ratio: TrendMetric::NotAvailable,
            },
        );
        trend.insert(
            100,
            TrendEntry {
                rating: TrendMetric::Value(9.9),
                negative_comment_ratio: TrendMetric::Value(12.5),
            },
        );

        let json = serde_json::to_string(&trend).unwrap();
        assert_eq!(
            json,
            r#"{"100":{"rating":9.9,"negative_comment_ratio":12.5},"99":{"rating":9.7,"negative_comment_ratio":"N/A"},"98":{"rating":9.8,"negative_comment_ratio":0.0}}"#
        );

        let back: TrendMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trend);
        assert_eq!(back.episodes(), vec![100, 99, 98]);
    }

    #[test]
    fn legacy_string_ratings_are_read_back() {
        let json = r#"{"152":{"rating":"9.95","negative_comment_ratio":3.1}}"#;
        let trend: TrendMap = serde_json::from_str(json).unwrap();
        assert_eq!(trend.get(152).unwrap().rating, TrendMetric::Value(9.95));
        let bad_key = r#"{"x":{"rating":1,"negative_comment_ratio":1}}"#;
        assert!(serde_json::from_str::<TrendMap>(bad_key).is_err());
    }
}
