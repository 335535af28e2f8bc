use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

use crate::traits::SentimentScorer;

#[derive(Clone, Debug)]
pub struct ScorerConfig {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

/// Text-classification model served over HTTP.
///
/// The endpoint answers `{"inputs": text}` with `[{"label": "1", "score": 0.98}]`
/// (optionally wrapped in one more array). Label `1` is positive, `0` negative.
pub struct HttpSentimentScorer {
    client: reqwest::Client,
    config: ScorerConfig,
}

impl HttpSentimentScorer {
    pub fn new(config: ScorerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build HTTP client")?;
        info!("Sentiment scorer endpoint: {}", config.endpoint);
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SentimentScorer for HttpSentimentScorer {
    async fn score(&self, text: &str) -> Result<f64> {
        let mut req = self
            .client
            .post(&self.config.endpoint)
            .json(&json!({ "inputs": text }));
        if let Some(token) = &self.config.api_token {
            req = req.bearer_auth(token);
        }

        let body: Value = req
            .send()
            .await
            .context("sentiment endpoint unreachable")?
            .error_for_status()?
            .json()
            .await
            .context("sentiment endpoint returned invalid JSON")?;

        score_from_response(&body)
    }
}

fn label_polarity(label: &str) -> Option<f64> {
    match label.trim().to_ascii_uppercase().as_str() {
        "1" | "LABEL_1" | "POSITIVE" | "POS" => Some(1.0),
        "0" | "LABEL_0" | "NEGATIVE" | "NEG" => Some(-1.0),
        _ => None,
    }
}

/// Top prediction `(label, confidence)` to a signed score.
pub(crate) fn score_from_response(body: &Value) -> Result<f64> {
    let mut top = body;
    while let Value::Array(items) = top {
        top = items
            .first()
            .ok_or_else(|| anyhow!("empty prediction list"))?;
    }

    let label = match top.get("label") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => bail!("prediction has no label: {}", top),
    };
    let confidence = top
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| anyhow!("prediction has no score: {}", top))?;
    let polarity =
        label_polarity(&label).ok_or_else(|| anyhow!("unknown sentiment label {:?}", label))?;

    Ok(polarity * confidence)
}
