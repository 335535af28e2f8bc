use adapter::ScorerConfig;
use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const ENV_PREFIX: &str = "TOONPULSE_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub data: DataSettings,
    pub scorer: ScorerSettings,
    pub digest: DigestSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DataSettings {
    // crawler output, one file per (title, episode)
    pub raw_dir: String,
    // episode listings with star ratings, one file per title
    pub episode_dir: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScorerSettings {
    pub endpoint: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DigestSettings {
    pub threshold: f64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars(std::env::vars());

        let s = config::Config::builder()
            .set_default("database.url", "sqlite://data/toonpulse.db")?
            .set_default("data.raw_dir", "comments_raw_data")?
            .set_default("data.episode_dir", "episode_data")?
            .set_default("scorer.endpoint", "http://127.0.0.1:8000/predict")?
            .set_default("scorer.timeout_secs", 30)?
            .set_default("digest.threshold", 0.5)?
            .add_source(config::File::with_name("toonpulse").required(false))
            .add_source(config::File::with_name(&format!("toonpulse.{}", run_mode)).required(false))
            .add_source(config::File::from_str(
                &serde_json::to_string(&env_map).map_err(|e| ConfigError::Foreign(Box::new(e)))?,
                config::FileFormat::Json,
            ))
            .build()?;

        s.try_deserialize()
    }

    pub fn scorer_config(&self) -> ScorerConfig {
        ScorerConfig {
            endpoint: self.scorer.endpoint.clone(),
            api_token: self.scorer.api_token.clone().filter(|t| !t.is_empty()),
            timeout: Duration::from_secs(self.scorer.timeout_secs),
        }
    }
}

/// `TOONPULSE_SCORER__ENDPOINT=x` becomes `scorer.endpoint = x`.
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
