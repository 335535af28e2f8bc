mod config;

use adapter::{HttpSentimentScorer, JsonCommentSource, JsonEpisodeCatalog};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use domain::digest::EpisodeDigest;
use dotenvy::dotenv;
use pipeline::Orchestrator;
use storage::Db;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "toonpulse", version, about = "Webtoon reader sentiment and trend pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enrich one episode's comments and store the record
    Run {
        #[arg(long)]
        title: String,
        #[arg(long)]
        episode: i64,
    },
    /// Re-run a range of episodes, oldest first
    Backfill {
        #[arg(long)]
        title: String,
        #[arg(long)]
        from: i64,
        #[arg(long)]
        to: i64,
    },
    /// Print the stored digest of an episode as JSON
    Show {
        #[arg(long)]
        title: String,
        #[arg(long)]
        episode: i64,
        /// Polarity band for the loyalty breakdown
        #[arg(long)]
        threshold: Option<f64>,
    },
}

fn build_orchestrator(db: Db, settings: &Settings) -> anyhow::Result<Orchestrator> {
    let scorer = HttpSentimentScorer::new(settings.scorer_config())?;
    Ok(Orchestrator::new(
        db,
        Box::new(JsonCommentSource::new(&settings.data.raw_dir)),
        Box::new(scorer),
        Box::new(JsonEpisodeCatalog::new(&settings.data.episode_dir)),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let settings = Settings::new().context("Failed to load configuration")?;
    let db = Db::new(&settings.database.url)
        .await
        .with_context(|| format!("Failed to open database: {}", settings.database.url))?;

    match cli.command {
        Command::Run { title, episode } => {
            let orchestrator = build_orchestrator(db, &settings)?;
            let record = orchestrator.run(&title, episode).await?;
            info!(
                "Stored {} #{}: {} comments, trend over {:?}",
                record.title,
                record.episode,
                record.comments.len(),
                record.trend.episodes()
            );
        }
        Command::Backfill { title, from, to } => {
            if from > to {
                bail!("--from ({}) must not be greater than --to ({})", from, to);
            }
            let orchestrator = build_orchestrator(db, &settings)?;
            let report = orchestrator.backfill(&title, from, to).await?;
            info!("Processed {:?}, skipped {:?}", report.processed, report.skipped);
        }
        Command::Show {
            title,
            episode,
            threshold,
        } => {
            let record = db
                .get_episode(&title, episode)
                .await?
                .with_context(|| format!("No stored record for {} #{}", title, episode))?;
            let digest =
                EpisodeDigest::build(&record, threshold.unwrap_or(settings.digest.threshold));
            println!("{}", serde_json::to_string_pretty(&digest)?);
        }
    }

    Ok(())
}
