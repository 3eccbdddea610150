//! observation-scraper - NWS climatological reports to Kafka
//!
//! Usage:
//!   observation-scraper [idle]                keep the container alive until stopped
//!   observation-scraper run                   daily scheduler
//!   observation-scraper fetch KNYC            print beats as JSON lines, no Kafka
//!   observation-scraper publish KNYC          fetch and publish once
//!   observation-scraper test-beat             publish a deployment smoke beat
//!
//! Environment:
//!   OBS_CONFIG_DIR - config directory (default: ./config)
//!   OBS__<SECTION>__<KEY> - override any config value
//!   OBS__STATE__PATH - where published reports are remembered between runs
//!   RUST_LOG       - log filter (default: info)

use clap::{Parser, Subcommand};
use observation_scraper::utils::constants::{APP_NAME, APP_VERSION, DEFAULT_CONFIG_DIR};
use observation_scraper::{
    preview_beats, send_test_beat, shutdown_signal, BeatSink, CliScraper, ObservationProducer,
    Pipeline, Scheduler, Settings, StdoutSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about = "Scrape NWS climatological reports and publish observation beats")]
struct Cli {
    /// Directory holding cli.yaml, kafka.yaml and optional schedule.yaml
    #[arg(long, env = "OBS_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR, global = true)]
    config_dir: PathBuf,

    /// Defaults to `idle`
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Block until SIGINT/SIGTERM without doing any work (default)
    Idle,
    /// Run the daily scheduler
    Run,
    /// Fetch and parse a station's report, print its beats
    Fetch {
        station: String,
    },
    /// Fetch, parse and publish a station's report once
    Publish {
        station: String,
        /// Topic override
        #[arg(long)]
        topic: Option<String>,
        /// Publish even if this report date is recorded in the state file
        #[arg(long)]
        force: bool,
    },
    /// Publish a single smoke-test beat
    TestBeat {
        #[arg(long)]
        topic: Option<String>,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Logs go to stderr so `fetch` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("❌ {} ({})", e, e.code_str());
        return Err(e.into());
    }
    Ok(())
}

async fn run(cli: Cli) -> observation_scraper::AppResult<()> {
    match cli.command.unwrap_or(Command::Idle) {
        Command::Idle => {
            info!("🕯️ {} v{} idle, waiting for stop signal", APP_NAME, APP_VERSION);
            shutdown_signal().await;
            info!("👋 Idle process exiting");
        }
        Command::Run => {
            let settings = Settings::load(&cli.config_dir)?;
            let scraper = CliScraper::new(settings.cli.clone())?;
            let producer = ObservationProducer::new(&settings.kafka)?;
            let pipeline = Pipeline::new(Arc::new(scraper), Arc::new(producer), settings.kafka.topic.clone())
                .with_state_file(&settings.state.path, settings.state.ttl());

            let scheduler = Scheduler::new(
                pipeline,
                settings.schedule.stations.clone(),
                settings.schedule.run_time()?,
            );
            scheduler.run(shutdown_signal()).await;
        }
        Command::Fetch { station } => {
            let settings = Settings::load(&cli.config_dir)?;
            let scraper = CliScraper::new(settings.cli)?;
            let beats = preview_beats(&scraper, &station).await?;
            for beat in &beats {
                StdoutSink.send_beat(&settings.kafka.topic, beat, Some(beat.station_id.as_str())).await?;
            }
            info!("📝 {} beat(s) for {} printed, nothing published", beats.len(), station);
        }
        Command::Publish { station, topic, force } => {
            let settings = Settings::load(&cli.config_dir)?;
            let topic = topic.unwrap_or_else(|| settings.kafka.topic.clone());
            let scraper = CliScraper::new(settings.cli)?;
            let producer = ObservationProducer::new(&settings.kafka)?;

            let pipeline = Pipeline::new(Arc::new(scraper), Arc::new(producer), topic)
                .with_state_file(&settings.state.path, settings.state.ttl());
            let count = pipeline.run_station(&station, force).await?;
            info!("📊 {} beat(s) published for {}", count, station);
        }
        Command::TestBeat { topic } => {
            let settings = Settings::load(&cli.config_dir)?;
            let topic = topic.unwrap_or_else(|| settings.kafka.topic.clone());
            let producer = ObservationProducer::new(&settings.kafka)?;
            send_test_beat(&producer, &topic).await?;
        }
    }

    Ok(())
}
