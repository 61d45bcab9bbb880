use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use epg_filter::{
    config::{Config, SelectionConfig, SelectionMode},
    errors::AppError,
    observability::{LogFormat, init_logging},
    pipeline::EpgPipeline,
    utils::StandardHttpClient,
};

#[derive(Parser)]
#[command(name = "epg-filter")]
#[command(version)]
#[command(about = "Download XMLTV guides, keep the selected channels and write one merged guide")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (falls back to EPG_CONFIG_FILE)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Additional source URL, appended after the configured ones
    #[arg(short, long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Keep the channel with this id (replaces the configured selection)
    #[arg(long = "channel-id", value_name = "ID", conflicts_with = "channel_names")]
    channel_ids: Vec<String>,

    /// Keep channels with this display name (replaces the configured selection)
    #[arg(long = "channel-name", value_name = "NAME")]
    channel_names: Vec<String>,

    /// Output file path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Keep the downloaded and decompressed payloads in this directory
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Download all sources concurrently
    #[arg(long)]
    concurrent: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Write the default configuration to PATH and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

impl Cli {
    fn apply_overrides(self, config: &mut Config) {
        config.sources.extend(self.urls);

        if !self.channel_ids.is_empty() {
            config.selection = Some(SelectionConfig {
                mode: SelectionMode::Id,
                values: self.channel_ids,
            });
        } else if !self.channel_names.is_empty() {
            config.selection = Some(SelectionConfig {
                mode: SelectionMode::Name,
                values: self.channel_names,
            });
        }

        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(dir) = self.download_dir {
            config.download_dir = Some(dir);
        }
        if self.concurrent {
            config.concurrent_fetch = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_level, cli.log_format) {
        eprintln!("Failed to initialise logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(path) = &cli.write_default_config {
        let rendered = Config::default().to_toml()?;
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write default config to {}", path.display()))?;
        info!("Default configuration written to: {}", path.display());
        return Ok(());
    }

    info!("Starting EPG filter v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref()).context("config stage failed")?;
    cli.apply_overrides(&mut config);

    let fetcher = StandardHttpClient::new(&config.http).context("config stage failed")?;
    let pipeline = EpgPipeline::new(config, fetcher).map_err(with_stage)?;
    let report = pipeline.run().await.map_err(with_stage)?;

    if report.skipped_sources() > 0 {
        info!(
            "{} of {} source(s) were skipped",
            report.skipped_sources(),
            report.sources.len()
        );
    }

    Ok(())
}

fn with_stage(error: AppError) -> anyhow::Error {
    let stage = error.stage();
    anyhow::Error::new(error).context(format!("{stage} stage failed"))
}
