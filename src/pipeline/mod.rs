//! Run orchestration
//!
//! Loads every configured source, applies the per-source escalation policy,
//! merges the survivors in declared order, filters and writes the output.

pub mod source_loader;

use std::path::PathBuf;

use futures::future::join_all;
use tracing::{info, warn};

use crate::config::Config;
use crate::epg::{self, ChannelSelection, FilterStats};
use crate::errors::{AppError, AppResult, SourceError};
use crate::utils::{FeedFetcher, UrlUtils};
use crate::xmltv::{self, Document};

pub use source_loader::SourceLoader;

/// What happened to one configured source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Loaded { channels: usize, programmes: usize },
    Skipped { stage: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    /// Source URL with credentials obfuscated
    pub url: String,
    pub outcome: SourceOutcome,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sources: Vec<SourceReport>,
    pub stats: FilterStats,
    pub output_path: PathBuf,
}

impl RunReport {
    pub fn channels_written(&self) -> usize {
        self.stats.channels_kept
    }

    pub fn programmes_written(&self) -> usize {
        self.stats.programmes_kept
    }

    pub fn skipped_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Skipped { .. }))
            .count()
    }
}

/// Download, merge, filter and write one EPG guide
pub struct EpgPipeline<F: FeedFetcher> {
    config: Config,
    selection: ChannelSelection,
    fetcher: F,
}

impl<F: FeedFetcher> EpgPipeline<F> {
    /// Validates the configuration up front so a bad value never costs a download
    pub fn new(config: Config, fetcher: F) -> AppResult<Self> {
        config.validate()?;
        let selection = config.channel_selection()?;
        Ok(Self {
            config,
            selection,
            fetcher,
        })
    }

    pub fn selection(&self) -> &ChannelSelection {
        &self.selection
    }

    pub async fn run(&self) -> AppResult<RunReport> {
        let source_count = self.config.sources.len();
        let skip_failures = self.config.on_source_error.skips_failures(source_count);
        info!(
            "Starting EPG filter run: {} source(s), filtering for {}",
            source_count, self.selection
        );

        let results = self.load_sources(!skip_failures).await;

        let mut documents = Vec::with_capacity(source_count);
        let mut reports = Vec::with_capacity(source_count);
        let mut first_failure: Option<AppError> = None;

        for (url, result) in self.config.sources.iter().zip(results) {
            let display_url = UrlUtils::obfuscate_credentials(url);
            match result {
                Ok(document) => {
                    reports.push(SourceReport {
                        url: display_url,
                        outcome: SourceOutcome::Loaded {
                            channels: document.channel_count(),
                            programmes: document.programme_count(),
                        },
                    });
                    documents.push(document);
                }
                Err(error) if skip_failures => {
                    warn!("Skipping source {} after {} failure: {}", display_url, error.stage(), error);
                    reports.push(SourceReport {
                        url: display_url.clone(),
                        outcome: SourceOutcome::Skipped {
                            stage: error.stage(),
                            message: error.to_string(),
                        },
                    });
                    first_failure.get_or_insert(AppError::source_failed(display_url, error));
                }
                Err(error) => return Err(AppError::source_failed(display_url, error)),
            }
        }

        if let Some(failure) = first_failure {
            if self.config.require_all_sources {
                warn!(
                    "Not writing {}: a source was skipped and all sources are required",
                    self.config.output_path.display()
                );
                return Err(failure);
            }
            if documents.is_empty() {
                warn!("Every source failed, the output will contain no channels");
            }
        }

        let merged = epg::merge(documents);
        let outcome = self.selection.apply(&merged);
        self.write(&outcome.document)?;

        info!(
            "Filter complete. Added {} channels and {} programmes.",
            outcome.stats.channels_kept, outcome.stats.programmes_kept
        );
        info!("Output file created: {}", self.config.output_path.display());

        Ok(RunReport {
            sources: reports,
            stats: outcome.stats,
            output_path: self.config.output_path.clone(),
        })
    }

    /// Results are returned in declared source order either way. Sequential
    /// loading stops at the first failure when `stop_on_error` is set.
    async fn load_sources(&self, stop_on_error: bool) -> Vec<Result<Document, SourceError>> {
        let loader = SourceLoader::new(&self.fetcher, self.config.download_dir.as_deref());
        let sources = self.config.sources.iter().enumerate();

        if self.config.concurrent_fetch {
            join_all(sources.map(|(index, url)| loader.load(index + 1, url))).await
        } else {
            let mut results = Vec::with_capacity(self.config.sources.len());
            for (index, url) in sources {
                let result = loader.load(index + 1, url).await;
                let failed = result.is_err();
                results.push(result);
                if failed && stop_on_error {
                    break;
                }
            }
            results
        }
    }

    fn write(&self, document: &Document) -> AppResult<()> {
        xmltv::write_document(document, &self.config.output_path)?;
        Ok(())
    }
}
