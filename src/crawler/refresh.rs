//! Refresh pass over already stored fictions
//!
//! Re-fetches the detail page of every stored fiction in ascending
//! identifier order and overwrites its record. The pass keeps its own
//! cursor (the last processed identifier) so it can be interrupted and
//! resumed independently of the listing crawl.

use crate::checkpoint::RefreshCheckpointStore;
use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{HtmlPageParser, PageParser};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::ShutdownSignal;
use crate::output::{estimate_time_remaining, format_number};
use crate::record::{detail_url, FictionRecord, NormalizeError, Normalizer};
use crate::storage::{open_repository, Repository, SqliteRepository};
use crate::HarvestError;
use std::path::Path;
use url::Url;

/// Outcome of one refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Records re-fetched and overwritten
    pub updated: u64,

    /// Fictions whose detail page could not be fetched or normalized
    pub failed: u64,

    /// Cursor position the next pass resumes after
    pub last_processed_id: u64,

    /// True if the pass stopped on a shutdown request
    pub interrupted: bool,
}

/// Walks stored fictions and re-ingests them
pub struct Refresher<R: Repository, P: PageParser> {
    fetcher: PageFetcher,
    parser: P,
    repository: R,
    checkpoints: RefreshCheckpointStore,
    normalizer: Normalizer,
    limiter: RateLimiter,
    shutdown: ShutdownSignal,
    base_url: Url,
    detail_path: String,
    batch_size: usize,
    secs_per_fiction: f64,
}

impl Refresher<SqliteRepository, HtmlPageParser> {
    pub fn from_config(config: &Config, shutdown: ShutdownSignal) -> Result<Self, HarvestError> {
        let repository = open_repository(Path::new(&config.output.database_path))?;
        let fetcher = PageFetcher::from_config(config)?;
        let parser = HtmlPageParser::new(fetcher.base_url().clone(), &config.site.detail_path);
        let checkpoints = RefreshCheckpointStore::new(&config.output.refresh_checkpoint_path);

        Ok(Self::new(
            config,
            fetcher,
            parser,
            repository,
            checkpoints,
            shutdown,
        ))
    }
}

impl<R: Repository, P: PageParser> Refresher<R, P> {
    pub fn new(
        config: &Config,
        fetcher: PageFetcher,
        parser: P,
        repository: R,
        checkpoints: RefreshCheckpointStore,
        shutdown: ShutdownSignal,
    ) -> Self {
        let crawler = &config.crawler;

        Self {
            base_url: fetcher.base_url().clone(),
            fetcher,
            parser,
            repository,
            checkpoints,
            normalizer: Normalizer::new(),
            limiter: RateLimiter::from_secs(crawler.fiction_delay_secs, crawler.fiction_jitter_secs),
            shutdown,
            detail_path: config.site.detail_path.clone(),
            batch_size: crawler.refresh_batch_size.max(1),
            secs_per_fiction: crawler.mean_fiction_secs(),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Runs the pass until every stored fiction has been visited or a
    /// shutdown is requested
    ///
    /// Each batch is upserted before the cursor is saved. Fictions that fail
    /// are logged and skipped; the cursor still moves past them.
    pub async fn run(&mut self) -> Result<RefreshReport, HarvestError> {
        let mut report = RefreshReport {
            last_processed_id: self.checkpoints.load().last_processed_id,
            ..RefreshReport::default()
        };

        let stored = self.repository.count_fictions()?;
        tracing::info!(
            "Refreshing {} stored fictions after ID {} (ETA up to {})",
            format_number(stored),
            report.last_processed_id,
            estimate_time_remaining(stored, self.secs_per_fiction)
        );

        loop {
            if self.shutdown.is_requested() {
                report.interrupted = true;
                break;
            }

            let ids = self
                .repository
                .ids_after(report.last_processed_id, self.batch_size)?;
            if ids.is_empty() {
                break;
            }

            let mut batch = Vec::with_capacity(ids.len());
            for id in ids {
                if self.shutdown.is_requested() {
                    report.interrupted = true;
                    break;
                }

                match self.refresh_one(id).await {
                    Ok(record) => batch.push(record),
                    Err(e) => {
                        tracing::warn!("Could not refresh fiction {}: {}", id, e);
                        report.failed += 1;
                    }
                }
                report.last_processed_id = id;

                self.limiter.wait().await;
            }

            self.repository.upsert_batch(&batch)?;
            report.updated += batch.len() as u64;

            if let Err(e) = self.checkpoints.save(report.last_processed_id) {
                tracing::warn!("Could not save refresh checkpoint: {}", e);
            }
            tracing::info!(
                "Refreshed {} fictions so far (last ID {})",
                format_number(report.updated),
                report.last_processed_id
            );

            if report.interrupted {
                break;
            }
        }

        if report.interrupted {
            tracing::info!(
                "Refresh paused after ID {}. Run again to continue",
                report.last_processed_id
            );
        } else {
            tracing::info!(
                "Refresh complete: {} updated, {} failed",
                report.updated,
                report.failed
            );
        }

        Ok(report)
    }

    async fn refresh_one(&mut self, fiction_id: u64) -> Result<FictionRecord, HarvestError> {
        let url = detail_url(&self.base_url, &self.detail_path, fiction_id)
            .ok_or(NormalizeError::MissingIdentifier)?;
        let html = self.fetcher.fetch_detail(&url).await?;
        let fields = self.parser.extract_detail_fields(&html);
        Ok(self.normalizer.normalize(Some(fiction_id), &fields)?)
    }
}

/// Runs a refresh pass with the SQLite repository
///
/// With `restart` the refresh cursor is cleared first and the pass starts
/// over from the lowest identifier.
pub async fn run_refresh(
    config: &Config,
    shutdown: ShutdownSignal,
    restart: bool,
) -> Result<RefreshReport, HarvestError> {
    let mut refresher = Refresher::from_config(config, shutdown)?;
    if restart {
        refresher.checkpoints.clear()?;
    }
    refresher.run().await
}
