//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Resuming from the persisted checkpoint
//! - Walking listing pages and their fiction links in order
//! - Normalizing and batch-upserting each page's fictions
//! - Checkpointing after every page and honoring caps and interrupts
//!
//! Per listing page the order is always: fetch, collect records, upsert the
//! batch, then save the checkpoint. A crash between upsert and save re-does
//! the page on the next run, which the identifier-keyed upsert absorbs.

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{HtmlPageParser, PageParser};
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::ShutdownSignal;
use crate::output::format_progress;
use crate::record::{fiction_id_from_url, FictionRecord, NormalizeError, Normalizer};
use crate::state::{CrawlState, StopReason};
use crate::storage::{open_repository, Repository, SqliteRepository};
use crate::HarvestError;
use std::path::Path;
use url::Url;

/// Outcome of one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    /// Terminal state the run ended in
    pub state: CrawlState,

    /// Listing page the next run will start from
    pub next_page: u32,

    /// Cumulative fictions ingested across all runs
    pub total_scraped: u64,

    /// Fictions ingested by this run
    pub ingested_this_run: u64,

    /// Listing pages whose batch was committed by this run
    pub pages_processed: u32,

    /// Fiction pages skipped because of a fetch or normalization error
    pub failed_items: u64,

    /// Listing pages that could not be fetched
    pub failed_pages: Vec<u32>,

    /// Last ingested identifier, if any
    pub last_fiction_id: Option<u64>,
}

/// In-memory crawl position
#[derive(Debug, Clone, Copy)]
struct Cursor {
    /// Next listing page this run fetches
    page: u32,

    /// Page a later run should start from
    resume_page: u32,

    total: u64,
    last_id: Option<u64>,

    /// The persisted checkpoint lags behind this cursor
    dirty: bool,
}

#[derive(Debug, Default)]
struct RunStats {
    ingested: u64,
    pages_processed: u32,
    failed_items: u64,
    failed_pages: Vec<u32>,
}

/// Main crawler coordinator structure
///
/// Owns the repository for the duration of the run; dropping the
/// coordinator releases it on every exit path.
pub struct Coordinator<R: Repository, P: PageParser> {
    fetcher: PageFetcher,
    parser: P,
    repository: R,
    checkpoints: CheckpointStore,
    normalizer: Normalizer,
    page_limiter: RateLimiter,
    fiction_limiter: RateLimiter,
    shutdown: ShutdownSignal,
    detail_path: String,
    max_pages: u32,
    max_novels: u64,
    secs_per_fiction: f64,
    state: CrawlState,
    cursor: Cursor,
    stats: RunStats,
}

impl Coordinator<SqliteRepository, HtmlPageParser> {
    /// Builds a coordinator with the SQLite repository and HTML parser
    ///
    /// Opens (and if needed creates) the database and loads the checkpoint
    /// named in `config.output`.
    pub fn from_config(config: &Config, shutdown: ShutdownSignal) -> Result<Self, HarvestError> {
        let repository = open_repository(Path::new(&config.output.database_path))?;
        let fetcher = PageFetcher::from_config(config)?;
        let parser = HtmlPageParser::new(fetcher.base_url().clone(), &config.site.detail_path);
        let checkpoints = CheckpointStore::open(&config.output.checkpoint_path);

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

impl<R: Repository, P: PageParser> Coordinator<R, P> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Limits, pacing and site paths
    /// * `fetcher` - HTTP access to listing and detail pages
    /// * `parser` - Markup extraction
    /// * `repository` - Destination of normalized records
    /// * `checkpoints` - Persisted crawl cursor
    /// * `shutdown` - Cancellation flag polled between pages and items
    pub fn new(
        config: &Config,
        fetcher: PageFetcher,
        parser: P,
        repository: R,
        checkpoints: CheckpointStore,
        shutdown: ShutdownSignal,
    ) -> Self {
        let crawler = &config.crawler;

        Self {
            fetcher,
            parser,
            repository,
            checkpoints,
            normalizer: Normalizer::new(),
            page_limiter: RateLimiter::from_secs(crawler.page_delay_secs, crawler.page_jitter_secs),
            fiction_limiter: RateLimiter::from_secs(
                crawler.fiction_delay_secs,
                crawler.fiction_jitter_secs,
            ),
            shutdown,
            detail_path: config.site.detail_path.clone(),
            max_pages: crawler.max_pages,
            max_novels: crawler.max_novels,
            secs_per_fiction: crawler.mean_fiction_secs(),
            state: CrawlState::Idle,
            cursor: Cursor {
                page: 1,
                resume_page: 1,
                total: 0,
                last_id: None,
                dirty: false,
            },
            stats: RunStats::default(),
        }
    }

    /// Replaces both rate limiters
    pub fn with_rate_limiters(mut self, page: RateLimiter, fiction: RateLimiter) -> Self {
        self.page_limiter = page;
        self.fiction_limiter = fiction;
        self
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Consumes the coordinator, handing back the repository
    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Runs the main crawl loop
    ///
    /// Starts from the checkpoint the store loaded when it was opened.
    /// Returns the report of a run that ended `Paused` or `Stopped`. A
    /// repository failure moves the crawl to `Failed` and is returned as an
    /// error with the checkpoint left untouched.
    pub async fn run(&mut self) -> Result<CrawlReport, HarvestError> {
        let checkpoint = self.checkpoints.current().clone();
        self.cursor = Cursor {
            page: checkpoint.start_page(),
            resume_page: checkpoint.start_page(),
            total: checkpoint.total_scraped,
            last_id: checkpoint.last_fiction_id,
            dirty: false,
        };
        self.stats = RunStats::default();
        self.transition(CrawlState::Running)?;

        if checkpoint.is_fresh() {
            tracing::info!("Starting crawl from page 1");
        } else {
            tracing::info!(
                "Resuming crawl from page {} ({} fictions already scraped)",
                self.cursor.page,
                self.cursor.total
            );
        }

        match self.crawl_pages().await {
            Ok(outcome) => self.finish(outcome),
            Err(e) => {
                tracing::error!("Crawl failed on page {}: {}", self.cursor.page, e);
                self.transition(CrawlState::Failed)?;
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: CrawlState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Crawl state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    async fn crawl_pages(&mut self) -> Result<CrawlState, HarvestError> {
        loop {
            if let Some(reason) = self.cap_reached() {
                return Ok(CrawlState::Stopped(reason));
            }
            if self.shutdown.is_requested() {
                tracing::info!("Shutdown requested before page {}", self.cursor.page);
                self.save_checkpoint();
                return Ok(CrawlState::Paused);
            }

            let page = self.cursor.page;
            tracing::info!(
                "{}",
                format_progress(
                    page,
                    self.max_pages,
                    self.cursor.total,
                    self.max_novels,
                    self.secs_per_fiction
                )
            );

            let links = match self.fetch_links(page).await {
                Ok(links) => links,
                Err(e) => {
                    tracing::warn!("Listing page {} failed: {}", page, e);
                    self.stats.failed_pages.push(page);
                    self.save_checkpoint();
                    self.cursor.page = page + 1;
                    self.page_limiter.wait().await;
                    continue;
                }
            };

            if links.is_empty() {
                tracing::info!("No fiction links on page {}, listing exhausted", page);
                return Ok(CrawlState::Stopped(StopReason::Exhausted));
            }
            tracing::info!("Found {} fiction links on page {}", links.len(), page);

            let (batch, interrupted) = self.crawl_links(&links).await;
            self.commit_page(page, batch, interrupted)?;

            if self.shutdown.is_requested() {
                return Ok(CrawlState::Paused);
            }
            if interrupted {
                // Item loop stopped on the novel cap
                continue;
            }

            self.page_limiter.wait().await;
        }
    }

    fn cap_reached(&self) -> Option<StopReason> {
        if self.cursor.total >= self.max_novels {
            tracing::info!(
                "Reached the novel cap ({} >= {})",
                self.cursor.total,
                self.max_novels
            );
            return Some(StopReason::NovelCapReached);
        }
        if self.cursor.page > self.max_pages {
            tracing::info!("Reached the page cap ({})", self.max_pages);
            return Some(StopReason::PageCapReached);
        }
        None
    }

    async fn fetch_links(&self, page: u32) -> Result<Vec<Url>, HarvestError> {
        let html = self.fetcher.fetch_listing(page).await?;
        Ok(self.parser.extract_listing_links(&html))
    }

    /// Visits the links of one page in order
    ///
    /// Returns the collected records and whether the loop stopped early.
    async fn crawl_links(&mut self, links: &[Url]) -> (Vec<FictionRecord>, bool) {
        let mut batch = Vec::with_capacity(links.len());

        for (idx, link) in links.iter().enumerate() {
            if self.cursor.total + batch.len() as u64 >= self.max_novels {
                tracing::info!("Novel cap reached mid-page, skipping remaining links");
                return (batch, true);
            }
            if self.shutdown.is_requested() {
                tracing::info!(
                    "Shutdown requested, skipping {} remaining links",
                    links.len() - idx
                );
                return (batch, true);
            }

            match self.crawl_fiction(link).await {
                Ok(record) => {
                    tracing::info!(
                        "[{}/{}] {} ({})",
                        idx + 1,
                        links.len(),
                        record.display_title(),
                        record.fiction_id
                    );
                    batch.push(record);
                }
                Err(e) => {
                    tracing::warn!("[{}/{}] Skipping {}: {}", idx + 1, links.len(), link, e);
                    self.stats.failed_items += 1;
                }
            }

            self.fiction_limiter.wait().await;
        }

        (batch, false)
    }

    async fn crawl_fiction(&mut self, link: &Url) -> Result<FictionRecord, HarvestError> {
        let fiction_id = fiction_id_from_url(link, &self.detail_path)
            .ok_or(NormalizeError::MissingIdentifier)?;
        let html = self.fetcher.fetch_detail(link).await?;
        let fields = self.parser.extract_detail_fields(&html);
        Ok(self.normalizer.normalize(Some(fiction_id), &fields)?)
    }

    /// Upserts a page's batch, then advances and saves the cursor
    fn commit_page(
        &mut self,
        page: u32,
        batch: Vec<FictionRecord>,
        interrupted: bool,
    ) -> Result<(), HarvestError> {
        if batch.is_empty() {
            if !interrupted {
                tracing::warn!("No fictions ingested from page {}", page);
                self.cursor.page = page + 1;
                if self.cursor.resume_page == page {
                    self.cursor.resume_page = page + 1;
                    self.cursor.dirty = true;
                }
            }
            return Ok(());
        }

        self.repository.upsert_batch(&batch)?;

        let count = batch.len() as u64;
        self.cursor.total += count;
        self.cursor.last_id = batch.last().map(|r| r.fiction_id);
        self.cursor.page = page + 1;
        self.cursor.resume_page = page + 1;
        self.stats.ingested += count;
        self.stats.pages_processed += 1;

        tracing::info!(
            "Saved {} fictions from page {} (total: {})",
            count,
            page,
            self.cursor.total
        );

        self.save_checkpoint();
        Ok(())
    }

    /// Persists the cursor; a failed write is logged and retried at the next save
    fn save_checkpoint(&mut self) {
        match self.checkpoints.save(
            self.cursor.resume_page,
            self.cursor.total,
            self.cursor.last_id,
        ) {
            Ok(_) => self.cursor.dirty = false,
            Err(e) => {
                tracing::warn!(
                    "Could not save checkpoint {}: {}",
                    self.checkpoints.path().display(),
                    e
                );
                self.cursor.dirty = true;
            }
        }
    }

    fn finish(&mut self, outcome: CrawlState) -> Result<CrawlReport, HarvestError> {
        self.transition(outcome)?;
        if self.cursor.dirty {
            self.save_checkpoint();
        }

        let report = self.report();
        tracing::info!(
            "Crawl {}: {} fictions this run, {} total, {} skipped",
            report.state,
            report.ingested_this_run,
            report.total_scraped,
            report.failed_items
        );
        if !report.failed_pages.is_empty() {
            tracing::warn!("Listing pages that failed: {:?}", report.failed_pages);
        }
        if report.state == CrawlState::Paused {
            tracing::info!(
                "Progress saved. Run again to resume from page {}",
                report.next_page
            );
        }

        Ok(report)
    }

    fn report(&self) -> CrawlReport {
        CrawlReport {
            state: self.state,
            next_page: self.cursor.resume_page,
            total_scraped: self.cursor.total,
            ingested_this_run: self.stats.ingested,
            pages_processed: self.stats.pages_processed,
            failed_items: self.stats.failed_items,
            failed_pages: self.stats.failed_pages.clone(),
            last_fiction_id: self.cursor.last_id,
        }
    }
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire crawl process:
///
/// 1. Open the database and load the checkpoint
/// 2. Build the HTTP client
/// 3. Walk listing pages until a cap, exhaustion or an interrupt
/// 4. Save the final checkpoint
///
/// # Example
///
/// ```no_run
/// use fiction_harvest::config::Config;
/// use fiction_harvest::crawler::{run_crawl, ShutdownSignal};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(&Config::default(), ShutdownSignal::new()).await?;
/// println!("stopped at page {}", report.next_page);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    shutdown: ShutdownSignal,
) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::from_config(config, shutdown)?;
    coordinator.run().await
}
