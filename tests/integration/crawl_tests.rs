//! Integration tests for the listing crawl
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! coordinator end-to-end against a real SQLite database.

use crate::support::{detail_html, TestSite, TripwireParser};
use fiction_harvest::checkpoint::Checkpoint;
use fiction_harvest::crawler::ShutdownSignal;
use fiction_harvest::record::FictionRecord;
use fiction_harvest::storage::{Repository, StorageError, StorageResult};
use fiction_harvest::{CrawlState, HarvestError, StopReason};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_two_link_page_end_to_end() {
    let site = TestSite::start().await;

    site.mount_listing(1, &[101, 102], 1).await;
    site.mount_listing(2, &[], 1).await;
    site.mount_detail(101, detail_html("First Story", Some("1,000")), 1)
        .await;
    site.mount_detail(102, detail_html("Second Story", None), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.state, CrawlState::Stopped(StopReason::Exhausted));
    assert_eq!(report.ingested_this_run, 2);
    assert_eq!(report.total_scraped, 2);
    assert_eq!(report.next_page, 2);

    let repo = coordinator.into_repository();
    assert_eq!(repo.count_fictions().unwrap(), 2);

    let first = repo.get_fiction(101).unwrap().expect("fiction 101 missing");
    assert_eq!(first.title.as_deref(), Some("First Story"));
    assert_eq!(first.views, Some(1000));
    assert_eq!(first.followers, Some(12));
    assert_eq!(first.avg_rating, Some(4.5));
    assert_eq!(first.status.as_deref(), Some("Ongoing"));

    let second = repo.get_fiction(102).unwrap().expect("fiction 102 missing");
    assert_eq!(second.views, None);
    assert!(second.ingested_at >= first.ingested_at);

    let checkpoint = site.checkpoints().current().clone();
    assert_eq!(checkpoint.current_page, 2);
    assert_eq!(checkpoint.total_scraped, 2);
    assert_eq!(checkpoint.last_fiction_id, Some(102));
    assert!(checkpoint.timestamp.is_some());
}

#[tokio::test]
async fn test_empty_listing_stops_without_writes() {
    let site = TestSite::start().await;
    site.mount_listing(1, &[], 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.state, CrawlState::Stopped(StopReason::Exhausted));
    assert_eq!(coordinator.repository().count_fictions().unwrap(), 0);
    assert!(!site.checkpoint_path().exists());

    let checkpoint = site.checkpoints().current().clone();
    assert_eq!(checkpoint.current_page, 1);
    assert_eq!(checkpoint.total_scraped, 0);
}

#[tokio::test]
async fn test_resumes_from_saved_page() {
    let site = TestSite::start().await;
    site.checkpoints()
        .overwrite(Checkpoint {
            current_page: 3,
            total_scraped: 40,
            last_fiction_id: Some(299),
            timestamp: None,
        })
        .unwrap();

    site.mount_listing(1, &[1], 0).await;
    site.mount_listing(3, &[301], 1).await;
    site.mount_listing(4, &[], 1).await;
    site.mount_detail(301, detail_html("Resumed", Some("5")), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.total_scraped, 41);
    assert_eq!(report.ingested_this_run, 1);
    assert_eq!(site.checkpoints().current().current_page, 4);
    assert_eq!(site.checkpoints().current().last_fiction_id, Some(301));
}

#[tokio::test]
async fn test_shutdown_mid_page_commits_collected_items() {
    let site = TestSite::start().await;

    site.mount_listing(1, &[1, 2, 3], 1).await;
    site.mount_listing(2, &[4], 0).await;
    site.mount_detail(1, detail_html("One", Some("10")), 1).await;
    site.mount_detail(2, detail_html("Two", Some("20")), 0).await;
    site.mount_detail(3, detail_html("Three", Some("30")), 0).await;

    let shutdown = ShutdownSignal::new();
    let parser = TripwireParser::new(site.html_parser(), shutdown.clone());
    let mut coordinator = site.coordinator(parser, site.open_repository(), shutdown);

    let report = coordinator.run().await.unwrap();

    assert_eq!(report.state, CrawlState::Paused);
    assert_eq!(report.next_page, 2);
    assert_eq!(coordinator.state(), CrawlState::Paused);

    let repo = coordinator.into_repository();
    assert_eq!(repo.count_fictions().unwrap(), 1);
    assert!(repo.get_fiction(1).unwrap().is_some());

    let checkpoint = site.checkpoints().current().clone();
    assert_eq!(checkpoint.current_page, 2);
    assert_eq!(checkpoint.total_scraped, 1);
    assert_eq!(checkpoint.last_fiction_id, Some(1));
}

#[tokio::test]
async fn test_rerun_after_lost_checkpoint_does_not_duplicate() {
    let site = TestSite::start().await;

    site.mount_listing(1, &[1, 2], 2).await;
    site.mount_listing(2, &[], 2).await;
    site.mount_detail(1, detail_html("One", Some("1")), 2).await;
    site.mount_detail(2, detail_html("Two", Some("2")), 2).await;

    let mut first_run =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    first_run.run().await.unwrap();
    let repo = first_run.into_repository();
    assert_eq!(repo.count_fictions().unwrap(), 2);

    // Simulate a crash between the upsert and the checkpoint write
    site.checkpoints()
        .overwrite(Checkpoint::default())
        .unwrap();

    let mut second_run = site.coordinator(site.html_parser(), repo, ShutdownSignal::new());
    let report = second_run.run().await.unwrap();

    assert_eq!(report.ingested_this_run, 2);
    assert_eq!(second_run.repository().count_fictions().unwrap(), 2);
}

/// Repository whose every write fails
struct FailingRepository;

impl Repository for FailingRepository {
    fn upsert_batch(&mut self, _records: &[FictionRecord]) -> StorageResult<()> {
        Err(StorageError::ValueOutOfRange("disk full".to_string()))
    }

    fn get_fiction(&self, _fiction_id: u64) -> StorageResult<Option<FictionRecord>> {
        Ok(None)
    }

    fn count_fictions(&self) -> StorageResult<u64> {
        Ok(0)
    }

    fn ids_after(&self, _after_id: u64, _limit: usize) -> StorageResult<Vec<u64>> {
        Ok(Vec::new())
    }

    fn count_by_status(&self) -> StorageResult<Vec<(Option<String>, u64)>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_repository_failure_fails_crawl_and_keeps_checkpoint() {
    let site = TestSite::start().await;
    site.checkpoints()
        .overwrite(Checkpoint {
            current_page: 5,
            total_scraped: 80,
            last_fiction_id: Some(7),
            timestamp: None,
        })
        .unwrap();

    site.mount_listing(5, &[11], 1).await;
    site.mount_listing(6, &[12], 0).await;
    site.mount_detail(11, detail_html("Eleven", None), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), FailingRepository, ShutdownSignal::new());
    let result = coordinator.run().await;

    assert!(matches!(result, Err(HarvestError::Storage(_))));
    assert_eq!(coordinator.state(), CrawlState::Failed);

    let checkpoint = site.checkpoints().current().clone();
    assert_eq!(checkpoint.current_page, 5);
    assert_eq!(checkpoint.total_scraped, 80);
    assert_eq!(checkpoint.last_fiction_id, Some(7));
}

#[tokio::test]
async fn test_listing_error_moves_on_to_next_page() {
    let site = TestSite::start().await;

    Mock::given(method("GET"))
        .and(path("/fictions/best-rated"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&site.server)
        .await;
    site.mount_listing(2, &[5], 1).await;
    site.mount_listing(3, &[], 1).await;
    site.mount_detail(5, detail_html("Five", Some("50")), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.failed_pages, vec![1]);
    assert_eq!(report.total_scraped, 1);
    assert_eq!(report.next_page, 3);
    assert_eq!(site.checkpoints().current().current_page, 3);
}

#[tokio::test]
async fn test_failed_detail_is_skipped() {
    let site = TestSite::start().await;

    site.mount_listing(1, &[1, 2], 1).await;
    site.mount_listing(2, &[], 1).await;
    site.mount_detail_status(1, 404).await;
    site.mount_detail(2, detail_html("Two", Some("2")), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.failed_items, 1);
    assert_eq!(report.total_scraped, 1);

    let repo = coordinator.into_repository();
    assert!(repo.get_fiction(1).unwrap().is_none());
    assert!(repo.get_fiction(2).unwrap().is_some());
    assert_eq!(site.checkpoints().current().last_fiction_id, Some(2));
}

#[tokio::test]
async fn test_novel_cap_stops_mid_page() {
    let mut site = TestSite::start().await;
    site.config.crawler.max_novels = 2;

    site.mount_listing(1, &[1, 2, 3], 1).await;
    site.mount_detail(1, detail_html("One", None), 1).await;
    site.mount_detail(2, detail_html("Two", None), 1).await;
    site.mount_detail(3, detail_html("Three", None), 0).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(
        report.state,
        CrawlState::Stopped(StopReason::NovelCapReached)
    );
    assert_eq!(report.total_scraped, 2);
    assert_eq!(site.checkpoints().current().current_page, 2);
}

#[tokio::test]
async fn test_page_cap_stops_after_last_page() {
    let mut site = TestSite::start().await;
    site.config.crawler.max_pages = 1;

    site.mount_listing(1, &[1], 1).await;
    site.mount_listing(2, &[2], 0).await;
    site.mount_detail(1, detail_html("One", None), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(
        report.state,
        CrawlState::Stopped(StopReason::PageCapReached)
    );
    assert_eq!(report.next_page, 2);
    assert_eq!(report.total_scraped, 1);
}

#[tokio::test]
async fn test_page_with_only_failures_advances_cursor() {
    let site = TestSite::start().await;

    site.mount_listing(1, &[1], 1).await;
    site.mount_listing(2, &[7], 1).await;
    site.mount_listing(3, &[], 1).await;
    site.mount_detail_status(1, 503).await;
    site.mount_detail(7, detail_html("Seven", Some("7")), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.failed_items, 1);
    assert_eq!(report.pages_processed, 1);
    assert_eq!(report.total_scraped, 1);
    assert_eq!(site.checkpoints().current().current_page, 3);
}

#[tokio::test]
async fn test_out_of_range_identifier_is_skipped() {
    let site = TestSite::start().await;
    let oversized = i64::MAX as u64 + 1;

    site.mount_listing(1, &[1, oversized], 1).await;
    site.mount_listing(2, &[], 1).await;
    site.mount_detail(1, detail_html("One", Some("1")), 1).await;
    site.mount_detail(oversized, detail_html("Too Big", None), 0)
        .await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.state, CrawlState::Stopped(StopReason::Exhausted));
    assert_eq!(report.failed_items, 1);
    assert_eq!(report.total_scraped, 1);

    let repo = coordinator.into_repository();
    assert_eq!(repo.count_fictions().unwrap(), 1);
    assert!(repo.get_fiction(1).unwrap().is_some());

    let checkpoint = site.checkpoints().current().clone();
    assert_eq!(checkpoint.current_page, 2);
    assert_eq!(checkpoint.last_fiction_id, Some(1));
}

#[tokio::test]
async fn test_checkpoint_write_failure_does_not_stop_crawl() {
    let site = TestSite::start().await;
    // A directory at the checkpoint path makes every save fail
    std::fs::create_dir(site.checkpoint_path()).unwrap();

    site.mount_listing(1, &[1], 1).await;
    site.mount_listing(2, &[2], 1).await;
    site.mount_listing(3, &[], 1).await;
    site.mount_detail(1, detail_html("One", Some("1")), 1).await;
    site.mount_detail(2, detail_html("Two", Some("2")), 1).await;

    let mut coordinator =
        site.coordinator(site.html_parser(), site.open_repository(), ShutdownSignal::new());
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.state, CrawlState::Stopped(StopReason::Exhausted));
    assert_eq!(report.total_scraped, 2);
    assert_eq!(report.pages_processed, 2);
    assert_eq!(report.next_page, 3);

    let in_memory = coordinator.checkpoints().current().clone();
    assert_eq!(in_memory.current_page, 3);
    assert_eq!(in_memory.total_scraped, 2);
    assert_eq!(in_memory.last_fiction_id, Some(2));

    assert_eq!(coordinator.repository().count_fictions().unwrap(), 2);
    assert!(site.checkpoint_path().is_dir());
}
