//! Integration tests for the refresh pass

use crate::support::{detail_html, TestSite, TripwireParser};
use fiction_harvest::checkpoint::RefreshCheckpointStore;
use fiction_harvest::crawler::{RateLimiter, Refresher, ShutdownSignal};
use fiction_harvest::record::FictionRecord;
use fiction_harvest::storage::{Repository, SqliteRepository};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn seeded_repository(site: &TestSite, ids: &[u64]) -> SqliteRepository {
    let mut repo = site.open_repository();
    let records: Vec<FictionRecord> = ids
        .iter()
        .map(|id| FictionRecord {
            title: Some(format!("Old {}", id)),
            ..FictionRecord::new(*id)
        })
        .collect();
    repo.upsert_batch(&records).unwrap();
    repo
}

fn refresh_store(site: &TestSite) -> RefreshCheckpointStore {
    RefreshCheckpointStore::new(&site.config.output.refresh_checkpoint_path)
}

async fn mount_refresh_detail(site: &TestSite, id: u64, title: &str, hits: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/fiction/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(title, Some("9"))))
        .expect(hits)
        .mount(&site.server)
        .await;
}

#[tokio::test]
async fn test_refresh_updates_stored_fictions() {
    let mut site = TestSite::start().await;
    site.config.crawler.refresh_batch_size = 2;
    let repo = seeded_repository(&site, &[10, 20, 30]);

    mount_refresh_detail(&site, 10, "New 10", 1).await;
    Mock::given(method("GET"))
        .and(path("/fiction/20"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&site.server)
        .await;
    mount_refresh_detail(&site, 30, "New 30", 1).await;

    let mut refresher = Refresher::new(
        &site.config,
        site.fetcher(),
        site.html_parser(),
        repo,
        refresh_store(&site),
        ShutdownSignal::new(),
    )
    .with_rate_limiter(RateLimiter::disabled());

    let report = refresher.run().await.unwrap();
    assert_eq!(report.updated, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.last_processed_id, 30);
    assert!(!report.interrupted);

    let repo = refresher.into_repository();
    let ten = repo.get_fiction(10).unwrap().unwrap();
    assert_eq!(ten.title.as_deref(), Some("New 10"));
    assert_eq!(ten.views, Some(9));
    let twenty = repo.get_fiction(20).unwrap().unwrap();
    assert_eq!(twenty.title.as_deref(), Some("Old 20"));

    assert_eq!(refresh_store(&site).load().last_processed_id, 30);
}

#[tokio::test]
async fn test_refresh_resumes_after_saved_cursor() {
    let site = TestSite::start().await;
    let repo = seeded_repository(&site, &[10, 20, 30]);
    refresh_store(&site).save(20).unwrap();

    mount_refresh_detail(&site, 10, "New 10", 0).await;
    mount_refresh_detail(&site, 20, "New 20", 0).await;
    mount_refresh_detail(&site, 30, "New 30", 1).await;

    let mut refresher = Refresher::new(
        &site.config,
        site.fetcher(),
        site.html_parser(),
        repo,
        refresh_store(&site),
        ShutdownSignal::new(),
    )
    .with_rate_limiter(RateLimiter::disabled());

    let report = refresher.run().await.unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.last_processed_id, 30);
}

#[tokio::test]
async fn test_refresh_stops_on_shutdown() {
    let site = TestSite::start().await;
    let repo = seeded_repository(&site, &[10, 20, 30]);

    mount_refresh_detail(&site, 10, "New 10", 1).await;
    mount_refresh_detail(&site, 20, "New 20", 0).await;
    mount_refresh_detail(&site, 30, "New 30", 0).await;

    let shutdown = ShutdownSignal::new();
    let parser = TripwireParser::new(site.html_parser(), shutdown.clone());
    let mut refresher = Refresher::new(
        &site.config,
        site.fetcher(),
        parser,
        repo,
        refresh_store(&site),
        shutdown,
    )
    .with_rate_limiter(RateLimiter::disabled());

    let report = refresher.run().await.unwrap();
    assert!(report.interrupted);
    assert_eq!(report.updated, 1);
    assert_eq!(report.last_processed_id, 10);
    assert_eq!(refresh_store(&site).load().last_processed_id, 10);

    let repo = refresher.into_repository();
    assert_eq!(
        repo.get_fiction(10).unwrap().unwrap().title.as_deref(),
        Some("New 10")
    );
}
