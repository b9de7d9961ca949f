//! Shared fixtures: mock site pages, configuration and parser wrappers

use fiction_harvest::checkpoint::CheckpointStore;
use fiction_harvest::config::Config;
use fiction_harvest::crawler::{
    Coordinator, HtmlPageParser, PageFetcher, PageParser, RateLimiter, ShutdownSignal,
};
use fiction_harvest::record::DetailFields;
use fiction_harvest::storage::{Repository, SqliteRepository};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server, with no delays
pub fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let mut config = Config::default();
    config.site.base_url = base_url.to_string();
    config.crawler.page_delay_secs = 0.0;
    config.crawler.page_jitter_secs = 0.0;
    config.crawler.fiction_delay_secs = 0.0;
    config.crawler.fiction_jitter_secs = 0.0;
    config.crawler.max_pages = 10;
    config.crawler.max_novels = 1000;
    config.crawler.timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.contact_email = "test@example.com".to_string();
    config.output.database_path = dir.join("fictions.db").display().to_string();
    config.output.checkpoint_path = dir.join("checkpoint.json").display().to_string();
    config.output.refresh_checkpoint_path = dir.join("refresh.json").display().to_string();
    config
}

/// Mock site plus a scratch directory for the database and checkpoints
pub struct TestSite {
    pub server: MockServer,
    pub dir: TempDir,
    pub config: Config,
}

impl TestSite {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = create_test_config(&server.uri(), dir.path());
        Self {
            server,
            dir,
            config,
        }
    }

    pub fn checkpoint_path(&self) -> &Path {
        Path::new(&self.config.output.checkpoint_path)
    }

    pub fn checkpoints(&self) -> CheckpointStore {
        CheckpointStore::open(self.checkpoint_path())
    }

    pub fn open_repository(&self) -> SqliteRepository {
        SqliteRepository::new(Path::new(&self.config.output.database_path))
            .expect("Failed to open database")
    }

    pub fn fetcher(&self) -> PageFetcher {
        PageFetcher::from_config(&self.config).expect("Failed to build fetcher")
    }

    pub fn html_parser(&self) -> HtmlPageParser {
        HtmlPageParser::new(
            Url::parse(&self.server.uri()).unwrap(),
            &self.config.site.detail_path,
        )
    }

    /// Builds a coordinator with the given parser and repository
    pub fn coordinator<R: Repository, P: PageParser>(
        &self,
        parser: P,
        repository: R,
        shutdown: ShutdownSignal,
    ) -> Coordinator<R, P> {
        Coordinator::new(
            &self.config,
            self.fetcher(),
            parser,
            repository,
            self.checkpoints(),
            shutdown,
        )
        .with_rate_limiters(RateLimiter::disabled(), RateLimiter::disabled())
    }

    /// Serves listing page `page` with links to `ids`, expecting `hits` requests
    pub async fn mount_listing(&self, page: u32, ids: &[u64], hits: u64) {
        Mock::given(method("GET"))
            .and(path("/fictions/best-rated"))
            .and(query_param("page", page.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(ids)))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    /// Serves the detail page of `id`, expecting `hits` requests
    pub async fn mount_detail(&self, id: u64, html: String, hits: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/fiction/{}/story-{}", id, id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .expect(hits)
            .mount(&self.server)
            .await;
    }

    /// Makes the detail page of `id` answer with `status`
    pub async fn mount_detail_status(&self, id: u64, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/fiction/{}/story-{}", id, id)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

/// Listing page markup with one ranked entry per identifier
pub fn listing_html(ids: &[u64]) -> String {
    let entries: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="fiction-list-item">
                    <h2 class="fiction-title"><a href="/fiction/{id}/story-{id}">Story {id}</a></h2>
                </div>"#,
                id = id
            )
        })
        .collect();

    format!(
        r#"<html><body><div class="fiction-list">{}</div></body></html>"#,
        entries
    )
}

/// Detail page markup with a title and an optional total view count
pub fn detail_html(title: &str, views: Option<&str>) -> String {
    format!(
        r#"<html>
        <head><meta property="books:rating:value" content="4.5"></head>
        <body>
            <h1 class="font-white">{title}</h1>
            <div class="fiction-info"><span class="label">ONGOING</span></div>
            <div class="stats-content"><ul class="list-unstyled">
                <li>Total Views :</li><li>{views}</li>
                <li>Followers :</li><li>12</li>
            </ul></div>
        </body>
        </html>"#,
        title = title,
        views = views.unwrap_or("")
    )
}

/// Parser wrapper that requests shutdown while parsing the first detail page
pub struct TripwireParser {
    pub inner: HtmlPageParser,
    pub shutdown: ShutdownSignal,
    pub calls: Arc<AtomicUsize>,
}

impl TripwireParser {
    pub fn new(inner: HtmlPageParser, shutdown: ShutdownSignal) -> Self {
        Self {
            inner,
            shutdown,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PageParser for TripwireParser {
    fn extract_listing_links(&self, html: &str) -> Vec<Url> {
        self.inner.extract_listing_links(html)
    }

    fn extract_detail_fields(&self, html: &str) -> DetailFields {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.shutdown.request();
        }
        self.inner.extract_detail_fields(html)
    }
}
