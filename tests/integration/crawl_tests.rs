//! Integration tests for the indexer
//!
//! These tests use wiremock to create mock HTTP servers and run full
//! indexing cycles end-to-end against a temporary SQLite database.

use site_indexer::api::{ApiResponse, IndexingApi};
use site_indexer::config::{
    load_config, Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use site_indexer::crawler::{HttpFetcher, Orchestrator, STOPPED_BY_USER};
use site_indexer::state::SiteStatus;
use site_indexer::storage::{PageRecord, PageStore, SiteRecord, SiteStore, SqliteStorage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for the given sites
fn create_test_config(sites: Vec<SiteConfig>, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_fetches: 4,
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.display().to_string(),
        },
        sites,
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(
            format!("<html><body>{}</body></html>", body),
            "text/html; charset=utf-8",
        )
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Builds an orchestrator over a fresh database in `dir`
fn orchestrator(sites: Vec<SiteConfig>, dir: &TempDir) -> (Orchestrator, Arc<SqliteStorage>) {
    let config = create_test_config(sites, &dir.path().join("index.db"));
    let storage = Arc::new(
        SqliteStorage::new(Path::new(&config.output.database_path))
            .expect("Failed to open database"),
    );
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)
        .expect("Failed to build HTTP client");
    let orchestrator = Orchestrator::new(&config, storage.clone(), Arc::new(fetcher));
    (orchestrator, storage)
}

async fn run_to_completion(orchestrator: &Orchestrator) {
    orchestrator.start().expect("Failed to start indexing");
    tokio::time::timeout(Duration::from_secs(30), orchestrator.wait_until_idle())
        .await
        .expect("Indexing did not finish");
    assert!(!orchestrator.status());
}

fn site(storage: &SqliteStorage, url: &str) -> SiteRecord {
    storage
        .find_site_by_url(url)
        .expect("Failed to query site")
        .unwrap_or_else(|| panic!("No site row for {}", url))
}

fn pages(storage: &SqliteStorage, site_id: i64) -> Vec<PageRecord> {
    let mut pages = storage
        .find_pages_by_site(site_id)
        .expect("Failed to query pages");
    pages.sort_by(|a, b| a.path.cmp(&b.path));
    pages
}

async fn mount_a_test_graph(server: &MockServer) {
    let external = r#"<a href="https://other.example/x">External</a>"#;
    mount(
        server,
        "/",
        html(&format!(r#"<a href="/b">B</a> <a href="/c">C</a> {}"#, external)),
    )
    .await;
    mount(server, "/b", html(r#"<a href="/c">C</a> <a href="/">Home</a>"#)).await;

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(html(r#"<a href="/b/">B</a>"#))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_index_single_site() {
    let server = MockServer::start().await;
    mount_a_test_graph(&server).await;
    let dir = TempDir::new().unwrap();

    let (orchestrator, storage) =
        orchestrator(vec![SiteConfig::new(server.uri(), "Mock")], &dir);
    run_to_completion(&orchestrator).await;

    let record = site(&storage, &server.uri());
    assert_eq!(record.status, SiteStatus::Indexed);
    assert_eq!(record.name, "Mock");
    assert_eq!(record.last_error, None);

    let pages = pages(&storage, record.id);
    let paths: Vec<_> = pages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/", "/b", "/c"]);
    assert!(pages.iter().all(|p| p.code == 200));
    assert!(pages[0].content.contains(r#"href="/b""#));
}

#[tokio::test]
async fn test_reindex_replaces_previous_run() {
    let server = MockServer::start().await;
    mount(&server, "/", html(r#"<a href="/b">B</a>"#)).await;
    mount(&server, "/b", html("leaf")).await;
    let dir = TempDir::new().unwrap();

    let (orchestrator, storage) =
        orchestrator(vec![SiteConfig::new(server.uri(), "Mock")], &dir);

    run_to_completion(&orchestrator).await;
    let first = site(&storage, &server.uri());

    run_to_completion(&orchestrator).await;
    let second = site(&storage, &server.uri());

    assert_ne!(first.id, second.id);
    assert_eq!(storage.list_sites().unwrap().len(), 1);
    assert_eq!(second.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(first.id).unwrap(), 0);
    assert_eq!(storage.count_pages_by_site(second.id).unwrap(), 2);
}

#[tokio::test]
async fn test_content_types_and_failures() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(
            r#"<a href="/logo.png">Logo</a>
               <a href="/data.json">Data</a>
               <a href="/missing">Missing</a>
               <a href="/blob">Blob</a>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/logo.png",
        ResponseTemplate::new(200)
            .set_body_bytes(vec![0u8; 16])
            .insert_header("content-type", "image/png"),
    )
    .await;
    mount(
        &server,
        "/data.json",
        ResponseTemplate::new(200)
            .set_body_raw(r#"{"href":"/hidden"}"#, "application/json"),
    )
    .await;
    mount(&server, "/missing", ResponseTemplate::new(404)).await;
    mount(
        &server,
        "/blob",
        ResponseTemplate::new(200)
            .set_body_bytes(b"<a href=\"/hidden\">x</a>".to_vec())
            .insert_header("content-type", "application/x-custom"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html("never reached"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let (orchestrator, storage) =
        orchestrator(vec![SiteConfig::new(server.uri(), "Mock")], &dir);
    run_to_completion(&orchestrator).await;

    let record = site(&storage, &server.uri());
    assert_eq!(record.status, SiteStatus::Indexed);

    let pages = pages(&storage, record.id);
    let find = |p: &str| {
        pages
            .iter()
            .find(|page| page.path == p)
            .unwrap_or_else(|| panic!("No page row for {}", p))
    };
    assert_eq!(pages.len(), 5);
    assert_eq!(find("/logo.png").content, "[asset image/png, 16 bytes]");
    assert_eq!(find("/data.json").content, r#"{"href":"/hidden"}"#);
    assert_eq!(find("/missing").code, 404);
    assert_eq!(find("/missing").content, "HTTP 404 Not Found");
    assert_eq!(
        find("/blob").content,
        "[unsupported content type: application/x-custom]"
    );
}

#[tokio::test]
async fn test_redirect_resolves_links_against_final_url() {
    let server = MockServer::start().await;
    mount(&server, "/", html(r#"<a href="/old/">Old</a>"#)).await;
    mount(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/docs/new"),
    )
    .await;
    mount(&server, "/docs/new", html(r#"<a href="next">Next</a>"#)).await;
    mount(&server, "/docs/next", html("end")).await;
    let dir = TempDir::new().unwrap();

    let (orchestrator, storage) =
        orchestrator(vec![SiteConfig::new(server.uri(), "Mock")], &dir);
    run_to_completion(&orchestrator).await;

    let record = site(&storage, &server.uri());
    let paths: Vec<_> = pages(&storage, record.id)
        .into_iter()
        .map(|p| p.path)
        .collect();
    assert_eq!(paths, vec!["/", "/docs/next", "/old"]);
}

#[tokio::test]
async fn test_sites_under_one_host_stay_in_their_roots() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/docs",
        html(r#"<a href="/docs/intro">Intro</a> <a href="/blog/post">Post</a>"#),
    )
    .await;
    mount(&server, "/docs/intro", html(r#"<a href="/docs-old">Old</a>"#)).await;
    mount(&server, "/blog", html(r#"<a href="/blog/post">Post</a>"#)).await;
    mount(&server, "/blog/post", html("post")).await;
    Mock::given(method("GET"))
        .and(path("/docs-old"))
        .respond_with(html("old"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let docs_url = format!("{}/docs", server.uri());
    let blog_url = format!("{}/blog/", server.uri());
    let (orchestrator, storage) = orchestrator(
        vec![
            SiteConfig::new(&docs_url, "Docs"),
            SiteConfig::new(&blog_url, "Blog"),
        ],
        &dir,
    );
    run_to_completion(&orchestrator).await;

    let docs = site(&storage, &docs_url);
    let blog = site(&storage, &format!("{}/blog", server.uri()));
    assert_eq!(docs.status, SiteStatus::Indexed);
    assert_eq!(blog.status, SiteStatus::Indexed);

    let docs_paths: Vec<_> = pages(&storage, docs.id).into_iter().map(|p| p.path).collect();
    assert_eq!(docs_paths, vec!["/", "/intro"]);
    let blog_paths: Vec<_> = pages(&storage, blog.id).into_iter().map(|p| p.path).collect();
    assert_eq!(blog_paths, vec!["/", "/post"]);
}

#[tokio::test]
async fn test_unreachable_site_still_indexed_with_failure_row() {
    let dir = TempDir::new().unwrap();
    // Nothing listens on port 9 of localhost
    let (orchestrator, storage) =
        orchestrator(vec![SiteConfig::new("http://127.0.0.1:9", "Down")], &dir);
    run_to_completion(&orchestrator).await;

    let record = site(&storage, "http://127.0.0.1:9");
    assert_eq!(record.status, SiteStatus::Indexed);

    let pages = pages(&storage, record.id);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].path, "/");
    assert_eq!(pages[0].code, 500);
    assert!(pages[0].content.starts_with("failed to load page"));
}

#[tokio::test]
async fn test_stop_through_api_fails_site() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        html(r#"<a href="/b">B</a>"#).set_delay(Duration::from_millis(500)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("b"))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let (orchestrator, storage) =
        orchestrator(vec![SiteConfig::new(server.uri(), "Mock")], &dir);
    let api = IndexingApi::new(orchestrator.clone());

    assert_eq!(api.start_indexing(), ApiResponse::ok());
    assert_eq!(
        api.start_indexing(),
        ApiResponse::error("indexing already running")
    );

    // Wait for the site row to appear
    let mut waited = Duration::ZERO;
    while storage.find_site_by_url(&server.uri()).unwrap().is_none() {
        assert!(waited < Duration::from_secs(5), "site row never created");
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
    assert!(api.indexing_status().indexing);

    assert_eq!(api.stop_indexing(), ApiResponse::ok());
    assert!(!api.indexing_status().indexing);
    assert_eq!(
        api.stop_indexing(),
        ApiResponse::error("indexing is not running")
    );

    let record = site(&storage, &server.uri());
    assert_eq!(record.status, SiteStatus::Failed);
    assert_eq!(record.last_error.as_deref(), Some(STOPPED_BY_USER));

    tokio::time::timeout(Duration::from_secs(10), orchestrator.wait_until_idle())
        .await
        .expect("Stopped run did not drain");

    // The in-flight root fetch is kept; its children are never dispatched
    let record = site(&storage, &server.uri());
    assert_eq!(record.status, SiteStatus::Failed);
    let paths: Vec<_> = pages(&storage, record.id).into_iter().map(|p| p.path).collect();
    assert_eq!(paths, vec!["/"]);
}

#[tokio::test]
async fn test_index_from_config_file() {
    let server = MockServer::start().await;
    mount(&server, "/", html(r#"<a href="/about">About</a>"#)).await;
    mount(&server, "/about", html("about")).await;
    let dir = TempDir::new().unwrap();

    let db_path = dir.path().join("index.db");
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
max-pages-per-site = 10
max-concurrent-fetches = 2

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0"
contact-url = "https://example.com/bot"
contact-email = "bot@example.com"

[output]
database-path = "{}"

[[sites]]
url = "{}/"
name = "Mock"
"#,
            db_path.display(),
            server.uri()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).expect("Failed to load config");
    let storage = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler).unwrap();
    let orchestrator = Orchestrator::new(&config, storage.clone(), Arc::new(fetcher));
    run_to_completion(&orchestrator).await;

    let record = site(&storage, &server.uri());
    assert_eq!(record.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(record.id).unwrap(), 2);
}
