//! Integration tests for the crawler
//!
//! These tests use wiremock to stand up a mock storefront and run the full
//! pipeline end-to-end through the real HTTP transport.

use catalog_harvest::config::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, SeedConfig, UserAgentConfig,
};
use catalog_harvest::crawler::Coordinator;
use catalog_harvest::storage::{
    ListingLedger, ProductStore, RecordStore, StorageError, StorageResult,
};
use catalog_harvest::{ConfigError, Field, FieldMap, HarvestError};
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing all state under `dir`
fn create_test_config(base_url: &str, seed: SeedConfig, dir: &Path) -> Config {
    let out = |name: &str| dir.join(name).display().to_string();
    Config {
        crawler: CrawlerConfig {
            base_url: base_url.to_string(),
            launch_spacing_ms: 0,
            page_size: 2,
            request_timeout_secs: 5,
            connect_timeout_secs: 5,
            reuse_discovered_listings: true,
        },
        seed,
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        extraction: ExtractionConfig::default(),
        output: OutputConfig {
            accumulator_path: out("products.jsonl"),
            listing_ledger_path: out("listing_pages.jsonl"),
            listing_frontier_path: out("listing_urls.txt"),
            dataset_path: out("products.csv"),
        },
    }
}

fn page_range(base_url: &str, last_page: u32) -> SeedConfig {
    SeedConfig::PageRange {
        listing_url: format!("{}/c/all", base_url),
        first_page: 1,
        last_page,
    }
}

/// Listing page embedding the given `(id, slug)` pairs the way the storefront does
fn listing_page(items: &[(&str, &str)]) -> String {
    let products: Vec<String> = items
        .iter()
        .map(|(id, slug)| {
            format!(
                r#"{{"mainVariant":{{"id":"{}","name":"x","slug":"{}"}},"price":1}}"#,
                id, slug
            )
        })
        .collect();
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{{"props":{{"items":[{}]}}}}</script></body></html>"#,
        products.join(",")
    )
}

fn category_page(total: u64) -> String {
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{{"props":{{"initialProps":{{"pageProps":{{"initialProductData":{{"total":{}}}}}}}}}}}</script></body></html>"#,
        total
    )
}

fn product_page(name: &str, description: &str) -> String {
    format!(
        r#"<html><body>
        <h1 data-testid="pdp-product-info-product-name">{}</h1>
        <div class="ProductDescription_description__4e5b7">{}</div>
        </body></html>"#,
        name, description
    )
}

async fn mount_listing(server: &MockServer, listing: &str, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(listing))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_product(server: &MockServer, slug: &str, id: &str, name: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/p/{}/{}/", slug, id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page(name, "Plain")))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts a two-page listing `/c/all` with three products
async fn mount_small_catalog(server: &MockServer, product_calls: u64) {
    mount_listing(
        server,
        "/c/all",
        "1",
        listing_page(&[("a1", "hand-soap"), ("b2", "paper-towels")]),
    )
    .await;
    mount_listing(server, "/c/all", "2", listing_page(&[("c3", "gloves")])).await;

    mount_product(server, "hand-soap", "a1", "Hand Soap", product_calls).await;
    mount_product(server, "paper-towels", "b2", "Paper Towels", product_calls).await;
    mount_product(server, "gloves", "c3", "Gloves", product_calls).await;
}

#[tokio::test]
async fn test_full_pipeline_page_range() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    mount_small_catalog(&server, 1).await;

    let config = create_test_config(&base_url, page_range(&base_url, 2), dir.path());
    let mut coordinator = Coordinator::new(config.clone()).unwrap();
    let state = coordinator.run().await.unwrap();

    assert_eq!(state.listings_discovered, 2);
    assert_eq!(state.listings_processed, 2);
    assert_eq!(state.items_discovered, 3);
    assert_eq!(state.items_processed, 3);
    assert_eq!(state.items_failed, 0);
    assert_eq!(state.records_materialized, 3);

    let products = ProductStore::open(&config.output.accumulator_path).unwrap();
    let url = format!("{}/p/hand-soap/a1/", base_url);
    let record = products.get(&url).unwrap();
    assert_eq!(record.get(Field::Name), Some("Hand Soap"));
    assert_eq!(record.get(Field::SupplierUrl), Some(url.as_str()));
    assert_eq!(record.get(Field::Supplier), Some("igefa Handelsgesellschaft"));
    assert_eq!(record.get(Field::Gtin), None);

    let ledger = ListingLedger::open(&config.output.listing_ledger_path).unwrap();
    assert_eq!(ledger.len(), 2);

    let mut reader = csv::Reader::from_path(&config.output.dataset_path).unwrap();
    assert_eq!(reader.headers().unwrap().len(), 12);
    assert_eq!(reader.records().count(), 3);
}

#[tokio::test]
async fn test_second_run_makes_no_duplicate_requests() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    // Each product page may be requested exactly once across both runs
    mount_small_catalog(&server, 1).await;

    let config = create_test_config(&base_url, page_range(&base_url, 2), dir.path());
    Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();
    let first = std::fs::read_to_string(&config.output.accumulator_path).unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();

    let state = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(state.listings_skipped, 2);
    assert_eq!(state.items_pending, 0);
    assert_eq!(state.items_processed, 0);
    assert_eq!(state.records_materialized, 3);
    assert_eq!(server.received_requests().await.unwrap().len(), requests_after_first);

    let second = std::fs::read_to_string(&config.output.accumulator_path).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_failing_item_is_isolated_and_retried_by_rerun() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    let items = [
        ("i1", "item-one"),
        ("i2", "item-two"),
        ("i3", "item-three"),
        ("i4", "item-four"),
        ("i5", "item-five"),
    ];
    mount_listing(&server, "/c/all", "1", listing_page(&items)).await;
    // The third item fails once, then serves normally
    Mock::given(method("GET"))
        .and(path("/p/item-three/i3/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    for (id, slug) in items {
        mount_product(&server, slug, id, slug, 1).await;
    }

    let config = create_test_config(&base_url, page_range(&base_url, 1), dir.path());
    let state = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(state.items_processed, 4);
    assert_eq!(state.items_failed, 1);
    let failed_url = format!("{}/p/item-three/i3/", base_url);
    {
        let products = ProductStore::open(&config.output.accumulator_path).unwrap();
        assert_eq!(products.len(), 4);
        assert!(!products.has(&failed_url));
    }

    // The next run only asks for the failed item
    let requests_after_first = server.received_requests().await.unwrap().len();
    let state = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(state.items_pending, 1);
    assert_eq!(state.items_processed, 1);
    assert_eq!(state.records_materialized, 5);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first + 1
    );
}

#[tokio::test]
async fn test_resume_skips_items_already_in_accumulator() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "/c/all",
        "1",
        listing_page(&[("a1", "hand-soap"), ("b2", "paper-towels")]),
    )
    .await;
    mount_product(&server, "hand-soap", "a1", "Hand Soap", 0).await;
    mount_product(&server, "paper-towels", "b2", "Paper Towels", 1).await;

    let config = create_test_config(&base_url, page_range(&base_url, 1), dir.path());
    let preloaded = format!(
        "{{\"url\":\"{}/p/hand-soap/a1/\",\"record\":{{\"Product Name\":\"Preloaded Soap\"}}}}\n",
        base_url
    );
    std::fs::write(&config.output.accumulator_path, preloaded).unwrap();

    let state = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(state.items_discovered, 2);
    assert_eq!(state.items_pending, 1);
    assert_eq!(state.records_materialized, 2);

    // The preloaded record keeps its content and its first position
    let mut reader = csv::Reader::from_path(&config.output.dataset_path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(&rows[0][0], "Preloaded Soap");
    assert_eq!(&rows[1][0], "Paper Towels");
}

#[tokio::test]
async fn test_categories_strategy_paginates_by_total() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    // Listing pages are mounted first so they win over the bare category mock
    mount_listing(&server, "/c/cleaning", "1", listing_page(&[("a1", "hand-soap")])).await;
    mount_listing(&server, "/c/cleaning", "2", listing_page(&[("b2", "paper-towels")])).await;
    Mock::given(method("GET"))
        .and(path("/c/cleaning"))
        .respond_with(ResponseTemplate::new(200).set_body_string(category_page(3)))
        .expect(1)
        .mount(&server)
        .await;
    mount_product(&server, "hand-soap", "a1", "Hand Soap", 1).await;
    mount_product(&server, "paper-towels", "b2", "Paper Towels", 1).await;

    let seed = SeedConfig::Categories {
        categories: vec![format!("{}/c/cleaning", base_url)],
    };
    let config = create_test_config(&base_url, seed, dir.path());
    let state = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    // ceil(3 / 2) = 2 listing pages
    assert_eq!(state.seeds, 1);
    assert_eq!(state.listings_discovered, 2);
    assert_eq!(state.items_processed, 2);

    let frontier = std::fs::read_to_string(&config.output.listing_frontier_path).unwrap();
    assert_eq!(frontier.lines().count(), 2);
    assert!(frontier.contains("/c/cleaning?page=2"));
}

#[tokio::test]
async fn test_sitemap_strategy() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url><loc>{base}/c/soap</loc></url>
          <url><loc>{base}/c/empty</loc></url>
        </urlset>"#,
        base = base_url
    );
    Mock::given(method("GET"))
        .and(path("/sitemap-taxonomies.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(&server)
        .await;

    mount_listing(&server, "/c/soap", "1", listing_page(&[("a1", "hand-soap")])).await;
    Mock::given(method("GET"))
        .and(path("/c/soap"))
        .respond_with(ResponseTemplate::new(200).set_body_string(category_page(1)))
        .mount(&server)
        .await;
    // A category without item count metadata contributes no pages
    Mock::given(method("GET"))
        .and(path("/c/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    mount_product(&server, "hand-soap", "a1", "Hand Soap", 1).await;

    let seed = SeedConfig::Sitemap {
        sitemap_url: format!("{}/sitemap-taxonomies.xml", base_url),
    };
    let config = create_test_config(&base_url, seed, dir.path());
    let state = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(state.seeds, 2);
    assert_eq!(state.listings_discovered, 1);
    assert_eq!(state.items_processed, 1);
}

#[tokio::test]
async fn test_empty_listing_page_is_not_recorded() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "/c/all", "1", listing_page(&[("a1", "hand-soap")])).await;
    mount_listing(&server, "/c/all", "2", listing_page(&[])).await;
    mount_product(&server, "hand-soap", "a1", "Hand Soap", 1).await;

    let config = create_test_config(&base_url, page_range(&base_url, 2), dir.path());
    let state = Coordinator::new(config.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(state.listings_processed, 1);
    assert_eq!(state.listings_failed, 1);

    let ledger = ListingLedger::open(&config.output.listing_ledger_path).unwrap();
    assert!(ledger.has(&format!("{}/c/all?page=1", base_url)));
    assert!(!ledger.has(&format!("{}/c/all?page=2", base_url)));
}

#[tokio::test]
async fn test_unwritable_output_path_fails_before_any_request() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();
    mount_small_catalog(&server, 0).await;

    let mut config = create_test_config(&base_url, page_range(&base_url, 2), dir.path());
    config.output.dataset_path = dir
        .path()
        .join("missing")
        .join("products.csv")
        .display()
        .to_string();

    let result = Coordinator::new(config.clone());

    assert!(matches!(
        result,
        Err(HarvestError::Config(ConfigError::UnwritablePath { .. }))
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!Path::new(&config.output.accumulator_path).exists());
}

/// Product journal that accepts `limit` records, then fails every write
/// the way a full disk would
struct DiskFullAfter {
    inner: ProductStore,
    limit: usize,
}

impl RecordStore<FieldMap> for DiskFullAfter {
    fn has(&self, url: &str) -> bool {
        self.inner.has(url)
    }

    fn get(&self, url: &str) -> Option<&FieldMap> {
        self.inner.get(url)
    }

    fn keys(&self) -> HashSet<String> {
        self.inner.keys()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn put(&mut self, url: &str, record: FieldMap) -> StorageResult<()> {
        if self.inner.len() >= self.limit {
            return Err(StorageError::File {
                path: self.inner.path().display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
            });
        }
        self.inner.put(url, record)
    }

    fn materialize(&self) -> Vec<FieldMap> {
        self.inner.materialize()
    }
}

#[tokio::test]
async fn test_storage_failure_aborts_run_and_keeps_earlier_records() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    let items = [
        ("a1", "hand-soap", "Hand Soap"),
        ("b2", "paper-towels", "Paper Towels"),
        ("c3", "gloves", "Gloves"),
        ("d4", "mop", "Mop"),
    ];
    let listed: Vec<(&str, &str)> = items.iter().map(|(id, slug, _)| (*id, *slug)).collect();
    mount_listing(&server, "/c/all", "1", listing_page(&listed)).await;
    for (id, slug, name) in items {
        Mock::given(method("GET"))
            .and(path(format!("/p/{}/{}/", slug, id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_page(name, "Plain")))
            .mount(&server)
            .await;
    }

    let config = create_test_config(&base_url, page_range(&base_url, 1), dir.path());
    let store = DiskFullAfter {
        inner: ProductStore::open(&config.output.accumulator_path).unwrap(),
        limit: 2,
    };
    let mut coordinator = Coordinator::new(config.clone())
        .unwrap()
        .with_product_store(store);

    let result = coordinator.run().await;
    assert!(matches!(
        result,
        Err(HarvestError::Storage(StorageError::File { .. }))
    ));

    // Records written before the failure survive a reopen
    let products = ProductStore::open(&config.output.accumulator_path).unwrap();
    assert_eq!(products.len(), 2);
    for record in products.materialize() {
        assert!(record.get(Field::Name).is_some());
    }

    // The run stopped before MATERIALIZE
    assert!(!Path::new(&config.output.dataset_path).exists());
}
