//! Integration tests for the concurrency coordinator
//!
//! A wiremock server stands in for customer pages; the coordinator drives
//! the real HTTP fetcher against it.

use customer_scout::config::{CoordinatorConfig, FetcherConfig};
use customer_scout::crawler::{Coordinator, Fetcher, HttpFetcher, TaskError};
use customer_scout::jobs::{ProgressEvent, ProgressSink};
use customer_scout::sources::fetch_page;
use customer_scout::state::{CandidateRecord, SourceKind};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SLOW_PAGE: usize = 7;

fn coordinator() -> Coordinator {
    Coordinator::new(&CoordinatorConfig {
        workers: 5,
        batch_size: 10,
        batch_delay_ms: 0,
        progress_every: 3,
        max_retries: 0,
        retry_backoff_ms: 10,
    })
}

/// Mounts ten customer pages, one of which answers too late
async fn customer_pages() -> MockServer {
    let mock_server = MockServer::start().await;

    for i in 0..10 {
        let body = format!(
            r#"<html><head><title>Customer {} | Acme</title></head>
            <body><a href="https://customer{}.com/">Customer {}</a></body></html>"#,
            i, i, i
        );
        let mut response = ResponseTemplate::new(200)
            .set_body_string(body)
            .insert_header("content-type", "text/html");
        if i == SLOW_PAGE {
            response = response.set_delay(Duration::from_secs(3));
        }

        Mock::given(method("GET"))
            .and(path(format!("/customers/{}", i)))
            .respond_with(response)
            .mount(&mock_server)
            .await;
    }

    mock_server
}

fn targets(base: &str) -> Vec<String> {
    (0..10).map(|i| format!("{}/customers/{}", base, i)).collect()
}

async fn run(
    server: &MockServer,
    max_results: usize,
    progress: &ProgressSink,
) -> customer_scout::crawler::TaskReport {
    let fetcher: Arc<dyn Fetcher> =
        Arc::new(HttpFetcher::new(&FetcherConfig::default()).expect("Failed to build fetcher"));

    coordinator()
        .run(
            SourceKind::VendorSite,
            targets(&server.uri()),
            max_results,
            progress,
            move |index, url| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let page = fetch_page(fetcher.as_ref(), &url, Duration::from_millis(500)).await?;
                    let name = page.parsed.title.clone().unwrap_or_default();
                    let name = name.split('|').next().unwrap_or_default().trim().to_string();
                    let link = page.parsed.links.first().map(|l| l.url.to_string());
                    Ok::<_, TaskError>(vec![CandidateRecord::new(
                        SourceKind::VendorSite,
                        "vendor_site",
                        name,
                        link,
                        index,
                        0,
                    )])
                }
            },
        )
        .await
}

#[tokio::test]
async fn test_one_timeout_does_not_abort_batch() {
    let server = customer_pages().await;
    let report = run(&server, 0, &ProgressSink::disabled()).await;

    assert_eq!(report.dispatched, 10);
    assert_eq!(report.records.len(), 9);
    assert_eq!(report.failed, 1);
    assert!(!report.stopped_early);
    assert!(report
        .records
        .iter()
        .all(|r| r.raw_name != format!("Customer {}", SLOW_PAGE)));
}

#[tokio::test]
async fn test_failures_visible_in_progress() {
    let server = customer_pages().await;
    let (sink, mut rx) = ProgressSink::channel();

    run(&server, 0, &sink).await;
    drop(sink);

    let mut checked = 0;
    let mut failed = 0;
    let mut heartbeats = 0;
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::PageChecked { succeeded, .. } => {
                checked += 1;
                if !succeeded {
                    failed += 1;
                }
            }
            ProgressEvent::Heartbeat { .. } => heartbeats += 1,
            _ => {}
        }
    }

    assert_eq!(checked, 10);
    assert_eq!(failed, 1);
    assert!(heartbeats >= 3);
}

#[tokio::test]
async fn test_early_exit_stops_new_work() {
    let server = customer_pages().await;
    let report = run(&server, 2, &ProgressSink::disabled()).await;

    assert!(report.stopped_early);
    assert!(report.unique_count() >= 2);
    assert!(report.dispatched < 10);
    assert_eq!(report.dispatched, report.completed + report.failed);
}
