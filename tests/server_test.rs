//! Metrics sink and HTTP endpoint tests

mod common;

use bareos_exporter::collector::{BackupCollector, CollectorOptions, Fact};
use bareos_exporter::descriptors::DescriptorRegistry;
use bareos_exporter::metrics::MetricsSink;
use bareos_exporter::server::serve;
use bareos_exporter::status::TerminationStatus;
use common::{healthy_client, job, ClientRecord, FakeStore};
use std::sync::Arc;
use tokio::net::TcpListener;

fn sink(store: FakeStore, namespace: &str) -> MetricsSink {
    let collector = BackupCollector::new(
        Arc::new(store),
        Arc::new(DescriptorRegistry::new()),
        CollectorOptions::default(),
    );
    MetricsSink::new(collector, namespace).unwrap()
}

/// Serve `sink` on an ephemeral port and return its base URL.
async fn spawn_server(sink: MetricsSink, endpoint: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { serve(listener, endpoint, Arc::new(sink)).await });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_scrape_renders_prometheus_format() {
    let store = FakeStore::new()
        .with_client(
            "host-a",
            ClientRecord {
                total_bytes: 500,
                total_files: 0,
                last_job: Some(job("I", 100, 10, 0, 1_709_890_000)),
                last_full_job: None,
                last_status: Some(TerminationStatus::Terminated),
                scheduled_jobs: 2,
            },
        )
        .failing("host-a", Fact::TotalFiles);
    let sink = sink(store, "bareos");

    sink.scrape().await.unwrap();
    let metrics = sink.encode().unwrap();

    assert!(metrics.contains("# HELP bareos_bytes_saved_total"));
    assert!(metrics.contains("# TYPE bareos_bytes_saved_total counter"));
    assert!(metrics.contains("# TYPE bareos_last_backup_job_status gauge"));
    assert!(metrics.contains("bareos_up 1"));
    assert!(metrics.contains(r#"bareos_bytes_saved_total{client="host-a"} 500"#));
    assert!(metrics.contains(r#"bareos_files_saved_total{client="host-a"} 0"#));
    assert!(metrics
        .contains(r#"bareos_last_backup_job_bytes_saved_total{client="host-a",level="I"} 100"#));
    assert!(metrics.contains(r#"bareos_last_backup_job_status{client="host-a",status="T"} 1"#));
    assert!(metrics.contains(r#"bareos_last_backup_job_status{client="host-a",status="f"} 0"#));
    assert!(metrics.contains(r#"bareos_last_full_backup_job_bytes_saved_total{client="host-a"} 0"#));
    assert!(metrics.contains(r#"bareos_scheduled_jobs_total{client="host-a"} 2"#));
    assert!(metrics.contains(r#"bareos_fact_fetch_failures{method="TotalFiles"} 1"#));
    assert!(metrics.contains(r#"bareos_fact_fetch_failures{method="TotalBytes"} 0"#));
}

#[tokio::test]
async fn test_discovery_failure_reports_down() {
    let store = FakeStore::new()
        .with_client("host-a", healthy_client())
        .failing_discovery();
    let sink = sink(store, "bareos");

    assert!(sink.scrape().await.is_err());

    let metrics = sink.encode().unwrap();
    assert!(metrics.contains("bareos_up 0"));
    assert!(!metrics.contains(r#"bareos_bytes_saved_total{"#));
    assert!(!metrics.contains(r#"client="host-a""#));
    // Discovery is the only reported error, no fact counts as failed.
    for fact in Fact::ALL {
        assert!(metrics.contains(&format!(
            r#"bareos_fact_fetch_failures{{method="{}"}} 0"#,
            fact.operation()
        )));
    }
}

#[tokio::test]
async fn test_custom_namespace() {
    let sink = sink(FakeStore::new().with_client("db1", healthy_client()), "backup");

    sink.scrape().await.unwrap();
    let metrics = sink.encode().unwrap();

    assert!(metrics.contains("backup_up 1"));
    assert!(metrics.contains(r#"backup_bytes_saved_total{client="db1"} 10000"#));
    assert!(!metrics.contains("bareos_"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = spawn_server(sink(FakeStore::new(), "bareos"), "/metrics").await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_metrics_endpoint_serves_scrape() {
    let store = FakeStore::new()
        .with_client("alpha", healthy_client())
        .with_client("beta", healthy_client());
    let base = spawn_server(sink(store, "bareos"), "/metrics").await;

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    assert!(body.contains("bareos_up 1"));
    assert!(body.contains(r#"bareos_bytes_saved_total{client="alpha"} 10000"#));
    assert!(body.contains(r#"bareos_bytes_saved_total{client="beta"} 10000"#));
    assert!(body.contains(r#"bareos_last_backup_job_status{client="beta",status="T"} 1"#));
}

#[tokio::test]
async fn test_configured_endpoint_path() {
    let base = spawn_server(
        sink(FakeStore::new().with_client("alpha", healthy_client()), "bareos"),
        "/bareos",
    )
    .await;

    let response = reqwest::get(format!("{}/bareos", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("bareos_up 1"));

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), 404);

    let response = reqwest::get(format!("{}/", base)).await.unwrap();
    assert!(response.text().await.unwrap().contains(r#"href="/bareos""#));
}

#[tokio::test]
async fn test_landing_page_lists_status_codes() {
    let base = spawn_server(sink(FakeStore::new(), "bareos"), "/metrics").await;

    let body = reqwest::get(format!("{}/", base)).await.unwrap().text().await.unwrap();

    assert!(body.contains(r#"href="/metrics""#));
    for status in TerminationStatus::ALL {
        assert!(body.contains(&format!(
            "<code>{}</code> - {}",
            status.label(),
            status.description()
        )));
    }
    assert!(body.contains("<code>f</code> - Fatal error"));
}

#[tokio::test]
async fn test_metrics_endpoint_on_discovery_failure() {
    let base = spawn_server(sink(FakeStore::new().failing_discovery(), "bareos"), "/metrics").await;

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();

    // The scrape still succeeds and reports the exporter as down.
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("bareos_up 0"));
}
