//! End-to-end tests for the scan orchestrator

use indexmap::IndexMap;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xsshound::xss::blind::BlindNotifier;
use xsshound::xss::config::{ScanData, ScanMode, XssConfig};
use xsshound::xss::payloads::PayloadCorpus;
use xsshound::xss::scan_target;
use xsshound::xss::types::{HttpMethod, VulnClass};
use xsshound::xss::waf::{WafRegistry, WafSignature};

const PAYLOAD: &str = "<b>xss-probe</b>";

fn data(signatures: WafRegistry) -> Arc<ScanData> {
    let corpus = PayloadCorpus::new(IndexMap::from([(
        "basic".to_string(),
        vec![PAYLOAD.to_string()],
    )]));
    Arc::new(ScanData::new(corpus, signatures))
}

fn config(target: &str) -> XssConfig {
    XssConfig {
        target: target.to_string(),
        timeout_secs: 5,
        basic_only: true,
        ..Default::default()
    }
}

async fn mount_html(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_scan_reports_reflected_link() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", PAYLOAD))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Test-Waf", "on")
                .set_body_string(format!("Results for {}", PAYLOAD)),
        )
        .mount(&server)
        .await;
    mount_html(&server, "/", r#"<a href="/search?q=hello">search</a>"#).await;

    let mut signatures = WafRegistry::new();
    signatures.register(WafSignature::new("TestWAF", Some("200"), &["x-test-waf"], None).unwrap());

    let records = scan_target(
        XssConfig {
            detect_waf: true,
            ..config(&server.uri())
        },
        data(signatures),
    )
    .await
    .expect("scan");

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.success);
    assert_eq!(record.endpoint_type, "link");
    assert_eq!(record.endpoint_url, "/search?q=hello");
    assert_eq!(record.endpoint_method, HttpMethod::GET);
    assert_eq!(record.endpoint_params["q"], "hello");
    assert_eq!(record.payload, PAYLOAD);
    assert_eq!(record.vuln_type, VulnClass::Reflected);
    assert_eq!(record.waf.as_deref(), Some("TestWAF"));
}

#[tokio::test]
async fn test_query_fallback_when_page_has_no_surfaces() {
    let server = MockServer::start().await;
    mount_html(&server, "/page", "<p>nothing to click</p>").await;

    let target = format!("{}/page?id=7", server.uri());
    let records = scan_target(config(&target), data(WafRegistry::new()))
        .await
        .expect("scan");

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint_type, "query");
    assert!(!records[0].success);
    assert!(records[0].waf.is_none());
}

#[tokio::test]
async fn test_unreachable_single_target_yields_no_records() {
    let records = scan_target(config("http://127.0.0.1:9/"), data(WafRegistry::new()))
        .await
        .expect("scan");
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_blind_probe_sent_once_per_url_and_param() {
    let server = MockServer::start().await;
    let callback = "https://collector.test/x.js";
    let blind_payload = BlindNotifier::new(callback).expect("notifier").payload();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", blind_payload.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_html(&server, "/search", "<p>ok</p>").await;
    mount_html(
        &server,
        "/",
        r#"<a href="/search?q=1">one</a><a href="/search?q=2#x">two</a>"#,
    )
    .await;

    let records = scan_target(
        XssConfig {
            blind_callback: Some(callback.to_string()),
            ..config(&server.uri())
        },
        data(WafRegistry::new()),
    )
    .await
    .expect("scan");

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| !r.success));
}

#[tokio::test]
async fn test_crawl_scan_visits_linked_pages() {
    let server = MockServer::start().await;

    mount_html(&server, "/", r#"<a href="/guestbook">guestbook</a>"#).await;
    mount_html(
        &server,
        "/guestbook",
        r#"<form method="post" action="/sign"><input name="msg"><input type="submit"></form>"#,
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/sign"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("<li>{}</li>", PAYLOAD)))
        .mount(&server)
        .await;

    let records = scan_target(
        XssConfig {
            mode: ScanMode::Crawl,
            max_depth: 2,
            max_concurrency: 2,
            ..config(&server.uri())
        },
        data(WafRegistry::new()),
    )
    .await
    .expect("scan");

    assert_eq!(records.len(), 1);
    assert!(records[0].url.ends_with("/guestbook"));
    assert!(records[0].success);
    assert_eq!(records[0].vuln_type, VulnClass::Stored);
    assert_eq!(records[0].endpoint_method, HttpMethod::POST);
}

#[tokio::test]
async fn test_local_file_scan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let page = dir.path().join("index.html");
    std::fs::write(
        &page,
        r#"<form action="go" method="post"><input name="q"></form>"#,
    )
    .expect("write page");
    std::fs::write(dir.path().join("go"), format!("echo: {}", PAYLOAD)).expect("write go");

    let target = url::Url::from_file_path(&page).expect("file url").to_string();
    let records = scan_target(config(&target), data(WafRegistry::new()))
        .await
        .expect("scan");

    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].endpoint_type, "form");
    assert_eq!(records[0].vuln_type, VulnClass::Stored);
}

#[tokio::test]
async fn test_invalid_configuration_rejected_before_scanning() {
    let result = scan_target(
        XssConfig {
            max_depth: 0,
            mode: ScanMode::Crawl,
            ..config("https://example.com")
        },
        data(WafRegistry::new()),
    )
    .await;
    assert!(matches!(
        result,
        Err(xsshound::xss::error::ScanError::Validation(_))
    ));
}
