// src/xss/mod.rs
// Cross-site scripting scanner module for xsshound
// Only point it at targets you are authorized to test

pub mod blind;
pub mod config;
pub mod crawler;
pub mod dom;
pub mod error;
pub mod extractor;
pub mod http_client;
pub mod mutator;
pub mod payloads;
pub mod tester;
pub mod types;
pub mod waf;

use blind::BlindNotifier;
use config::{is_local_target, local_file_path, ScanData, ScanMode, XssConfig};
use error::ScanError;
use http_client::{resolve_url, HttpClient};
use std::collections::HashSet;
use std::sync::Arc;
use tester::XssTester;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use types::{Endpoint, Page, ScanRecord, TestOutcome, VulnClass};

/// Main entry point for XSS scanning
pub async fn scan_target(
    config: XssConfig,
    data: Arc<ScanData>,
) -> Result<Vec<ScanRecord>, ScanError> {
    config.validate()?;
    let start_time = chrono::Utc::now();

    info!("🔍 Starting XSS scan");
    info!("Target: {}", config.target);

    let config = Arc::new(config);
    let mut scanner = Scanner::new(config.clone(), data)?;

    let records = match config.mode {
        ScanMode::Single => scanner.single_scan().await,
        ScanMode::Crawl => scanner.full_scan().await?,
    };
    scanner.finish().await;

    let elapsed = chrono::Utc::now() - start_time;
    info!("✅ Scan complete in {}s", elapsed.num_seconds());
    info!(
        "   Confirmed findings: {}",
        records.iter().filter(|r| r.success).count()
    );

    Ok(records)
}

/// Sequential scan driver: pages, then endpoints, then payloads
pub struct Scanner {
    config: Arc<XssConfig>,
    data: Arc<ScanData>,
    http_client: HttpClient,
    tester: XssTester,
    blind: Option<Arc<BlindNotifier>>,
    /// (url without query, parameter) pairs that already got a blind probe
    probed: HashSet<(String, String)>,
    probes: Vec<JoinHandle<()>>,
}

impl Scanner {
    pub fn new(config: Arc<XssConfig>, data: Arc<ScanData>) -> Result<Self, ScanError> {
        let http_client = HttpClient::new(config.clone())?;
        let tester = XssTester::new(http_client.clone());
        let blind = match config.blind_callback {
            Some(ref callback) => Some(Arc::new(BlindNotifier::new(callback)?)),
            None => None,
        };

        Ok(Self {
            config,
            data,
            http_client,
            tester,
            blind,
            probed: HashSet::new(),
            probes: Vec::new(),
        })
    }

    /// Scan the target page only; an unreadable target yields no records
    pub async fn single_scan(&mut self) -> Vec<ScanRecord> {
        let target = self.config.target.clone();
        info!("Phase 1/2: Loading target...");

        let html = match load_page(&self.http_client, &target).await {
            Ok(html) => html,
            Err(e) => {
                error!("Cannot load {}: {}", target, e);
                return Vec::new();
            }
        };

        info!("Phase 2/2: Testing endpoints...");
        self.scan_page(&Page { url: target, html }).await
    }

    /// Crawl the target's origin, then scan every page in crawl order
    pub async fn full_scan(&mut self) -> Result<Vec<ScanRecord>, ScanError> {
        info!("Phase 1/2: Crawling target...");
        let crawler = crawler::Crawler::new(self.http_client.clone());
        let pages = crawler
            .crawl(
                &self.config.target,
                self.config.max_depth,
                self.config.max_concurrency,
            )
            .await?;
        info!("✓ Found {} pages", pages.len());

        info!("Phase 2/2: Testing endpoints...");
        let mut records = Vec::new();
        for (idx, page) in pages.iter().enumerate() {
            info!("({}/{}) Scanning: {}", idx + 1, pages.len(), page.url);
            records.extend(self.scan_page(page).await);
        }

        Ok(records)
    }

    /// Test every endpoint of one page, one payload at a time
    pub async fn scan_page(&mut self, page: &Page) -> Vec<ScanRecord> {
        let endpoints = endpoints_for(page);
        if endpoints.is_empty() {
            debug!("No endpoints on {}", page.url);
            return Vec::new();
        }
        info!("✓ Found {} endpoints on {}", endpoints.len(), page.url);

        let mut records = Vec::new();
        for endpoint in &endpoints {
            let payloads =
                self.data
                    .corpus
                    .generate(endpoint, self.config.basic_only, self.config.obfuscate);

            for payload in &payloads {
                let outcome = self
                    .tester
                    .test(
                        &page.url,
                        endpoint,
                        payload,
                        self.config.obfuscate,
                        self.config.encode,
                    )
                    .await;

                let waf = if self.config.detect_waf {
                    self.data.signatures.detect(&outcome.response)
                } else {
                    None
                };

                print_outcome(endpoint, &outcome, waf.as_deref());
                records.push(ScanRecord::new(&page.url, endpoint, &outcome, waf));
            }

            self.dispatch_blind(&page.url, endpoint);
        }

        records
    }

    /// Wait for outstanding blind probes; each is bounded by its own timeout
    pub async fn finish(&mut self) {
        if self.probes.is_empty() {
            return;
        }
        info!("Waiting for {} blind probes", self.probes.len());
        for handle in self.probes.drain(..) {
            if let Err(e) = handle.await {
                debug!("Blind probe task failed: {}", e);
            }
        }
    }

    pub fn blind_probe_count(&self) -> usize {
        self.probed.len()
    }

    fn dispatch_blind(&mut self, page_url: &str, endpoint: &Endpoint) {
        let Some(notifier) = self.blind.as_ref() else {
            return;
        };
        if endpoint.is_dom() || is_local_target(page_url) {
            return;
        }

        let Ok(mut target) = resolve_url(page_url, endpoint.url()) else {
            return;
        };
        if target.scheme() == "file" {
            return;
        }
        target.set_fragment(None);

        let mut key = target.clone();
        key.set_query(None);

        for param in endpoint.param_names() {
            if self.probed.insert((key.to_string(), param.to_string())) {
                debug!("Dispatching blind probe: {} [{}]", target, param);
                self.probes
                    .push(notifier.dispatch(target.to_string(), param.to_string()));
            }
        }
    }
}

/// Read a `file://` target from disk, or GET anything else
pub async fn load_page(http_client: &HttpClient, target: &str) -> Result<String, ScanError> {
    if is_local_target(target) {
        let path = local_file_path(target)
            .ok_or_else(|| ScanError::Validation(format!("Not a usable file URL: {}", target)))?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    } else {
        http_client.fetch_text(target).await
    }
}

/// Page endpoints in document order, the query fallback when there are
/// none, then a DOM endpoint if the page reads its own URL
pub fn endpoints_for(page: &Page) -> Vec<Endpoint> {
    let mut endpoints = extractor::extract(&page.html);
    if endpoints.is_empty() {
        endpoints = extractor::query_fallback(&page.url);
    }
    endpoints.extend(extractor::extract_dom(&page.html, &page.url));
    endpoints
}

fn print_outcome(endpoint: &Endpoint, outcome: &TestOutcome, waf: Option<&str>) {
    let param_id = endpoint.param_id();
    if outcome.success {
        println!(
            "[+] {} XSS: {} => {}",
            endpoint.vuln_class().title(),
            param_id,
            outcome.payload
        );
    } else if let Some(name) = waf {
        println!("[!] WAF ({}) on {}", name, param_id);
    } else {
        println!("[-] No XSS: {}", param_id);
    }
}

/// Print scan results in human-readable format
pub fn print_results(target: &str, records: &[ScanRecord]) {
    let confirmed: Vec<&ScanRecord> = records.iter().filter(|r| r.success).collect();
    let count_class = |class: VulnClass| confirmed.iter().filter(|r| r.vuln_type == class).count();
    let waf_hits = records.iter().filter(|r| r.waf.is_some()).count();

    println!("\n{}", "═".repeat(70));
    println!("  XSS SCAN RESULTS");
    println!("{}", "═".repeat(70));
    println!("Target: {}", target);
    println!();

    println!("📊 Summary:");
    println!("   Tests recorded: {}", records.len());
    println!("   Confirmed findings: {}", confirmed.len());
    println!("   WAF responses: {}", waf_hits);
    println!();

    if confirmed.is_empty() {
        println!("✅ No XSS vulnerabilities detected");
        println!("\n{}", "═".repeat(70));
        return;
    }

    println!("🎯 Vulnerability classes:");
    println!("   Reflected: {}", count_class(VulnClass::Reflected));
    println!("   Stored:    {}", count_class(VulnClass::Stored));
    println!("   DOM:       {}", count_class(VulnClass::Dom));
    println!();

    println!("📋 Confirmed findings:");
    println!("{}", "-".repeat(70));
    for (i, record) in confirmed.iter().enumerate() {
        println!(
            "\n[{}] {} {} ({})",
            i + 1,
            record.endpoint_method,
            record.endpoint_url,
            record.vuln_type.title()
        );
        println!("    Page: {}", record.url);
        println!(
            "    Parameters: {}",
            record.endpoint_params.keys().cloned().collect::<Vec<_>>().join(", ")
        );
        println!("    Payload: {}", record.payload);
        if let Some(ref waf) = record.waf {
            println!("    WAF: {}", waf);
        }
    }

    println!("\n{}", "═".repeat(70));
}
