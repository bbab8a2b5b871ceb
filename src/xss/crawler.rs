// src/xss/crawler.rs
use crate::xss::error::ScanError;
use crate::xss::http_client::{is_same_origin, HttpClient};
use crate::xss::types::Page;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

/// Breadth-first, same-origin crawler with a bounded number of fetches in flight
pub struct Crawler {
    http_client: HttpClient,
}

impl Crawler {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    /// Crawl from `start` for at most `max_depth` fetch rounds.
    ///
    /// Every URL is fetched at most once. Pages of the final round are
    /// returned but their links are not followed. A failed fetch yields a
    /// page with an empty body.
    pub async fn crawl(
        &self,
        start: &str,
        max_depth: usize,
        concurrency: usize,
    ) -> Result<Vec<Page>, ScanError> {
        let mut base_url = Url::parse(start)
            .map_err(|e| ScanError::Validation(format!("Invalid start URL '{}': {}", start, e)))?;
        base_url.set_fragment(None);

        info!("🕷️ Starting crawl of {} (depth {}, concurrency {})", base_url, max_depth, concurrency);

        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut seen: HashSet<String> = HashSet::from([base_url.to_string()]);
        let mut pending = vec![base_url.to_string()];
        let mut pages = Vec::new();

        for depth in 0..max_depth {
            if pending.is_empty() {
                break;
            }
            debug!("Round {}: fetching {} URLs", depth + 1, pending.len());

            let mut tasks = Vec::with_capacity(pending.len());
            for url in pending.drain(..) {
                let sem = semaphore.clone();
                let client = self.http_client.clone();

                tasks.push(tokio::spawn(async move {
                    // Released on drop, whatever the fetch outcome
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return Page { url, html: String::new() };
                    };
                    fetch_page(&client, url).await
                }));
            }

            let expand = depth + 1 < max_depth;
            let mut next = Vec::new();
            for task in tasks {
                let page = match task.await {
                    Ok(page) => page,
                    Err(e) => {
                        warn!("Crawl task failed: {}", e);
                        continue;
                    }
                };

                if expand && !page.html.is_empty() {
                    for link in same_origin_links(&page.html, &page.url, &base_url) {
                        if seen.insert(link.clone()) {
                            next.push(link);
                        }
                    }
                }
                pages.push(page);
            }
            pending = next;
        }

        info!("✅ Crawl complete. Fetched {} pages", pages.len());
        Ok(pages)
    }
}

async fn fetch_page(client: &HttpClient, url: String) -> Page {
    match client.fetch_text(&url).await {
        Ok(html) => {
            debug!("✓ Fetched: {} ({} bytes)", url, html.len());
            Page { url, html }
        }
        Err(e) => {
            warn!("Failed to fetch {}: {}", url, e);
            Page { url, html: String::new() }
        }
    }
}

/// Absolute, fragment-stripped anchor targets sharing the crawl origin
pub fn same_origin_links(html: &str, page_url: &str, base_url: &Url) -> Vec<String> {
    let Ok(current) = Url::parse(page_url) else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").unwrap();

    let mut links = Vec::new();
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(mut absolute) = current.join(href.trim()) else {
            continue;
        };
        absolute.set_fragment(None);

        if is_same_origin(&absolute, base_url) {
            links.push(absolute.to_string());
        }
    }

    links
}
