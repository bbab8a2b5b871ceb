use crate::xss::types::{Endpoint, HttpMethod};
use indexmap::IndexMap;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

static FRAGMENT_READER: OnceLock<Regex> = OnceLock::new();

/// Injection points in document order: one Link per query key of each
/// anchor, one Form per form element.
pub fn extract(html: &str) -> Vec<Endpoint> {
    let document = Html::parse_document(html);
    let surface_selector = Selector::parse("a[href], form").unwrap();
    let field_selector = Selector::parse("input, textarea").unwrap();

    let mut endpoints = Vec::new();
    for element in document.select(&surface_selector) {
        match element.value().name() {
            "a" => {
                if let Some(href) = element.value().attr("href") {
                    endpoints.extend(link_endpoints(href));
                }
            }
            "form" => endpoints.push(form_endpoint(element, &field_selector)),
            _ => {}
        }
    }

    endpoints
}

fn link_endpoints(href: &str) -> Vec<Endpoint> {
    query_pairs(href)
        .into_iter()
        .map(|(param, value)| Endpoint::Link {
            url: href.to_string(),
            param,
            value,
        })
        .collect()
}

fn form_endpoint(form: ElementRef, field_selector: &Selector) -> Endpoint {
    let action = form.value().attr("action").unwrap_or("");
    let method = form
        .value()
        .attr("method")
        .map(HttpMethod::parse)
        .unwrap_or(HttpMethod::GET);

    let mut params = IndexMap::new();
    for field in form.select(field_selector) {
        let Some(name) = field.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let value = if field.value().name() == "textarea" {
            field.text().collect::<String>()
        } else {
            field.value().attr("value").unwrap_or("").to_string()
        };
        // Later duplicates overwrite earlier ones, keeping the first position
        params.insert(name.to_string(), value);
    }

    Endpoint::Form {
        url: action.to_string(),
        method,
        params,
    }
}

/// Decoded query pairs of a (possibly relative) href, first value per key
fn query_pairs(href: &str) -> Vec<(String, String)> {
    let without_fragment = href.split('#').next().unwrap_or(href);
    let Some((_, query)) = without_fragment.split_once('?') else {
        return Vec::new();
    };

    let mut pairs: IndexMap<String, String> = IndexMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        pairs.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    pairs.into_iter().collect()
}

/// Endpoints synthesized from the target URL's own query string
pub fn query_fallback(target: &str) -> Vec<Endpoint> {
    let Ok(url) = Url::parse(target) else {
        return Vec::new();
    };
    let Some(query) = url.query().filter(|q| !q.is_empty()) else {
        return Vec::new();
    };

    let mut pairs: IndexMap<String, String> = IndexMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        pairs.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }

    pairs
        .into_iter()
        .map(|(param, value)| Endpoint::QueryFallback {
            url: target.to_string(),
            param,
            value,
        })
        .collect()
}

/// A DOM endpoint when the page's scripts read the fragment or document URL
pub fn extract_dom(html: &str, page_url: &str) -> Vec<Endpoint> {
    let fragment_reader = FRAGMENT_READER.get_or_init(|| {
        Regex::new(r"\blocation\.hash\b|\bdocument\.URL\b").expect("fragment reader pattern")
    });

    if fragment_reader.is_match(html) {
        vec![Endpoint::Dom {
            url: page_url.to_string(),
            param: "hash".to_string(),
        }]
    } else {
        Vec::new()
    }
}
