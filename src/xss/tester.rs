// src/xss/tester.rs
use crate::xss::config::local_file_path;
use crate::xss::dom::DomAnalyzer;
use crate::xss::error::ScanError;
use crate::xss::http_client::{resolve_url, set_query_param, HttpClient};
use crate::xss::mutator;
use crate::xss::types::{Endpoint, HttpMethod, ResponseSnapshot, TestOutcome};
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// One concrete request for one payload candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedRequest {
    /// Read a local file instead of touching the network
    Local(PathBuf),
    Get(Url),
    GetForm {
        url: Url,
        params: IndexMap<String, String>,
    },
    PostForm {
        url: Url,
        params: IndexMap<String, String>,
    },
}

impl PreparedRequest {
    /// Build the request that plants `candidate` into `endpoint`
    pub fn build(base_url: &str, endpoint: &Endpoint, candidate: &str) -> Result<Self, ScanError> {
        match endpoint {
            Endpoint::Link { url, param, .. } | Endpoint::QueryFallback { url, param, .. } => {
                let mut target = resolve_url(base_url, url)?;
                set_query_param(&mut target, param, candidate);
                Self::local_or(target, Self::Get)
            }
            Endpoint::Form { url, method, params } => {
                let target = resolve_url(base_url, url)?;
                let filled: IndexMap<String, String> = params
                    .keys()
                    .map(|name| (name.clone(), candidate.to_string()))
                    .collect();

                match method {
                    HttpMethod::GET => Self::local_or(target, |url| Self::GetForm { url, params: filled }),
                    HttpMethod::POST => Self::local_or(target, |url| Self::PostForm { url, params: filled }),
                }
            }
            Endpoint::Dom { url, .. } => {
                let mut target = resolve_url(base_url, url)?;
                target.set_fragment(Some(candidate));
                Self::local_or(target, Self::Get)
            }
        }
    }

    fn local_or(target: Url, remote: impl FnOnce(Url) -> Self) -> Result<Self, ScanError> {
        if target.scheme() != "file" {
            return Ok(remote(target));
        }
        local_file_path(target.as_str())
            .map(Self::Local)
            .ok_or_else(|| ScanError::Parse(format!("Not a usable file URL: {}", target)))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

/// Injects payload candidates into endpoints and judges reflection
pub struct XssTester {
    http_client: HttpClient,
    analyzer: DomAnalyzer,
}

impl XssTester {
    pub fn new(http_client: HttpClient) -> Self {
        Self {
            http_client,
            analyzer: DomAnalyzer::new(),
        }
    }

    /// Original payload, then obfuscated, then encoded variants, de-duplicated
    pub fn candidates(payload: &str, obfuscate: bool, encode: bool) -> Vec<String> {
        let mut candidates = vec![payload.to_string()];

        let mut extend = |variants: Vec<String>| {
            for variant in variants {
                if !candidates.contains(&variant) {
                    candidates.push(variant);
                }
            }
        };

        if obfuscate {
            extend(mutator::obfuscate(payload));
        }
        if encode {
            extend(mutator::encode(payload));
        }

        candidates
    }

    pub async fn test(
        &self,
        base_url: &str,
        endpoint: &Endpoint,
        payload: &str,
        obfuscate: bool,
        encode: bool,
    ) -> TestOutcome {
        let candidates = Self::candidates(payload, obfuscate, encode);
        self.test_candidates(base_url, endpoint, payload, &candidates).await
    }

    /// Try candidates in order, one request each, stopping at the first hit.
    ///
    /// Transport and file errors skip to the next candidate. When nothing
    /// confirms, the outcome carries the original payload and an empty
    /// snapshot.
    pub async fn test_candidates(
        &self,
        base_url: &str,
        endpoint: &Endpoint,
        original: &str,
        candidates: &[String],
    ) -> TestOutcome {
        for (idx, candidate) in candidates.iter().enumerate() {
            let request = match PreparedRequest::build(base_url, endpoint, candidate) {
                Ok(request) => request,
                Err(e) => {
                    debug!("Cannot build request for {}: {}", endpoint.url(), e);
                    continue;
                }
            };

            debug!(
                "Testing candidate {}/{} on {} [{}]",
                idx + 1,
                candidates.len(),
                endpoint.url(),
                endpoint.param_id()
            );

            match self.execute(&request, candidate).await {
                Ok(Some(response)) => {
                    return TestOutcome {
                        success: true,
                        response,
                        payload: candidate.clone(),
                    };
                }
                Ok(None) => {}
                Err(e) => debug!("Candidate skipped after error: {}", e),
            }
        }

        TestOutcome {
            success: false,
            response: ResponseSnapshot::empty(),
            payload: original.to_string(),
        }
    }

    /// Issue the request; `Some(snapshot)` when the candidate is confirmed
    async fn execute(
        &self,
        request: &PreparedRequest,
        candidate: &str,
    ) -> Result<Option<ResponseSnapshot>, ScanError> {
        let response = match request {
            PreparedRequest::Local(path) => {
                let bytes = tokio::fs::read(path).await?;
                let body = String::from_utf8_lossy(&bytes).into_owned();
                return Ok(if body.contains(candidate) {
                    Some(ResponseSnapshot::from_body(body))
                } else {
                    None
                });
            }
            PreparedRequest::Get(url) => self.http_client.get(url.as_str()).await?,
            PreparedRequest::GetForm { url, params } => {
                self.http_client.get_with_query(url.as_str(), params).await?
            }
            PreparedRequest::PostForm { url, params } => {
                self.http_client.post_form(url.as_str(), params).await?
            }
        };

        let snapshot = ResponseSnapshot::capture(response).await?;
        if snapshot.body.contains(candidate) || self.analyzer.is_vulnerable(&snapshot.body) {
            Ok(Some(snapshot))
        } else {
            Ok(None)
        }
    }
}
