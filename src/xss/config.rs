use crate::xss::error::ScanError;
use crate::xss::payloads::PayloadCorpus;
use crate::xss::waf::WafRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ScanMode {
    /// Extract and test the target page only
    Single,
    /// Crawl same-origin pages first, then test each one
    Crawl,
}

/// Configuration for the XSS scanner
#[derive(Debug, Clone)]
pub struct XssConfig {
    pub target: String,
    pub mode: ScanMode,
    pub max_depth: usize,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub cookies: Option<String>,
    pub custom_headers: HashMap<String, String>,
    pub follow_redirects: bool,
    /// Only the "basic" payload category, untouched
    pub basic_only: bool,
    pub obfuscate: bool,
    pub encode: bool,
    pub detect_waf: bool,
    /// Out-of-band collector URL; enables blind probes when set
    pub blind_callback: Option<String>,
    pub payload_file: Option<PathBuf>,
    pub signature_file: Option<PathBuf>,
}

impl Default for XssConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            mode: ScanMode::Single,
            max_depth: 2,
            max_concurrency: 5,
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (xsshound)".to_string(),
            cookies: None,
            custom_headers: HashMap::new(),
            follow_redirects: true,
            basic_only: false,
            obfuscate: false,
            encode: false,
            detect_waf: false,
            blind_callback: None,
            payload_file: None,
            signature_file: None,
        }
    }
}

impl XssConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        let target = Url::parse(&self.target)
            .map_err(|e| ScanError::Validation(format!("Invalid target URL '{}': {}", self.target, e)))?;

        match target.scheme() {
            "http" | "https" => {
                if target.host_str().map_or(true, str::is_empty) {
                    return Err(ScanError::Validation(format!(
                        "Target URL has no host: {}",
                        self.target
                    )));
                }
            }
            "file" => {
                if self.mode == ScanMode::Crawl {
                    return Err(ScanError::Validation(
                        "Crawling requires an http(s) target, not a local file".to_string(),
                    ));
                }
                let path = local_file_path(&self.target).ok_or_else(|| {
                    ScanError::Validation(format!("Invalid file target: {}", self.target))
                })?;
                if !path.is_file() {
                    return Err(ScanError::Validation(format!(
                        "File not found: {}",
                        path.display()
                    )));
                }
            }
            other => {
                return Err(ScanError::Validation(format!(
                    "Unsupported target scheme '{}': use http, https or file",
                    other
                )));
            }
        }

        if self.max_depth < 1 {
            return Err(ScanError::Validation(
                "Depth must be a positive integer".to_string(),
            ));
        }

        if self.max_concurrency < 1 {
            return Err(ScanError::Validation(
                "Concurrency must be a positive integer".to_string(),
            ));
        }

        if let Some(ref callback) = self.blind_callback {
            Url::parse(callback).map_err(|e| {
                ScanError::Validation(format!("Invalid blind callback URL '{}': {}", callback, e))
            })?;
        }

        Ok(())
    }

    pub fn is_local(&self) -> bool {
        is_local_target(&self.target)
    }
}

pub fn is_local_target(target: &str) -> bool {
    target.starts_with("file://")
}

/// Filesystem path behind a `file://` target.
///
/// `file:///abs/page.html` maps to an absolute path; a host-less shorthand
/// like `file://pages/index.html` is taken relative to the working directory.
pub fn local_file_path(target: &str) -> Option<PathBuf> {
    let rest = target.strip_prefix("file://")?;

    if let Ok(url) = Url::parse(target) {
        if let Ok(path) = url.to_file_path() {
            return Some(path);
        }
    }

    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    if rest.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(rest)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| rest.to_string());
    Some(PathBuf::from(decoded))
}

/// Immutable scan data: payload corpus and WAF signature registry.
///
/// Built once at startup and shared by reference with the payload catalog
/// and the WAF fingerprinter.
#[derive(Debug, Default)]
pub struct ScanData {
    pub corpus: PayloadCorpus,
    pub signatures: WafRegistry,
}

impl ScanData {
    pub fn new(corpus: PayloadCorpus, signatures: WafRegistry) -> Self {
        Self { corpus, signatures }
    }

    pub fn builtin() -> Self {
        Self::new(PayloadCorpus::builtin(), WafRegistry::builtin())
    }

    /// Load the configured data files, falling back to empty data on error
    pub fn load(config: &XssConfig) -> Self {
        let corpus = match config.payload_file {
            Some(ref path) => load_or_empty(path, "payload corpus", PayloadCorpus::from_file),
            None => PayloadCorpus::builtin(),
        };

        let signatures = match config.signature_file {
            Some(ref path) => load_or_empty(path, "WAF signature registry", WafRegistry::from_file),
            None => WafRegistry::builtin(),
        };

        info!(
            "Loaded {} payloads in {} categories, {} WAF signatures",
            corpus.len(),
            corpus.category_count(),
            signatures.len()
        );

        Self::new(corpus, signatures)
    }
}

fn load_or_empty<T: Default>(
    path: &Path,
    what: &str,
    loader: impl FnOnce(&Path) -> Result<T, ScanError>,
) -> T {
    match loader(path) {
        Ok(data) => data,
        Err(e) => {
            warn!(
                "⚠️  Could not load {} from {}: {} - continuing with an empty {}",
                what,
                path.display(),
                e,
                what
            );
            T::default()
        }
    }
}
