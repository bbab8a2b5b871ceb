use crate::xss::error::ScanError;
use crate::xss::types::ResponseSnapshot;
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

/// Signature file entry: `{ "code": ..., "headers": ... , "page": ... }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSignature {
    pub code: Option<String>,
    pub headers: Option<HeaderPatterns>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HeaderPatterns {
    One(String),
    Many(Vec<String>),
}

impl HeaderPatterns {
    fn patterns(&self) -> Vec<&str> {
        match self {
            HeaderPatterns::One(p) => vec![p.as_str()],
            HeaderPatterns::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

/// A compiled WAF signature
#[derive(Debug, Clone)]
pub struct WafSignature {
    pub name: String,
    code: Option<Regex>,
    headers: Vec<Regex>,
    page: Option<Regex>,
}

impl WafSignature {
    pub fn new(
        name: &str,
        code: Option<&str>,
        headers: &[&str],
        page: Option<&str>,
    ) -> Result<Self, ScanError> {
        let compile = |pattern: &str, case_insensitive: bool| {
            RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| {
                    ScanError::Config(format!("Invalid pattern in WAF signature '{}': {}", name, e))
                })
        };

        Ok(Self {
            name: name.to_string(),
            code: code.filter(|p| !p.is_empty()).map(|p| compile(p, false)).transpose()?,
            headers: headers
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| compile(*p, true))
                .collect::<Result<_, _>>()?,
            page: page.filter(|p| !p.is_empty()).map(|p| compile(p, true)).transpose()?,
        })
    }

    pub fn from_raw(name: &str, raw: &RawSignature) -> Result<Self, ScanError> {
        let headers = raw
            .headers
            .as_ref()
            .map(HeaderPatterns::patterns)
            .unwrap_or_default();
        Self::new(name, raw.code.as_deref(), &headers, raw.page.as_deref())
    }

    /// 0.5 for a status match, 1 per matching header pattern, 1 for a body match
    pub fn score(&self, status: &str, header_blob: &str, body: &str) -> f64 {
        let mut score = 0.0;

        if let Some(ref code) = self.code {
            if code.is_match(status) {
                score += 0.5;
            }
        }

        for header in &self.headers {
            if header.is_match(header_blob) {
                score += 1.0;
            }
        }

        if let Some(ref page) = self.page {
            if page.is_match(body) {
                score += 1.0;
            }
        }

        score
    }
}

/// Signatures in registration order, unique by name
#[derive(Debug, Clone, Default)]
pub struct WafRegistry {
    signatures: Vec<WafSignature>,
}

impl WafRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature; re-registering a name replaces it in place
    pub fn register(&mut self, signature: WafSignature) {
        match self.signatures.iter_mut().find(|s| s.name == signature.name) {
            Some(existing) => *existing = signature,
            None => self.signatures.push(signature),
        }
    }

    /// Parse a JSON object of `name → signature`; invalid entries are dropped
    pub fn from_json_str(json: &str) -> Result<Self, ScanError> {
        let raw: IndexMap<String, RawSignature> = serde_json::from_str(json)?;
        let mut registry = Self::new();

        for (name, sig) in &raw {
            match WafSignature::from_raw(name, sig) {
                Ok(signature) => registry.register(signature),
                Err(e) => warn!("Skipping WAF signature: {}", e),
            }
        }

        Ok(registry)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!(
                "Failed to read WAF signature file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Default signatures shipped with the scanner
    pub fn builtin() -> Self {
        let builtin: [(&str, Option<&str>, &[&str], Option<&str>); 8] = [
            (
                "Cloudflare",
                Some("403|503"),
                &["server: cloudflare", "cf-ray"],
                Some(r"Attention Required! \| Cloudflare|Cloudflare Ray ID"),
            ),
            (
                "ModSecurity",
                Some("403|406|501"),
                &["mod_security|NOYB"],
                Some("This error was generated by Mod_Security|rules of the mod_security module"),
            ),
            (
                "AWS WAF",
                Some("403"),
                &["x-amzn-requestid|x-amz-cf-id|awselb"],
                Some("Request blocked|The request could not be satisfied"),
            ),
            (
                "Akamai Kona",
                Some("403"),
                &["akamaighost|x-akamai"],
                Some(r"Access Denied.*Reference #[0-9a-f.]+"),
            ),
            (
                "Sucuri CloudProxy",
                Some("403"),
                &["x-sucuri-id|server: sucuri"],
                Some("Access Denied - Sucuri Website Firewall"),
            ),
            (
                "Imperva Incapsula",
                Some("403"),
                &["incap_ses|visid_incap|x-iinfo"],
                Some("Incapsula incident ID|_Incapsula_Resource"),
            ),
            (
                "F5 BIG-IP ASM",
                None,
                &["bigipserver|x-wa-info|f5-"],
                Some("The requested URL was rejected"),
            ),
            (
                "Wordfence",
                Some("403|503"),
                &[],
                Some("Generated by Wordfence|This response was generated by Wordfence"),
            ),
        ];

        let mut registry = Self::new();
        for (name, code, headers, page) in builtin {
            match WafSignature::new(name, code, headers, page) {
                Ok(signature) => registry.register(signature),
                Err(e) => warn!("Skipping WAF signature: {}", e),
            }
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(|s| s.name.as_str())
    }

    /// Best-scoring signature name; ties keep the earliest registered
    pub fn detect(&self, response: &ResponseSnapshot) -> Option<String> {
        self.detect_with_score(response).map(|(name, _)| name)
    }

    pub fn detect_with_score(&self, response: &ResponseSnapshot) -> Option<(String, f64)> {
        let status = response.status_text();
        let headers = response.header_blob();

        let mut best: Option<(&WafSignature, f64)> = None;
        for signature in &self.signatures {
            let score = signature.score(&status, &headers, &response.body);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((signature, score));
            }
        }

        best.map(|(signature, score)| {
            debug!("WAF fingerprint: {} (score {})", signature.name, score);
            (signature.name.clone(), score)
        })
    }
}
