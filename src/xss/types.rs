use crate::xss::error::ScanError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fetched page handed from the crawler to the scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    GET,
    POST,
}

impl HttpMethod {
    /// Form-style method parsing: anything other than POST is GET
    pub fn parse(method: &str) -> Self {
        if method.trim().eq_ignore_ascii_case("post") {
            HttpMethod::POST
        } else {
            HttpMethod::GET
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One injectable surface discovered on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Anchor whose href carries a query string, one per query key
    Link {
        url: String,
        param: String,
        value: String,
    },
    /// A form element with all of its named fields
    Form {
        url: String,
        method: HttpMethod,
        params: IndexMap<String, String>,
    },
    /// Synthesized from the target URL's own query string
    QueryFallback {
        url: String,
        param: String,
        value: String,
    },
    /// Page whose inline script reads the URL fragment or document URL
    Dom { url: String, param: String },
}

impl Endpoint {
    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::Link { .. } => "link",
            Endpoint::Form { .. } => "form",
            Endpoint::QueryFallback { .. } => "query",
            Endpoint::Dom { .. } => "dom",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Endpoint::Link { url, .. }
            | Endpoint::Form { url, .. }
            | Endpoint::QueryFallback { url, .. }
            | Endpoint::Dom { url, .. } => url,
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::Form { method, .. } => *method,
            Endpoint::Link { .. } | Endpoint::QueryFallback { .. } | Endpoint::Dom { .. } => {
                HttpMethod::GET
            }
        }
    }

    /// Whether the surface is a single query-string parameter
    pub fn is_query_param(&self) -> bool {
        matches!(self, Endpoint::Link { .. } | Endpoint::QueryFallback { .. })
    }

    pub fn is_dom(&self) -> bool {
        matches!(self, Endpoint::Dom { .. })
    }

    /// Parameter names in declaration order
    pub fn param_names(&self) -> Vec<&str> {
        match self {
            Endpoint::Link { param, .. }
            | Endpoint::QueryFallback { param, .. }
            | Endpoint::Dom { param, .. } => vec![param.as_str()],
            Endpoint::Form { params, .. } => params.keys().map(String::as_str).collect(),
        }
    }

    /// Parameter mapping as recorded in scan output
    pub fn params(&self) -> IndexMap<String, String> {
        match self {
            Endpoint::Link { param, value, .. } | Endpoint::QueryFallback { param, value, .. } => {
                IndexMap::from([(param.clone(), value.clone())])
            }
            Endpoint::Dom { param, .. } => IndexMap::from([(param.clone(), String::new())]),
            Endpoint::Form { params, .. } => params.clone(),
        }
    }

    /// Short identifier used in console lines
    pub fn param_id(&self) -> String {
        self.param_names().join(",")
    }

    pub fn vuln_class(&self) -> VulnClass {
        match self {
            Endpoint::Form { .. } => VulnClass::Stored,
            Endpoint::Dom { .. } => VulnClass::Dom,
            Endpoint::Link { .. } | Endpoint::QueryFallback { .. } => VulnClass::Reflected,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VulnClass {
    Reflected,
    Stored,
    Dom,
}

impl VulnClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnClass::Reflected => "reflected",
            VulnClass::Stored => "stored",
            VulnClass::Dom => "dom",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            VulnClass::Reflected => "Reflected",
            VulnClass::Stored => "Stored",
            VulnClass::Dom => "DOM",
        }
    }
}

impl fmt::Display for VulnClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status, headers and body of one response.
///
/// Local-file reads and exhausted tests carry no status code. Header names
/// are stored lowercased.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ResponseSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            status: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn new(status: u16, headers: &[(&str, &str)], body: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            body: body.into(),
        }
    }

    /// Drain a live response into a snapshot
    pub async fn capture(response: reqwest::Response) -> Result<Self, ScanError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_lowercase(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(Self {
            status: Some(status),
            headers,
            body,
        })
    }

    pub fn status_text(&self) -> String {
        self.status.map(|s| s.to_string()).unwrap_or_default()
    }

    /// All headers serialized as `name: value` lines
    pub fn header_blob(&self) -> String {
        self.headers
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of testing one base payload against one endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub success: bool,
    pub response: ResponseSnapshot,
    /// The confirming candidate, or the original payload on failure
    pub payload: String,
}

/// One line of scan output, appended in traversal order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanRecord {
    pub url: String,
    pub endpoint_type: String,
    pub endpoint_url: String,
    pub endpoint_method: HttpMethod,
    pub endpoint_params: IndexMap<String, String>,
    pub payload: String,
    pub success: bool,
    pub waf: Option<String>,
    pub vuln_type: VulnClass,
}

impl ScanRecord {
    pub fn new(
        page_url: &str,
        endpoint: &Endpoint,
        outcome: &TestOutcome,
        waf: Option<String>,
    ) -> Self {
        Self {
            url: page_url.to_string(),
            endpoint_type: endpoint.kind().to_string(),
            endpoint_url: endpoint.url().to_string(),
            endpoint_method: endpoint.method(),
            endpoint_params: endpoint.params(),
            payload: outcome.payload.clone(),
            success: outcome.success,
            waf,
            vuln_type: endpoint.vuln_class(),
        }
    }
}
