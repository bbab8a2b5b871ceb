// src/xss/http_client.rs
use crate::xss::config::XssConfig;
use crate::xss::error::ScanError;
use indexmap::IndexMap;
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// HTTP client wrapper for the XSS scanner
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: Arc<XssConfig>,
}

impl HttpClient {
    /// Create a new HTTP client with scanner configuration
    pub fn new(config: Arc<XssConfig>) -> Result<Self, ScanError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn get(&self, url: &str) -> Result<Response, ScanError> {
        Ok(self.with_session(self.client.get(url)).send().await?)
    }

    /// GET with extra query parameters appended
    pub async fn get_with_query(
        &self,
        url: &str,
        params: &IndexMap<String, String>,
    ) -> Result<Response, ScanError> {
        let request = self.client.get(url).query(params);
        Ok(self.with_session(request).send().await?)
    }

    /// POST url-encoded form data
    pub async fn post_form(
        &self,
        url: &str,
        form: &IndexMap<String, String>,
    ) -> Result<Response, ScanError> {
        let request = self.client.post(url).form(form);
        Ok(self.with_session(request).send().await?)
    }

    /// GET and read the body as text
    pub async fn fetch_text(&self, url: &str) -> Result<String, ScanError> {
        Ok(self.get(url).await?.text().await?)
    }

    fn with_session(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (key, value) in &self.config.custom_headers {
            request = request.header(key, value);
        }

        if let Some(ref cookies) = self.config.cookies {
            request = request.header("Cookie", cookies);
        }

        request
    }
}

/// Resolve `href` against `base`; absolute hrefs are returned as-is
pub fn resolve_url(base: &str, href: &str) -> Result<Url, ScanError> {
    match Url::parse(href) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(base)?.join(href)?),
        Err(e) => Err(e.into()),
    }
}

/// Set one query parameter, keeping the other keys in their order.
///
/// Repeated keys collapse to one entry holding the last value. A missing
/// parameter is appended.
pub fn set_query_param(url: &mut Url, param: &str, value: &str) {
    let mut pairs: IndexMap<String, String> = IndexMap::new();
    for (k, v) in url.query_pairs() {
        pairs.insert(k.into_owned(), v.into_owned());
    }
    pairs.insert(param.to_string(), value.to_string());

    url.query_pairs_mut().clear().extend_pairs(pairs.iter());
}

/// Same scheme, host and port
pub fn is_same_origin(url: &Url, base: &Url) -> bool {
    url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn create_test_config() -> Arc<XssConfig> {
        Arc::new(XssConfig {
            target: "https://example.com".to_string(),
            timeout_secs: 5,
            user_agent: "test-agent".to_string(),
            custom_headers: HashMap::from([("X-Test".to_string(), "1".to_string())]),
            cookies: Some("PHPSESSID=test123; security=low".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_http_client_creation() {
        assert!(HttpClient::new(create_test_config()).is_ok());
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = "https://example.com/app/page.html";
        assert_eq!(
            resolve_url(base, "/x?a=1").unwrap().as_str(),
            "https://example.com/x?a=1"
        );
        assert_eq!(
            resolve_url(base, "next?b=2").unwrap().as_str(),
            "https://example.com/app/next?b=2"
        );
        assert_eq!(
            resolve_url(base, "https://other.test/q").unwrap().as_str(),
            "https://other.test/q"
        );
        assert_eq!(
            resolve_url("file:///tmp/site/index.html", "go").unwrap().as_str(),
            "file:///tmp/site/go"
        );
    }

    #[test]
    fn test_set_query_param_replaces_value() {
        let mut url = Url::parse("https://example.com/s?a=1&q=old&b=2").unwrap();
        set_query_param(&mut url, "q", "<b>");
        assert_eq!(url.as_str(), "https://example.com/s?a=1&q=%3Cb%3E&b=2");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[1], ("q".to_string(), "<b>".to_string()));
    }

    #[test]
    fn test_set_query_param_appends_missing() {
        let mut url = Url::parse("https://example.com/s").unwrap();
        set_query_param(&mut url, "q", "x y");
        assert_eq!(url.as_str(), "https://example.com/s?q=x+y");
    }

    #[test]
    fn test_same_origin() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(is_same_origin(&Url::parse("https://example.com:443/a").unwrap(), &base));
        assert!(!is_same_origin(&Url::parse("http://example.com/a").unwrap(), &base));
        assert!(!is_same_origin(&Url::parse("https://cdn.example.com/a").unwrap(), &base));
        assert!(!is_same_origin(&Url::parse("https://example.com:8443/a").unwrap(), &base));
    }
}
