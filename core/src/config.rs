//! Serializable client settings for embedding in a host application's
//! config file.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;
use crate::options::ClientOption;

/// Settings that map one-to-one onto construction options.
///
/// ```ignore
/// let config: ClientConfig = serde_json::from_str(r#"{
///     "base_url": "https://billing.internal/",
///     "timeout_secs": 30,
///     "headers": { "X-Caller": "orders" }
/// }"#)?;
/// let client = config.into_client()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Per-call timeout; `0` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    /// Laid over the default headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_accept_invalid_certs() -> bool {
    true
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: default_accept_invalid_certs(),
            headers: BTreeMap::new(),
        }
    }

    pub fn into_client(self) -> Result<Client> {
        let options = [
            ClientOption::timeout(Duration::from_secs(self.timeout_secs)),
            ClientOption::accept_invalid_certs(self.accept_invalid_certs),
        ];
        let client = Client::new(&self.base_url, options)?;
        Ok(client.with_headers(self.headers))
    }
}
