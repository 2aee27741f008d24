//! RabbitMQ management HTTP API client.
//!
//! Only used by the caller to resolve a queue's type and starting message
//! counts; the managers themselves never touch it.

use crate::error::ApiError;
use serde::Deserialize;
use std::fmt;
use url::Url;

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;

/// Broker-side queue implementation, which determines the manager variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    Classic,
    Quorum,
    Stream,
}

impl Default for QueueType {
    fn default() -> Self {
        Self::Classic
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Classic => "classic",
            Self::Quorum => "quorum",
            Self::Stream => "stream",
        };
        write!(f, "{name}")
    }
}

/// Metadata for a named queue as reported by the management API.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub queue_type: QueueType,
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub messages_ready: u64,
    #[serde(default)]
    pub messages_unacknowledged: u64,
}

/// Thin client for the management HTTP API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: String, username: String, password: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            username,
            password,
        }
    }

    /// Build a client from the AMQP endpoint, taking credentials from its
    /// userinfo. Without an explicit API endpoint the conventional default
    /// is derived by prefixing the AMQP port with `1` (5672 becomes 15672).
    pub fn from_amqp_endpoint(
        amqp_endpoint: &str,
        api_endpoint: Option<&str>,
    ) -> Result<Self, ApiError> {
        let parsed = Url::parse(amqp_endpoint).map_err(|err| ApiError::InvalidEndpoint {
            endpoint: amqp_endpoint.to_string(),
            message: err.to_string(),
        })?;

        let host = parsed
            .host_str()
            .ok_or_else(|| ApiError::InvalidEndpoint {
                endpoint: amqp_endpoint.to_string(),
                message: "missing host".to_string(),
            })?
            .to_string();
        let port = parsed.port().unwrap_or(5672);

        let base_url = match api_endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => format!("http://{host}:1{port}"),
        };

        let username = parsed.username().to_string();
        let password = parsed.password().unwrap_or_default().to_string();

        Ok(Self::new(base_url, username, password))
    }

    /// Look up a queue by name across all vhosts.
    pub async fn queue_info(&self, queue: &str) -> Result<QueueInfo, ApiError> {
        let url = format!("{}/api/queues", self.base_url.trim_end_matches('/'));
        let queues: Vec<QueueInfo> = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        queues
            .into_iter()
            .find(|info| info.name == queue)
            .ok_or_else(|| ApiError::QueueNotFound {
                queue: queue.to_string(),
            })
    }
}
