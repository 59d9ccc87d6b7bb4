//! HTTP fetcher: GET + status check + JSON decode under a per-request deadline.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{Comment, Post};

use super::ResourceFetcher;

/// Production [`ResourceFetcher`] issuing HTTP GET requests.
///
/// The client is owned by the fetcher and shared by every request it makes, so
/// connections are pooled across items and workers.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    dependent_segment: String,
}

impl HttpFetcher {
    /// Build a fetcher with its own client configured from `config`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::HttpClient)?;
        Ok(Self::with_client(client, config))
    }

    /// Build a fetcher around an existing client.
    ///
    /// The deadline from `config` is still enforced on every request, whatever
    /// timeout the client itself carries.
    pub fn with_client(client: reqwest::Client, config: &FetchConfig) -> Self {
        Self {
            client,
            timeout: config.timeout,
            dependent_segment: config.dependent_segment.trim_matches('/').to_string(),
        }
    }

    /// URL of the dependent resource for `address`.
    pub fn dependent_url(&self, address: &str) -> String {
        format!(
            "{}/{}",
            address.trim_end_matches('/'),
            self.dependent_segment
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> std::result::Result<T, FetchError> {
        let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidRequest {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidRequest {
                url: url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let request = async {
            let response = self
                .client
                .get(parsed)
                .send()
                .await
                .map_err(|e| self.transport_error(url, e))?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| self.transport_error(url, e))?;

            serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
                url: url.to_string(),
                source: e,
            })
        };

        // Dropping the request future on expiry tears down the in-flight connection
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    fn transport_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait::async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch_primary(&self, address: &str) -> std::result::Result<Post, FetchError> {
        self.get_json(address).await
    }

    async fn fetch_dependent(&self, address: &str) -> std::result::Result<Vec<Comment>, FetchError> {
        let url = self.dependent_url(address);
        self.get_json(&url).await
    }
}
