use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use wikiref_core::config::HttpConfig;
use wikiref_core::error::{ResolveError, UnreachableCause};

/// Read-only HTTP boundary of the resolver. Every remote call goes through
/// this trait so the whole pipeline can run against a scripted transport in
/// tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, ResolveError>;
    async fn get_text(&self, url: &Url) -> Result<String, ResolveError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    max_body_size: usize,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| ResolveError::Other(e.into()))?;

        Ok(Self {
            client,
            max_body_size: config.max_body_size_mb * 1024 * 1024,
        })
    }

    fn classify(url: &Url, error: reqwest::Error) -> ResolveError {
        warn!(url = %url, error = %error, "fetch failed");
        let cause = if error.is_timeout() {
            UnreachableCause::Timeout
        } else if format!("{error:?}").to_lowercase().contains("certificate") {
            UnreachableCause::BadCertificate
        } else {
            UnreachableCause::Connect
        };
        ResolveError::Unreachable(cause)
    }

    async fn fetch(&self, url: &Url) -> Result<(reqwest::StatusCode, Url, Vec<u8>), ResolveError> {
        debug!(url = %url, "fetching");
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = resp.status();
        let final_url = resp.url().clone();

        // Hosting platforms answer a request for a nonexistent community
        // with a redirect to their "not a valid community" page.
        if final_url.host_str() != url.host_str()
            && final_url.path().contains("Not_a_valid_community")
        {
            return Err(ResolveError::WikiNotFound);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ResolveError::PermissionDenied);
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| Self::classify(url, e))?;
        if body.len() > self.max_body_size {
            return Err(ResolveError::Malformed(format!(
                "body too large: {} bytes",
                body.len()
            )));
        }
        Ok((status, final_url, body.to_vec()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &Url) -> Result<serde_json::Value, ResolveError> {
        let (status, _, body) = self.fetch(url).await?;
        serde_json::from_slice(&body).map_err(|_| {
            ResolveError::Malformed(format!("non-JSON response (status {})", status.as_u16()))
        })
    }

    async fn get_text(&self, url: &Url) -> Result<String, ResolveError> {
        let (_, _, body) = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
