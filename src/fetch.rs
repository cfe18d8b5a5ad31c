//! Anonymous HTTP fetch.
//!
//! The refetch must not be linkable to the user's original visit: no cookie
//! store, no auth headers beyond what the request explicitly forwards, and
//! a fresh client per request. Status handling classifies failures for the
//! retry policy: 4xx is permanent, 429 is permanent only when the request
//! flags it (transient otherwise), everything else is transient.

use crate::config::JobConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::redirect;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request fetch parameters forwarded from the job request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Whether redirects are followed.
    pub redirect: RedirectMode,
    /// Maximum number of redirect hops when following.
    pub steps: u32,
    /// Classify HTTP 429 as permanent instead of transient.
    #[serde(rename = "treat429AsPermanentError")]
    pub treat_429_as_permanent: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            redirect: RedirectMode::Follow,
            steps: 3,
            treat_429_as_permanent: false,
        }
    }
}

/// Redirect handling, mirroring the fetch API's `redirect` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    #[default]
    Follow,
    Manual,
}

/// HTTP collaborator used by the job.
#[async_trait]
pub trait AnonymousHttp: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<String>;
}

/// Reqwest-backed anonymous client.
pub struct AnonymousClient {
    user_agent: String,
    timeout: Duration,
}

impl AnonymousClient {
    pub fn new(config: &JobConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_millis(config.fetch_timeout_ms),
        }
    }
}

#[async_trait]
impl AnonymousHttp for AnonymousClient {
    async fn get(&self, url: &str, options: &FetchOptions) -> Result<String> {
        let policy = match options.redirect {
            RedirectMode::Follow => redirect::Policy::limited(options.steps.max(1) as usize),
            RedirectMode::Manual => redirect::Policy::none(),
        };

        // A fresh client per request: no shared connection pool or cookie
        // state between refetches.
        let client = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .timeout(self.timeout)
            .redirect(policy)
            .build()
            .map_err(|err| Error::Fetch(err.to_string()))?;

        let mut request = client.get(url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|err| Error::Fetch(err.to_string()))?;

        classify_status(response.status().as_u16(), options.treat_429_as_permanent)?;

        response
            .text()
            .await
            .map_err(|err| Error::Fetch(err.to_string()))
    }
}

/// Map a response status to the retry classification: 4xx is permanent,
/// 429 only when flagged, everything else non-2xx is transient.
fn classify_status(status: u16, treat_429_as_permanent: bool) -> Result<()> {
    if status == 429 {
        return Err(if treat_429_as_permanent {
            Error::PermanentHttp(429)
        } else {
            Error::Fetch("http status 429".to_string())
        });
    }
    if (400..500).contains(&status) {
        return Err(Error::PermanentHttp(status));
    }
    if !(200..300).contains(&status) {
        return Err(Error::Fetch(format!("http status {status}")));
    }
    Ok(())
}
