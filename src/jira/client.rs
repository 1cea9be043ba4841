//! HTTP client for the Jira Cloud REST API
//!
//! Wraps reqwest with the retry policy the Jira platform expects: honor
//! `Retry-After` (seconds or HTTP date) first, then `X-RateLimit-Reset`
//! (epoch seconds), then exponential backoff with a small jitter so
//! concurrent connections do not stampede.

use crate::config::HttpClientConfig;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::{Method, StatusCode, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
const JITTER_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("jira request failed with status {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("jira request to {url} timed out")]
    Timeout { url: String },
    #[error("jira request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

pub fn should_retry_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

fn clamp(value: u64, min: u64, max: u64) -> u64 {
    value.max(min).min(max)
}

/// Retry delay in milliseconds for a failed attempt.
///
/// `Retry-After` wins when present and parseable, then `X-RateLimit-Reset`,
/// then exponential backoff from the configured floor. Header-derived delays
/// are clamped into `[min_delay_ms, max_delay_ms]` and taken as-is; only the
/// exponential fallback gets jitter, so a server-mandated wait is honored
/// exactly.
pub fn compute_retry_delay(
    attempt: u32,
    retry_after: Option<&str>,
    rate_limit_reset: Option<&str>,
    now: DateTime<Utc>,
    config: &HttpClientConfig,
) -> u64 {
    if let Some(raw) = retry_after {
        let raw = raw.trim();
        if let Ok(secs) = raw.parse::<u64>() {
            return clamp(secs * 1_000, config.min_delay_ms, config.max_delay_ms);
        }
        if let Ok(at) = DateTime::parse_from_rfc2822(raw) {
            let delta_ms = (at.with_timezone(&Utc) - now).num_milliseconds().max(0) as u64;
            return clamp(delta_ms, config.min_delay_ms, config.max_delay_ms);
        }
    }
    if let Some(raw) = rate_limit_reset {
        if let Ok(epoch_secs) = raw.trim().parse::<i64>() {
            let delta_ms = ((epoch_secs - now.timestamp()) * 1_000).max(0) as u64;
            return clamp(delta_ms, config.min_delay_ms, config.max_delay_ms);
        }
    }
    let exponential = config.min_delay_ms.saturating_mul(1u64 << attempt.min(16));
    with_jitter(exponential.min(config.max_delay_ms))
}

fn with_jitter(delay_ms: u64) -> u64 {
    delay_ms + rand::thread_rng().gen_range(0..JITTER_MS)
}

/// A successful response, classified by what the server actually sent back.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    /// 204 or an empty body
    None,
    Json(serde_json::Value),
    /// 2xx with a non-JSON content type
    Text(String),
}

/// Authenticated client for the Atlassian API gateway.
#[derive(Debug, Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    api_base: String,
    config: HttpClientConfig,
}

impl JiraClient {
    pub fn new(api_base: impl Into<String>, config: HttpClientConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.into(),
            config,
        })
    }

    /// Agile API base for a connected site, keyed by its cloud id.
    pub fn agile_url(&self, cloud_id: &str, path: &str) -> String {
        format!(
            "{}/ex/jira/{}/rest/agile/1.0{}",
            self.api_base.trim_end_matches('/'),
            cloud_id,
            path
        )
    }

    /// GET a resource as typed JSON. 204 and empty bodies come back as
    /// `Ok(None)`; a non-JSON 2xx body is a decode error.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<Option<T>, ClientError> {
        match self.request(Method::GET, url, None, access_token).await? {
            ResponseBody::None => Ok(None),
            ResponseBody::Json(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| ClientError::Decode {
                    url: url.to_string(),
                    message: e.to_string(),
                }),
            ResponseBody::Text(text) => Err(ClientError::Decode {
                url: url.to_string(),
                message: format!("expected JSON, got: {}", truncate(&text, 200)),
            }),
        }
    }

    /// Issue a request with the full retry policy.
    ///
    /// Retries on 429 and 5xx and on network failures, up to the configured
    /// retry limit; every attempt gets the full timeout budget.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        access_token: &str,
    ) -> Result<ResponseBody, ClientError> {
        let mut attempt: u32 = 0;
        loop {
            let mut builder = self
                .http
                .request(method.clone(), url)
                .bearer_auth(access_token)
                .header(header::ACCEPT, "application/json");
            if let Some(body) = body {
                builder = builder.json(body);
            }
            let result = builder.send().await;

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    let client_err = if err.is_timeout() {
                        ClientError::Timeout {
                            url: url.to_string(),
                        }
                    } else {
                        ClientError::Network {
                            url: url.to_string(),
                            message: err.to_string(),
                        }
                    };
                    if attempt >= self.config.max_retries {
                        return Err(client_err);
                    }
                    let delay =
                        compute_retry_delay(attempt, None, None, Utc::now(), &self.config);
                    warn!(url, attempt, delay_ms = delay, error = %client_err, "request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                if status == StatusCode::NO_CONTENT {
                    return Ok(ResponseBody::None);
                }
                let is_json = response
                    .headers()
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.contains("application/json"));
                let bytes = response.bytes().await.map_err(|e| ClientError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
                if bytes.is_empty() {
                    return Ok(ResponseBody::None);
                }
                if is_json {
                    return serde_json::from_slice(&bytes)
                        .map(ResponseBody::Json)
                        .map_err(|e| ClientError::Decode {
                            url: url.to_string(),
                            message: e.to_string(),
                        });
                }
                return Ok(ResponseBody::Text(
                    String::from_utf8_lossy(&bytes).into_owned(),
                ));
            }

            if should_retry_status(status) && attempt < self.config.max_retries {
                let retry_after = header_str(&response, "retry-after");
                let reset = header_str(&response, "x-ratelimit-reset");
                let delay = compute_retry_delay(
                    attempt,
                    retry_after.as_deref(),
                    reset.as_deref(),
                    Utc::now(),
                    &self.config,
                );
                debug!(url, attempt, status = status.as_u16(), delay_ms = delay, "retryable status");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status,
                url: url.to_string(),
                body,
            });
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn header_str(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
