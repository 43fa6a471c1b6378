//! HTTP utilities for Linode REST API calls

use crate::error::{ApiError, Error, Result};
use reqwest::{Certificate, Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::path::Path;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Build an [`ApiError`] from the Linode error envelope:
/// `{"errors": [{"reason": "...", "field": "..."}]}`
pub fn parse_api_error(status: StatusCode, body: &str) -> ApiError {
    let errors: Vec<String> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("errors").and_then(|e| e.as_array()).cloned())
        .map(|arr| arr.iter().filter_map(format_reason).collect())
        .unwrap_or_default();

    let errors = if errors.is_empty() {
        vec![status
            .canonical_reason()
            .unwrap_or("API request failed")
            .to_string()]
    } else {
        errors
    };

    ApiError::new(status.as_u16(), errors)
}

fn format_reason(entry: &Value) -> Option<String> {
    let reason = entry.get("reason").and_then(|v| v.as_str())?;
    match entry.get("field").and_then(|v| v.as_str()) {
        Some(field) => Some(format!("{}: {}", field, reason)),
        None => Some(reason.to_string()),
    }
}

/// HTTP client wrapper for Linode API calls
#[derive(Clone)]
pub struct LinodeHttpClient {
    client: Client,
}

impl LinodeHttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: &str, ca_path: Option<&Path>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);

        if let Some(path) = ca_path {
            let pem = std::fs::read(path).map_err(|e| {
                Error::Config(format!("failed to read CA bundle {}: {}", path.display(), e))
            })?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Make a GET request, optionally with an `X-Filter` header
    pub async fn get(&self, url: &str, token: &str, filter: Option<&Value>) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(url).bearer_auth(token);
        if let Some(filter) = filter {
            request = request.header("X-Filter", filter.to_string());
        }

        self.execute(request).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.execute(request).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);

        let request = self.client.put(url).bearer_auth(token).json(body);
        self.execute(request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("DELETE {}", url);

        let request = self.client.delete(url).bearer_auth(token);
        self.execute(request).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Only the sanitized, truncated body reaches the log
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(parse_api_error(status, &body).into());
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}
