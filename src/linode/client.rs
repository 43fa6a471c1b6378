//! Linode Client
//!
//! Main client for interacting with the Linode API, combining the bearer
//! token, the versioned base URL and the HTTP wrapper.

use super::http::LinodeHttpClient;
use crate::config::ApiSettings;
use crate::error::{Error, Result};
use serde_json::Value;

/// Main Linode client
#[derive(Clone)]
pub struct LinodeClient {
    pub http: LinodeHttpClient,
    token: String,
    base_url: String,
}

impl std::fmt::Debug for LinodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinodeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl LinodeClient {
    /// Create a new Linode client from resolved connection settings
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let user_agent = match settings.ua_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{} lincloud/{}", prefix, env!("CARGO_PKG_VERSION"))
            }
            _ => format!("lincloud/{}", env!("CARGO_PKG_VERSION")),
        };

        let http = LinodeHttpClient::new(&user_agent, settings.ca_path.as_deref())?;

        Ok(Self {
            http,
            token: settings.api_token.clone(),
            base_url: build_base_url(&settings.api_url, &settings.api_version)?,
        })
    }

    /// Versioned API root, e.g. `https://api.linode.com/v4beta`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an absolute URL for an API path such as `/domains/123`
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Make a GET request to an API path
    pub async fn get(&self, path: &str) -> Result<Value> {
        self.http.get(&self.url(path), &self.token, None).await
    }

    /// Make a GET request with an `X-Filter` expression
    pub async fn get_filtered(&self, path: &str, filter: &Value) -> Result<Value> {
        self.http.get(&self.url(path), &self.token, Some(filter)).await
    }

    /// Make a POST request to an API path
    pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.http.post(&self.url(path), &self.token, body).await
    }

    /// Make a PUT request to an API path
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.http.put(&self.url(path), &self.token, body).await
    }

    /// Make a DELETE request to an API path
    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.http.delete(&self.url(path), &self.token).await
    }

    /// Load a single object, mapping a 404 to [`Error::NotFound`]
    pub async fn load(&self, path: &str) -> Result<Value> {
        match self.get(path).await {
            Err(Error::Api(err)) if err.is_not_found() => Err(Error::NotFound(path.to_string())),
            other => other,
        }
    }
}

fn build_base_url(api_url: &str, api_version: &str) -> Result<String> {
    let parsed = url::Url::parse(api_url)
        .map_err(|e| Error::Config(format!("invalid api_url {}: {}", api_url, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "api_url must use http or https, got {}",
            parsed.scheme()
        )));
    }

    Ok(format!(
        "{}/{}",
        parsed.as_str().trim_end_matches('/'),
        api_version.trim_matches('/')
    ))
}
