//! Common utilities for the Scaleway API client
//!
//! Provides the authenticated HTTP wrapper shared by every API call.

use crate::error::ScalewayError;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Header carrying the secret key
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// Header carrying the total number of items of a paginated list
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// HTTP client wrapper with authentication
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Turn a non-success response into an error, keeping the body for context
    async fn check(method: &str, path: &str, response: Response) -> Result<Response, ScalewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(ScalewayError::NotFound(format!(
                "{} {} - {}",
                method, path, body
            ))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ScalewayError::Authentication(
                format!("{} {} failed: {} - {}", method, path, status, body),
            )),
            _ => Err(ScalewayError::Api(format!(
                "{} {} failed: {} - {}",
                method, path, status, body
            ))),
        }
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ScalewayError> {
        let (value, _) = self.get_with_total(path).await?;
        Ok(value)
    }

    /// Make a GET request and return the `x-total-count` header alongside the body
    pub async fn get_with_total<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<(T, Option<u64>), ScalewayError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(AUTH_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = Self::check("GET", path, response).await?;

        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let text = response.text().await?;
        let value = serde_json::from_str(&text).map_err(|e| {
            ScalewayError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })?;
        Ok((value, total))
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ScalewayError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        let response = Self::check("POST", path, response).await?;

        response.json().await.map_err(ScalewayError::Http)
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), ScalewayError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header(AUTH_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::check("DELETE", path, response).await?;

        Ok(())
    }

    /// Build query string from filters, skipping empty values
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http() -> HttpClient {
        HttpClient::new(Client::new(), "https://api.scaleway.com/".to_string(), "token".to_string())
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let http = http();
        assert_eq!(http.base_url(), "https://api.scaleway.com");
        assert_eq!(
            http.build_url("/instance/v1/zones/fr-par-1/servers"),
            "https://api.scaleway.com/instance/v1/zones/fr-par-1/servers"
        );
    }

    #[test]
    fn test_query_string_encodes_and_skips_empty() {
        let http = http();
        let qs = http.build_query_string(&[("name", "node 1"), ("tags", ""), ("page", "2")]);
        assert_eq!(qs, "name=node%201&page=2");
    }
}
