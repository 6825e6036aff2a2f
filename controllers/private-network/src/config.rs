//! Controller configuration
//!
//! Read once from the environment in `main` and passed down explicitly.

use crate::error::ControllerError;
use regex::Regex;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Default pattern for `Node.spec.providerID`.
///
/// Matches either `scaleway://<product>/<zone>/<uuid>` or `scaleway://<uuid>`.
pub const DEFAULT_PROVIDER_ID_PATTERN: &str =
    r"scaleway://((?P<product>.*?)/(?P<zone>.*?)/(?P<uuid>.*)|(?P<uuid2>.*))";

const DEFAULT_API_URL: &str = "https://api.scaleway.com";
const DEFAULT_ZONE: &str = "fr-par-1";
const DEFAULT_REQUEUE_SECONDS: u64 = 30;
const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_CONCURRENCY: u16 = 3;

/// Runtime configuration of the controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Access key, only logged for identification
    pub access_key: Option<String>,
    /// Secret key sent to the Scaleway API
    pub secret_key: String,
    /// Zone used when a PrivateNetwork or provider ID does not name one
    pub default_zone: String,
    /// Scaleway API base URL
    pub api_url: String,
    /// Delay of the fixed reschedule used for "not ready yet" conditions
    pub requeue_after: Duration,
    /// Pattern used to parse `Node.spec.providerID`
    pub provider_id_pattern: Regex,
    /// Listen address of the probes and metrics server
    pub metrics_addr: SocketAddr,
    /// Maximum number of concurrent PrivateNetwork reconciliations
    pub concurrency: u16,
}

impl ControllerConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SCW_SECRET_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig(
                    "SCW_SECRET_KEY environment variable is required".to_string(),
                )
            })?;

        let requeue_seconds = match lookup("REQUEUE_SECONDS") {
            Some(v) => v.parse::<u64>().map_err(|e| {
                ControllerError::InvalidConfig(format!("REQUEUE_SECONDS={}: {}", v, e))
            })?,
            None => DEFAULT_REQUEUE_SECONDS,
        };
        if requeue_seconds == 0 {
            return Err(ControllerError::InvalidConfig(
                "REQUEUE_SECONDS must be greater than 0".to_string(),
            ));
        }

        let pattern = lookup("PROVIDER_ID_PATTERN")
            .unwrap_or_else(|| DEFAULT_PROVIDER_ID_PATTERN.to_string());
        let provider_id_pattern = Regex::new(&pattern).map_err(|e| {
            ControllerError::InvalidConfig(format!("PROVIDER_ID_PATTERN: {}", e))
        })?;
        if !provider_id_pattern
            .capture_names()
            .flatten()
            .any(|n| n == "uuid" || n == "uuid2")
        {
            return Err(ControllerError::InvalidConfig(
                "PROVIDER_ID_PATTERN must define a `uuid` or `uuid2` capture group".to_string(),
            ));
        }

        let metrics_addr_str =
            lookup("METRICS_ADDR").unwrap_or_else(|| DEFAULT_METRICS_ADDR.to_string());
        let metrics_addr = metrics_addr_str.parse::<SocketAddr>().map_err(|e| {
            ControllerError::InvalidConfig(format!("METRICS_ADDR={}: {}", metrics_addr_str, e))
        })?;

        let concurrency = match lookup("CONTROLLER_CONCURRENCY") {
            Some(v) => v.parse::<u16>().map_err(|e| {
                ControllerError::InvalidConfig(format!("CONTROLLER_CONCURRENCY={}: {}", v, e))
            })?,
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            access_key: lookup("SCW_ACCESS_KEY").filter(|v| !v.is_empty()),
            secret_key,
            default_zone: lookup("SCW_DEFAULT_ZONE")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_ZONE.to_string()),
            api_url: lookup("SCW_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            requeue_after: Duration::from_secs(requeue_seconds),
            provider_id_pattern,
            metrics_addr,
            concurrency,
        })
    }
}
