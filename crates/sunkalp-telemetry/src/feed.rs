//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Remote channel feed wire types and HTTP client."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sunkalp_common::config::TelemetryConfig;
use tracing::debug;
use url::Url;

use crate::reading::Reading;
use crate::{Result, TelemetryError};

/// One raw sample as sent by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedRecord {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub entry_id: Option<u64>,
    #[serde(default)]
    pub field1: Option<Value>,
    #[serde(default)]
    pub field2: Option<Value>,
    #[serde(default)]
    pub field3: Option<Value>,
    #[serde(default)]
    pub field4: Option<Value>,
    #[serde(default)]
    pub field5: Option<Value>,
}

/// Body of `GET /channels/{id}/feeds.json`.
///
/// Only the feed list is read; the channel metadata block is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FeedResponse {
    #[serde(default)]
    pub feeds: Option<Vec<FeedRecord>>,
}

impl FeedResponse {
    /// Normalize every record, oldest first.
    pub fn into_readings(self) -> Result<Vec<Reading>> {
        let feeds = self.feeds.ok_or(TelemetryError::MissingFeeds)?;
        Ok(feeds.iter().map(Reading::from_record).collect())
    }
}

/// Anything able to produce the latest readings for a channel.
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    /// Fetch and normalize the most recent window of samples.
    async fn fetch_window(&self, channel_id: &str, api_key: &str) -> Result<Vec<Reading>>;
}

/// HTTP client for ThingSpeak-compatible channel feeds.
#[derive(Debug, Clone)]
pub struct ThingSpeakClient {
    http: reqwest::Client,
    endpoint: Url,
    results: usize,
}

impl ThingSpeakClient {
    /// Build a client from the telemetry section of the configuration.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.results, config.request_timeout)
    }

    pub fn new(endpoint: Url, results: usize, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("sunkalp/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint,
            results,
        })
    }

    /// Number of samples requested per call.
    pub fn results(&self) -> usize {
        self.results
    }

    /// Full request URL for a channel, including the API key.
    pub fn feed_url(&self, channel_id: &str, api_key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TelemetryError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["channels", channel_id, "feeds.json"]);
        url.query_pairs_mut()
            .clear()
            .append_pair("api_key", api_key)
            .append_pair("results", &self.results.to_string());
        Ok(url)
    }
}

#[async_trait]
impl FeedSource for ThingSpeakClient {
    async fn fetch_window(&self, channel_id: &str, api_key: &str) -> Result<Vec<Reading>> {
        let url = self.feed_url(channel_id, api_key)?;
        debug!(channel_id, results = self.results, "requesting channel feed");
        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        let parsed: FeedResponse = serde_json::from_slice(&body)?;
        let readings = parsed.into_readings()?;
        debug!(channel_id, samples = readings.len(), "channel feed received");
        Ok(readings)
    }
}
