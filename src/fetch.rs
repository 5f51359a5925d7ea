use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::constants::USER_AGENT;
use crate::feed::{parse_collection, FeatureCollection, FeedError};

/// Plain GET client for the two GeoJSON feeds. No retries.
#[derive(Clone)]
pub struct FeedClient {
    http: Client,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build reqwest client")?;
        Ok(Self { http })
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| FeedError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| FeedError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    pub async fn fetch_collection<P: DeserializeOwned + Default>(
        &self,
        url: &str,
    ) -> Result<FeatureCollection<P>, FeedError> {
        let body = self.fetch_bytes(url).await?;
        parse_collection(url, &body)
    }
}
