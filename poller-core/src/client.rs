use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Request};
use std::fmt::Debug;

/// Status and body of one hourly-forecast request. Non-200 statuses are not
/// errors at this level; the poll cycle decides what to do with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyReply {
    pub status: u16,
    pub body: String,
}

impl HourlyReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Fetches the hourly point forecast for a coordinate pair.
#[async_trait]
pub trait HourlyClient: Send + Sync + Debug {
    async fn fetch_hourly(&self, latitude: f64, longitude: f64) -> Result<HourlyReply>;
}

/// Client for the site-specific `point/hourly` endpoint.
#[derive(Debug, Clone)]
pub struct DataHubClient {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl DataHubClient {
    /// `endpoint` is the API base, without the `/point/hourly` suffix.
    pub fn new(api_key: String, endpoint: impl Into<String>) -> Self {
        Self {
            api_key,
            endpoint: endpoint.into(),
            http: Client::new(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}/point/hourly", self.endpoint.trim_end_matches('/'))
    }

    /// Build the `point/hourly` request for one coordinate pair.
    pub fn request(&self, latitude: f64, longitude: f64) -> reqwest::Result<Request> {
        let latitude = latitude.to_string();
        let longitude = longitude.to_string();

        self.http
            .get(self.url())
            .header("apikey", self.api_key.as_str())
            .query(&[
                ("excludeParameterMetadata", "true"),
                ("includeLocationName", "true"),
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
            ])
            .build()
    }
}

#[async_trait]
impl HourlyClient for DataHubClient {
    async fn fetch_hourly(&self, latitude: f64, longitude: f64) -> Result<HourlyReply> {
        let request = self
            .request(latitude, longitude)
            .context("Failed to build DataHub point/hourly request")?;

        let res = self
            .http
            .execute(request)
            .await
            .context("Failed to send request to DataHub (point/hourly)")?;

        let status = res.status().as_u16();
        let body = res
            .text()
            .await
            .context("Failed to read DataHub point/hourly response body")?;

        Ok(HourlyReply { status, body })
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_appends_point_hourly() {
        let client = DataHubClient::new("KEY".into(), "https://example.test/sitespecific/v0/");
        assert_eq!(client.url(), "https://example.test/sitespecific/v0/point/hourly");
    }

    #[test]
    fn request_carries_query_and_api_key() {
        let client = DataHubClient::new("SECRET".into(), "https://example.test/sitespecific/v0");

        let request = client.request(50.72, -3.53).expect("request should build");

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/sitespecific/v0/point/hourly");
        let query: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            query,
            vec![
                ("excludeParameterMetadata".to_string(), "true".to_string()),
                ("includeLocationName".to_string(), "true".to_string()),
                ("latitude".to_string(), "50.72".to_string()),
                ("longitude".to_string(), "-3.53".to_string()),
            ]
        );
        assert_eq!(request.headers()["apikey"], "SECRET");
    }

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }
}
