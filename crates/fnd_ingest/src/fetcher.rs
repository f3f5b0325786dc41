use async_trait::async_trait;
use fnd_core::{NewsSource, RawArticle, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::logging::Logger;
use crate::rate_limiter::RateLimiter;

pub const GUARDIAN_API_URL: &str = "https://content.guardianapis.com/search";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub api_url: String,
    pub api_key: String,
    pub page_size: u32,
    pub timeout: Duration,
    /// Skip TLS certificate checks. Off unless explicitly configured.
    pub accept_invalid_certs: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            api_url: GUARDIAN_API_URL.to_string(),
            api_key: String::new(),
            page_size: 10,
            timeout: Duration::from_secs(20),
            accept_invalid_certs: false,
        }
    }
}

impl FetcherConfig {
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()?;
        Ok(client)
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawArticle>,
}

/// Pulls the newest articles of a section from the Guardian content API.
pub struct GuardianFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    limiter: Arc<RateLimiter>,
    logger: Logger,
}

impl GuardianFetcher {
    pub fn new(config: FetcherConfig, limiter: Arc<RateLimiter>) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self {
            client,
            config,
            limiter,
            logger: Logger::new().with_new_prefixes("📰 guardian"),
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Newest articles for a section. Failures are logged and yield an empty batch.
    pub async fn fetch(&self, section: Option<&str>) -> Vec<RawArticle> {
        match self.fetch_logged(section).await {
            Ok(articles) => articles,
            Err(_) => Vec::new(),
        }
    }

    /// Same as [`GuardianFetcher::fetch`] but surfaces the failure.
    pub async fn try_fetch(&self, section: Option<&str>) -> Result<Vec<RawArticle>> {
        let page_size = self.config.page_size.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("api-key", self.config.api_key.as_str()),
            ("show-fields", "all"),
            ("page-size", page_size.as_str()),
            ("order-by", "newest"),
        ];
        if let Some(section) = section {
            query.push(("section", section));
        }

        let response = self
            .limiter
            .request_with_retry(|| self.client.get(&self.config.api_url).query(&query))
            .await?;
        let envelope: SearchEnvelope = response.json().await?;
        Ok(envelope.response.results)
    }

    async fn fetch_logged(&self, section: Option<&str>) -> Result<Vec<RawArticle>> {
        let logger = self.logger.with_prefix(format!("[{}]", section.unwrap_or("all")));
        let result = self.try_fetch(section).await;
        match &result {
            Ok(articles) => logger.debug(&format!("Fetched {} articles", articles.len())),
            Err(e) => logger.error(&format!("Error fetching news: {}", e)),
        }
        result
    }
}

/// The pipeline needs the failure to keep the category watermark untouched.
#[async_trait]
impl NewsSource for GuardianFetcher {
    fn name(&self) -> &str {
        "guardian"
    }

    async fn fetch(&self, section: Option<&str>) -> Result<Vec<RawArticle>> {
        self.fetch_logged(section).await
    }
}
