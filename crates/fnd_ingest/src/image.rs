use async_trait::async_trait;
use fnd_core::{ImageResolver, Result};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::fetcher::FetcherConfig;

/// Lead image selector on Guardian article pages.
const ARTICLE_IMAGE_SELECTOR: &str = "article img.dcr-evn1e9";
const OG_IMAGE_SELECTOR: &str = "meta[property='og:image']";

/// Scrapes the article page for its lead image.
pub struct HtmlImageResolver {
    client: reqwest::Client,
}

impl HtmlImageResolver {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetcherConfig) -> Result<Self> {
        Ok(Self::new(config.build_client()?))
    }
}

/// First lead image `src`, falling back to the Open Graph image.
pub fn extract_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let lead = Selector::parse(ARTICLE_IMAGE_SELECTOR).ok().and_then(|selector| {
        document
            .select(&selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string)
    });
    if lead.is_some() {
        return lead;
    }

    let selector = Selector::parse(OG_IMAGE_SELECTOR).ok()?;
    document
        .select(&selector)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ImageResolver for HtmlImageResolver {
    async fn resolve(&self, article_url: &str) -> Option<String> {
        let response = match self.client.get(article_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error scraping image from {}: {}", article_url, e);
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("Image page {} returned {}", article_url, response.status());
            return None;
        }
        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Error reading page {}: {}", article_url, e);
                return None;
            }
        };
        extract_image(&html)
    }
}
