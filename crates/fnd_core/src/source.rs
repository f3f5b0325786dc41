use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

/// An article as returned by the upstream search endpoint.
///
/// Every field is optional so that one incomplete record never prevents the
/// rest of the response from being read; the pipeline validates per record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub web_title: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub web_publication_date: Option<String>,
    #[serde(default)]
    pub pillar_name: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub section_name: Option<String>,
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub fields: Option<RawFields>,
}

/// The `fields` bag requested with `show-fields=all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFields {
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub trail_text: Option<String>,
    #[serde(default)]
    pub body_text: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl RawArticle {
    pub fn body_text(&self) -> Option<&str> {
        self.fields.as_ref().and_then(|f| f.body_text.as_deref())
    }
}

/// Upstream news provider, queried per section.
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the newest articles for a section, or across all sections.
    async fn fetch(&self, section: Option<&str>) -> Result<Vec<RawArticle>>;
}

/// Best-effort lookup of a representative image for an article page.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// `None` when nothing usable was found or the lookup failed.
    async fn resolve(&self, article_url: &str) -> Option<String>;
}
