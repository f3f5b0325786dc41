use chrono::{DateTime, Utc};
use fnd_core::{Article, Category, Page};
use fnd_inference::{reliability_score, Assessment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub publication_date: DateTime<Utc>,
    pub news_category: String,
    pub prediction: bool,
    pub section_id: String,
    pub section_name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub web_url: String,
    pub img_url: String,
    pub reliability_score: i64,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            reliability_score: reliability_score(article.prediction, article.confidence),
            id: article.id,
            title: article.title,
            publication_date: article.publication_date,
            news_category: article.category,
            prediction: article.prediction,
            section_id: article.section_id,
            section_name: article.section_name,
            content_type: article.content_type.to_string(),
            web_url: article.source_url,
            img_url: article.image_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub count: u64,
    pub next_offset: Option<usize>,
    pub results: Vec<ArticleResponse>,
}

impl From<Page<Article>> for ListResponse {
    fn from(page: Page<Article>) -> Self {
        let next_offset = page.next_offset();
        Self {
            status: "success".to_string(),
            category: None,
            query: None,
            count: page.total,
            next_offset,
            results: page.items.into_iter().map(ArticleResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub title: Option<String>,
    pub text: Option<String>,
}

/// Rendering of an assessment with percentages as strings.
pub fn analyze_response(assessment: &Assessment) -> serde_json::Value {
    serde_json::json!({
        "status": "success",
        "prediction": assessment.is_real,
        "label": assessment.label(),
        "confidence": assessment.formatted_confidence(),
        "reliability_score": assessment.reliability_score,
        "probabilities": {
            "fake": format!("{:.2}%", assessment.fake_probability * 100.0),
            "real": format!("{:.2}%", assessment.real_probability * 100.0),
        },
        "analysis": {
            "risk_score": format!("{:.1}/100", assessment.risk.risk_score),
            "patterns": assessment.risk.interpretation,
        }
    })
}

#[derive(Debug, Serialize)]
pub struct CategoryStatus {
    pub name: String,
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub minutes_since_fetch: Option<i64>,
}

impl CategoryStatus {
    pub fn new(category: Category, now: DateTime<Utc>) -> Self {
        Self {
            minutes_since_fetch: category.last_fetch_at.map(|at| (now - at).num_minutes()),
            name: category.name,
            last_fetch_at: category.last_fetch_at,
        }
    }
}
