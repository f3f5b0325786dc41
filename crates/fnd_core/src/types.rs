use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Stored in `image_url` when no representative image could be resolved.
pub const NO_IMAGE: &str = "None";

/// Category used when the upstream record carries no pillar.
pub const DEFAULT_CATEGORY: &str = "Undefined";

/// Confidence recorded when the classifier gave none.
pub const DEFAULT_CONFIDENCE: f64 = 0.84;

pub const MIN_TITLE_LEN: usize = 10;

/// Timestamp layout used by the upstream content API.
pub const PUBLICATION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Categories left active by an administrative reset.
pub const RESET_CATEGORIES: &[&str] = &["world", "politics", "technology", "science", "business"];

/// Upstream sections seeded by the category update command.
pub const GUARDIAN_SECTIONS: &[&str] = &[
    "sport",
    "world",
    "society",
    "books",
    "lifeandstyle",
    "artanddesign",
    "us-news",
    "commentisfree",
    "fashion",
    "news",
    "education",
    "politics",
    "tv-and-radio",
    "business",
    "uk-news",
    "environment",
    "football",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Article,
    Liveblog,
    Video,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Liveblog => "liveblog",
            ContentType::Video => "video",
        }
    }

    /// Maps an upstream `type` value, falling back to `article`.
    pub fn from_upstream(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "article" => Ok(ContentType::Article),
            "liveblog" => Ok(ContentType::Liveblog),
            "video" => Ok(ContentType::Video),
            other => Err(Error::MalformedRecord(format!("unknown content type: {}", other))),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An article ready to be persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub publication_date: DateTime<Utc>,
    pub category: String,
    pub section_id: String,
    pub section_name: String,
    pub content_type: ContentType,
    pub source_url: String,
    pub image_url: String,
    pub prediction: bool,
    pub confidence: f64,
}

impl NewArticle {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().chars().count() < MIN_TITLE_LEN {
            return Err(Error::MalformedRecord(format!(
                "title shorter than {} characters: {:?}",
                MIN_TITLE_LEN, self.title
            )));
        }
        let url = url::Url::parse(&self.source_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.source_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(self.source_url.clone()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::MalformedRecord(format!(
                "confidence out of range: {}",
                self.confidence
            )));
        }
        Ok(())
    }

    pub fn into_article(self, id: i64) -> Article {
        Article {
            id,
            title: self.title,
            publication_date: self.publication_date,
            category: self.category,
            section_id: self.section_id,
            section_name: self.section_name,
            content_type: self.content_type,
            source_url: self.source_url,
            image_url: self.image_url,
            prediction: self.prediction,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub publication_date: DateTime<Utc>,
    pub category: String,
    pub section_id: String,
    pub section_name: String,
    pub content_type: ContentType,
    pub source_url: String,
    pub image_url: String,
    pub prediction: bool,
    pub confidence: f64,
}

impl Article {
    pub fn has_image(&self) -> bool {
        self.image_url != NO_IMAGE && !self.image_url.is_empty()
    }
}

/// Ingestion watermark for one upstream section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub is_active: bool,
    pub last_fetch_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            last_fetch_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: u64,
    pub reliable: u64,
    pub unreliable: u64,
    /// Articles published since the requested instant.
    pub recent: u64,
}

impl Stats {
    pub fn reliable_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.reliable as f64 / self.total as f64 * 100.0
        }
    }
}

/// Parses an upstream publication timestamp; naive values are taken as UTC.
pub fn parse_publication_date(value: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), PUBLICATION_DATE_FORMAT)
        .map_err(|e| Error::MalformedRecord(format!("bad publication date {:?}: {}", value, e)))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn sample() -> NewArticle {
        NewArticle {
            title: "Local Council Approves New Budget".to_string(),
            publication_date: Utc::now(),
            category: "News".to_string(),
            section_id: "world".to_string(),
            section_name: "World news".to_string(),
            content_type: ContentType::Article,
            source_url: "https://x/1".to_string(),
            image_url: NO_IMAGE.to_string(),
            prediction: true,
            confidence: 0.86,
        }
    }

    #[test]
    fn test_parse_publication_date() {
        let date = parse_publication_date("2024-03-01T10:00:00Z").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 3);
        assert_eq!(date.hour(), 10);
        assert_eq!(date.timezone(), Utc);

        assert!(matches!(
            parse_publication_date("01/03/2024 10:00"),
            Err(Error::MalformedRecord(_))
        ));
        assert!(parse_publication_date("").is_err());
    }

    #[test]
    fn test_content_type_from_upstream() {
        assert_eq!(ContentType::from_upstream(Some("liveblog")), ContentType::Liveblog);
        assert_eq!(ContentType::from_upstream(Some("Video")), ContentType::Video);
        assert_eq!(ContentType::from_upstream(Some("interactive")), ContentType::Article);
        assert_eq!(ContentType::from_upstream(None), ContentType::Article);
    }

    #[test]
    fn test_validate() {
        assert!(sample().validate().is_ok());

        let mut short = sample();
        short.title = "Short".to_string();
        assert!(matches!(short.validate(), Err(Error::MalformedRecord(_))));

        let mut bad_url = sample();
        bad_url.source_url = "not a url".to_string();
        assert!(matches!(bad_url.validate(), Err(Error::InvalidUrl(_))));

        let mut bad_confidence = sample();
        bad_confidence.confidence = 1.5;
        assert!(bad_confidence.validate().is_err());
    }

    #[test]
    fn test_has_image() {
        let article = sample().into_article(1);
        assert!(!article.has_image());

        let mut with_image = sample();
        with_image.image_url = "https://i.guim.co.uk/img.jpg".to_string();
        assert!(with_image.into_article(2).has_image());
    }
}
