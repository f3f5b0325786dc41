use chrono::Utc;
use fnd_core::{
    parse_publication_date, ArticleStorage, Classifier, ClassifierSource, ContentType, Error, ImageResolver,
    NewArticle, NewsSource, RawArticle, Result, DEFAULT_CATEGORY, NO_IMAGE,
};
use std::sync::Arc;
use std::time::Duration;

use crate::logging::Logger;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause between two categories of the same cycle, on top of the rate limiter.
    pub category_pause: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            category_pause: Duration::from_secs(1),
        }
    }
}

/// Result of processing one fetched batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub created: usize,
    pub skipped: usize,
    pub failed: Vec<(RawArticle, Error)>,
}

#[derive(Debug)]
pub struct CategoryReport {
    pub category: String,
    pub result: Result<BatchOutcome>,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub categories: Vec<CategoryReport>,
}

impl CycleReport {
    pub fn created(&self) -> usize {
        self.categories
            .iter()
            .filter_map(|c| c.result.as_ref().ok())
            .map(|o| o.created)
            .sum()
    }

    pub fn failed_categories(&self) -> usize {
        self.categories.iter().filter(|c| c.result.is_err()).count()
    }
}

/// Fetch, classify, dedup and persist articles for the active categories.
pub struct IngestionPipeline {
    source: Arc<dyn NewsSource>,
    images: Arc<dyn ImageResolver>,
    storage: Arc<dyn ArticleStorage>,
    classifiers: Arc<dyn ClassifierSource>,
    config: PipelineConfig,
    logger: Logger,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn NewsSource>,
        images: Arc<dyn ImageResolver>,
        storage: Arc<dyn ArticleStorage>,
        classifiers: Arc<dyn ClassifierSource>,
        config: PipelineConfig,
    ) -> Self {
        let logger = Logger::new().with_new_prefixes(format!("🔄 {}", source.name()));
        Self {
            source,
            images,
            storage,
            classifiers,
            config,
            logger,
        }
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    /// One pass over every active category.
    ///
    /// Fails as a whole only when no classifier can be obtained or the
    /// category list cannot be read; per-category failures are in the report.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let classifier = match self.classifiers.classifier().await {
            Ok(classifier) => classifier,
            Err(e) => {
                self.logger.error(&format!("Classifier unavailable, skipping cycle: {}", e));
                return Err(e);
            }
        };

        let categories = self.storage.active_categories().await?;
        self.logger.info(&format!("Starting cycle over {} categories", categories.len()));

        let mut report = CycleReport::default();
        for (i, category) in categories.iter().enumerate() {
            if i > 0 && !self.config.category_pause.is_zero() {
                tokio::time::sleep(self.config.category_pause).await;
            }
            let result = self.run_category(&category.name, classifier.as_ref()).await;
            report.categories.push(CategoryReport {
                category: category.name.clone(),
                result,
            });
        }

        self.logger.info(&format!(
            "Cycle done: {} new articles, {} failed categories",
            report.created(),
            report.failed_categories()
        ));
        Ok(report)
    }

    /// Ad-hoc ingestion of a single category.
    pub async fn ingest_category(&self, name: &str) -> Result<BatchOutcome> {
        let classifier = self.classifiers.classifier().await?;
        self.run_category(name, classifier.as_ref()).await
    }

    async fn run_category(&self, name: &str, classifier: &dyn Classifier) -> Result<BatchOutcome> {
        let logger = self.logger.with_prefix(format!("[{}]", name));
        let result = self.process_category(name, classifier).await;
        match &result {
            Ok(outcome) => {
                self.storage.touch_category(name, Utc::now()).await?;
                logger.info(&format!(
                    "Created {} new articles ({} skipped, {} failed)",
                    outcome.created,
                    outcome.skipped,
                    outcome.failed.len()
                ));
            }
            Err(e) => logger.error(&format!("Error processing category: {}", e)),
        }
        result
    }

    async fn process_category(&self, name: &str, classifier: &dyn Classifier) -> Result<BatchOutcome> {
        let articles = self.source.fetch(Some(name)).await?;
        if articles.is_empty() {
            return Ok(BatchOutcome::default());
        }
        self.process_batch(articles, classifier).await
    }

    /// Processes each record independently. Artifact errors abort the batch
    /// since every following record would fail the same way.
    pub async fn process_batch(
        &self,
        articles: Vec<RawArticle>,
        classifier: &dyn Classifier,
    ) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        for raw in articles {
            match self.process_article(&raw, classifier).await {
                Ok(true) => outcome.created += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) if e.is_artifact_error() => return Err(e),
                Err(e) => {
                    self.logger.warn(&format!(
                        "Error processing article {}: {}",
                        raw.web_url.as_deref().unwrap_or("<no url>"),
                        e
                    ));
                    outcome.failed.push((raw, e));
                }
            }
        }
        Ok(outcome)
    }

    /// Returns `true` when a new article was stored.
    async fn process_article(&self, raw: &RawArticle, classifier: &dyn Classifier) -> Result<bool> {
        let source_url = raw
            .web_url
            .as_deref()
            .ok_or_else(|| Error::MalformedRecord("missing webUrl".to_string()))?;
        if self.storage.exists(source_url).await? {
            return Ok(false);
        }

        let title = raw
            .web_title
            .as_deref()
            .ok_or_else(|| Error::MalformedRecord("missing webTitle".to_string()))?;
        let publication_date = parse_publication_date(
            raw.web_publication_date
                .as_deref()
                .ok_or_else(|| Error::MalformedRecord("missing webPublicationDate".to_string()))?,
        )?;

        let prediction = classifier.score(title)?;

        let image_url = self
            .images
            .resolve(source_url)
            .await
            .unwrap_or_else(|| NO_IMAGE.to_string());

        let article = NewArticle {
            title: title.to_string(),
            publication_date,
            category: raw.pillar_name.clone().unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            section_id: raw.section_id.clone().unwrap_or_default(),
            section_name: raw.section_name.clone().unwrap_or_default(),
            content_type: ContentType::from_upstream(raw.content_type.as_deref()),
            source_url: source_url.to_string(),
            image_url,
            prediction: prediction.is_real,
            confidence: prediction.confidence,
        };

        let created = self.storage.upsert_if_absent(&article).await?;
        if created {
            self.logger.debug(&format!("Stored {}", article.title));
        }
        Ok(created)
    }
}
