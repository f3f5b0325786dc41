use fnd_core::{ArticleStorage, ClassifierSource};
use fnd_ingest::IngestionPipeline;
use std::sync::Arc;

pub struct AppState {
    pub storage: Arc<dyn ArticleStorage>,
    pub classifiers: Arc<dyn ClassifierSource>,
    /// Present when the process is allowed to trigger ingestion on request.
    pub pipeline: Option<Arc<IngestionPipeline>>,
}

impl AppState {
    pub fn new(storage: Arc<dyn ArticleStorage>, classifiers: Arc<dyn ClassifierSource>) -> Self {
        Self {
            storage,
            classifiers,
            pipeline: None,
        }
    }

    pub fn with_pipeline(mut self, pipeline: Arc<IngestionPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }
}
