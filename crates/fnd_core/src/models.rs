use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::DEFAULT_CONFIDENCE;
use crate::Result;

/// Output of a single classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `true` when the text is classified as real news.
    pub is_real: bool,
    /// Posterior probability of the predicted class.
    pub confidence: f64,
    pub fake_probability: f64,
    pub real_probability: f64,
}

impl Prediction {
    /// Builds a prediction from a `[fake, real]` posterior. Ties go to fake.
    pub fn from_posterior(fake: f64, real: f64) -> Self {
        let is_real = real > fake;
        Self {
            is_real,
            confidence: fake.max(real),
            fake_probability: fake,
            real_probability: real,
        }
    }
}

impl Default for Prediction {
    fn default() -> Self {
        Self::from_posterior(1.0 - DEFAULT_CONFIDENCE, DEFAULT_CONFIDENCE)
    }
}

pub trait Classifier: Send + Sync {
    /// Short human readable description, used in logs.
    fn name(&self) -> &str;

    /// Scores a piece of text. Must be deterministic for a given model.
    fn score(&self, text: &str) -> Result<Prediction>;
}

/// Hands out a ready classifier, loading it on first use.
#[async_trait]
pub trait ClassifierSource: Send + Sync {
    async fn classifier(&self) -> Result<Arc<dyn Classifier>>;
}

#[async_trait]
impl ClassifierSource for Arc<dyn Classifier> {
    async fn classifier(&self) -> Result<Arc<dyn Classifier>> {
        Ok(self.clone())
    }
}
