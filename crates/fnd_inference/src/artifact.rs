use fnd_core::{Classifier, Error, Prediction, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::models::Model;
use crate::vectorizer::TfidfVectorizer;

/// Toolchain version this runtime was built against.
pub const RUNTIME_TOOLCHAIN_VERSION: &str = "1.5.2";

/// Text used for the load-time sanity prediction.
pub const SELF_TEST_TEXT: &str = "This is a test news article";

/// The current on-disk shape of a trained artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    #[serde(default)]
    pub format_version: u32,
    pub toolchain_version: String,
    #[serde(default)]
    pub vectorizer: Option<TfidfVectorizer>,
    pub model: Model,
}

/// A loaded artifact. The shape is decided once, when the blob is parsed.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// Oldest format: the bare model, with no vectorizer to turn text into features.
    LegacyModelOnly(Model),
    Versioned {
        model: Model,
        vectorizer: TfidfVectorizer,
        version: String,
    },
}

impl Artifact {
    /// Detects the artifact shape and checks internal consistency.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::ArtifactCorrupt(e.to_string()))?;

        let is_structured = value.as_object().map_or(false, |o| o.contains_key("model"));
        let artifact = if is_structured {
            let file: ArtifactFile =
                serde_json::from_value(value).map_err(|e| Error::ArtifactCorrupt(e.to_string()))?;
            match file.vectorizer {
                Some(vectorizer) => Artifact::Versioned {
                    model: file.model,
                    vectorizer,
                    version: file.toolchain_version,
                },
                None => {
                    warn!("Artifact has no vectorizer, treating it as a legacy model");
                    Artifact::LegacyModelOnly(file.model)
                }
            }
        } else {
            let model: Model =
                serde_json::from_value(value).map_err(|e| Error::ArtifactCorrupt(e.to_string()))?;
            Artifact::LegacyModelOnly(model)
        };

        artifact.validate()?;
        Ok(artifact)
    }

    fn validate(&self) -> Result<()> {
        self.model().validate().map_err(Error::ArtifactCorrupt)?;
        if let Artifact::Versioned { model, vectorizer, .. } = self {
            vectorizer.validate().map_err(Error::ArtifactCorrupt)?;
            if model.n_features() != vectorizer.n_features() {
                return Err(Error::ArtifactCorrupt(format!(
                    "model expects {} features, vectorizer produces {}",
                    model.n_features(),
                    vectorizer.n_features()
                )));
            }
        }
        Ok(())
    }

    pub fn model(&self) -> &Model {
        match self {
            Artifact::LegacyModelOnly(model) => model,
            Artifact::Versioned { model, .. } => model,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            Artifact::LegacyModelOnly(_) => None,
            Artifact::Versioned { version, .. } => Some(version),
        }
    }

    /// Compares the recorded toolchain version with the runtime's.
    pub fn check_version(&self, strict: bool) -> Result<()> {
        let Some(version) = self.version() else {
            return Ok(());
        };
        if version == RUNTIME_TOOLCHAIN_VERSION {
            return Ok(());
        }
        if strict {
            return Err(Error::VersionMismatch {
                artifact: version.to_string(),
                runtime: RUNTIME_TOOLCHAIN_VERSION.to_string(),
            });
        }
        warn!(
            "Version mismatch: model trained with {}, current version is {}",
            version, RUNTIME_TOOLCHAIN_VERSION
        );
        Ok(())
    }
}

/// Classifier backed by a loaded artifact. Immutable once built.
#[derive(Debug, Clone)]
pub struct ArtifactClassifier {
    artifact: Artifact,
    name: String,
}

impl ArtifactClassifier {
    pub fn new(artifact: Artifact) -> Self {
        let name = match artifact.version() {
            Some(version) => format!("{} ({})", artifact.model().name(), version),
            None => format!("{} (legacy)", artifact.model().name()),
        };
        Self { artifact, name }
    }

    /// Loads a local artifact file. Version mismatches only warn.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ArtifactNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let artifact = Artifact::parse(&bytes)?;
        artifact.check_version(false)?;
        let classifier = Self::new(artifact);
        classifier.self_test();
        Ok(classifier)
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn vocabulary_size(&self) -> Option<usize> {
        match &self.artifact {
            Artifact::LegacyModelOnly(_) => None,
            Artifact::Versioned { vectorizer, .. } => Some(vectorizer.vocabulary.len()),
        }
    }

    /// Logs one canned prediction so operators can see the model is sane.
    pub fn self_test(&self) {
        match self.score(SELF_TEST_TEXT) {
            Ok(prediction) => {
                info!("Model test results:");
                info!("- Test prediction: {}", if prediction.is_real { "real" } else { "fake" });
                info!("- Test probability: {:.2}%", prediction.confidence * 100.0);
                if let Some(size) = self.vocabulary_size() {
                    info!("- Vectorizer vocabulary size: {}", size);
                }
                info!("Successfully loaded and tested model {}", self.name);
            }
            Err(e) => warn!("Model self-test skipped: {}", e),
        }
    }
}

impl Classifier for ArtifactClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, text: &str) -> Result<Prediction> {
        match &self.artifact {
            Artifact::LegacyModelOnly(_) => Err(Error::VectorizerMissing),
            Artifact::Versioned { model, vectorizer, .. } => {
                let features = vectorizer.transform(text);
                let [fake, real] = model.predict_proba(&features);
                Ok(Prediction::from_posterior(fake, real))
            }
        }
    }
}
