pub mod analysis;
pub mod artifact;
pub mod loader;
pub mod models;
pub mod reliability;
pub mod vectorizer;

pub use analysis::{analyze, assess, Assessment, RiskAnalysis};
pub use artifact::{Artifact, ArtifactClassifier};
pub use loader::{ArtifactLoader, ArtifactStore, HttpArtifactStore, LazyClassifier, LoaderConfig};
pub use reliability::reliability_score;

pub mod prelude {
    pub use super::{
        ArtifactClassifier, ArtifactLoader, HttpArtifactStore, LazyClassifier, LoaderConfig,
    };
    pub use fnd_core::{Classifier, ClassifierSource, Error, Prediction, Result};
}
