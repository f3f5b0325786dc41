use serde::{Deserialize, Serialize};

use crate::vectorizer::SparseVector;

pub mod logistic;
pub mod naive_bayes;

pub use logistic::LogisticModel;
pub use naive_bayes::MultinomialNbModel;

/// Binary text model over TF-IDF features. Class 0 is fake, class 1 is real.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    MultinomialNb(MultinomialNbModel),
    Logistic(LogisticModel),
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Model::MultinomialNb(_) => "multinomial_nb",
            Model::Logistic(_) => "logistic",
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Model::MultinomialNb(m) => m.n_features(),
            Model::Logistic(m) => m.n_features(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Model::MultinomialNb(m) => m.validate(),
            Model::Logistic(m) => m.validate(),
        }
    }

    /// Posterior `[p(fake), p(real)]`.
    pub fn predict_proba(&self, features: &SparseVector) -> [f64; 2] {
        match self {
            Model::MultinomialNb(m) => m.predict_proba(features),
            Model::Logistic(m) => m.predict_proba(features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_tagging() {
        let json = r#"{"kind": "logistic", "coef": [1.0, -1.0], "intercept": 0.0}"#;
        let model: Model = serde_json::from_str(json).unwrap();
        assert_eq!(model.name(), "logistic");
        assert_eq!(model.n_features(), 2);

        let json = r#"{"kind": "random_forest", "trees": []}"#;
        assert!(serde_json::from_str::<Model>(json).is_err());
    }
}
