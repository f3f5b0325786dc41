use serde::{Deserialize, Serialize};

use crate::vectorizer::SparseVector;

/// Binary logistic regression; positive scores lean towards real.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticModel {
    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.intercept.is_finite() || !self.coef.iter().all(|c| c.is_finite()) {
            return Err("non-finite coefficient".to_string());
        }
        Ok(())
    }

    pub fn decision_function(&self, features: &SparseVector) -> f64 {
        self.intercept
            + features
                .iter()
                .map(|&(column, value)| value * self.coef.get(column).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    pub fn predict_proba(&self, features: &SparseVector) -> [f64; 2] {
        let real = 1.0 / (1.0 + (-self.decision_function(features)).exp());
        [1.0 - real, real]
    }
}
