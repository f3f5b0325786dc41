use serde::{Deserialize, Serialize};

use crate::vectorizer::SparseVector;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNbModel {
    pub class_log_prior: [f64; 2],
    /// One row of per-feature log probabilities for each class.
    pub feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNbModel {
    pub fn n_features(&self) -> usize {
        self.feature_log_prob[0].len()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.feature_log_prob[0].len() != self.feature_log_prob[1].len() {
            return Err("feature_log_prob rows differ in length".to_string());
        }
        let finite = self.class_log_prior.iter().all(|v| v.is_finite())
            && self.feature_log_prob.iter().flatten().all(|v| v.is_finite());
        if !finite {
            return Err("non-finite log probability".to_string());
        }
        Ok(())
    }

    fn joint_log_likelihood(&self, features: &SparseVector, class: usize) -> f64 {
        let row = &self.feature_log_prob[class];
        self.class_log_prior[class]
            + features
                .iter()
                .map(|&(column, value)| value * row.get(column).copied().unwrap_or(0.0))
                .sum::<f64>()
    }

    pub fn predict_proba(&self, features: &SparseVector) -> [f64; 2] {
        let fake = self.joint_log_likelihood(features, 0);
        let real = self.joint_log_likelihood(features, 1);
        let max = fake.max(real);
        let fake = (fake - max).exp();
        let real = (real - max).exp();
        let sum = fake + real;
        [fake / sum, real / sum]
    }
}
