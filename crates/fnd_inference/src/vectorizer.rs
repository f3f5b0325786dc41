use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sparse feature vector: `(column, value)` pairs in column order.
pub type SparseVector = Vec<(usize, f64)>;

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

/// TF-IDF text vectorizer with a fixed vocabulary and L2 normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub stop_words: HashSet<String>,
}

impl TfidfVectorizer {
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    /// Checks that every vocabulary column has an idf weight.
    pub fn validate(&self) -> Result<(), String> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram range ({}, {})", min_n, max_n));
        }
        if let Some((term, column)) = self.vocabulary.iter().find(|(_, &c)| c >= self.idf.len()) {
            return Err(format!(
                "term {:?} maps to column {} but only {} idf weights exist",
                term,
                column,
                self.idf.len()
            ));
        }
        Ok(())
    }

    /// Word tokens: runs of alphanumeric characters or underscores.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase { text.to_lowercase() } else { text.to_string() };
        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty() && !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            grams.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        grams
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let tokens = self.tokenize(text);
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.ngrams(&tokens) {
            if let Some(&column) = self.vocabulary.get(&gram) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut features: SparseVector = counts
            .into_iter()
            .map(|(column, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                (column, tf * self.idf[column])
            })
            .collect();

        let norm = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in features.iter_mut() {
                *value /= norm;
            }
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer(ngram_range: (usize, usize)) -> TfidfVectorizer {
        let vocabulary = ["council", "budget", "new budget", "the"]
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();
        TfidfVectorizer {
            vocabulary,
            idf: vec![2.0, 1.0, 3.0, 1.0],
            ngram_range,
            lowercase: true,
            sublinear_tf: false,
            stop_words: ["the".to_string()].into_iter().collect(),
        }
    }

    #[test]
    fn test_tokenize() {
        let v = vectorizer((1, 1));
        assert_eq!(
            v.tokenize("The Council's NEW budget!"),
            vec!["council", "s", "new", "budget"]
        );
    }

    #[test]
    fn test_transform_is_l2_normalised() {
        let v = vectorizer((1, 2));
        let features = v.transform("Council approves new budget");
        let columns: Vec<usize> = features.iter().map(|(c, _)| *c).collect();
        assert_eq!(columns, vec![0, 1, 2]);
        let norm: f64 = features.iter().map(|(_, x)| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-9);
        // idf 3 for the bigram outweighs idf 2 for the unigram
        assert!(features[2].1 > features[0].1);
    }

    #[test]
    fn test_transform_unknown_text_is_empty() {
        let v = vectorizer((1, 1));
        assert!(v.transform("nothing here matches").is_empty());
        assert!(v.transform("").is_empty());
    }

    #[test]
    fn test_sublinear_tf() {
        let mut v = vectorizer((1, 1));
        v.sublinear_tf = true;
        let once = v.transform("budget council");
        let many = v.transform("budget budget budget council");
        assert!(many[1].1 > once[1].1);
    }

    #[test]
    fn test_validate() {
        let mut v = vectorizer((1, 1));
        assert!(v.validate().is_ok());
        v.idf.pop();
        assert!(v.validate().is_err());

        let mut v = vectorizer((2, 1));
        assert!(v.validate().is_err());
        v.ngram_range = (1, 2);
        assert!(v.validate().is_ok());
    }
}
