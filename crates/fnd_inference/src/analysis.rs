//! Surface-level text heuristics shown next to a prediction. Advisory only,
//! never part of the stored classification.

use fnd_core::{Classifier, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::reliability::reliability_score;

const URGENCY_WORDS: &[&str] = &[
    "urgent", "breaking", "share", "must", "warning", "attention", "alert", "emergency", "shocking",
    "bombshell",
];

const CONSPIRACY_WORDS: &[&str] = &[
    "truth",
    "exposed",
    "secret",
    "they",
    "conspiracy",
    "controlled",
    "mainstream media",
    "hidden",
    "coverup",
    "revealed",
    "proof",
    "evidence",
    "wake up",
    "sheeple",
    "banned",
];

static REPEATED_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[!?]{2,}").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TextFeatures {
    pub exclamation_count: usize,
    pub caps_ratio: f64,
    pub urgency_words: usize,
    pub conspiracy_words: usize,
    pub repeated_punctuation: usize,
    pub all_caps_ratio: f64,
}

impl TextFeatures {
    pub fn extract(text: &str) -> Self {
        let lower = text.to_lowercase();
        let chars = text.chars().count();
        let uppercase = text.chars().filter(|c| c.is_uppercase()).count();

        let words: Vec<&str> = text.split_whitespace().collect();
        let all_caps = words
            .iter()
            .filter(|w| w.chars().count() > 1 && is_shouted(w))
            .count();

        Self {
            exclamation_count: text.matches('!').count(),
            caps_ratio: ratio(uppercase, chars),
            urgency_words: count_terms(&lower, URGENCY_WORDS),
            conspiracy_words: count_terms(&lower, CONSPIRACY_WORDS),
            repeated_punctuation: REPEATED_PUNCTUATION.find_iter(text).count(),
            all_caps_ratio: ratio(all_caps, words.len()),
        }
    }

    fn weighted(&self, weights: [f64; 6]) -> f64 {
        self.exclamation_count as f64 * weights[0]
            + self.caps_ratio * weights[1]
            + self.urgency_words as f64 * weights[2]
            + self.conspiracy_words as f64 * weights[3]
            + self.repeated_punctuation as f64 * weights[4]
            + self.all_caps_ratio * weights[5]
    }
}

/// Has cased letters and all of them are uppercase, so `"EXPOSED!!!"` counts.
fn is_shouted(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Substring presence of each term, so "they" also matches "theyre".
fn count_terms(lower: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| lower.contains(*term)).count()
}

const TITLE_WEIGHTS: [f64; 6] = [2.0, 100.0, 3.0, 3.0, 3.0, 50.0];
const TEXT_WEIGHTS: [f64; 6] = [1.0, 50.0, 2.0, 2.0, 2.0, 25.0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub caps_usage: &'static str,
    pub punctuation: &'static str,
    pub sensationalism: &'static str,
    pub conspiracy_language: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAnalysis {
    pub risk_score: f64,
    pub title: TextFeatures,
    pub text: TextFeatures,
    pub interpretation: Interpretation,
}

pub fn analyze(title: &str, text: &str) -> RiskAnalysis {
    let title_features = TextFeatures::extract(title);
    let text_features = TextFeatures::extract(text);

    let raw = title_features.weighted(TITLE_WEIGHTS) + text_features.weighted(TEXT_WEIGHTS);
    let risk_score = (raw.min(100.0) * 100.0).round() / 100.0;

    let interpretation = Interpretation {
        caps_usage: if title_features.caps_ratio > 0.3 || text_features.caps_ratio > 0.3 {
            "High"
        } else {
            "Normal"
        },
        punctuation: if title_features.repeated_punctuation > 0 || text_features.repeated_punctuation > 2 {
            "Excessive"
        } else {
            "Normal"
        },
        sensationalism: if title_features.urgency_words > 1 || text_features.urgency_words > 2 {
            "High"
        } else {
            "Normal"
        },
        conspiracy_language: if title_features.conspiracy_words > 0 || text_features.conspiracy_words > 1 {
            "Present"
        } else {
            "Not Present"
        },
    };

    RiskAnalysis {
        risk_score,
        title: title_features,
        text: text_features,
        interpretation,
    }
}

/// Prediction plus heuristics for one piece of submitted content.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub is_real: bool,
    pub confidence: f64,
    pub fake_probability: f64,
    pub real_probability: f64,
    pub reliability_score: i64,
    pub risk: RiskAnalysis,
}

impl Assessment {
    pub fn label(&self) -> &'static str {
        if self.is_real {
            "REAL"
        } else {
            "FAKE"
        }
    }

    /// Confidence as shown to users, e.g. `"86.00%"`.
    pub fn formatted_confidence(&self) -> String {
        format!("{:.2}%", self.confidence * 100.0)
    }
}

/// Scores the title with the classifier and runs the heuristics over title and text.
pub fn assess(classifier: &dyn Classifier, title: &str, text: &str) -> Result<Assessment> {
    let prediction = classifier.score(title)?;
    Ok(Assessment {
        is_real: prediction.is_real,
        confidence: prediction.confidence,
        fake_probability: prediction.fake_probability,
        real_probability: prediction.real_probability,
        reliability_score: reliability_score(prediction.is_real, prediction.confidence),
        risk: analyze(title, text),
    })
}
