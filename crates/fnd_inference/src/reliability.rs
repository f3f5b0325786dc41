//! Display-side reliability percentage derived from a classifier prediction.

/// Maps a prediction and its confidence to a 0..=100 reliability score.
///
/// The result is asymmetric: confident "real" predictions are boosted and
/// capped at 98, confident "fake" predictions are discounted and capped at 95.
/// Confidence outside `[0, 1]` bypasses the tiers and returns the rounded
/// percentage as is.
pub fn reliability_score(prediction: bool, confidence: f64) -> i64 {
    let base = (confidence * 100.0).round() as i64;
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return base;
    }

    if prediction {
        if confidence > 0.9 {
            (base + 10).min(98)
        } else if confidence > 0.8 {
            base + 5
        } else if confidence > 0.7 {
            base
        } else {
            (base - 5).max(50)
        }
    } else if confidence > 0.9 {
        (base - 5).min(95)
    } else if confidence > 0.8 {
        base - 10
    } else if confidence > 0.7 {
        base - 15
    } else {
        (base - 20).max(40)
    }
}
