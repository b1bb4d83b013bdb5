use super::vectorizer::FeatureVector;

/// Cosine similarity of two sparse feature vectors.
///
/// Returns 0.0 when either vector is empty or has zero norm. For the
/// non-negative weights produced by [`vectorize`](super::vectorizer::vectorize)
/// the result lies in `[0, 1]` and is exactly 1.0 for identical vectors.
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    // Keys missing from either side contribute nothing, so walking the
    // smaller vector covers every non-zero term of the union.
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(key, weight)| large.get(key).map(|other| weight * other))
        .sum();

    let norm_a_sq = squared_norm(a);
    let norm_b_sq = squared_norm(b);
    if norm_a_sq == 0.0 || norm_b_sq == 0.0 {
        return 0.0;
    }

    // sqrt of the product rather than product of sqrts keeps |a|·|a| == a·a
    (dot / (norm_a_sq * norm_b_sq).sqrt()).clamp(0.0, 1.0)
}

fn squared_norm(vector: &FeatureVector) -> f64 {
    vector.values().map(|w| w * w).sum()
}
