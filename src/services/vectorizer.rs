use std::collections::BTreeMap;

use crate::models::Post;

/// Sparse feature vector: feature key → non-negative weight.
///
/// Keys that are absent have weight zero. Ordered so that norms and dot
/// products are summed in the same order on every run.
pub type FeatureVector = BTreeMap<String, f64>;

/// Builds the feature vector of a post from its category and metadata.
///
/// - category `C` → `cat:<lowercase C>` with weight 1.0
/// - metadata `k = v` → `m:<k>:<lowercase v>`, +1.0 per occurrence
///
/// Keys are never case-folded, only values and the category.
pub fn vectorize(post: &Post) -> FeatureVector {
    let mut vector = FeatureVector::new();

    if let Some(category) = post.category.as_deref() {
        vector.insert(format!("cat:{}", category.to_lowercase()), 1.0);
    }

    for (key, value) in &post.metadata {
        let feature = format!("m:{}:{}", key, value.to_string().to_lowercase());
        *vector.entry(feature).or_insert(0.0) += 1.0;
    }

    vector
}
