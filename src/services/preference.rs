use std::collections::HashSet;

use crate::models::{Engagement, EngagementKind, Post, PostId};

use super::vectorizer::{vectorize, FeatureVector};

/// Rating assumed when a rating engagement arrives without a score
pub const DEFAULT_RATING: i16 = 3;

/// A user's accumulated taste, rebuilt for every ranking request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preference {
    /// Weighted sum of the feature vectors of every engaged post
    pub vector: FeatureVector,
    /// Every post referenced by the history, resolvable or not
    pub seen: HashSet<PostId>,
    /// Number of engagements whose post was found
    pub resolved: usize,
}

impl Preference {
    /// True when no engagement could be resolved to a post
    pub fn is_cold(&self) -> bool {
        self.resolved == 0
    }
}

/// Weight an engagement contributes to the preference vector
///
/// | kind    | weight                          |
/// |---------|---------------------------------|
/// | view    | 0.5                             |
/// | like    | 1.0                             |
/// | inspire | 1.2                             |
/// | rating  | 0.8 + 0.4 * (score / 5)         |
pub fn engagement_weight(kind: EngagementKind, rating_score: Option<i16>) -> f64 {
    match kind {
        EngagementKind::View => 0.5,
        EngagementKind::Like => 1.0,
        EngagementKind::Inspire => 1.2,
        EngagementKind::Rating => {
            let score = rating_score.unwrap_or(DEFAULT_RATING) as f64;
            0.8 + 0.4 * (score / 5.0)
        }
    }
}

/// Folds an engagement history into a preference vector and a seen set.
///
/// Engagements whose post cannot be resolved through `lookup` still mark the
/// post as seen but add nothing to the vector.
pub fn aggregate<'a, F>(engagements: &[Engagement], lookup: F) -> Preference
where
    F: Fn(PostId) -> Option<&'a Post>,
{
    let mut preference = Preference::default();

    for engagement in engagements {
        preference.seen.insert(engagement.post_id);

        let Some(post) = lookup(engagement.post_id) else {
            tracing::debug!(post_id = engagement.post_id, "Skipping engagement on missing post");
            continue;
        };

        let weight = engagement_weight(engagement.kind, engagement.rating_score);
        for (feature, value) in vectorize(post) {
            *preference.vector.entry(feature).or_insert(0.0) += weight * value;
        }
        preference.resolved += 1;
    }

    preference
}
