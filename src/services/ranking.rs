use std::collections::HashSet;

use crate::models::{Page, Post, PostId};

use super::{
    preference::Preference,
    similarity::cosine_similarity,
    vectorizer::{vectorize, FeatureVector},
};

/// A catalog post paired with its similarity to the user's preference
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate<'a> {
    pub post: &'a Post,
    pub score: f64,
}

/// Ranks unseen catalog posts against a user's preference
///
/// Implementations must be deterministic for a fixed catalog order and must
/// never return a post from the preference's seen set.
pub trait Ranker: Send + Sync {
    fn rank<'a>(
        &self,
        preference: &Preference,
        catalog: &'a [Post],
        page: Page,
    ) -> Vec<RankedCandidate<'a>>;

    /// Ranker name for logging
    fn name(&self) -> &'static str;
}

/// Scores every catalog post on each request
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScanRanker;

impl Ranker for LinearScanRanker {
    fn rank<'a>(
        &self,
        preference: &Preference,
        catalog: &'a [Post],
        page: Page,
    ) -> Vec<RankedCandidate<'a>> {
        rank(&preference.vector, &preference.seen, catalog, page)
    }

    fn name(&self) -> &'static str {
        "linear_scan"
    }
}

/// Scores unseen posts by cosine similarity and returns one page of them,
/// best first.
///
/// The sort is stable: posts with equal scores keep their catalog order.
pub fn rank<'a>(
    preference: &FeatureVector,
    seen: &HashSet<PostId>,
    catalog: &'a [Post],
    page: Page,
) -> Vec<RankedCandidate<'a>> {
    if page.limit == 0 {
        return Vec::new();
    }

    let mut scored: Vec<RankedCandidate<'a>> = catalog
        .iter()
        .filter(|post| !seen.contains(&post.id))
        .map(|post| RankedCandidate {
            post,
            score: cosine_similarity(preference, &vectorize(post)),
        })
        .collect();

    // `sort_by` is stable, which keeps ties in catalog order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    page.apply(scored)
}
