//! Named tie-break policies for electing an original among verified
//! candidates.
//!
//! The state machine verifies candidates in the order a policy arranges
//! them and elects the first one that passes; swapping the policy never
//! touches the state machine itself.

use ndd_store::Article;

/// A candidate surviving the collision-count filter, carrying its rank key.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub article: Article,
    pub match_count: usize,
}

/// Arranges surviving candidates into verification order.
pub trait TieBreakPolicy: Send + Sync {
    /// Stable identifier, used in logs.
    fn name(&self) -> &'static str;
    fn order(&self, candidates: &mut Vec<RankedCandidate>);
}

/// Default policy: match count descending, article id ascending.
///
/// Ties among several plausible originals resolve by index ordering, not by
/// publication time.
pub struct DescendingMatchCount;

impl TieBreakPolicy for DescendingMatchCount {
    fn name(&self) -> &'static str {
        "descending-match-count"
    }

    fn order(&self, candidates: &mut Vec<RankedCandidate>) {
        candidates.sort_by(|a, b| {
            b.match_count
                .cmp(&a.match_count)
                .then_with(|| a.article.id.cmp(&b.article.id))
        });
    }
}

/// Alternative policy: earliest publication date first, match count as the
/// secondary key.
pub struct EarliestPublished;

impl TieBreakPolicy for EarliestPublished {
    fn name(&self) -> &'static str {
        "earliest-published"
    }

    fn order(&self, candidates: &mut Vec<RankedCandidate>) {
        candidates.sort_by(|a, b| {
            a.article
                .published_at
                .cmp(&b.article.published_at)
                .then_with(|| b.match_count.cmp(&a.match_count))
                .then_with(|| a.article.id.cmp(&b.article.id))
        });
    }
}
