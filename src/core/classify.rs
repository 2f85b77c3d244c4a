//! Activity classification.
//!
//! Reduces a batch of confidence-scored activity guesses to a single
//! label. The provider's top candidate is used directly unless it is the
//! umbrella "on foot" kind, which is disambiguated into walking or
//! running by confidence.

use crate::core::types::{ActivityCandidate, ActivityKind};

/// Resolve a batch of candidates to one activity label.
///
/// Pure and total: an empty batch resolves to `Unknown`, and identical
/// batches always yield identical labels. Confidence ties keep the
/// first-seen candidate; batch order is provider-defined, so a tie
/// across providers is not guaranteed stable.
pub fn resolve(batch: &[ActivityCandidate]) -> ActivityKind {
    let Some(top) = most_confident(batch) else {
        return ActivityKind::Unknown;
    };

    if top.kind != ActivityKind::OnFoot {
        return top.kind;
    }

    // On foot: pick the stronger of walking and running.
    most_confident_of(batch, &[ActivityKind::Walking, ActivityKind::Running])
        .map(|c| c.kind)
        .unwrap_or(ActivityKind::Unknown)
}

fn most_confident(batch: &[ActivityCandidate]) -> Option<&ActivityCandidate> {
    batch.iter().fold(None, |best, candidate| match best {
        Some(b) if candidate.confidence > b.confidence => Some(candidate),
        Some(b) => Some(b),
        None => Some(candidate),
    })
}

fn most_confident_of<'a>(
    batch: &'a [ActivityCandidate],
    kinds: &[ActivityKind],
) -> Option<&'a ActivityCandidate> {
    batch.iter().filter(|c| kinds.contains(&c.kind)).fold(
        None,
        |best, candidate| match best {
            Some(b) if candidate.confidence > b.confidence => Some(candidate),
            Some(b) => Some(b),
            None => Some(candidate),
        },
    )
}
