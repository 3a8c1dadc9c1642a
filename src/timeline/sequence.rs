use std::cmp::Ordering;

use super::types::*;

/// Orders episodes most recent first and each episode's children oldest first.
///
/// Episodes with identical starts fall back to `id`, so the order is total.
/// Children sharing a timestamp keep their attachment order. Standalone
/// points are left alone.
pub fn sequence_episodes(episodes: &mut [TimelineEvent]) {
    episodes.sort_by(compare_episodes);

    for episode in episodes.iter_mut() {
        episode.children.sort_by_key(|child| child.timestamp);
    }
}

fn compare_episodes(a: &TimelineEvent, b: &TimelineEvent) -> Ordering {
    b.start
        .cmp(&a.start)
        .then_with(|| a.id.cmp(&b.id))
}
