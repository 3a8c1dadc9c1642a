use super::types::*;

/// Episodes with their attached points, plus the points no episode encloses.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTimeline {
    pub episodes: Vec<TimelineEvent>,
    pub standalone: Vec<TimelineEvent>,
}

/// Attaches each point to the enclosing episode with the latest start.
///
/// Enclosure is inclusive on both ends. Equal starts keep the episode that
/// came first. A point lands in exactly one place: one episode's children
/// or `standalone`. Any children the episodes arrived with are discarded.
pub fn attach_points(
    mut episodes: Vec<TimelineEvent>,
    points: Vec<TimelineEvent>,
) -> MergedTimeline {
    for episode in &mut episodes {
        episode.children.clear();
    }

    let mut standalone = Vec::new();

    for point in points {
        match enclosing_episode(&episodes, &point) {
            Some(index) => episodes[index].children.push(point),
            None => standalone.push(point),
        }
    }

    MergedTimeline {
        episodes,
        standalone,
    }
}

/// Index of the most recently begun episode containing the point's instant.
fn enclosing_episode(episodes: &[TimelineEvent], point: &TimelineEvent) -> Option<usize> {
    let mut best: Option<(usize, chrono::DateTime<chrono::Utc>)> = None;

    for (index, episode) in episodes.iter().enumerate() {
        let Some((start, end)) = episode.interval() else {
            continue;
        };
        if point.timestamp < start || point.timestamp > end {
            continue;
        }
        match best {
            Some((_, best_start)) if start <= best_start => {}
            _ => best = Some((index, start)),
        }
    }

    best.map(|(index, _)| index)
}
