//! Role-based visibility for assembled timelines.
//!
//! Rules, checked per event category:
//! - doctor: everything
//! - nurse: no surgeries (a hidden surgery takes its attached events with it)
//! - intern: no imaging, wherever it sits
//!
//! Filtering always builds a fresh `TimelineData`; the input is never touched.
//! `partial` and `unavailable_sources` pass through as-is.

use crate::timeline::{EventKind, TimelineData, TimelineEvent};

/// Caller role, already resolved by the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Doctor,
    Nurse,
    Intern,
    /// Any role the rules do not name. No category is restricted for it.
    Other,
}

impl Role {
    /// Case-insensitive; unknown names map to `Role::Other`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "doctor" => Role::Doctor,
            "nurse" => Role::Nurse,
            "intern" => Role::Intern,
            _ => Role::Other,
        }
    }

    /// Whether this role may observe events of `kind`.
    ///
    /// Surgery only ever arrives as an episode, so the nurse rule never fires
    /// for children or standalone events today. It is still applied there:
    /// what a nurse should see if a source ever emits a point-level surgery
    /// is an open product question, and hiding it is the conservative reading.
    pub fn can_view(self, kind: EventKind) -> bool {
        match (self, kind) {
            (Role::Doctor, _) => true,
            (Role::Nurse, EventKind::Surgery) => false,
            (Role::Nurse, EventKind::EmergencyRoom | EventKind::Vitals | EventKind::Imaging) => {
                true
            }
            (Role::Intern, EventKind::Imaging) => false,
            (Role::Intern, EventKind::Surgery | EventKind::EmergencyRoom | EventKind::Vitals) => {
                true
            }
            (Role::Other, _) => true,
        }
    }
}

/// The subset of `data` that `role` is permitted to observe.
pub fn filter_for_role(data: &TimelineData, role: Role) -> TimelineData {
    if role == Role::Doctor {
        return data.clone();
    }
    retain_visible(data, |event| role.can_view(event.kind))
}

/// Copies `data`, keeping only events accepted by `keep`.
///
/// An episode is judged first; a rejected episode drops with all its
/// children. Surviving episodes have their children judged one by one.
pub(crate) fn retain_visible<F>(data: &TimelineData, keep: F) -> TimelineData
where
    F: Fn(&TimelineEvent) -> bool,
{
    let episodes = data
        .episodes
        .iter()
        .filter(|episode| keep(episode))
        .map(|episode| TimelineEvent {
            children: episode
                .children
                .iter()
                .filter(|child| keep(child))
                .cloned()
                .collect(),
            ..episode.clone_without_children()
        })
        .collect();

    let standalone = data
        .standalone
        .iter()
        .filter(|event| keep(event))
        .cloned()
        .collect();

    TimelineData {
        episodes,
        standalone,
        partial: data.partial,
        unavailable_sources: data.unavailable_sources.clone(),
    }
}
