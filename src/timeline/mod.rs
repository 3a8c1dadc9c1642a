//! Clinical timeline: one patient's record across every source, in one payload.
//!
//! Pipeline, strictly forward:
//! 1. `orchestrator` queries all sources at once and splits episodes from points
//! 2. `merge` attaches each point to its most recently begun enclosing episode
//! 3. `sequence` orders episodes newest first, children oldest first
//! 4. `crate::authorization` drops what the caller's role may not see
//!
//! A failing source degrades the result (`partial = true`) instead of failing it.

mod engine;
mod merge;
mod orchestrator;
mod sequence;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::*;
pub use merge::*;
pub use orchestrator::*;
pub use sequence::*;
pub use types::*;

// ── Tests ──────────────────────────────────────────────────────────────────
