//! Shared types for the API layer.

use std::sync::Arc;

use crate::timeline::TimelineEngine;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub engine: Arc<TimelineEngine>,
}

impl ApiContext {
    pub fn new(engine: TimelineEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Caller role as sent in `X-User-Role`, injected by the role middleware.
/// Kept raw: the engine resolves it.
#[derive(Debug, Clone)]
pub struct CallerRole(pub String);
