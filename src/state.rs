//! Shared application state handed to every handler

use std::sync::Arc;

use crate::services::detection::FallacyDetector;

/// Immutable after startup, so clones are cheap and need no locking.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<FallacyDetector>,
}

impl AppState {
    pub fn new(detector: FallacyDetector) -> Self {
        Self {
            detector: Arc::new(detector),
        }
    }
}
