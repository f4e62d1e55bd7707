//! Shared application state for the Axum API server.

use tenancy_notifier::Notifier;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(notifier: Notifier) -> Self {
        Self { notifier }
    }
}
