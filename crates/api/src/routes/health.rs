//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let readiness = state.notifier.readiness();
    let queue = state.notifier.email_queue();

    Json(json!({
        "status": "ok",
        "service": "tenancy-api",
        "version": env!("CARGO_PKG_VERSION"),
        "channels": {
            "email": readiness.email,
            "whatsapp_primary": readiness.provider_a,
            "whatsapp_fallback": readiness.provider_b,
        },
        "pending_emails": queue.pending(),
        "email_worker_busy": queue.is_busy(),
    }))
}
