//! Notification routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tenancy_common::error::AppError;
use tenancy_common::types::{DEFAULT_SUBJECT, DeliveryOutcome, EmailMessage, MISSING_RECIPIENT};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications/email", post(send_email))
        .route("/api/notifications/whatsapp", post(send_whatsapp))
}

#[derive(Debug, Deserialize)]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueuedEmail {
    pub id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SendWhatsAppRequest {
    pub phone: String,
    pub text: String,
}

/// POST /api/notifications/email — Queue an email for paced delivery.
///
/// Responds as soon as the message is queued; the outcome is only logged.
async fn send_email(
    State(state): State<AppState>,
    Json(req): Json<SendEmailRequest>,
) -> Result<(StatusCode, Json<QueuedEmail>), AppError> {
    if req.to.trim().is_empty() {
        return Err(AppError::Validation(MISSING_RECIPIENT.to_string()));
    }

    let message = EmailMessage {
        subject: req.subject.unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
        html: req.html,
        text: req.text,
        ..EmailMessage::new(req.to)
    };
    let to = message.to.clone();

    let handle = state.notifier.send_email(message);
    let id = handle.id();

    tokio::spawn(async move {
        match handle.await {
            DeliveryOutcome::Sent {
                provider,
                message_id,
            } => {
                tracing::info!(
                    id = %id,
                    to = %to,
                    provider = %provider,
                    message_id = %message_id,
                    "Queued email delivered"
                );
            }
            DeliveryOutcome::Failed { reason } => {
                tracing::error!(id = %id, to = %to, reason = %reason, "Queued email failed");
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedEmail {
            id,
            status: "queued".to_string(),
        }),
    ))
}

/// POST /api/notifications/whatsapp — Send a WhatsApp text through the
/// provider fallback chain.
async fn send_whatsapp(
    State(state): State<AppState>,
    Json(req): Json<SendWhatsAppRequest>,
) -> Result<Json<DeliveryOutcome>, AppError> {
    let outcome = state.notifier.send_whatsapp(&req.phone, &req.text).await;
    outcome.clone().into_result()?;
    Ok(Json(outcome))
}
