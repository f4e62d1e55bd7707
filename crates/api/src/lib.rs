//! HTTP surface for the notification dispatcher.
//!
//! - `GET  /health`: service status, channel readiness, pending email count
//! - `POST /api/notifications/email`: queue an email, returns its queue id
//! - `POST /api/notifications/whatsapp`: send a WhatsApp text with fallback

pub mod routes;
pub mod state;
