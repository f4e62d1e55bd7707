//! Outbound notification dispatcher.
//!
//! Delivers email through a paced, single-worker FIFO queue and WhatsApp
//! messages through an ordered provider fallback chain. Application code
//! talks only to [`Notifier`]:
//!
//! ```no_run
//! use tenancy_common::config::AppConfig;
//! use tenancy_common::types::EmailMessage;
//! use tenancy_notifier::Notifier;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::from_env()?;
//! let notifier = Notifier::from_config(&config)?;
//!
//! // Returns at once; the queue worker delivers in the background.
//! let handle = notifier.send_email(
//!     EmailMessage::new("tenant@example.com")
//!         .subject("Payment received")
//!         .text("Thanks, your rent for March is recorded."),
//! );
//!
//! let outcome = notifier.send_whatsapp("919999999999", "Rent received").await;
//! println!("{outcome:?} / {:?}", handle.await);
//! # Ok(())
//! # }
//! ```

pub mod clients;
pub mod error;
pub mod notifier;
pub mod phone;
pub mod queue;
pub mod whatsapp;

pub use error::{ChannelError, Result};
pub use notifier::Notifier;
pub use queue::{DeliveryHandle, EmailQueue};
pub use whatsapp::WhatsAppDispatcher;
