//! Paced email delivery queue.
//!
//! Request handlers enqueue an [`EmailMessage`] and get a [`DeliveryHandle`]
//! back immediately. A single worker task drains the queue in FIFO order,
//! one SMTP send at a time, sleeping for the pacing interval between sends.
//!
//! The pending entries and the "worker active" flag share one mutex, and the
//! flag only changes under that lock: on enqueue (idle → active, spawning the
//! worker) and when the worker finds the queue empty (active → idle). This is
//! what keeps at most one send in flight per queue.
//!
//! The queue is unbounded. Producers get no backpressure; that is acceptable
//! for admin-triggered notification volume but a bounded queue with an
//! explicit overflow policy is needed before reusing this for bulk mail.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, oneshot};
use uuid::Uuid;

use tenancy_common::types::{DeliveryOutcome, EmailMessage, MISSING_RECIPIENT, Provider};

use crate::clients::Mailer;

/// Default minimum delay between consecutive sends.
pub const DEFAULT_PACING: Duration = Duration::from_millis(1000);

/// Failure reason for an entry whose send task panicked or was dropped.
pub const WORKER_STOPPED: &str = "delivery worker stopped";

/// Caller's side of a queued email: resolves exactly once with the outcome.
#[derive(Debug)]
pub struct DeliveryHandle {
    id: Uuid,
    rx: oneshot::Receiver<DeliveryOutcome>,
}

impl DeliveryHandle {
    /// Queue-assigned id, also used in the worker's log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Future for DeliveryHandle {
    type Output = DeliveryOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| DeliveryOutcome::failed(WORKER_STOPPED))
        })
    }
}

struct QueueEntry {
    id: Uuid,
    message: EmailMessage,
    enqueued_at: DateTime<Utc>,
    completion: oneshot::Sender<DeliveryOutcome>,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    worker_active: bool,
}

struct Inner {
    /// `None` when the email channel is not configured.
    mailer: Option<Arc<dyn Mailer>>,
    pacing: Duration,
    state: Mutex<QueueState>,
    idle: Notify,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(self: Arc<Self>, mailer: Arc<dyn Mailer>) {
        loop {
            let entry = self.lock_state().entries.pop_front();
            if let Some(entry) = entry {
                self.deliver(&mailer, entry).await;
            }

            {
                let mut state = self.lock_state();
                if state.entries.is_empty() {
                    state.worker_active = false;
                    break;
                }
            }

            tokio::time::sleep(self.pacing).await;
        }

        tracing::debug!("Email queue drained");
        self.idle.notify_waiters();
    }

    /// Send one entry. The send runs in its own task so a panicking mailer
    /// fails only this entry and the worker keeps draining.
    async fn deliver(&self, mailer: &Arc<dyn Mailer>, entry: QueueEntry) {
        let QueueEntry {
            id,
            message,
            enqueued_at,
            completion,
        } = entry;
        let to = message.to.clone();
        let waited_ms = (Utc::now() - enqueued_at).num_milliseconds();
        tracing::debug!(id = %id, to = %to, waited_ms, "Sending queued email");

        let send = tokio::spawn({
            let mailer = Arc::clone(mailer);
            async move { mailer.send(&message).await }
        });

        let outcome = match send.await {
            Ok(Ok(message_id)) => {
                tracing::info!(id = %id, to = %to, message_id = %message_id, "Email sent");
                DeliveryOutcome::sent(Provider::Smtp, message_id)
            }
            Ok(Err(e)) => {
                tracing::warn!(id = %id, to = %to, error = %e, "Email delivery failed");
                DeliveryOutcome::failed(e.to_string())
            }
            Err(e) => {
                tracing::error!(id = %id, to = %to, error = %e, "Email send task aborted");
                DeliveryOutcome::failed(WORKER_STOPPED)
            }
        };

        if completion.send(outcome).is_err() {
            tracing::debug!(id = %id, "Delivery handle dropped before completion");
        }
    }
}

/// In-process FIFO email queue with a single paced worker.
///
/// Cheap to clone; clones share the same queue and worker.
#[derive(Clone)]
pub struct EmailQueue {
    inner: Arc<Inner>,
}

impl EmailQueue {
    pub fn new(mailer: Arc<dyn Mailer>, pacing: Duration) -> Self {
        Self::build(Some(mailer), pacing)
    }

    /// Queue for a process without email credentials: every message is
    /// skipped and reported as sent.
    pub fn disabled() -> Self {
        Self::build(None, DEFAULT_PACING)
    }

    fn build(mailer: Option<Arc<dyn Mailer>>, pacing: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                mailer,
                pacing,
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.mailer.is_some()
    }

    pub fn pacing(&self) -> Duration {
        self.inner.pacing
    }

    /// Queue a message for delivery.
    ///
    /// Never fails synchronously. A disabled queue resolves the handle at once
    /// as a no-op send; a blank recipient resolves it as failed. Must be called
    /// from within a Tokio runtime, since the first enqueue of a burst spawns
    /// the worker task.
    pub fn enqueue(&self, message: EmailMessage) -> DeliveryHandle {
        let id = Uuid::new_v4();
        let (completion, rx) = oneshot::channel();
        let handle = DeliveryHandle { id, rx };

        let Some(mailer) = &self.inner.mailer else {
            tracing::debug!(id = %id, to = %message.to, "Email channel not configured, skipping");
            let _ = completion.send(DeliveryOutcome::skipped());
            return handle;
        };

        if !message.has_recipient() {
            tracing::warn!(id = %id, "Rejected email without recipient");
            let _ = completion.send(DeliveryOutcome::failed(MISSING_RECIPIENT));
            return handle;
        }

        let start_worker = {
            let mut state = self.inner.lock_state();
            state.entries.push_back(QueueEntry {
                id,
                message,
                enqueued_at: Utc::now(),
                completion,
            });
            tracing::debug!(id = %id, pending = state.entries.len(), "Email queued");
            !std::mem::replace(&mut state.worker_active, true)
        };

        if start_worker {
            tokio::spawn(Arc::clone(&self.inner).drain(Arc::clone(mailer)));
        }

        handle
    }

    /// Entries waiting to be sent, not counting the one in flight.
    pub fn pending(&self) -> usize {
        self.inner.lock_state().entries.len()
    }

    /// Whether a worker is currently draining the queue.
    pub fn is_busy(&self) -> bool {
        self.inner.lock_state().worker_active
    }

    /// Resolve once the worker has drained every queued entry.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChannelError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Records the start time of every send and the peak concurrency.
    #[derive(Default)]
    struct RecordingMailer {
        sends: Mutex<Vec<(String, Instant)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.sends.lock().unwrap().push((message.to.clone(), Instant::now()));

            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_for.as_deref() == Some(message.to.as_str()) {
                return Err(ChannelError::smtp("550 mailbox unavailable"));
            }
            Ok(format!("<{}@test>", message.to))
        }
    }

    fn recipients(mailer: &RecordingMailer) -> Vec<String> {
        mailer.sends.lock().unwrap().iter().map(|(to, _)| to.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_in_order_with_pacing() {
        let mailer = Arc::new(RecordingMailer::default());
        let queue = EmailQueue::new(mailer.clone(), Duration::from_millis(1000));

        let handles: Vec<_> = ["a@x.io", "b@x.io", "c@x.io"]
            .into_iter()
            .map(|to| queue.enqueue(EmailMessage::new(to).text("hi")))
            .collect();

        for handle in handles {
            assert!(handle.await.is_sent());
        }

        assert_eq!(recipients(&mailer), ["a@x.io", "b@x.io", "c@x.io"]);
        let sends = mailer.sends.lock().unwrap();
        assert!(sends[1].1 - sends[0].1 >= Duration::from_millis(1000));
        assert!(sends[2].1 - sends[0].1 >= Duration::from_millis(2000));
        assert_eq!(mailer.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_does_not_stop_queue() {
        let mailer = Arc::new(RecordingMailer {
            fail_for: Some("bad@x.io".to_string()),
            ..Default::default()
        });
        let queue = EmailQueue::new(mailer.clone(), Duration::from_millis(100));

        let first = queue.enqueue(EmailMessage::new("bad@x.io"));
        let second = queue.enqueue(EmailMessage::new("good@x.io"));

        match first.await {
            DeliveryOutcome::Failed { reason } => assert!(reason.contains("550")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(
            second.await,
            DeliveryOutcome::sent(Provider::Smtp, "<good@x.io@test>")
        );
        assert_eq!(recipients(&mailer), ["bad@x.io", "good@x.io"]);
    }

    #[tokio::test]
    async fn test_disabled_queue_skips_without_sending() {
        let queue = EmailQueue::disabled();
        let outcome = queue.enqueue(EmailMessage::new("tenant@example.com")).await;
        assert_eq!(outcome, DeliveryOutcome::skipped());
        assert!(!queue.is_busy());
        assert!(!queue.is_enabled());
    }

    #[tokio::test]
    async fn test_blank_recipient_fails_through_handle() {
        let mailer = Arc::new(RecordingMailer::default());
        let queue = EmailQueue::new(mailer.clone(), Duration::ZERO);

        let outcome = queue.enqueue(EmailMessage::new("  ")).await;
        assert_eq!(outcome, DeliveryOutcome::failed(MISSING_RECIPIENT));
        assert!(recipients(&mailer).is_empty());
        assert!(!queue.is_busy());
    }

    /// Panics on the first send, succeeds afterwards.
    #[derive(Default)]
    struct PanicOnceMailer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Mailer for PanicOnceMailer {
        async fn send(&self, message: &EmailMessage) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("mailer blew up");
            }
            Ok(format!("<{}@test>", message.to))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_send_fails_only_its_entry() {
        let mailer = Arc::new(PanicOnceMailer::default());
        let queue = EmailQueue::new(mailer.clone(), Duration::from_millis(100));

        let a = queue.enqueue(EmailMessage::new("a@x.io"));
        let b = queue.enqueue(EmailMessage::new("b@x.io"));

        assert_eq!(a.await, DeliveryOutcome::failed(WORKER_STOPPED));
        assert_eq!(
            b.await,
            DeliveryOutcome::sent(Provider::Smtp, "<b@x.io@test>")
        );

        let c = queue.enqueue(EmailMessage::new("c@x.io"));
        assert_eq!(
            c.await,
            DeliveryOutcome::sent(Provider::Smtp, "<c@x.io@test>")
        );

        queue.wait_idle().await;
        assert!(!queue.is_busy());
        assert_eq!(queue.pending(), 0);
        assert_eq!(mailer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_and_wait_idle() {
        let mailer = Arc::new(RecordingMailer::default());
        let queue = EmailQueue::new(mailer.clone(), Duration::from_millis(500));

        let _a = queue.enqueue(EmailMessage::new("a@x.io"));
        let _b = queue.enqueue(EmailMessage::new("b@x.io"));
        let _c = queue.enqueue(EmailMessage::new("c@x.io"));
        assert!(queue.is_busy());
        assert_eq!(queue.pending(), 3);

        queue.wait_idle().await;
        assert!(!queue.is_busy());
        assert_eq!(queue.pending(), 0);
        assert_eq!(recipients(&mailer).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_burst_after_idle_restarts_worker() {
        let mailer = Arc::new(RecordingMailer::default());
        let queue = EmailQueue::new(mailer.clone(), Duration::from_millis(200));

        queue.enqueue(EmailMessage::new("a@x.io")).await;
        queue.wait_idle().await;

        let outcome = queue.enqueue(EmailMessage::new("b@x.io")).await;
        assert!(outcome.is_sent());
        assert_eq!(recipients(&mailer), ["a@x.io", "b@x.io"]);
        assert_eq!(mailer.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
