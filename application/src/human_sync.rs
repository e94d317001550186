//! Human-sync gate: suspend a tool call until a person responds.
//!
//! The gate owns a single pending-request slot. [`HumanSyncGate::ask`]
//! occupies it, publishes the request on the [`EventBus`] for the UI, and
//! waits for [`resolve`](HumanSyncGate::resolve),
//! [`reject`](HumanSyncGate::reject) or the deadline. A second `ask` while the
//! slot is occupied fails immediately with [`GateError::Busy`]; it never
//! queues and never overwrites the first request.
//!
//! ```text
//! ask() ──▶ slot empty? ──no──▶ Err(Busy)
//!              │yes
//!              ▼
//!        occupy slot ─▶ publish ─▶ await { resolve | reject | deadline }
//!                                         │
//!                                   clear slot
//! ```
//!
//! The same gate type backs clarifying questions ([`QuestionGate`]) and
//! destructive-action approval ([`PermissionGate`]).

use crate::bus::{EventBus, EventDefinition, topics};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use toolhost_domain::interaction::{Answer, PermissionDecision, PermissionRequest, Question};
use tracing::{debug, warn};

/// Errors returned to the caller of [`HumanSyncGate::ask`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Another request is already waiting for a response")]
    Busy,

    #[error("No response within {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Responder dropped the request")]
    Closed,
}

struct Pending<Resp> {
    id: u64,
    responder: oneshot::Sender<Result<Resp, String>>,
    deadline: Instant,
}

/// Single-slot blocking gate between a tool call and an external responder.
pub struct HumanSyncGate<Req, Resp> {
    bus: Arc<EventBus>,
    definition: EventDefinition<Req>,
    timeout: Duration,
    pending: Mutex<Option<Pending<Resp>>>,
    next_id: AtomicU64,
}

pub type QuestionGate = HumanSyncGate<Question, Answer>;
pub type PermissionGate = HumanSyncGate<PermissionRequest, PermissionDecision>;

impl QuestionGate {
    pub fn questions(bus: Arc<EventBus>, timeout: Duration) -> Self {
        Self::new(bus, topics::question_asked(), timeout)
    }
}

impl PermissionGate {
    pub fn permissions(bus: Arc<EventBus>, timeout: Duration) -> Self {
        Self::new(bus, topics::permission_requested(), timeout)
    }
}

impl<Req: Serialize, Resp> HumanSyncGate<Req, Resp> {
    pub fn new(bus: Arc<EventBus>, definition: EventDefinition<Req>, timeout: Duration) -> Self {
        Self {
            bus,
            definition,
            timeout,
            pending: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Pending<Resp>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish `request` and wait for the response.
    pub async fn ask(&self, request: Req) -> Result<Resp, GateError> {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        {
            let mut slot = self.slot();
            if slot.is_some() {
                debug!(topic = self.definition.name(), "Gate busy, rejecting request");
                return Err(GateError::Busy);
            }
            *slot = Some(Pending {
                id,
                responder: tx,
                deadline: Instant::now() + self.timeout,
            });
        }

        // Clears the slot on every exit path, including cancellation of this future
        let _release = SlotRelease { gate: self, id };

        self.bus.publish(&self.definition, &request);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(reason))) => Err(GateError::Rejected(reason)),
            Ok(Err(_)) => Err(GateError::Closed),
            Err(_) => {
                warn!(
                    topic = self.definition.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Human-sync request timed out"
                );
                Err(GateError::Timeout(self.timeout))
            }
        }
    }

    /// Answer the pending request. Returns `false` when nothing is pending.
    pub fn resolve(&self, response: Resp) -> bool {
        match self.slot().take() {
            Some(pending) => pending.responder.send(Ok(response)).is_ok(),
            None => false,
        }
    }

    /// Fail the pending request with `reason`. Returns `false` when nothing is pending.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        match self.slot().take() {
            Some(pending) => pending.responder.send(Err(reason.into())).is_ok(),
            None => false,
        }
    }

    /// How long `ask` waits for a response.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Deadline of the pending request, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.slot().as_ref().map(|p| p.deadline)
    }
}

struct SlotRelease<'a, Req: Serialize, Resp> {
    gate: &'a HumanSyncGate<Req, Resp>,
    id: u64,
}

impl<Req: Serialize, Resp> Drop for SlotRelease<'_, Req, Resp> {
    fn drop(&mut self) {
        let mut slot = self.gate.slot();
        if slot.as_ref().is_some_and(|p| p.id == self.id) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusEvent;

    fn gate(timeout: Duration) -> (Arc<QuestionGate>, Arc<Mutex<Vec<BusEvent>>>) {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        // Leak the subscription handle for the test's lifetime
        std::mem::forget(bus.subscribe(move |e| sink.lock().unwrap().push(e.clone())));
        (Arc::new(QuestionGate::questions(bus, timeout)), seen)
    }

    async fn wait_for_pending(gate: &QuestionGate) {
        while !gate.is_pending() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_ask_resolves_and_publishes() {
        let (gate, seen) = gate(Duration::from_secs(5));

        let asker = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ask(Question::new("Which branch?")).await })
        };
        wait_for_pending(&gate).await;

        assert!(gate.resolve(Answer::new("main")));
        assert_eq!(asker.await.unwrap(), Ok(Answer::new("main")));
        assert!(!gate.is_pending());

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].name, topics::QUESTION_ASKED);
        assert_eq!(seen[0].payload["question"], "Which branch?");
    }

    #[tokio::test]
    async fn test_second_ask_is_busy_and_first_still_resolves() {
        let (gate, _seen) = gate(Duration::from_secs(5));

        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ask(Question::new("first")).await })
        };
        wait_for_pending(&gate).await;

        let second = gate.ask(Question::new("second")).await;
        assert_eq!(second, Err(GateError::Busy));
        assert!(gate.is_pending());

        gate.resolve(Answer::new("one"));
        assert_eq!(first.await.unwrap(), Ok(Answer::new("one")));
    }

    #[tokio::test]
    async fn test_reject() {
        let (gate, _seen) = gate(Duration::from_secs(5));
        let asker = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ask(Question::new("q")).await })
        };
        wait_for_pending(&gate).await;

        assert!(gate.reject("user dismissed"));
        assert_eq!(
            asker.await.unwrap(),
            Err(GateError::Rejected("user dismissed".into()))
        );
        assert!(!gate.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_slot() {
        let (gate, _seen) = gate(Duration::from_secs(300));

        let result = gate.ask(Question::new("anyone?")).await;
        assert_eq!(result, Err(GateError::Timeout(Duration::from_secs(300))));
        assert!(!gate.is_pending());
        assert!(!gate.resolve(Answer::new("late")));

        // Slot is free again
        let asker = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ask(Question::new("again")).await })
        };
        wait_for_pending(&gate).await;
        gate.resolve(Answer::new("yes"));
        assert_eq!(asker.await.unwrap(), Ok(Answer::new("yes")));
    }

    #[tokio::test]
    async fn test_resolve_without_pending() {
        let (gate, _seen) = gate(Duration::from_secs(1));
        assert!(!gate.resolve(Answer::new("nobody asked")));
        assert!(!gate.reject("nobody asked"));
        assert!(gate.deadline().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_ask_frees_slot() {
        let (gate, _seen) = gate(Duration::from_secs(60));
        let asker = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.ask(Question::new("q")).await })
        };
        wait_for_pending(&gate).await;

        asker.abort();
        let _ = asker.await;
        assert!(!gate.is_pending());
    }
}
