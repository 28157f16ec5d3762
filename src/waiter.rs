//! Event correlation for interactive widgets
//!
//! [`EventWaiter`] holds every pending "wait for the next matching event"
//! registration in the process. Inbound gateway events are dispatched against
//! the registry; the first terminal transition of a waiter (matched or timed
//! out) removes it, so its callback and its timeout callback can never both
//! run.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::EVENT_TARGET;
use crate::events::{Event, EventKind};

/// Boxed future used by stored waiter callbacks.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

type Condition = Box<dyn Fn(&Event) -> bool + Send + Sync + 'static>;
type Action = Box<dyn FnOnce(Event) -> BoxFuture + Send + 'static>;
type TimeoutAction = Box<dyn FnOnce() -> BoxFuture + Send + 'static>;

/// A single pending registration.
struct Waiter {
    id: u64,
    condition: Condition,
    outcome: Outcome,
}

enum Outcome {
    /// Callback-style waiter registered through `wait_for`.
    Invoke {
        action: Action,
        on_timeout: Option<TimeoutAction>,
    },
    /// Future-style waiter registered through `receive`.
    Resolve(oneshot::Sender<Event>),
}

impl Waiter {
    async fn fire(self, event: Event) {
        match self.outcome {
            Outcome::Invoke { action, .. } => action(event).await,
            Outcome::Resolve(tx) => {
                // The receiver may have been dropped by a cancelled caller.
                let _ = tx.send(event);
            }
        }
    }

    async fn expire(self) {
        match self.outcome {
            Outcome::Invoke { on_timeout, .. } => {
                if let Some(on_timeout) = on_timeout {
                    on_timeout().await;
                }
            }
            // Dropping the sender resolves the pending `receive` to `None`.
            Outcome::Resolve(_) => {}
        }
    }
}

/// Registry of pending waiters, keyed by event kind.
///
/// Cloning is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct EventWaiter {
    registry: Arc<DashMap<EventKind, Vec<Waiter>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventWaiter {
    /// Create a new, empty waiter registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register a callback waiter for the next event of `kind` matching
    /// `condition`.
    ///
    /// Registration returns immediately. When a matching event is dispatched
    /// the waiter is removed and `action` runs with a clone of the event. If
    /// `timeout` is set and elapses first, the waiter is removed silently.
    ///
    /// `condition` is evaluated under the registry lock and must not call
    /// back into the waiter.
    pub fn wait_for<C, A, F>(&self, kind: EventKind, timeout: Option<Duration>, condition: C, action: A)
    where
        C: Fn(&Event) -> bool + Send + Sync + 'static,
        A: FnOnce(Event) -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        let outcome = Outcome::Invoke {
            action: Box::new(move |event: Event| -> BoxFuture { Box::pin(action(event)) }),
            on_timeout: None,
        };
        let id = self.register(kind, Box::new(condition), outcome);
        if let Some(delay) = timeout {
            self.schedule_expiry(kind, id, delay);
        }
    }

    /// Like [`wait_for`](Self::wait_for), but with a callback invoked when
    /// `delay` elapses before any event matches.
    ///
    /// Exactly one of `action` and `on_timeout` runs, never both.
    pub fn wait_for_with_timeout<C, A, F, T, TF>(
        &self,
        kind: EventKind,
        delay: Duration,
        condition: C,
        action: A,
        on_timeout: T,
    ) where
        C: Fn(&Event) -> bool + Send + Sync + 'static,
        A: FnOnce(Event) -> F + Send + 'static,
        F: Future<Output = ()> + Send + 'static,
        T: FnOnce() -> TF + Send + 'static,
        TF: Future<Output = ()> + Send + 'static,
    {
        let outcome = Outcome::Invoke {
            action: Box::new(move |event: Event| -> BoxFuture { Box::pin(action(event)) }),
            on_timeout: Some(Box::new(move || -> BoxFuture { Box::pin(on_timeout()) })),
        };
        let id = self.register(kind, Box::new(condition), outcome);
        self.schedule_expiry(kind, id, delay);
    }

    /// Wait for the next event of `kind` matching `condition` and return it.
    ///
    /// Resolves to `None` when `timeout` elapses with no match. With
    /// `timeout` of `None` this waits indefinitely.
    pub async fn receive<C>(&self, kind: EventKind, timeout: Option<Duration>, condition: C) -> Option<Event>
    where
        C: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let id = self.register(kind, Box::new(condition), Outcome::Resolve(tx));
        if let Some(delay) = timeout {
            self.schedule_expiry(kind, id, delay);
        }
        rx.await.ok()
    }

    /// Feed an inbound event to the registry on its own task.
    ///
    /// This is the gateway handler's entry point; it returns immediately so
    /// waiter evaluation and callbacks never block event delivery.
    pub fn handle(&self, event: Event) {
        let waiter = self.clone();
        tokio::spawn(async move {
            waiter.dispatch(event).await;
        });
    }

    /// Evaluate `event` against every waiter registered under each of its
    /// kinds, firing and removing all that match.
    pub async fn dispatch(&self, event: Event) {
        for kind in event.categories() {
            let matched = self.drain_matching(kind, &event);
            for waiter in matched {
                debug!(
                    target: EVENT_TARGET,
                    waiter_id = waiter.id,
                    kind = %kind,
                    "waiter matched"
                );
                waiter.fire(event.clone()).await;
            }
        }
    }

    /// Number of currently registered waiters.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.registry.iter().map(|entry| entry.value().len()).sum()
    }

    fn register(&self, kind: EventKind, condition: Condition, outcome: Outcome) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.entry(kind).or_default().push(Waiter {
            id,
            condition,
            outcome,
        });
        debug!(target: EVENT_TARGET, waiter_id = id, kind = %kind, "waiter registered");
        id
    }

    /// Remove a waiter by id. Returns `None` when it already fired or
    /// already expired; removal is the commit point for both paths.
    fn remove(&self, kind: EventKind, id: u64) -> Option<Waiter> {
        let mut list = self.registry.get_mut(&kind)?;
        let index = list.iter().position(|waiter| waiter.id == id)?;
        Some(list.remove(index))
    }

    fn schedule_expiry(&self, kind: EventKind, id: u64, delay: Duration) {
        let waiter = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(expired) = waiter.remove(kind, id) {
                debug!(target: EVENT_TARGET, waiter_id = id, kind = %kind, "waiter timed out");
                expired.expire().await;
            }
        });
    }

    /// Remove and return every waiter under `kind` whose condition accepts
    /// `event`. Evaluation order is registration order, and a match does not
    /// stop evaluation of the remaining waiters.
    fn drain_matching(&self, kind: EventKind, event: &Event) -> Vec<Waiter> {
        let Some(mut list) = self.registry.get_mut(&kind) else {
            return Vec::new();
        };
        let mut matched = Vec::new();
        let mut index = 0;
        while index < list.len() {
            if Self::evaluate(&list[index], event) {
                matched.push(list.remove(index));
            } else {
                index += 1;
            }
        }
        matched
    }

    /// A condition that panics is treated as a non-match and the waiter stays
    /// registered; sibling waiters are unaffected.
    fn evaluate(waiter: &Waiter, event: &Event) -> bool {
        catch_unwind(AssertUnwindSafe(|| (waiter.condition)(event))).unwrap_or_else(|_| {
            warn!(
                target: EVENT_TARGET,
                waiter_id = waiter.id,
                kind = %event.kind(),
                "waiter condition panicked, treating as no match"
            );
            false
        })
    }
}

impl std::fmt::Debug for EventWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWaiter")
            .field("pending", &self.pending())
            .finish()
    }
}
