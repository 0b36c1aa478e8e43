#![forbid(unsafe_code)]

//! Subscription system for continuous event sources.
//!
//! Subscriptions deliver messages from outside the model, such as
//! notifications published on a [`NotificationBus`](crate::bus::NotificationBus).
//! The program manages their lifecycle based on what the model declares
//! as active.
//!
//! # How it works
//!
//! 1. `Model::subscriptions()` returns the set of active subscriptions
//! 2. After each `update()`, the program compares active vs previous subscriptions
//! 3. New subscriptions are started, removed ones are stopped
//! 4. Subscription messages are routed through `Model::update()` on the program thread

use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

/// A unique identifier for a subscription.
///
/// Used by the program to track which subscriptions are active and
/// to deduplicate subscriptions across update cycles.
pub type SubId = u64;

/// A subscription produces messages from an external event source.
///
/// Subscriptions run on background threads and send messages through
/// the provided channel.
pub trait Subscription<M: Send + 'static>: Send {
    /// Unique identifier for deduplication.
    ///
    /// Subscriptions with the same ID are considered identical; an
    /// unchanged subscription keeps running across updates.
    fn id(&self) -> SubId;

    /// Run the subscription, sending messages through the channel.
    ///
    /// Called on a background thread. Implementations loop until the
    /// channel is disconnected or the stop signal is raised.
    fn run(&self, sender: mpsc::Sender<M>, stop: StopSignal);
}

type StopFlag = Arc<(Mutex<bool>, Condvar)>;

/// Signal for stopping a subscription.
#[derive(Clone)]
pub struct StopSignal {
    inner: StopFlag,
}

impl StopSignal {
    /// Create a new stop signal pair (signal, trigger).
    pub(crate) fn new() -> (Self, StopTrigger) {
        let inner: StopFlag = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: Arc::clone(&inner),
        };
        (signal, StopTrigger { inner })
    }

    /// Check if the stop signal has been triggered.
    pub fn is_stopped(&self) -> bool {
        let (lock, _) = &*self.inner;
        *lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for either the stop signal or a timeout.
    ///
    /// Returns `true` if stopped, `false` if timed out.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            return true;
        }
        let (stopped, _) = cvar
            .wait_timeout(stopped, duration)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Trigger to stop a subscription from the program side.
pub(crate) struct StopTrigger {
    inner: StopFlag,
}

impl StopTrigger {
    pub(crate) fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        cvar.notify_all();
    }
}

/// A running subscription handle.
pub(crate) struct RunningSubscription {
    pub(crate) id: SubId,
    trigger: StopTrigger,
    thread: Option<thread::JoinHandle<()>>,
}

impl RunningSubscription {
    /// Stop the subscription and join its thread.
    pub(crate) fn stop(mut self) {
        self.trigger.stop();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RunningSubscription {
    fn drop(&mut self) {
        self.trigger.stop();
    }
}

/// Manages the lifecycle of subscriptions and owns the program's inbound
/// message channel.
pub(crate) struct SubscriptionManager<M: Send + 'static> {
    active: Vec<RunningSubscription>,
    sender: mpsc::Sender<M>,
    receiver: mpsc::Receiver<M>,
}

impl<M: Send + 'static> SubscriptionManager<M> {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            active: Vec::new(),
            sender,
            receiver,
        }
    }

    /// Sender feeding the same channel subscriptions use.
    pub(crate) fn sender(&self) -> mpsc::Sender<M> {
        self.sender.clone()
    }

    /// Update the set of active subscriptions.
    ///
    /// - Starts subscriptions that are new (ID not in active set)
    /// - Stops subscriptions that are no longer declared
    /// - Leaves unchanged subscriptions running
    pub(crate) fn reconcile(&mut self, subscriptions: Vec<Box<dyn Subscription<M>>>) {
        let new_ids: HashSet<SubId> = subscriptions.iter().map(|s| s.id()).collect();

        let mut remaining = Vec::new();
        for running in self.active.drain(..) {
            if new_ids.contains(&running.id) {
                remaining.push(running);
            } else {
                tracing::debug!(sub_id = running.id, "Stopping subscription");
                running.stop();
            }
        }
        self.active = remaining;

        let mut active_ids: HashSet<SubId> = self.active.iter().map(|r| r.id).collect();
        for sub in subscriptions {
            let id = sub.id();
            if !active_ids.insert(id) {
                continue;
            }

            tracing::debug!(sub_id = id, "Starting subscription");
            let (signal, trigger) = StopSignal::new();
            let sender = self.sender.clone();
            let thread = thread::spawn(move || {
                sub.run(sender, signal);
            });

            self.active.push(RunningSubscription {
                id,
                trigger,
                thread: Some(thread),
            });
        }
    }

    /// Number of running subscriptions.
    pub(crate) fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Take one pending message without blocking.
    pub(crate) fn try_recv(&self) -> Option<M> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for a message.
    pub(crate) fn recv_timeout(&self, timeout: Duration) -> Option<M> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Stop all running subscriptions.
    pub(crate) fn stop_all(&mut self) {
        for running in self.active.drain(..) {
            running.stop();
        }
    }
}

impl<M: Send + 'static> Drop for SubscriptionManager<M> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// A mock subscription for testing.
///
/// Immediately sends all queued messages and then stops.
pub struct MockSubscription<M: Send + 'static> {
    id: SubId,
    messages: Vec<M>,
}

impl<M: Send + Clone + 'static> MockSubscription<M> {
    /// Create a mock subscription that sends the given messages.
    pub fn new(id: SubId, messages: Vec<M>) -> Self {
        Self { id, messages }
    }
}

impl<M: Send + Clone + 'static> Subscription<M> for MockSubscription<M> {
    fn id(&self) -> SubId {
        self.id
    }

    fn run(&self, sender: mpsc::Sender<M>, _stop: StopSignal) {
        for msg in &self.messages {
            if sender.send(msg.clone()).is_err() {
                break;
            }
        }
    }
}
