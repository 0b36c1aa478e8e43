#![forbid(unsafe_code)]

//! Notification bus shared between the navigation tree and its host.
//!
//! The host publishes [`Notification`]s (a hierarchy reload request, a
//! change of the selected rule); the tree listens through
//! [`BusSubscription`]s declared by its model. The bus is a cloneable
//! handle: every clone publishes to the same set of listeners.

use crate::subscription::{StopSignal, SubId, Subscription};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// How often a listening subscription re-checks its stop signal.
const LISTEN_POLL: Duration = Duration::from_millis(20);

/// Notification topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Reload,
    SelectionChanged,
}

impl Topic {
    /// Stable subscription id for listeners of this topic.
    #[must_use]
    pub const fn sub_id(&self) -> SubId {
        // "NTFY" magic keeps these clear of hand-picked ids.
        let base: SubId = 0x4E54_4659 << 8;
        match self {
            Self::Reload => base | 1,
            Self::SelectionChanged => base | 2,
        }
    }
}

/// A message published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Re-fetch the hierarchy.
    Reload,
    /// A rule was selected.
    SelectionChanged {
        new_selected_id: String,
        parent_id: Option<String>,
    },
}

impl Notification {
    /// Convenience constructor for a selection change.
    pub fn selection_changed(
        new_selected_id: impl Into<String>,
        parent_id: Option<impl Into<String>>,
    ) -> Self {
        Self::SelectionChanged {
            new_selected_id: new_selected_id.into(),
            parent_id: parent_id.map(Into::into),
        }
    }

    /// Topic this notification is published under.
    #[must_use]
    pub const fn topic(&self) -> Topic {
        match self {
            Self::Reload => Topic::Reload,
            Self::SelectionChanged { .. } => Topic::SelectionChanged,
        }
    }
}

/// Registered listeners, keyed so a subscription can withdraw its own.
#[derive(Default)]
struct Listeners {
    next_id: u64,
    senders: Vec<(u64, mpsc::Sender<Notification>)>,
}

/// Cloneable publish/subscribe handle.
#[derive(Clone, Default)]
pub struct NotificationBus {
    listeners: Arc<Mutex<Listeners>>,
}

impl NotificationBus {
    /// Create a bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `notification` to every live listener.
    ///
    /// Listeners whose receiver has been dropped are pruned. Returns the
    /// number of listeners reached.
    pub fn publish(&self, notification: Notification) -> usize {
        let mut listeners = self.lock();
        listeners
            .senders
            .retain(|(_, tx)| tx.send(notification.clone()).is_ok());
        let delivered = listeners.senders.len();
        tracing::trace!(
            topic = ?notification.topic(),
            delivered,
            "bus.publish"
        );
        delivered
    }

    /// Register a new listener.
    #[must_use]
    pub fn listen(&self) -> mpsc::Receiver<Notification> {
        self.register().1
    }

    /// Number of registered listeners, including ones not yet pruned.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.lock().senders.len()
    }

    /// Subscription forwarding `topic` notifications as model messages.
    #[must_use]
    pub fn subscription<M>(&self, topic: Topic) -> BusSubscription<M>
    where
        M: From<Notification> + Send + 'static,
    {
        BusSubscription::new(self, topic)
    }

    fn register(&self) -> (u64, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel();
        let mut listeners = self.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.senders.push((id, tx));
        (id, rx)
    }

    fn unregister(&self, id: u64) {
        self.lock().senders.retain(|(listener, _)| *listener != id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Subscription that forwards one topic of a [`NotificationBus`].
///
/// The listener is registered when the subscription is created, so
/// notifications published between declaration and start are not lost.
/// It is withdrawn when the subscription is dropped, whether it ran or was
/// discarded as a duplicate of one already running.
pub struct BusSubscription<M> {
    topic: Topic,
    bus: NotificationBus,
    listener: u64,
    receiver: Mutex<Option<mpsc::Receiver<Notification>>>,
    _msg: std::marker::PhantomData<fn() -> M>,
}

impl<M> BusSubscription<M>
where
    M: From<Notification> + Send + 'static,
{
    /// Listen on `bus` for `topic`.
    #[must_use]
    pub fn new(bus: &NotificationBus, topic: Topic) -> Self {
        let (listener, receiver) = bus.register();
        Self {
            topic,
            bus: bus.clone(),
            listener,
            receiver: Mutex::new(Some(receiver)),
            _msg: std::marker::PhantomData,
        }
    }
}

impl<M> Drop for BusSubscription<M> {
    fn drop(&mut self) {
        self.bus.unregister(self.listener);
    }
}

impl<M> Subscription<M> for BusSubscription<M>
where
    M: From<Notification> + Send + 'static,
{
    fn id(&self) -> SubId {
        self.topic.sub_id()
    }

    fn run(&self, sender: mpsc::Sender<M>, stop: StopSignal) {
        let Some(receiver) = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };
        while !stop.is_stopped() {
            match receiver.recv_timeout(LISTEN_POLL) {
                Ok(notification) if notification.topic() == self.topic => {
                    if sender.send(M::from(notification)).is_err() {
                        break;
                    }
                }
                Ok(_) | Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}
