//! Multicast event bus
//!
//! Every subscriber sees every event published after it subscribed
//! (multicast, not competing consumers). Each subscriber has its own
//! unbounded queue, so a slow reader falls behind without losing anything
//! and never holds up the clock. Dropping the bus completes all
//! subscriptions; dropping a subscription only stops delivery to it.

use log::warn;
use tempora_ports::TimeError;
use tokio::sync::mpsc;

/// One delivery on a bus: an event or an error routed to this channel
pub type Notification<T> = Result<T, TimeError>;

/// Publishing side of a multicast channel
pub struct EventBus<T> {
    subscribers: Vec<mpsc::UnboundedSender<Notification<T>>>,
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Get another subscriber for this bus
    pub fn subscribe(&mut self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        Subscription { rx: Some(rx) }
    }

    /// Publish to current subscribers, returning how many were reached
    pub fn publish(&mut self, event: T) -> usize {
        self.send(Ok(event))
    }

    /// Route an error to current subscribers without closing the channel
    pub fn publish_error(&mut self, error: TimeError) -> usize {
        self.send(Err(error))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.iter().filter(|tx| !tx.is_closed()).count()
    }

    fn send(&mut self, notification: Notification<T>) -> usize {
        // Dropped subscriptions fall out here
        self.subscribers
            .retain(|tx| tx.send(notification.clone()).is_ok());
        self.subscribers.len()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of a bus
///
/// Yields `None` once the bus is gone and everything published before that
/// was read, and keeps yielding `None` afterwards.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: Option<mpsc::UnboundedReceiver<Notification<T>>>,
}

impl<T: Clone> Subscription<T> {
    /// A subscription that is already complete
    pub fn closed() -> Self {
        Self { rx: None }
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    /// Notifications published but not read yet
    pub fn backlog(&self) -> usize {
        self.rx.as_ref().map_or(0, |rx| rx.len())
    }

    /// Wait for the next notification, or `None` when the channel completed
    pub async fn recv(&mut self) -> Option<Notification<T>> {
        let rx = self.rx.as_mut()?;
        match rx.recv().await {
            Some(notification) => Some(notification),
            None => {
                self.rx = None;
                None
            }
        }
    }

    /// Wait for the next event, skipping routed errors
    pub async fn next_event(&mut self) -> Option<T> {
        loop {
            match self.recv().await? {
                Ok(event) => return Some(event),
                Err(error) => warn!("Skipping routed error: {}", error),
            }
        }
    }

    /// Drain events until the channel completes
    pub async fn collect_events(mut self) -> Vec<T> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }
}
