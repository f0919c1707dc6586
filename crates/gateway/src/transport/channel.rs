//! Tokio channel-based transport for single-process mode
//!
//! Requests travel over an mpsc channel with a oneshot for the reply;
//! callbacks are queued on an mpsc channel per callback address.
//! No serialization overhead - messages are passed directly.

use crate::error::TransportError;
use crate::messages::callback::Callback;
use crate::transport::{Notifier, Requester};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tempora_core::{ClockEvent, SubscriptionId, TriggerEvent};
use tempora_ports::TimeError;
use tokio::sync::{mpsc, oneshot};

/// Request message wrapper for channel-based request/reply
struct ChannelRequest<Req, Res> {
    request: Req,
    reply_tx: oneshot::Sender<Res>,
}

/// Channel-based requester for request/reply pattern
pub struct ChannelRequester<Req, Res> {
    tx: mpsc::Sender<ChannelRequest<Req, Res>>,
}

impl<Req, Res> Clone for ChannelRequester<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<Req, Res> ChannelRequester<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// Create a requester/responder pair
    pub fn pair(capacity: usize) -> (Self, ChannelResponder<Req, Res>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, ChannelResponder { rx })
    }
}

#[async_trait]
impl<Req, Res> Requester<Req, Res> for ChannelRequester<Req, Res>
where
    Req: Serialize + Clone + Send + Sync + 'static,
    Res: Send + 'static,
{
    async fn request(&self, req: &Req) -> Result<Res, TransportError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = ChannelRequest {
            request: req.clone(),
            reply_tx,
        };

        self.tx
            .send(request)
            .await
            .map_err(|_| TransportError::ChannelClosed)?;

        reply_rx.await.map_err(|_| TransportError::ChannelClosed)
    }
}

/// Channel-based responder (server side of request/reply)
pub struct ChannelResponder<Req, Res> {
    rx: mpsc::Receiver<ChannelRequest<Req, Res>>,
}

impl<Req, Res> ChannelResponder<Req, Res> {
    /// Receive the next request
    pub async fn next(&mut self) -> Option<(Req, oneshot::Sender<Res>)> {
        self.rx.recv().await.map(|req| (req.request, req.reply_tx))
    }
}

/// Notifier that queues callbacks on in-process channels
///
/// Each callback address is bound to a receiver with [`ChannelNotifier::bind`];
/// notifying an unbound address is rejected.
#[derive(Default)]
pub struct ChannelNotifier {
    endpoints: DashMap<String, mpsc::Sender<Callback>>,
    capacity: usize,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            endpoints: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Start receiving the callbacks sent to `address`
    ///
    /// Binding an address again replaces the previous receiver.
    pub fn bind(&self, address: impl Into<String>) -> mpsc::Receiver<Callback> {
        let (tx, rx) = mpsc::channel(self.capacity.max(1));
        self.endpoints.insert(address.into(), tx);
        rx
    }

    pub fn unbind(&self, address: &str) -> bool {
        self.endpoints.remove(address).is_some()
    }

    async fn send(&self, address: &str, callback: Callback) -> Result<(), TransportError> {
        let endpoint = self
            .endpoints
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::Rejected(format!("no endpoint at {address}")))?;
        endpoint
            .send(callback)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify_clock(
        &self,
        callback: &str,
        subscription: SubscriptionId,
        event: &ClockEvent,
    ) -> Result<(), TransportError> {
        self.send(
            callback,
            Callback::Clock {
                subscription,
                event: event.clone(),
            },
        )
        .await
    }

    async fn notify_trigger(
        &self,
        callback: &str,
        subscription: SubscriptionId,
        event: &TriggerEvent,
    ) -> Result<(), TransportError> {
        self.send(
            callback,
            Callback::Trigger {
                subscription,
                event: event.clone(),
            },
        )
        .await
    }

    async fn notify_error(
        &self,
        callback: &str,
        subscription: SubscriptionId,
        error: &TimeError,
    ) -> Result<(), TransportError> {
        self.send(callback, Callback::error(subscription, error))
            .await
    }

    async fn notify_completed(
        &self,
        callback: &str,
        subscription: SubscriptionId,
    ) -> Result<(), TransportError> {
        self.send(callback, Callback::Completed { subscription })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempora_core::{ClockConfig, ClockId};

    #[tokio::test]
    async fn test_request_reply() {
        let (requester, mut responder) = ChannelRequester::<String, String>::pair(10);

        // Spawn responder task
        let handle = tokio::spawn(async move {
            if let Some((req, reply_tx)) = responder.next().await {
                let response = format!("Echo: {}", req);
                let _ = reply_tx.send(response);
            }
        });

        let response = requester.request(&"test".to_string()).await.unwrap();
        assert_eq!(response, "Echo: test");

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_after_responder_dropped() {
        let (requester, responder) = ChannelRequester::<String, String>::pair(1);
        drop(responder);

        let err = requester.request(&"lost".to_string()).await.unwrap_err();
        assert_eq!(err, TransportError::ChannelClosed);
    }

    #[tokio::test]
    async fn test_notifier_routes_by_address() {
        let notifier = ChannelNotifier::new(8);
        let mut a = notifier.bind("mem://a");
        let mut b = notifier.bind("mem://b");
        let subscription = SubscriptionId::generate();
        let event = ClockEvent::snapshot(&ClockConfig::new(ClockId::from("c")));

        notifier
            .notify_clock("mem://b", subscription, &event)
            .await
            .unwrap();
        notifier
            .notify_completed("mem://a", subscription)
            .await
            .unwrap();

        assert_eq!(a.recv().await, Some(Callback::Completed { subscription }));
        assert_eq!(b.recv().await, Some(Callback::Clock { subscription, event }));
    }

    #[tokio::test]
    async fn test_notifier_rejects_unbound_address() {
        let notifier = ChannelNotifier::new(8);
        let err = notifier
            .notify_completed("mem://nobody", SubscriptionId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));

        let rx = notifier.bind("mem://gone");
        drop(rx);
        let err = notifier
            .notify_completed("mem://gone", SubscriptionId::generate())
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::ChannelClosed);
    }
}
