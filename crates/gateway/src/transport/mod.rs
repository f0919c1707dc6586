//! Transport abstraction layer
//!
//! The time manager is reached through two traits: a `Requester` carries
//! calls in and their answers back, and a `Notifier` pushes subscription
//! events out to callback addresses, since the transport has no streaming
//! of its own. Tokio channels implement both for single-process use.

pub mod channel;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::Serialize;
use tempora_core::{ClockEvent, SubscriptionId, TriggerEvent};
use tempora_ports::TimeError;

/// Request/Reply pattern for manager operations
#[async_trait]
pub trait Requester<Req, Res>: Send + Sync
where
    Req: Serialize + Send + Sync,
    Res: Send,
{
    /// Send a request and wait for a response
    async fn request(&self, req: &Req) -> Result<Res, TransportError>;
}

/// Outbound side of callback subscriptions
///
/// `callback` is the address given when subscribing; `subscription` tells
/// the receiver which of its subscriptions the event belongs to.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_clock(
        &self,
        callback: &str,
        subscription: SubscriptionId,
        event: &ClockEvent,
    ) -> Result<(), TransportError>;

    async fn notify_trigger(
        &self,
        callback: &str,
        subscription: SubscriptionId,
        event: &TriggerEvent,
    ) -> Result<(), TransportError>;

    /// An error routed to this subscription; the stream may continue
    async fn notify_error(
        &self,
        callback: &str,
        subscription: SubscriptionId,
        error: &TimeError,
    ) -> Result<(), TransportError>;

    /// Sent once when the stream ends
    async fn notify_completed(
        &self,
        callback: &str,
        subscription: SubscriptionId,
    ) -> Result<(), TransportError>;
}
