//! Time manager exposed through the transport
//!
//! `TimeManagerService::handle` checks a request against the exported
//! allow-list and runs it on the manager. Streaming operations answer with
//! a `SubscriptionId` and hand the stream to a forwarder task that pushes
//! every event to the subscriber's callback address.
//!
//! ```text
//! Requester ──► ChannelResponder ──► handle() ──► TimeManager
//!                                        │
//!                                        └──► forwarder ──► Notifier ──► callback
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tempora_core::{ClockEvent, ClockId, SubscriptionId, TriggerEvent, TriggerId};
use tempora_engine::Subscription;
use tempora_manager::TimeManager;
use tempora_ports::TimeError;
use tokio::task::JoinHandle;

use crate::error::{GatewayResult, TransportError};
use crate::messages::request::{Request, Response};
use crate::operation::Operation;
use crate::transport::Notifier;
use crate::transport::channel::ChannelResponder;

/// Server side of the time manager transport
pub struct TimeManagerService {
    manager: Arc<TimeManager>,
    notifier: Arc<dyn Notifier>,
    exported: HashSet<Operation>,
    forwarders: DashMap<SubscriptionId, JoinHandle<()>>,
}

impl TimeManagerService {
    /// Serve the default exported operations
    pub fn new(manager: Arc<TimeManager>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_operations(manager, notifier, &Operation::EXPORTED)
    }

    /// Serve exactly `operations`
    pub fn with_operations(
        manager: Arc<TimeManager>,
        notifier: Arc<dyn Notifier>,
        operations: &[Operation],
    ) -> Self {
        Self {
            manager,
            notifier,
            exported: operations.iter().copied().collect(),
            forwarders: DashMap::new(),
        }
    }

    pub fn manager(&self) -> &Arc<TimeManager> {
        &self.manager
    }

    pub fn is_exported(&self, operation: Operation) -> bool {
        self.exported.contains(&operation)
    }

    /// Number of subscriptions still forwarding events
    pub fn active_subscriptions(&self) -> usize {
        self.forwarders
            .iter()
            .filter(|entry| !entry.value().is_finished())
            .count()
    }

    /// Answer requests from `responder` until every requester is gone
    ///
    /// Each request runs on its own task so a slow call never holds up the
    /// others.
    pub async fn serve(
        self: Arc<Self>,
        mut responder: ChannelResponder<Request, GatewayResult<Response>>,
    ) {
        info!("Time manager service started");
        while let Some((request, reply_tx)) = responder.next().await {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                let response = service.handle(request).await;
                if reply_tx.send(response).is_err() {
                    debug!("Requester left before the reply");
                }
            });
        }
        info!("Time manager service stopped");
    }

    pub async fn handle(&self, request: Request) -> GatewayResult<Response> {
        let operation = request.operation();
        if !self.is_exported(operation) {
            warn!("Rejected call to unexported operation {}", operation);
            return Err(TransportError::NotExported(operation.name().to_string()).into());
        }
        debug!("Handling {}", operation);

        let response = match request {
            Request::SetTimerConfig(config) => {
                self.manager.set_timer_config(config).await?;
                Response::Done
            }
            Request::GetTimerConfig => {
                Response::TimerConfig(self.manager.get_timer_config().await)
            }
            Request::GetTimerStatus => {
                Response::TimerStatus(self.manager.get_timer_status().await)
            }
            Request::Destroy => {
                self.manager.destroy().await;
                Response::Done
            }
            Request::GetClock(id) => {
                Response::Clock(self.manager.get_clock(id.as_ref()).await?)
            }
            Request::UpdateClock(config) => {
                Response::Clock(self.manager.update_clock(config).await?)
            }
            Request::ForkClock {
                parent_id,
                child_id,
            } => Response::Clock(self.manager.fork_clock(&parent_id, &child_id).await?),
            Request::RemoveClock(id) => {
                self.manager.remove_clock(&id).await?;
                Response::Done
            }
            Request::ObserveClock { clock_id, callback } => {
                let events = self.manager.observe_clock(&clock_id).await?;
                let timeout = self.slave_timeout(&clock_id).await;
                Response::Subscribed(self.forward(events, callback, timeout))
            }
            Request::RegisterTrigger { trigger, callback } => {
                let id = trigger.id;
                let events = self.manager.register_trigger(trigger).await?;
                self.subscribe_trigger(id, events, callback).await
            }
            Request::UpdateTrigger { trigger, callback } => {
                let id = trigger.id;
                let events = self.manager.update_trigger(trigger).await?;
                self.subscribe_trigger(id, events, callback).await
            }
            Request::RemoveTrigger(id) => {
                self.manager.remove_trigger(&id).await?;
                Response::Done
            }
            Request::Unsubscribe(id) => {
                self.unsubscribe(id);
                Response::Done
            }
        };
        Ok(response)
    }

    /// Stop forwarding a subscription; unknown ids are ignored
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.forwarders.remove(&id) {
            Some((_, forwarder)) => {
                forwarder.abort();
                debug!("Subscription {} cancelled", id);
                true
            }
            None => {
                debug!("Subscription {} already gone", id);
                false
            }
        }
    }

    /// Cancel every forwarder
    pub fn shutdown(&self) {
        let ids: Vec<SubscriptionId> = self.forwarders.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.unsubscribe(id);
        }
    }

    async fn subscribe_trigger(
        &self,
        id: TriggerId,
        events: Subscription<TriggerEvent>,
        callback: String,
    ) -> Response {
        // A trigger the manager did not file has no clock to bound delivery
        let timeout = match self.manager.trigger(&id).and_then(|t| t.clock_id) {
            Some(clock_id) => self.slave_timeout(&clock_id).await,
            None => None,
        };
        Response::Subscribed(self.forward(events, callback, timeout))
    }

    async fn slave_timeout(&self, clock_id: &ClockId) -> Option<Duration> {
        match self.manager.get_clock(Some(clock_id)).await {
            Ok(config) => config.slave_timeout,
            Err(e) => {
                debug!("No delivery bound for clock {}: {}", clock_id, e);
                None
            }
        }
    }

    fn forward<T: Deliverable>(
        &self,
        events: Subscription<T>,
        callback: String,
        timeout: Option<Duration>,
    ) -> SubscriptionId {
        self.forwarders.retain(|_, forwarder| !forwarder.is_finished());

        let sink = CallbackSink {
            id: SubscriptionId::generate(),
            callback,
            notifier: Arc::clone(&self.notifier),
            timeout,
        };
        let id = sink.id;
        debug!("Subscription {} forwarding to {}", id, sink.callback);
        self.forwarders.insert(id, tokio::spawn(sink.run(events)));
        id
    }
}

/// Events that can be pushed through a [`Notifier`]
#[async_trait]
trait Deliverable: Clone + Send + Sync + 'static {
    async fn deliver(
        &self,
        notifier: &dyn Notifier,
        callback: &str,
        subscription: SubscriptionId,
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl Deliverable for ClockEvent {
    async fn deliver(
        &self,
        notifier: &dyn Notifier,
        callback: &str,
        subscription: SubscriptionId,
    ) -> Result<(), TransportError> {
        notifier.notify_clock(callback, subscription, self).await
    }
}

#[async_trait]
impl Deliverable for TriggerEvent {
    async fn deliver(
        &self,
        notifier: &dyn Notifier,
        callback: &str,
        subscription: SubscriptionId,
    ) -> Result<(), TransportError> {
        notifier.notify_trigger(callback, subscription, self).await
    }
}

/// Where one subscription's events go
struct CallbackSink {
    id: SubscriptionId,
    callback: String,
    notifier: Arc<dyn Notifier>,
    /// Longest a single delivery may take
    timeout: Option<Duration>,
}

impl CallbackSink {
    async fn run<T: Deliverable>(self, mut events: Subscription<T>) {
        while let Some(notification) = events.recv().await {
            match &notification {
                Ok(event) => {
                    let delivered = self
                        .bounded(event.deliver(self.notifier.as_ref(), &self.callback, self.id))
                        .await;
                    if let Err(e) = delivered {
                        self.route_failure(e).await;
                    }
                }
                Err(error) => {
                    let delivered = self
                        .bounded(self.notifier.notify_error(&self.callback, self.id, error))
                        .await;
                    if let Err(e) = delivered {
                        warn!(
                            "Subscription {} lost error '{}' (callback {}): {}",
                            self.id, error, self.callback, e
                        );
                    }
                }
            }
        }

        match self
            .bounded(self.notifier.notify_completed(&self.callback, self.id))
            .await
        {
            Ok(()) => debug!("Subscription {} completed", self.id),
            Err(e) => warn!(
                "Subscription {} completion not delivered (callback {}): {}",
                self.id, self.callback, e
            ),
        }
    }

    async fn bounded(
        &self,
        delivery: impl Future<Output = Result<(), TransportError>>,
    ) -> Result<(), TransportError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, delivery)
                .await
                .map_err(|_| TransportError::Timeout)?,
            None => delivery.await,
        }
    }

    /// Send a failed event delivery to the subscriber's error channel
    ///
    /// The stream carries on either way.
    async fn route_failure(&self, reason: TransportError) {
        let error = TimeError::SubscriberDelivery {
            subscriber: self.id.to_string(),
            reason: reason.to_string(),
        };
        warn!("{} (callback {})", error, self.callback);
        let routed = self
            .bounded(self.notifier.notify_error(&self.callback, self.id, &error))
            .await;
        if let Err(e) = routed {
            warn!("Subscription {} error channel failed too: {}", self.id, e);
        }
    }
}
