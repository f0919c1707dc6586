use serde::Serialize;
use tempora_core::{ClockEvent, SubscriptionId, TriggerEvent};
use tempora_ports::TimeError;

/// Notification pushed to a subscriber's callback address
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Callback {
    Clock {
        subscription: SubscriptionId,
        event: ClockEvent,
    },
    Trigger {
        subscription: SubscriptionId,
        event: TriggerEvent,
    },
    Error {
        subscription: SubscriptionId,
        error: String,
    },
    /// The stream ended; nothing follows for this subscription
    Completed { subscription: SubscriptionId },
}

impl Callback {
    pub fn error(subscription: SubscriptionId, error: &TimeError) -> Self {
        Callback::Error {
            subscription,
            error: error.to_string(),
        }
    }

    pub fn subscription(&self) -> SubscriptionId {
        match self {
            Callback::Clock { subscription, .. }
            | Callback::Trigger { subscription, .. }
            | Callback::Error { subscription, .. }
            | Callback::Completed { subscription } => *subscription,
        }
    }
}
