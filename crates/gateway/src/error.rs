//! Error types for the gateway crate

use tempora_core::SubscriptionId;
use tempora_ports::TimeError;
use thiserror::Error;

/// Transport-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Timeout waiting for subscriber")]
    Timeout,

    #[error("Operation not exported: {0}")]
    NotExported(String),

    #[error("Callback rejected: {0}")]
    Rejected(String),
}

/// Gateway-level errors (service operations)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Time(#[from] TimeError),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
