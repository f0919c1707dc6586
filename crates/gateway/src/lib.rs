//! Tempora Gateway
//!
//! Transport adapter for the time manager. Provides:
//! - An allow-list of operations callable from outside the process
//! - Wire message types for requests, responses and callbacks
//! - Transport traits, with tokio channel implementations
//! - The service that runs requests and forwards subscriptions
//!
//! ## Architecture
//!
//! ```text
//! Remote caller
//!         │ Request (operation + params)
//!    ┌────▼────┐
//!    │ Service │──► allow-list check
//!    └────┬────┘
//!         │
//!    ┌────▼────────┐        ┌──────────┐
//!    │ TimeManager │──────► │ Notifier │──► notifyClock / notifyTrigger
//!    └─────────────┘ events └──────────┘    (callback address + SubscriptionId)
//! ```
//!
//! ## Transport
//!
//! Currently uses tokio channels for single-process operation. The
//! `Requester`/`Notifier` traits allow plugging in other transports
//! (HTTP callbacks, NATS, etc.) when needed.

pub mod error;
pub mod messages;
pub mod operation;
pub mod service;
pub mod transport;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult, TransportError};
pub use messages::{
    callback::Callback,
    request::{Request, Response},
};
pub use operation::Operation;
pub use service::TimeManagerService;
pub use transport::{
    Notifier, Requester,
    channel::{ChannelNotifier, ChannelRequester, ChannelResponder},
};
