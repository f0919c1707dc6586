//! Tempora Ports
//!
//! Port definitions (traits) and the error taxonomy shared by every layer.
//! These define the boundaries between scheduling logic and infrastructure.

mod clock;
mod error;

pub use clock::WallClock;
pub use error::{TimeError, TimeResult};
