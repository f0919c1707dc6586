//! Wire message types
//!
//! - `request`: operations sent to the time manager and their responses
//! - `callback`: out-of-band notifications pushed to subscribers

pub mod callback;
pub mod request;
