//! Tempora Clock Infrastructure
//!
//! Wall-clock sources and the pacing ("drag") math that maps simulated time
//! onto real delays:
//!
//! ```text
//! SystemClock (monotonic wall time)
//!     │
//!     └── Pacer (drag offset + rate per running clock)
//!             │
//!             └── deadline(t_sim) = wall0 + (t_sim - sim0) * rate
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use tempora_clock::{Pacer, SystemClock, WallClock};
//! use tempora_core::{Rate, SimDuration};
//!
//! let wall = SystemClock::new();
//! let pacer = Pacer::start(wall.now(), SimDuration::ZERO, Some(Rate::REAL_TIME));
//! let delay = pacer.delay(SimDuration::from_millis(100), wall.now());
//! ```

mod pacer;
mod system;

pub use pacer::{DragOffset, Pacer};
pub use system::SystemClock;

// Re-export the WallClock port for convenience
pub use tempora_ports::WallClock;
