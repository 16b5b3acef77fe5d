//! Companion-computer link for multirotor flight controllers.
//!
//! uavcom carries commands from an onboard computer to the flight controller
//! and streams telemetry back, over a single byte-stuffed serial link.
//!
//! # Crate Structure
//!
//! - [`transport`]: non-blocking byte queues, clocks and stream pumps
//! - [`frame`]: stuffing codec, CRC, transport header and frame link
//! - [`link`]: messages, dispatcher, telemetry scheduler and command watchdog
//!
//! # Example
//!
//! ```
//! use uavcom::link::{Link, Vehicle};
//! use uavcom::transport::{ByteQueue, ManualClock};
//!
//! let mut link = Link::new();
//! let mut rx = ByteQueue::<512>::new();
//! let mut tx = ByteQueue::<2048>::new();
//! let mut vehicle = Vehicle::new();
//! let clock = ManualClock::new(0);
//!
//! for _ in 0..1000 {
//!     link.spin(&mut rx, &mut tx, &mut vehicle, &clock);
//!     tx.drain_to_vec();
//!     clock.advance(1000);
//! }
//! // nothing commanded the vehicle, so the watchdog has switched it off
//! assert!(!link.is_active());
//! ```

/// Re-export transport types.
pub mod transport {
    pub use uavcom_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use uavcom_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use uavcom_link::*;
}
