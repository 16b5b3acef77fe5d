//! Byte-level plumbing underneath the uavcom link.
//!
//! The link state machine never touches a UART directly. It talks to two
//! single-producer/single-consumer byte queues, one per direction, and to a
//! monotonic clock:
//! - [`ByteSink`] / [`ByteSource`] are the non-blocking queue interfaces
//! - [`ByteQueue`] is the fixed-capacity ring buffer behind them
//! - [`Clock`] supplies microsecond timestamps
//!
//! [`pump`] moves bytes between the queues and any `std::io` stream, which is
//! how host-side tools and simulations attach a real byte stream.

pub mod clock;
pub mod error;
pub mod pump;
pub mod queue;
pub mod traits;

pub use clock::{ManualClock, MonotonicClock};
pub use error::{Result, TransportError};
pub use queue::ByteQueue;
pub use traits::{ByteSink, ByteSource, Clock};
