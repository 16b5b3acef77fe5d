//! Message layer of the uavcom companion link.
//!
//! Sits on top of the framing in `uavcom-frame` and turns verified frames
//! into vehicle commands, and vehicle state into periodic telemetry:
//! - [`Dispatcher`] routes inbound messages by id to the built-in command
//!   handlers, the uptime and rate-divisor services, or a user hook
//! - [`Scheduler`] runs telemetry producers at rate-divided intervals
//! - [`Watchdog`] forces the vehicle to [`CommandMode::Off`] when control
//!   commands stop arriving
//!
//! [`Link`] owns all of the above and is driven by calling
//! [`Link::spin`] once per control tick.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod link;
pub mod messages;
pub mod scheduler;
pub mod telemetry;
pub mod vehicle;
pub mod watchdog;

pub use config::{LinkConfig, ScheduleOverride, MAX_CONFIG_MESSAGE_SIZE};
pub use dispatcher::{DispatchContext, Dispatched, Dispatcher, UserMessageHandler};
pub use error::{LinkError, Result};
pub use link::{Link, SpinSummary};
pub use messages::{ids, Message};
pub use scheduler::{MessageProducer, ScheduleEntry, Scheduler, DEFAULT_DIVISORS};
pub use telemetry::default_scheduler;
pub use vehicle::{CommandMode, CommandState, Telemetry, Vehicle, VehicleType};
pub use watchdog::{Watchdog, DEFAULT_COMMAND_TIMEOUT_TICKS};
