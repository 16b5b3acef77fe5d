use tracing::{info, warn};

use crate::vehicle::{CommandMode, Vehicle};

/// Default command timeout in ticks (200 ms at 1 kHz).
pub const DEFAULT_COMMAND_TIMEOUT_TICKS: u16 = 200;

/// Command watchdog.
///
/// Counts ticks since the last accepted control command. Once the count
/// reaches the timeout the vehicle's command mode is forced to
/// [`CommandMode::Off`] and the link is reported inactive until commands
/// arrive again.
#[derive(Debug, Clone)]
pub struct Watchdog {
    counter: u16,
    timeout: u16,
    active: bool,
}

impl Watchdog {
    /// A watchdog that starts inactive with a zero counter. A zero timeout
    /// is treated as one tick.
    pub fn new(timeout: u16) -> Self {
        Self {
            counter: 0,
            timeout: timeout.max(1),
            active: false,
        }
    }

    /// Advance one tick. Returns true on the tick the link times out.
    pub fn tick(&mut self, vehicle: &mut Vehicle) -> bool {
        self.counter = self.counter.saturating_add(1).min(self.timeout);

        if self.counter >= self.timeout {
            if self.active {
                warn!(
                    ticks = self.timeout,
                    mode = %vehicle.command.mode,
                    "no command within timeout, switching command mode off"
                );
                vehicle.command.mode = CommandMode::Off;
                self.active = false;
                return true;
            }
            return false;
        }

        if !self.active {
            info!("command link active");
        }
        self.active = true;
        false
    }

    /// Record an accepted control command.
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Ticks since the last accepted command, saturated at the timeout.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn timeout(&self) -> u16 {
        self.timeout
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT_TICKS)
    }
}
