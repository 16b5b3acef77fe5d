use tracing::{debug, info};
use uavcom_frame::{FrameLink, LinkStats, TransportHeader};
use uavcom_transport::{ByteSink, ByteSource, Clock};

use crate::config::LinkConfig;
use crate::dispatcher::{DispatchContext, Dispatched, Dispatcher, UserMessageHandler};
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::telemetry::default_scheduler;
use crate::vehicle::Vehicle;
use crate::watchdog::Watchdog;

/// What one [`Link::spin`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpinSummary {
    /// Verified frames dispatched this tick.
    pub frames: usize,
    /// Of those, control commands accepted.
    pub commands: usize,
    /// Telemetry producers that ran.
    pub produced: usize,
    /// The command watchdog expired on this tick.
    pub timed_out: bool,
}

/// One end of the companion link.
///
/// Owns the framing state, the dispatcher, the telemetry schedule and the
/// command watchdog. The host calls [`spin`](Self::spin) once per control
/// tick with its byte queues, the vehicle state and a clock.
///
/// ```
/// use uavcom_link::{Link, Vehicle};
/// use uavcom_transport::{ByteQueue, ManualClock};
///
/// let mut link = Link::new();
/// let mut rx = ByteQueue::<256>::new();
/// let mut tx = Vec::new();
/// let mut vehicle = Vehicle::new();
/// let clock = ManualClock::new(0);
///
/// for _ in 0..2 {
///     link.spin(&mut rx, &mut tx, &mut vehicle, &clock);
///     clock.advance(1000);
/// }
/// // IMU runs every second tick
/// assert_eq!(link.stats().tx.good, 1);
/// ```
#[derive(Debug)]
pub struct Link {
    config: LinkConfig,
    frames: FrameLink,
    dispatcher: Dispatcher,
    scheduler: Scheduler,
    watchdog: Watchdog,
}

impl Link {
    /// A link with the default configuration.
    pub fn new() -> Self {
        Self::build(LinkConfig::default())
    }

    /// Validate `config` and build a link from it. Schedule overrides are
    /// applied on top of the default telemetry table.
    pub fn with_config(config: LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: LinkConfig) -> Self {
        let mut scheduler = default_scheduler(config.vehicle_type);
        for entry in &config.schedule {
            scheduler.set_divisor(entry.id, entry.divisor);
        }
        info!(
            vehicle_type = %config.vehicle_type,
            max_message_size = config.frame.max_message_size,
            command_timeout_ticks = config.command_timeout_ticks,
            "link configured"
        );
        Self {
            frames: FrameLink::with_config(config.frame),
            dispatcher: Dispatcher::new(config.max_thrust()),
            watchdog: Watchdog::new(config.command_timeout_ticks),
            scheduler,
            config,
        }
    }

    /// Run one control tick: watchdog, then every complete inbound frame,
    /// then the telemetry schedule.
    pub fn spin<R, T, C>(&mut self, rx: &mut R, tx: &mut T, vehicle: &mut Vehicle, clock: &C) -> SpinSummary
    where
        R: ByteSource + ?Sized,
        T: ByteSink + ?Sized,
        C: Clock + ?Sized,
    {
        let now_us = clock.now_us();
        let mut summary = SpinSummary {
            timed_out: self.watchdog.tick(vehicle),
            ..SpinSummary::default()
        };

        while let Some(frame) = self.frames.poll(rx) {
            let mut ctx = DispatchContext {
                link: &mut self.frames,
                tx: &mut *tx,
                vehicle: &mut *vehicle,
                scheduler: &mut self.scheduler,
                watchdog: &mut self.watchdog,
                now_us,
            };
            let outcome = self.dispatcher.dispatch(&frame.payload, &mut ctx);
            summary.frames += 1;
            if matches!(outcome, Dispatched::Command(_)) {
                summary.commands += 1;
            }
        }

        summary.produced = self.scheduler.tick(&mut self.frames, tx, vehicle, now_us);
        summary
    }

    /// Send an application message outside the schedule.
    pub fn send_message<T: ByteSink + ?Sized>(
        &mut self,
        tx: &mut T,
        header: &TransportHeader,
        body: &[u8],
    ) -> Result<u16> {
        let seq = self.frames.send_message(tx, header, body)?;
        debug!(id = format_args!("{:#x}", header.id), seq, len = body.len(), "message sent");
        Ok(seq)
    }

    /// Route messages without a built-in handler to `handler`.
    pub fn set_user_handler(&mut self, handler: impl UserMessageHandler + 'static) {
        self.dispatcher.set_user_handler(handler);
    }

    pub fn stats(&self) -> &LinkStats {
        self.frames.stats()
    }

    /// True while control commands keep arriving within the timeout.
    pub fn is_active(&self) -> bool {
        self.watchdog.is_active()
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Mutable access for registering extra producers.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    pub fn frame_link(&self) -> &FrameLink {
        &self.frames
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::new()
    }
}
