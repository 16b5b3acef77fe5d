use std::f32::consts::PI;

use tracing::debug;
use uavcom_frame::{FrameLink, TransportHeader};
use uavcom_transport::ByteSink;

use crate::messages::{
    ids, CommandGpsWaypoint, CommandMotorSpeed, CommandRollPitchYawrateClimbRate,
    CommandRollPitchYawrateThrust, Message, RateDivisor, SystemUptime,
};
use crate::scheduler::Scheduler;
use crate::vehicle::{CommandMode, CommandState, Vehicle};
use crate::watchdog::Watchdog;

/// Full-scale value of the thrust command.
pub const THRUST_FULL_SCALE: f32 = 4095.0;

/// Acceptance radius written with every waypoint command, in mm.
pub const WAYPOINT_TOLERANCE_MM: u16 = 3000;

/// Dwell time written with every waypoint command, in ms.
pub const WAYPOINT_TIME_TO_STAY_MS: u32 = 1;

/// Receives every message the dispatcher does not handle itself.
///
/// Called from the spin loop, so implementations must not block.
pub trait UserMessageHandler {
    fn on_message(&mut self, header: &TransportHeader, body: &[u8]);
}

impl<F> UserMessageHandler for F
where
    F: FnMut(&TransportHeader, &[u8]),
{
    fn on_message(&mut self, header: &TransportHeader, body: &[u8]) {
        self(header, body)
    }
}

/// Everything a handler may touch while one frame is dispatched.
pub struct DispatchContext<'a, S: ?Sized> {
    pub link: &'a mut FrameLink,
    pub tx: &'a mut S,
    pub vehicle: &'a mut Vehicle,
    pub scheduler: &'a mut Scheduler,
    pub watchdog: &'a mut Watchdog,
    pub now_us: u64,
}

/// What happened to one dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// A control command was applied; the vehicle is now in this mode.
    Command(CommandMode),
    /// An uptime reply was queued.
    Uptime,
    /// A rate-divisor command matched this many schedule entries.
    RateDivisor { updated: usize },
    /// Forwarded to the user handler.
    User,
    /// Malformed or unhandled; nothing changed.
    Dropped,
}

/// Routes verified frames by message id.
pub struct Dispatcher {
    max_thrust: f32,
    handler: Option<Box<dyn UserMessageHandler>>,
}

impl Dispatcher {
    pub fn new(max_thrust: f32) -> Self {
        Self {
            max_thrust,
            handler: None,
        }
    }

    /// Install the hook for messages without a built-in handler.
    pub fn set_user_handler(&mut self, handler: impl UserMessageHandler + 'static) {
        self.handler = Some(Box::new(handler));
    }

    pub fn max_thrust(&self) -> f32 {
        self.max_thrust
    }

    /// Handle one verified payload (transport header + body).
    ///
    /// If the header requests an acknowledgement, an empty acknowledgement
    /// frame is queued afterwards, whatever the outcome.
    pub fn dispatch<S: ByteSink + ?Sized>(
        &mut self,
        payload: &[u8],
        ctx: &mut DispatchContext<'_, S>,
    ) -> Dispatched {
        let (header, body) = match TransportHeader::parse(payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(error = %err, "dropping frame without header");
                return Dispatched::Dropped;
            }
        };

        let outcome = self.route(&header, body, ctx);

        if header.wants_ack() {
            if let Err(err) = ctx.link.send_message(&mut *ctx.tx, &header.ack_response(), &[]) {
                debug!(id = format_args!("{:#x}", header.id), error = %err, "acknowledgement dropped");
            }
        }

        outcome
    }

    fn route<S: ByteSink + ?Sized>(
        &mut self,
        header: &TransportHeader,
        body: &[u8],
        ctx: &mut DispatchContext<'_, S>,
    ) -> Dispatched {
        let max_thrust = self.max_thrust;
        match header.id {
            ids::COMMAND_MOTOR_SPEED => command(body, ctx, apply_motor_speed),
            ids::COMMAND_ROLL_PITCH_YAWRATE_THRUST => command(
                body,
                ctx,
                |cmd: &CommandRollPitchYawrateThrust, state: &mut CommandState| {
                    apply_attitude_thrust(cmd, max_thrust, state)
                },
            ),
            ids::COMMAND_ROLL_PITCH_YAWRATE_CLIMBRATE => command(body, ctx, apply_attitude_climb),
            ids::COMMAND_GPS_WAYPOINT => command(body, ctx, apply_waypoint),
            ids::SYSTEM_UPTIME => {
                let reply = SystemUptime {
                    timestamp_us: ctx.now_us,
                };
                let header = TransportHeader::new(ids::SYSTEM_UPTIME);
                if let Err(err) = ctx.link.send_message(&mut *ctx.tx, &header, &reply.to_vec()) {
                    debug!(error = %err, "uptime reply dropped");
                }
                Dispatched::Uptime
            }
            ids::CONFIG_SET_MESSAGE_RATE_DIVISOR => {
                let mut updated = 0usize;
                for pair in RateDivisor::parse_all(body) {
                    if ctx.scheduler.set_divisor(pair.id, pair.divisor) {
                        updated += 1;
                    } else {
                        debug!(id = format_args!("{:#x}", pair.id), "rate divisor for unscheduled message ignored");
                    }
                }
                Dispatched::RateDivisor { updated }
            }
            _ => self.forward(header, body),
        }
    }

    fn forward(&mut self, header: &TransportHeader, body: &[u8]) -> Dispatched {
        match self.handler.as_mut() {
            Some(handler) => {
                handler.on_message(header, body);
                Dispatched::User
            }
            None => {
                debug!(id = format_args!("{:#x}", header.id), "no handler for message");
                Dispatched::Dropped
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("max_thrust", &self.max_thrust)
            .field("user_handler", &self.handler.is_some())
            .finish()
    }
}

fn command<M, S, F>(body: &[u8], ctx: &mut DispatchContext<'_, S>, apply: F) -> Dispatched
where
    M: Message,
    S: ?Sized,
    F: FnOnce(&M, &mut CommandState),
{
    match M::decode(body) {
        Ok(cmd) => {
            apply(&cmd, &mut ctx.vehicle.command);
            ctx.watchdog.reset();
            Dispatched::Command(ctx.vehicle.command.mode)
        }
        Err(err) => {
            debug!(error = %err, "dropping command");
            Dispatched::Dropped
        }
    }
}

/// rad (or rad/s) to deg · 1000.
fn millidegrees(rad: f32) -> i32 {
    (rad * 180.0 / PI * 1000.0) as i32
}

pub fn apply_motor_speed(cmd: &CommandMotorSpeed, state: &mut CommandState) {
    state.mode = CommandMode::DirectMotor;
    state.direct_motor.rpm = cmd.rpm;
    state.direct_motor.enable = cmd.rpm.map(|rpm| rpm != 0);
}

/// Thrust scales linearly to [`THRUST_FULL_SCALE`] at `max_thrust` and is
/// not clamped.
pub fn apply_attitude_thrust(
    cmd: &CommandRollPitchYawrateThrust,
    max_thrust: f32,
    state: &mut CommandState,
) {
    state.mode = CommandMode::RollPitchYawRateThrust;
    let target = &mut state.attitude_thrust;
    target.roll = millidegrees(cmd.roll);
    target.pitch = millidegrees(cmd.pitch);
    target.yaw_rate = millidegrees(cmd.yaw_rate);
    target.thrust = (cmd.thrust / max_thrust * THRUST_FULL_SCALE) as u32;
}

pub fn apply_attitude_climb(cmd: &CommandRollPitchYawrateClimbRate, state: &mut CommandState) {
    state.mode = CommandMode::RollPitchYawRateClimbRate;
    let target = &mut state.attitude_climb;
    target.roll = millidegrees(cmd.roll);
    target.pitch = millidegrees(cmd.pitch);
    target.yaw_rate = millidegrees(cmd.yaw_rate);
    target.climb_rate = (cmd.climb_rate * 1000.0) as i32;
}

pub fn apply_waypoint(cmd: &CommandGpsWaypoint, state: &mut CommandState) {
    state.mode = CommandMode::GpsWaypointAbsolute;
    let wp = &mut state.waypoint;
    wp.latitude = cmd.latitude;
    wp.longitude = cmd.longitude;
    wp.height = (cmd.height * 1000.0) as i32;
    wp.heading = (cmd.heading * 1000.0) as i32;
    wp.reached_tolerance = WAYPOINT_TOLERANCE_MM;
    wp.time_to_stay = WAYPOINT_TIME_TO_STAY_MS;
    // percent of the 2 m/s cruise speed
    wp.max_speed = if cmd.max_speed > 2.0 {
        100
    } else {
        (cmd.max_speed * 50.0) as u8
    };
    wp.updated = true;
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use uavcom_frame::TransportFlags;

    use super::*;
    use crate::telemetry::default_scheduler;
    use crate::vehicle::VehicleType;

    struct Harness {
        link: FrameLink,
        wire: Vec<u8>,
        vehicle: Vehicle,
        scheduler: Scheduler,
        watchdog: Watchdog,
        dispatcher: Dispatcher,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                link: FrameLink::new(),
                wire: Vec::new(),
                vehicle: Vehicle::new(),
                scheduler: default_scheduler(VehicleType::Hummingbird),
                watchdog: Watchdog::default(),
                dispatcher: Dispatcher::new(20.0),
            }
        }

        fn dispatch(&mut self, header: TransportHeader, body: &[u8]) -> Dispatched {
            let mut payload = header.to_bytes().to_vec();
            payload.extend_from_slice(body);
            let mut ctx = DispatchContext {
                link: &mut self.link,
                tx: &mut self.wire,
                vehicle: &mut self.vehicle,
                scheduler: &mut self.scheduler,
                watchdog: &mut self.watchdog,
                now_us: 1_234_567,
            };
            self.dispatcher.dispatch(&payload, &mut ctx)
        }

        fn sent(&self) -> Vec<(TransportHeader, Vec<u8>)> {
            let mut rx = FrameLink::new();
            self.wire
                .iter()
                .filter_map(|&b| rx.feed(b))
                .map(|f| {
                    let (h, body) = f.header().unwrap();
                    (h, body.to_vec())
                })
                .collect()
        }
    }

    #[test]
    fn thrust_command_sets_mode_and_resets_watchdog() {
        let mut h = Harness::new();
        let mut idle = Vehicle::new();
        for _ in 0..10 {
            h.watchdog.tick(&mut idle);
        }

        let cmd = CommandRollPitchYawrateThrust {
            roll: 0.0,
            pitch: 0.0,
            yaw_rate: 0.0,
            thrust: 10.0,
        };
        let outcome = h.dispatch(TransportHeader::new(CommandRollPitchYawrateThrust::ID), &cmd.to_vec());

        assert_eq!(outcome, Dispatched::Command(CommandMode::RollPitchYawRateThrust));
        assert_eq!(h.vehicle.command.mode, CommandMode::RollPitchYawRateThrust);
        assert_eq!(h.vehicle.command.attitude_thrust.thrust, 2047);
        assert_eq!(h.watchdog.counter(), 0);
    }

    #[test]
    fn angles_convert_to_millidegrees() {
        let mut state = CommandState::default();
        let cmd = CommandRollPitchYawrateClimbRate {
            roll: PI / 2.0,
            pitch: -PI / 4.0,
            yaw_rate: 0.0,
            climb_rate: -1.5,
        };
        apply_attitude_climb(&cmd, &mut state);

        assert!((state.attitude_climb.roll - 90_000).abs() <= 1);
        assert!((state.attitude_climb.pitch + 45_000).abs() <= 1);
        assert_eq!(state.attitude_climb.climb_rate, -1500);
        assert_eq!(state.mode, CommandMode::RollPitchYawRateClimbRate);
    }

    #[test]
    fn thrust_is_not_clamped() {
        let mut state = CommandState::default();
        let cmd = CommandRollPitchYawrateThrust {
            thrust: 800.0,
            ..Default::default()
        };
        apply_attitude_thrust(&cmd, 20.0, &mut state);
        assert_eq!(state.attitude_thrust.thrust, 163_800);

        let negative = CommandRollPitchYawrateThrust {
            thrust: -5.0,
            ..Default::default()
        };
        apply_attitude_thrust(&negative, 20.0, &mut state);
        assert_eq!(state.attitude_thrust.thrust, 0);
    }

    #[test]
    fn motor_speed_enables_nonzero_motors() {
        let mut h = Harness::new();
        let cmd = CommandMotorSpeed {
            rpm: [1200, 0, 1300, 0, 0, 4000],
        };
        h.dispatch(TransportHeader::new(CommandMotorSpeed::ID), &cmd.to_vec());

        let motors = h.vehicle.command.direct_motor;
        assert_eq!(h.vehicle.command.mode, CommandMode::DirectMotor);
        assert_eq!(motors.rpm, cmd.rpm);
        assert_eq!(motors.enable, [true, false, true, false, false, true]);
    }

    #[test]
    fn waypoint_fields() {
        let mut state = CommandState::default();
        let cmd = CommandGpsWaypoint {
            latitude: 481_234_567,
            longitude: 116_543_210,
            height: 12.5,
            heading: 90.0,
            max_speed: 1.0,
        };
        apply_waypoint(&cmd, &mut state);

        let wp = state.waypoint;
        assert_eq!(state.mode, CommandMode::GpsWaypointAbsolute);
        assert_eq!(wp.latitude, 481_234_567);
        assert_eq!(wp.height, 12_500);
        assert_eq!(wp.heading, 90_000);
        assert_eq!(wp.max_speed, 50);
        assert_eq!(wp.reached_tolerance, 3000);
        assert_eq!(wp.time_to_stay, 1);
        assert!(wp.updated);

        apply_waypoint(
            &CommandGpsWaypoint {
                max_speed: 5.0,
                ..cmd
            },
            &mut state,
        );
        assert_eq!(state.waypoint.max_speed, 100);
    }

    #[test]
    fn short_command_body_changes_nothing() {
        let mut h = Harness::new();
        let mut idle = Vehicle::new();
        for _ in 0..5 {
            h.watchdog.tick(&mut idle);
        }

        let outcome = h.dispatch(TransportHeader::new(CommandMotorSpeed::ID), &[1, 2, 3]);

        assert_eq!(outcome, Dispatched::Dropped);
        assert_eq!(h.vehicle.command, CommandState::default());
        assert_eq!(h.watchdog.counter(), 5);
    }

    #[test]
    fn payload_without_header_is_dropped() {
        let mut h = Harness::new();
        let mut ctx = DispatchContext {
            link: &mut h.link,
            tx: &mut h.wire,
            vehicle: &mut h.vehicle,
            scheduler: &mut h.scheduler,
            watchdog: &mut h.watchdog,
            now_us: 0,
        };
        assert_eq!(h.dispatcher.dispatch(&[1, 2, 3], &mut ctx), Dispatched::Dropped);
        assert!(h.wire.is_empty());
    }

    #[test]
    fn uptime_request_is_answered() {
        let mut h = Harness::new();
        let outcome = h.dispatch(TransportHeader::new(ids::SYSTEM_UPTIME), &[]);
        assert_eq!(outcome, Dispatched::Uptime);

        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, TransportHeader::new(ids::SYSTEM_UPTIME));
        let reply = SystemUptime::decode(&sent[0].1).unwrap();
        assert_eq!(reply.timestamp_us, 1_234_567);
    }

    #[test]
    fn uptime_does_not_reset_watchdog() {
        let mut h = Harness::new();
        let mut idle = Vehicle::new();
        h.watchdog.tick(&mut idle);
        h.dispatch(TransportHeader::new(ids::SYSTEM_UPTIME), &[]);
        assert_eq!(h.watchdog.counter(), 1);
    }

    #[test]
    fn rate_divisor_updates_known_ids_only() {
        let mut h = Harness::new();
        let mut body = Vec::new();
        RateDivisor::encode_all(
            &[
                RateDivisor {
                    id: ids::IMU,
                    divisor: 20,
                },
                RateDivisor {
                    id: 0x7777,
                    divisor: 1,
                },
            ],
            &mut body,
        );
        body.push(0xAA);

        let outcome = h.dispatch(TransportHeader::new(ids::CONFIG_SET_MESSAGE_RATE_DIVISOR), &body);

        assert_eq!(outcome, Dispatched::RateDivisor { updated: 1 });
        assert_eq!(h.scheduler.divisor(ids::IMU), Some(20));
    }

    #[test]
    fn unknown_id_goes_to_user_handler() {
        let mut h = Harness::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        h.dispatcher
            .set_user_handler(move |header: &TransportHeader, body: &[u8]| {
                sink.borrow_mut().push((header.id, body.to_vec()));
            });

        let outcome = h.dispatch(TransportHeader::new(0x1000), b"custom");

        assert_eq!(outcome, Dispatched::User);
        assert_eq!(*seen.borrow(), vec![(0x1000, b"custom".to_vec())]);
    }

    #[test]
    fn unknown_id_without_handler_is_dropped() {
        let mut h = Harness::new();
        assert_eq!(h.dispatch(TransportHeader::new(0x1000), b""), Dispatched::Dropped);
    }

    #[test]
    fn ack_request_is_answered_with_empty_frame() {
        let mut h = Harness::new();
        let cmd = CommandMotorSpeed::default();
        h.dispatch(
            TransportHeader::new(CommandMotorSpeed::ID).with_ack_request(42),
            &cmd.to_vec(),
        );

        let sent = h.sent();
        assert_eq!(sent.len(), 1);
        let (ack, body) = &sent[0];
        assert!(ack.is_ack());
        assert_eq!(ack.id, CommandMotorSpeed::ID);
        assert_eq!(ack.ack_id, 42);
        assert!(body.is_empty());
    }

    #[test]
    fn command_flagged_as_ack_is_still_applied() {
        let mut h = Harness::new();
        let mut header = TransportHeader::new(CommandMotorSpeed::ID).with_ack_request(1);
        header.flags |= TransportFlags::ACK_RESPONSE;
        let cmd = CommandMotorSpeed { rpm: [1000; 6] };

        let outcome = h.dispatch(header, &cmd.to_vec());

        assert_eq!(outcome, Dispatched::Command(CommandMode::DirectMotor));
        assert_eq!(h.vehicle.command.mode, CommandMode::DirectMotor);
        assert_eq!(h.vehicle.command.direct_motor.rpm, [1000; 6]);
        assert_eq!(h.watchdog.counter(), 0);
        // the request bit still earns an acknowledgement
        assert_eq!(h.sent().len(), 1);
    }
}
