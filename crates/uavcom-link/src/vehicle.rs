//! Vehicle state shared with the flight stack.
//!
//! [`Telemetry`] is written by the flight stack and read by the telemetry
//! producers. [`CommandState`] is written by the dispatcher and the watchdog
//! and read back by the flight stack. Units follow the flight stack's native
//! fixed-point conventions; conversion to SI happens at the message boundary.

use serde::{Deserialize, Serialize};

/// Airframe family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Hummingbird,
    Pelican,
    Firefly,
}

impl VehicleType {
    /// Wire value reported in `VehicleStatus`.
    pub fn code(self) -> u8 {
        match self {
            VehicleType::Hummingbird => 1,
            VehicleType::Pelican => 2,
            VehicleType::Firefly => 3,
        }
    }

    /// Collective thrust in newtons that maps to full command scale.
    pub fn max_thrust_newtons(self) -> f32 {
        match self {
            VehicleType::Hummingbird => 20.0,
            VehicleType::Pelican | VehicleType::Firefly => 36.0,
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VehicleType::Hummingbird => "hummingbird",
            VehicleType::Pelican => "pelican",
            VehicleType::Firefly => "firefly",
        };
        f.write_str(name)
    }
}

/// Attitude estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attitude {
    /// deg · 1000
    pub roll: i32,
    /// deg · 1000
    pub pitch: i32,
    /// deg · 1000, 0..360000
    pub yaw: i32,
    /// roll, pitch, yaw rate in deg/s · 1000
    pub angular_velocity: [i32; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensors {
    /// m/s² · 1000
    pub acc: [i32; 3],
    /// raw magnetometer counts
    pub mag: [i32; 3],
    pub battery_mv: u16,
}

/// Raw remote-control channels, 0..4095.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcInput {
    pub pitch: u16,
    pub roll: u16,
    pub thrust: u16,
    pub yaw: u16,
    pub serial_switch: u16,
    pub flight_mode: u16,
    pub aux: u16,
    pub has_lock: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpsFix {
    /// deg · 1e7
    pub latitude: i32,
    /// deg · 1e7
    pub longitude: i32,
    /// mm/s
    pub speed_east_west: i32,
    /// mm/s
    pub speed_north_south: i32,
    /// deg · 1000
    pub heading: i32,
    pub horizontal_accuracy: u32,
    pub vertical_accuracy: u32,
    pub speed_accuracy: u32,
    pub satellites: u32,
    pub has_lock: bool,
}

/// Snapshot of everything the telemetry producers report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    pub attitude: Attitude,
    pub sensors: Sensors,
    /// mm above the motor-start point
    pub height: i32,
    /// mm/s
    pub vertical_speed: i32,
    pub rc: RcInput,
    pub gps: GpsFix,
    /// measured motor speeds in rpm
    pub motor_speed: [i16; 6],
    pub flight_mode: i32,
    /// 0..=1000
    pub cpu_load: u16,
    /// s
    pub flight_time: u16,
}

/// Active command source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMode {
    #[default]
    Off,
    DirectMotor,
    RollPitchYawRateThrust,
    RollPitchYawRateClimbRate,
    GpsWaypointAbsolute,
}

impl std::fmt::Display for CommandMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommandMode::Off => "off",
            CommandMode::DirectMotor => "direct_motor",
            CommandMode::RollPitchYawRateThrust => "roll_pitch_yawrate_thrust",
            CommandMode::RollPitchYawRateClimbRate => "roll_pitch_yawrate_climbrate",
            CommandMode::GpsWaypointAbsolute => "gps_waypoint_absolute",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMotorCommand {
    pub rpm: [i16; 6],
    pub enable: [bool; 6],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttitudeThrustCommand {
    /// deg · 1000
    pub roll: i32,
    /// deg · 1000
    pub pitch: i32,
    /// deg/s · 1000
    pub yaw_rate: i32,
    /// 0..4095 at nominal range
    pub thrust: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttitudeClimbCommand {
    /// deg · 1000
    pub roll: i32,
    /// deg · 1000
    pub pitch: i32,
    /// deg/s · 1000
    pub yaw_rate: i32,
    /// mm/s
    pub climb_rate: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointCommand {
    /// deg · 1e7
    pub latitude: i32,
    /// deg · 1e7
    pub longitude: i32,
    /// mm
    pub height: i32,
    /// deg · 1000
    pub heading: i32,
    /// percent, 0..=100
    pub max_speed: u8,
    /// ms
    pub time_to_stay: u32,
    /// mm
    pub reached_tolerance: u16,
    /// Set when new values were written; the flight stack clears it.
    pub updated: bool,
}

/// Commands for the flight stack. Only the block matching `mode` is live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandState {
    pub mode: CommandMode,
    pub direct_motor: DirectMotorCommand,
    pub attitude_thrust: AttitudeThrustCommand,
    pub attitude_climb: AttitudeClimbCommand,
    pub waypoint: WaypointCommand,
}

/// Telemetry in, commands out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub telemetry: Telemetry,
    pub command: CommandState,
}

impl Vehicle {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_thrust_by_type() {
        assert_eq!(VehicleType::Hummingbird.max_thrust_newtons(), 20.0);
        assert_eq!(VehicleType::Pelican.max_thrust_newtons(), 36.0);
        assert_eq!(VehicleType::Firefly.max_thrust_newtons(), 36.0);
    }

    #[test]
    fn vehicle_type_serde_names() {
        let t: VehicleType = serde_json::from_str("\"firefly\"").unwrap();
        assert_eq!(t, VehicleType::Firefly);
        assert_eq!(serde_json::to_string(&VehicleType::Pelican).unwrap(), "\"pelican\"");
        assert_eq!(VehicleType::Pelican.to_string(), "pelican");
    }

    #[test]
    fn new_vehicle_is_off() {
        let vehicle = Vehicle::new();
        assert_eq!(vehicle.command.mode, CommandMode::Off);
        assert!(!vehicle.command.waypoint.updated);
    }
}
