//! Message identifiers and body layouts.
//!
//! All bodies are packed little-endian and follow the transport header
//! directly.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, Result};

/// Protocol message identifiers.
pub mod ids {
    pub const SYSTEM_UPTIME: u32 = 0x0000_0001;
    pub const CONFIG_SET_MESSAGE_RATE_DIVISOR: u32 = 0x0000_0002;

    pub const IMU: u32 = 0x0000_0100;
    pub const VEHICLE_STATUS: u32 = 0x0000_0101;
    pub const RC_DATA: u32 = 0x0000_0102;
    pub const MOTOR_STATE: u32 = 0x0000_0103;
    pub const GPS_DATA: u32 = 0x0000_0104;
    pub const FILTERED_SENSOR_DATA: u32 = 0x0000_0105;

    pub const COMMAND_MOTOR_SPEED: u32 = 0x0000_0200;
    pub const COMMAND_ROLL_PITCH_YAWRATE_THRUST: u32 = 0x0000_0201;
    pub const COMMAND_ROLL_PITCH_YAWRATE_CLIMBRATE: u32 = 0x0000_0202;
    pub const COMMAND_GPS_WAYPOINT: u32 = 0x0000_0203;

    /// Human-readable name for a known id.
    pub fn name(id: u32) -> Option<&'static str> {
        Some(match id {
            SYSTEM_UPTIME => "system_uptime",
            CONFIG_SET_MESSAGE_RATE_DIVISOR => "config_set_message_rate_divisor",
            IMU => "imu",
            VEHICLE_STATUS => "vehicle_status",
            RC_DATA => "rc_data",
            MOTOR_STATE => "motor_state",
            GPS_DATA => "gps_data",
            FILTERED_SENSOR_DATA => "filtered_sensor_data",
            COMMAND_MOTOR_SPEED => "command_motor_speed",
            COMMAND_ROLL_PITCH_YAWRATE_THRUST => "command_roll_pitch_yawrate_thrust",
            COMMAND_ROLL_PITCH_YAWRATE_CLIMBRATE => "command_roll_pitch_yawrate_climbrate",
            COMMAND_GPS_WAYPOINT => "command_gps_waypoint",
            _ => return None,
        })
    }
}

/// A fixed-layout message body.
pub trait Message: Sized {
    /// Message identifier carried in the transport header.
    const ID: u32;
    /// Encoded body size in bytes.
    const SIZE: usize;

    /// Append the body to `dst`.
    fn encode<B: BufMut>(&self, dst: &mut B);

    /// Read the body from `src`, which holds at least `SIZE` bytes.
    fn read_from<B: Buf>(src: &mut B) -> Self;

    /// Parse a body, rejecting one shorter than `SIZE`. Trailing bytes are
    /// ignored.
    fn decode(mut body: &[u8]) -> Result<Self> {
        if body.len() < Self::SIZE {
            return Err(LinkError::BodyTooShort {
                id: Self::ID,
                len: body.len(),
                expected: Self::SIZE,
            });
        }
        Ok(Self::read_from(&mut body))
    }

    fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.encode(&mut out);
        out
    }
}

fn put_f32s<B: BufMut>(dst: &mut B, values: &[f32]) {
    for &v in values {
        dst.put_f32_le(v);
    }
}

fn get_f32x3<B: Buf>(src: &mut B) -> [f32; 3] {
    [src.get_f32_le(), src.get_f32_le(), src.get_f32_le()]
}

fn get_i16s<const N: usize, B: Buf>(src: &mut B) -> [i16; N] {
    let mut out = [0i16; N];
    for slot in &mut out {
        *slot = src.get_i16_le();
    }
    out
}

/// Unit quaternion, scalar first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Quaternion {
    /// Rotation for roll, pitch and yaw in radians.
    pub fn from_euler(roll: f32, pitch: f32, yaw: f32) -> Self {
        let (sy, cy) = (yaw * 0.5).sin_cos();
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();

        Self {
            w: cy * cr * cp + sy * sr * sp,
            x: cy * sr * cp - sy * cr * sp,
            y: cy * cr * sp + sy * sr * cp,
            z: sy * cr * cp - cy * sr * sp,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemUptime {
    pub timestamp_us: u64,
}

impl Message for SystemUptime {
    const ID: u32 = ids::SYSTEM_UPTIME;
    const SIZE: usize = 8;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64_le(self.timestamp_us);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            timestamp_us: src.get_u64_le(),
        }
    }
}

/// One `{id, divisor}` pair of a rate-divisor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDivisor {
    pub id: u32,
    pub divisor: u16,
}

impl RateDivisor {
    pub const SIZE: usize = 6;

    /// Parse every complete pair in `body`. A trailing partial pair is
    /// ignored.
    pub fn parse_all(body: &[u8]) -> impl Iterator<Item = RateDivisor> + '_ {
        body.chunks_exact(Self::SIZE).map(|mut chunk| RateDivisor {
            id: chunk.get_u32_le(),
            divisor: chunk.get_u16_le(),
        })
    }

    pub fn encode_all<B: BufMut>(pairs: &[RateDivisor], dst: &mut B) {
        for pair in pairs {
            dst.put_u32_le(pair.id);
            dst.put_u16_le(pair.divisor);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub timestamp_us: u64,
    /// rad/s
    pub angular_velocity: [f32; 3],
    /// m/s²
    pub linear_acceleration: [f32; 3],
    pub attitude: Quaternion,
}

impl Message for Imu {
    const ID: u32 = ids::IMU;
    const SIZE: usize = 48;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64_le(self.timestamp_us);
        put_f32s(dst, &self.angular_velocity);
        put_f32s(dst, &self.linear_acceleration);
        let q = &self.attitude;
        put_f32s(dst, &[q.w, q.x, q.y, q.z]);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            timestamp_us: src.get_u64_le(),
            angular_velocity: get_f32x3(src),
            linear_acceleration: get_f32x3(src),
            attitude: Quaternion {
                w: src.get_f32_le(),
                x: src.get_f32_le(),
                y: src.get_f32_le(),
                z: src.get_f32_le(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStatus {
    pub timestamp_us: u64,
    pub battery_voltage_mv: u16,
    /// 0..=1000
    pub cpu_load_per_mill: u16,
    pub flight_mode: u32,
    pub flight_time_ms: u32,
    pub safety_pilot_state: u8,
    pub vehicle_type: u8,
}

impl Message for VehicleStatus {
    const ID: u32 = ids::VEHICLE_STATUS;
    const SIZE: usize = 22;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64_le(self.timestamp_us);
        dst.put_u16_le(self.battery_voltage_mv);
        dst.put_u16_le(self.cpu_load_per_mill);
        dst.put_u32_le(self.flight_mode);
        dst.put_u32_le(self.flight_time_ms);
        dst.put_u8(self.safety_pilot_state);
        dst.put_u8(self.vehicle_type);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            timestamp_us: src.get_u64_le(),
            battery_voltage_mv: src.get_u16_le(),
            cpu_load_per_mill: src.get_u16_le(),
            flight_mode: src.get_u32_le(),
            flight_time_ms: src.get_u32_le(),
            safety_pilot_state: src.get_u8(),
            vehicle_type: src.get_u8(),
        }
    }
}

/// Remote-control channels, scaled to the peer's value range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcData {
    pub timestamp_us: u64,
    pub has_lock: u8,
    pub stick_pitch: i16,
    pub stick_roll: i16,
    pub stick_thrust: i16,
    pub stick_yaw: i16,
    pub switch_mode: i16,
    pub switch_power_on_off: i16,
    pub switch_external_command: i16,
    pub aux: i16,
}

impl Message for RcData {
    const ID: u32 = ids::RC_DATA;
    const SIZE: usize = 25;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64_le(self.timestamp_us);
        dst.put_u8(self.has_lock);
        for v in [
            self.stick_pitch,
            self.stick_roll,
            self.stick_thrust,
            self.stick_yaw,
            self.switch_mode,
            self.switch_power_on_off,
            self.switch_external_command,
            self.aux,
        ] {
            dst.put_i16_le(v);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        let timestamp_us = src.get_u64_le();
        let has_lock = src.get_u8();
        let [stick_pitch, stick_roll, stick_thrust, stick_yaw, switch_mode, switch_power_on_off, switch_external_command, aux] =
            get_i16s::<8, _>(src);
        Self {
            timestamp_us,
            has_lock,
            stick_pitch,
            stick_roll,
            stick_thrust,
            stick_yaw,
            switch_mode,
            switch_power_on_off,
            switch_external_command,
            aux,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorState {
    pub timestamp_us: u64,
    pub commanded_rpm: [i16; 8],
    pub measured_rpm: [i16; 8],
}

impl Message for MotorState {
    const ID: u32 = ids::MOTOR_STATE;
    const SIZE: usize = 40;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64_le(self.timestamp_us);
        for &v in self.commanded_rpm.iter().chain(&self.measured_rpm) {
            dst.put_i16_le(v);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            timestamp_us: src.get_u64_le(),
            commanded_rpm: get_i16s(src),
            measured_rpm: get_i16s(src),
        }
    }
}

/// GPS status value reported while the receiver has a fix.
pub const GPS_STATUS_LOCK: u8 = 0x03;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    pub timestamp_us: u64,
    /// deg · 1e7
    pub latitude: i32,
    /// deg · 1e7
    pub longitude: i32,
    /// mm
    pub height: i32,
    /// east, north, up in m/s
    pub velocity: [f32; 3],
    /// deg
    pub heading: f32,
    pub horizontal_accuracy: u32,
    pub vertical_accuracy: u32,
    pub speed_accuracy: u32,
    pub satellites: u32,
    pub status: u8,
}

impl Message for GpsData {
    const ID: u32 = ids::GPS_DATA;
    const SIZE: usize = 53;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64_le(self.timestamp_us);
        dst.put_i32_le(self.latitude);
        dst.put_i32_le(self.longitude);
        dst.put_i32_le(self.height);
        put_f32s(dst, &self.velocity);
        dst.put_f32_le(self.heading);
        dst.put_u32_le(self.horizontal_accuracy);
        dst.put_u32_le(self.vertical_accuracy);
        dst.put_u32_le(self.speed_accuracy);
        dst.put_u32_le(self.satellites);
        dst.put_u8(self.status);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            timestamp_us: src.get_u64_le(),
            latitude: src.get_i32_le(),
            longitude: src.get_i32_le(),
            height: src.get_i32_le(),
            velocity: get_f32x3(src),
            heading: src.get_f32_le(),
            horizontal_accuracy: src.get_u32_le(),
            vertical_accuracy: src.get_u32_le(),
            speed_accuracy: src.get_u32_le(),
            satellites: src.get_u32_le(),
            status: src.get_u8(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredSensorData {
    /// m/s²
    pub acc: [f32; 3],
    /// rad/s
    pub gyro: [f32; 3],
    pub mag: [f32; 3],
    /// m
    pub baro_height: f32,
}

impl Message for FilteredSensorData {
    const ID: u32 = ids::FILTERED_SENSOR_DATA;
    const SIZE: usize = 40;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        put_f32s(dst, &self.acc);
        put_f32s(dst, &self.gyro);
        put_f32s(dst, &self.mag);
        dst.put_f32_le(self.baro_height);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            acc: get_f32x3(src),
            gyro: get_f32x3(src),
            mag: get_f32x3(src),
            baro_height: src.get_f32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMotorSpeed {
    pub rpm: [i16; 6],
}

impl Message for CommandMotorSpeed {
    const ID: u32 = ids::COMMAND_MOTOR_SPEED;
    const SIZE: usize = 12;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        for &v in &self.rpm {
            dst.put_i16_le(v);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self { rpm: get_i16s(src) }
    }
}

/// Attitude and collective thrust. Angles in rad, yaw rate in rad/s,
/// thrust in N.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRollPitchYawrateThrust {
    pub roll: f32,
    pub pitch: f32,
    pub yaw_rate: f32,
    pub thrust: f32,
}

impl Message for CommandRollPitchYawrateThrust {
    const ID: u32 = ids::COMMAND_ROLL_PITCH_YAWRATE_THRUST;
    const SIZE: usize = 16;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        put_f32s(dst, &[self.roll, self.pitch, self.yaw_rate, self.thrust]);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            roll: src.get_f32_le(),
            pitch: src.get_f32_le(),
            yaw_rate: src.get_f32_le(),
            thrust: src.get_f32_le(),
        }
    }
}

/// Attitude and climb rate. Angles in rad, yaw rate in rad/s, climb rate in
/// m/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRollPitchYawrateClimbRate {
    pub roll: f32,
    pub pitch: f32,
    pub yaw_rate: f32,
    pub climb_rate: f32,
}

impl Message for CommandRollPitchYawrateClimbRate {
    const ID: u32 = ids::COMMAND_ROLL_PITCH_YAWRATE_CLIMBRATE;
    const SIZE: usize = 16;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        put_f32s(dst, &[self.roll, self.pitch, self.yaw_rate, self.climb_rate]);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            roll: src.get_f32_le(),
            pitch: src.get_f32_le(),
            yaw_rate: src.get_f32_le(),
            climb_rate: src.get_f32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandGpsWaypoint {
    /// deg · 1e7
    pub latitude: i32,
    /// deg · 1e7
    pub longitude: i32,
    /// m
    pub height: f32,
    /// deg
    pub heading: f32,
    /// m/s
    pub max_speed: f32,
}

impl Message for CommandGpsWaypoint {
    const ID: u32 = ids::COMMAND_GPS_WAYPOINT;
    const SIZE: usize = 20;

    fn encode<B: BufMut>(&self, dst: &mut B) {
        dst.put_i32_le(self.latitude);
        dst.put_i32_le(self.longitude);
        put_f32s(dst, &[self.height, self.heading, self.max_speed]);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            latitude: src.get_i32_le(),
            longitude: src.get_i32_le(),
            height: src.get_f32_le(),
            heading: src.get_f32_le(),
            max_speed: src.get_f32_le(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_size<M: Message>(msg: M) {
        assert_eq!(msg.to_vec().len(), M::SIZE);
    }

    #[test]
    fn encoded_sizes_match_layouts() {
        assert_size(SystemUptime::default());
        assert_size(Imu::default());
        assert_size(VehicleStatus::default());
        assert_size(RcData::default());
        assert_size(MotorState::default());
        assert_size(GpsData::default());
        assert_size(FilteredSensorData::default());
        assert_size(CommandMotorSpeed::default());
        assert_size(CommandRollPitchYawrateThrust::default());
        assert_size(CommandRollPitchYawrateClimbRate::default());
        assert_size(CommandGpsWaypoint::default());
    }

    #[test]
    fn vehicle_status_layout() {
        let status = VehicleStatus {
            timestamp_us: 1,
            battery_voltage_mv: 0x0302,
            cpu_load_per_mill: 0x0504,
            flight_mode: 6,
            flight_time_ms: 7,
            safety_pilot_state: 8,
            vehicle_type: 9,
        };
        assert_eq!(
            status.to_vec(),
            vec![1, 0, 0, 0, 0, 0, 0, 0, 2, 3, 4, 5, 6, 0, 0, 0, 7, 0, 0, 0, 8, 9]
        );
    }

    #[test]
    fn thrust_command_decodes() {
        let cmd = CommandRollPitchYawrateThrust {
            roll: 0.1,
            pitch: -0.2,
            yaw_rate: 0.0,
            thrust: 8.5,
        };
        let decoded = CommandRollPitchYawrateThrust::decode(&cmd.to_vec()).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn short_body_is_rejected() {
        let err = CommandMotorSpeed::decode(&[0u8; 11]).unwrap_err();
        assert!(matches!(
            err,
            LinkError::BodyTooShort {
                id: ids::COMMAND_MOTOR_SPEED,
                len: 11,
                expected: 12
            }
        ));
    }

    #[test]
    fn rate_divisor_pairs_ignore_partial_tail() {
        let mut body = Vec::new();
        RateDivisor::encode_all(
            &[
                RateDivisor {
                    id: ids::IMU,
                    divisor: 10,
                },
                RateDivisor {
                    id: ids::GPS_DATA,
                    divisor: 0,
                },
            ],
            &mut body,
        );
        body.extend_from_slice(&[0xFF, 0xFF, 0xFF]);

        let pairs: Vec<_> = RateDivisor::parse_all(&body).collect();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].id, ids::IMU);
        assert_eq!(pairs[0].divisor, 10);
        assert_eq!(pairs[1].divisor, 0);
    }

    #[test]
    fn identity_quaternion_for_zero_angles() {
        assert_eq!(Quaternion::from_euler(0.0, 0.0, 0.0), Quaternion::default());
    }

    #[test]
    fn yaw_only_quaternion() {
        let q = Quaternion::from_euler(0.0, 0.0, std::f32::consts::PI);
        assert!(q.w.abs() < 1e-6);
        assert!((q.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn id_names() {
        assert_eq!(ids::name(ids::IMU), Some("imu"));
        assert_eq!(ids::name(0xDEAD), None);
    }
}
