//! Telemetry producers for the default schedule.
//!
//! Each builder converts the vehicle's fixed-point readings into the SI units
//! of the corresponding message.

use std::f32::consts::PI;

use bytes::BytesMut;

use crate::messages::{
    ids, FilteredSensorData, GpsData, Imu, Message, MotorState, Quaternion, RcData,
    VehicleStatus, GPS_STATUS_LOCK,
};
use crate::scheduler::{MessageProducer, ScheduleEntry, Scheduler, DEFAULT_DIVISORS};
use crate::vehicle::{Vehicle, VehicleType};

const MILLIDEG_TO_RAD: f32 = 0.001 * PI / 180.0;
const MAG_SCALE: f32 = 48.0 / 2500.0;
const RC_SCALE: i32 = 8;

fn milli(v: i32) -> f32 {
    v as f32 * 0.001
}

fn rad(millideg: i32) -> f32 {
    millideg as f32 * MILLIDEG_TO_RAD
}

fn rc(raw: u16) -> i16 {
    // raw channels top out at 4095, so the product fits
    (i32::from(raw) * RC_SCALE) as i16
}

pub fn imu(vehicle: &Vehicle, now_us: u64) -> Imu {
    let att = &vehicle.telemetry.attitude;
    Imu {
        timestamp_us: now_us,
        angular_velocity: att.angular_velocity.map(rad),
        linear_acceleration: vehicle.telemetry.sensors.acc.map(milli),
        attitude: Quaternion::from_euler(rad(att.roll), rad(att.pitch), rad(att.yaw)),
    }
}

pub fn vehicle_status(vehicle: &Vehicle, now_us: u64, vehicle_type: VehicleType) -> VehicleStatus {
    let t = &vehicle.telemetry;
    VehicleStatus {
        timestamp_us: now_us,
        battery_voltage_mv: t.sensors.battery_mv,
        cpu_load_per_mill: t.cpu_load,
        flight_mode: t.flight_mode as u32,
        flight_time_ms: u32::from(t.flight_time) * 1000,
        safety_pilot_state: 0,
        vehicle_type: vehicle_type.code(),
    }
}

pub fn rc_data(vehicle: &Vehicle, now_us: u64) -> RcData {
    let input = &vehicle.telemetry.rc;
    RcData {
        timestamp_us: now_us,
        has_lock: u8::from(input.has_lock),
        stick_pitch: rc(input.pitch),
        stick_roll: rc(input.roll),
        stick_thrust: rc(input.thrust),
        stick_yaw: rc(input.yaw),
        switch_mode: rc(input.flight_mode),
        // no power switch on this airframe
        switch_power_on_off: -1,
        switch_external_command: rc(input.serial_switch),
        aux: rc(input.aux),
    }
}

pub fn motor_state(vehicle: &Vehicle, now_us: u64) -> MotorState {
    let mut state = MotorState {
        timestamp_us: now_us,
        ..MotorState::default()
    };
    state.commanded_rpm[..6].copy_from_slice(&vehicle.command.direct_motor.rpm);
    state.measured_rpm[..6].copy_from_slice(&vehicle.telemetry.motor_speed);
    state
}

pub fn gps_data(vehicle: &Vehicle, now_us: u64) -> GpsData {
    let t = &vehicle.telemetry;
    let gps = &t.gps;
    GpsData {
        timestamp_us: now_us,
        latitude: gps.latitude,
        longitude: gps.longitude,
        height: t.height,
        velocity: [
            milli(gps.speed_east_west),
            milli(gps.speed_north_south),
            milli(t.vertical_speed),
        ],
        heading: milli(gps.heading),
        horizontal_accuracy: gps.horizontal_accuracy,
        vertical_accuracy: gps.vertical_accuracy,
        speed_accuracy: gps.speed_accuracy,
        satellites: gps.satellites,
        status: if gps.has_lock { GPS_STATUS_LOCK } else { 0 },
    }
}

pub fn filtered_sensor_data(vehicle: &Vehicle) -> FilteredSensorData {
    let t = &vehicle.telemetry;
    FilteredSensorData {
        acc: t.sensors.acc.map(milli),
        gyro: t.attitude.angular_velocity.map(rad),
        mag: t.sensors.mag.map(|m| m as f32 * MAG_SCALE),
        baro_height: milli(t.height),
    }
}

/// Wrap a typed message builder as a [`MessageProducer`].
pub fn producer<M, F>(mut build: F) -> impl MessageProducer + 'static
where
    M: Message + 'static,
    F: FnMut(&Vehicle, u64) -> M + 'static,
{
    move |vehicle: &Vehicle, now_us: u64, out: &mut BytesMut| build(vehicle, now_us).encode(out)
}

/// Schedule entry for one of the built-in telemetry messages.
pub fn telemetry_entry(id: u32, divisor: u16, vehicle_type: VehicleType) -> Option<ScheduleEntry> {
    let entry = match id {
        ids::IMU => ScheduleEntry::new(id, divisor, producer(imu)),
        ids::VEHICLE_STATUS => ScheduleEntry::new(
            id,
            divisor,
            producer(move |v: &Vehicle, now| vehicle_status(v, now, vehicle_type)),
        ),
        ids::RC_DATA => ScheduleEntry::new(id, divisor, producer(rc_data)),
        ids::MOTOR_STATE => ScheduleEntry::new(id, divisor, producer(motor_state)),
        ids::GPS_DATA => ScheduleEntry::new(id, divisor, producer(gps_data)),
        ids::FILTERED_SENSOR_DATA => ScheduleEntry::new(
            id,
            divisor,
            producer(|v: &Vehicle, _| filtered_sensor_data(v)),
        ),
        _ => return None,
    };
    Some(entry)
}

/// The six telemetry messages at their default rates.
pub fn default_scheduler(vehicle_type: VehicleType) -> Scheduler {
    let mut scheduler = Scheduler::new();
    for (id, divisor) in DEFAULT_DIVISORS {
        if let Some(entry) = telemetry_entry(id, divisor, vehicle_type) {
            scheduler.push(entry);
        }
    }
    scheduler
}
