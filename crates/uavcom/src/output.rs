use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use uavcom_frame::{Frame, LinkStats, TransportHeader};
use uavcom_link::messages::{
    CommandGpsWaypoint, CommandMotorSpeed, CommandRollPitchYawrateClimbRate,
    CommandRollPitchYawrateThrust, FilteredSensorData, GpsData, Imu, MotorState, RateDivisor,
    RcData, SystemUptime, VehicleStatus,
};
use uavcom_link::{ids, Message};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded frame as printed by `decode`.
#[derive(Debug, Serialize)]
pub struct FrameOutput {
    pub sequence: u16,
    pub id: Option<u32>,
    pub name: &'static str,
    pub ack_request: bool,
    pub ack_response: bool,
    pub ack_id: u16,
    pub body_size: usize,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
}

impl FrameOutput {
    pub fn from_frame(frame: &Frame) -> Self {
        match frame.header() {
            Ok((header, body)) => Self {
                sequence: frame.sequence,
                id: Some(header.id),
                name: message_name(header.id),
                ack_request: header.wants_ack(),
                ack_response: header.is_ack(),
                ack_id: header.ack_id,
                body_size: body.len(),
                body: to_hex(body),
                fields: describe_body(&header, body),
            },
            Err(_) => Self {
                sequence: frame.sequence,
                id: None,
                name: "no_header",
                ack_request: false,
                ack_response: false,
                ack_id: 0,
                body_size: frame.payload.len(),
                body: to_hex(&frame.payload),
                fields: None,
            },
        }
    }
}

pub fn print_frames(frames: &[FrameOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                print_json(frame);
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "ID", "MESSAGE", "ACK", "SIZE", "FIELDS"]);
            for frame in frames {
                table.add_row(vec![
                    frame.sequence.to_string(),
                    frame.id.map(|id| format!("{id:#06x}")).unwrap_or_default(),
                    frame.name.to_string(),
                    ack_label(frame),
                    frame.body_size.to_string(),
                    fields_preview(frame),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for frame in frames {
                println!(
                    "seq={} id={} ({}) ack={} size={} {}",
                    frame.sequence,
                    frame.id.map(|id| format!("{id:#x}")).unwrap_or_else(|| "-".into()),
                    frame.name,
                    ack_label(frame),
                    frame.body_size,
                    fields_preview(frame)
                );
            }
        }
    }
}

/// Print link counters, one row per direction.
pub fn print_stats(stats: &LinkStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(stats),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["DIR", "GOOD", "CHECKSUM FAIL", "DECODE FAIL", "NO SPACE", "OVERSIZED"])
                .add_row(vec![
                    "rx".to_string(),
                    stats.rx.good.to_string(),
                    stats.rx.checksum_fail.to_string(),
                    stats.rx.decode_fail.to_string(),
                    "-".to_string(),
                    stats.rx.oversized.to_string(),
                ])
                .add_row(vec![
                    "tx".to_string(),
                    stats.tx.good.to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    stats.tx.no_buffer_space.to_string(),
                    stats.tx.oversized.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!(
                "rx good={} checksum_fail={} decode_fail={} oversized={}",
                stats.rx.good, stats.rx.checksum_fail, stats.rx.decode_fail, stats.rx.oversized
            );
            println!(
                "tx good={} no_buffer_space={} oversized={}",
                stats.tx.good, stats.tx.no_buffer_space, stats.tx.oversized
            );
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn message_name(id: u32) -> &'static str {
    ids::name(id).unwrap_or("user")
}

/// Decode a known message body into its fields. Acknowledgements, user
/// messages and short bodies yield `None`.
pub fn describe_body(header: &TransportHeader, body: &[u8]) -> Option<Value> {
    if header.is_ack() {
        return None;
    }
    match header.id {
        ids::SYSTEM_UPTIME if body.is_empty() => None,
        ids::SYSTEM_UPTIME => fields::<SystemUptime>(body),
        ids::CONFIG_SET_MESSAGE_RATE_DIVISOR => {
            let pairs: Vec<RateDivisor> = RateDivisor::parse_all(body).collect();
            serde_json::to_value(pairs).ok()
        }
        ids::IMU => fields::<Imu>(body),
        ids::VEHICLE_STATUS => fields::<VehicleStatus>(body),
        ids::RC_DATA => fields::<RcData>(body),
        ids::MOTOR_STATE => fields::<MotorState>(body),
        ids::GPS_DATA => fields::<GpsData>(body),
        ids::FILTERED_SENSOR_DATA => fields::<FilteredSensorData>(body),
        ids::COMMAND_MOTOR_SPEED => fields::<CommandMotorSpeed>(body),
        ids::COMMAND_ROLL_PITCH_YAWRATE_THRUST => fields::<CommandRollPitchYawrateThrust>(body),
        ids::COMMAND_ROLL_PITCH_YAWRATE_CLIMBRATE => {
            fields::<CommandRollPitchYawrateClimbRate>(body)
        }
        ids::COMMAND_GPS_WAYPOINT => fields::<CommandGpsWaypoint>(body),
        _ => None,
    }
}

fn fields<M: Message + Serialize>(body: &[u8]) -> Option<Value> {
    let msg = M::decode(body).ok()?;
    serde_json::to_value(msg).ok()
}

fn ack_label(frame: &FrameOutput) -> String {
    match (frame.ack_request, frame.ack_response) {
        (_, true) => format!("resp {}", frame.ack_id),
        (true, false) => format!("req {}", frame.ack_id),
        (false, false) => "-".to_string(),
    }
}

fn fields_preview(frame: &FrameOutput) -> String {
    match &frame.fields {
        Some(value) => value.to_string(),
        None if frame.body_size == 0 => String::new(),
        None => format!("<{}>", frame.body),
    }
}

pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse a hex string. Whitespace and an optional `0x` prefix are ignored.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let digits: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() {
        return Err("non-hex characters in input".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}
