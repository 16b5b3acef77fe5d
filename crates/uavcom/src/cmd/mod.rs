use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one wire frame.
    Encode(EncodeArgs),
    /// Decode a captured frame stream.
    Decode(DecodeArgs),
    /// Run the vehicle side of the link against a captured uplink.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageKind {
    /// COMMAND_MOTOR_SPEED, fields: rpm[6].
    MotorSpeed,
    /// COMMAND_ROLL_PITCH_YAWRATE_THRUST, fields: roll, pitch, yaw_rate, thrust.
    Thrust,
    /// COMMAND_ROLL_PITCH_YAWRATE_CLIMBRATE, fields: roll, pitch, yaw_rate, climb_rate.
    ClimbRate,
    /// COMMAND_GPS_WAYPOINT, fields: latitude, longitude, height, heading, max_speed.
    Waypoint,
    /// SYSTEM_UPTIME request, no body.
    Uptime,
    /// CONFIG_SET_MESSAGE_RATE_DIVISOR, a list of {id, divisor}.
    RateDivisor,
    /// Any id with a hex body.
    Raw,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message to build.
    pub message: MessageKind,
    /// Message fields as JSON.
    #[arg(long, conflicts_with = "hex")]
    pub json: Option<String>,
    /// Raw message body as hex.
    #[arg(long, conflicts_with = "json")]
    pub hex: Option<String>,
    /// Message id for `raw` (decimal or 0x-prefixed hex).
    #[arg(long, value_parser = parse_id)]
    pub id: Option<u32>,
    /// Request an acknowledgement with this correlation id.
    #[arg(long, value_name = "ACK_ID")]
    pub ack: Option<u16>,
    /// Sequence number stamped on the frame.
    #[arg(long, default_value_t = 0)]
    pub sequence: u16,
    /// Append the frame to this file.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read, `-` for stdin.
    pub input: PathBuf,
    /// Maximum unstuffed payload size of the capture.
    #[arg(long, default_value_t = uavcom_frame::DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,
    /// Stop after N good frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit non-zero if any frame was damaged.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Captured uplink (ground to vehicle) stream. Without it the link runs idle.
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Write the downlink stream here.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Link configuration (JSON).
    #[arg(long, value_name = "FILE", env = "UAVCOM_CONFIG")]
    pub config: Option<PathBuf>,
    /// Control ticks to run.
    #[arg(long, default_value_t = 1000)]
    pub ticks: u64,
    /// Tick period in microseconds.
    #[arg(long, default_value_t = 1000)]
    pub tick_us: u64,
    /// Uplink bytes delivered per tick, roughly the UART rate.
    #[arg(long, default_value_t = 64)]
    pub bytes_per_tick: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_id(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid message id: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_decimal_and_hex() {
        assert_eq!(parse_id("513"), Ok(0x201));
        assert_eq!(parse_id("0x201"), Ok(0x201));
        assert_eq!(parse_id("0X1000"), Ok(0x1000));
        assert!(parse_id("0xZZ").is_err());
        assert!(parse_id("-1").is_err());
    }
}
