use std::fs::OpenOptions;
use std::io::Write;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uavcom_frame::{FrameWriter, TransportHeader};
use uavcom_link::messages::{
    CommandGpsWaypoint, CommandMotorSpeed, CommandRollPitchYawrateClimbRate,
    CommandRollPitchYawrateThrust, RateDivisor,
};
use uavcom_link::{ids, Message};

use crate::cmd::{EncodeArgs, MessageKind};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{message_name, parse_hex, print_json, print_raw, to_hex, OutputFormat};

#[derive(Debug, Serialize)]
struct EncodeOutput {
    id: u32,
    name: &'static str,
    sequence: u16,
    ack_request: bool,
    body_size: usize,
    wire_size: usize,
    wire: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let (id, body) = build_body(&args)?;

    let mut header = TransportHeader::new(id);
    if let Some(ack_id) = args.ack {
        header = header.with_ack_request(ack_id);
    }
    let wire = encode(&header, &body, args.sequence)?;

    if let Some(path) = &args.output {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
        file.write_all(&wire)
            .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
    }

    let out = EncodeOutput {
        id,
        name: message_name(id),
        sequence: args.sequence,
        ack_request: header.wants_ack(),
        body_size: body.len(),
        wire_size: wire.len(),
        wire: to_hex(&wire),
    };
    match format {
        OutputFormat::Raw if args.output.is_none() => print_raw(&wire),
        OutputFormat::Raw => {}
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "{} ({:#x}) seq={} body={}B wire={}B {}",
            out.name, out.id, out.sequence, out.body_size, out.wire_size, out.wire
        ),
    }
    Ok(SUCCESS)
}

/// Stuff `header` and `body` into one wire frame, delimiter included.
fn encode(header: &TransportHeader, body: &[u8], sequence: u16) -> CliResult<Vec<u8>> {
    let mut writer = FrameWriter::new(Vec::new());
    writer.set_next_sequence(sequence);
    writer
        .send_message(header, body)
        .map_err(|err| frame_error("encode failed", err))?;
    Ok(writer.into_inner())
}

fn build_body(args: &EncodeArgs) -> CliResult<(u32, Vec<u8>)> {
    if args.message != MessageKind::Raw && args.hex.is_some() {
        return Err(CliError::usage("--hex is only accepted for `raw` messages"));
    }
    let json = args.json.as_deref();

    match args.message {
        MessageKind::MotorSpeed => command::<CommandMotorSpeed>(json),
        MessageKind::Thrust => command::<CommandRollPitchYawrateThrust>(json),
        MessageKind::ClimbRate => command::<CommandRollPitchYawrateClimbRate>(json),
        MessageKind::Waypoint => command::<CommandGpsWaypoint>(json),
        MessageKind::Uptime => Ok((ids::SYSTEM_UPTIME, Vec::new())),
        MessageKind::RateDivisor => {
            let pairs: Vec<RateDivisor> = parse_json(json)?;
            let mut body = Vec::with_capacity(pairs.len() * RateDivisor::SIZE);
            RateDivisor::encode_all(&pairs, &mut body);
            Ok((ids::CONFIG_SET_MESSAGE_RATE_DIVISOR, body))
        }
        MessageKind::Raw => {
            let id = args
                .id
                .ok_or_else(|| CliError::usage("`raw` requires --id"))?;
            let body = match &args.hex {
                Some(hex) => parse_hex(hex)
                    .map_err(|err| CliError::usage(format!("--hex: {err}")))?,
                None => Vec::new(),
            };
            Ok((id, body))
        }
    }
}

fn command<M: Message + DeserializeOwned>(json: Option<&str>) -> CliResult<(u32, Vec<u8>)> {
    let msg: M = parse_json(json)?;
    Ok((M::ID, msg.to_vec()))
}

fn parse_json<T: DeserializeOwned>(json: Option<&str>) -> CliResult<T> {
    let json = json.ok_or_else(|| CliError::usage("this message needs --json fields"))?;
    serde_json::from_str(json)
        .map_err(|err| CliError::new(DATA_INVALID, format!("--json does not match the message: {err}")))
}
