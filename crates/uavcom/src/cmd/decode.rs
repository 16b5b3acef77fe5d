use std::fs::File;
use std::io::{self, Read};

use serde::Serialize;
use tracing::{debug, warn};
use uavcom_frame::{FrameConfig, FrameError, FrameReader};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frames, print_json, FrameOutput, OutputFormat};

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
struct DecodeSummary {
    good: u64,
    corrupt: u64,
    oversized: u64,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    if args.max_message_size == 0 {
        return Err(CliError::new(USAGE, "--max-message-size must be greater than zero"));
    }
    let input: Box<dyn Read> = if args.input.as_os_str() == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(&args.input)
            .map_err(|err| io_error(&format!("failed opening {}", args.input.display()), err))?;
        Box::new(file)
    };

    let config = FrameConfig {
        max_message_size: args.max_message_size,
    };
    let (frames, summary) = decode_stream(input, config, args.count)?;

    print_frames(&frames, format);
    match format {
        OutputFormat::Json => print_json(&summary),
        _ => eprintln!(
            "{} good, {} corrupt, {} oversized",
            summary.good, summary.corrupt, summary.oversized
        ),
    }

    if args.strict && summary.corrupt + summary.oversized > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn decode_stream<R: Read>(
    input: R,
    config: FrameConfig,
    limit: Option<usize>,
) -> CliResult<(Vec<FrameOutput>, DecodeSummary)> {
    let mut frames = Vec::new();
    let mut summary = DecodeSummary::default();

    for item in FrameReader::with_config(input, config) {
        match item {
            Ok(frame) => {
                summary.good += 1;
                frames.push(FrameOutput::from_frame(&frame));
                if limit.is_some_and(|n| frames.len() >= n) {
                    break;
                }
            }
            Err(err) if err.is_corruption() => {
                debug!(error = %err, "skipping damaged frame");
                summary.corrupt += 1;
            }
            Err(FrameError::PayloadTooLarge { size, .. }) => {
                warn!(bytes = size, "skipping oversized frame");
                summary.oversized += 1;
            }
            Err(err) => return Err(frame_error("read failed", err)),
        }
    }
    Ok((frames, summary))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use uavcom_frame::{encode_frame, TransportHeader};
    use uavcom_link::messages::CommandMotorSpeed;
    use uavcom_link::{ids, Message};

    use super::*;

    fn capture() -> Vec<u8> {
        let mut wire = BytesMut::new();
        for seq in 0..3u16 {
            let mut payload = TransportHeader::new(ids::COMMAND_MOTOR_SPEED).to_bytes().to_vec();
            payload.extend_from_slice(&CommandMotorSpeed { rpm: [seq as i16; 6] }.to_vec());
            encode_frame(seq, &payload, &mut wire).unwrap();
        }
        wire.to_vec()
    }

    #[test]
    fn decodes_every_frame() {
        let (frames, summary) =
            decode_stream(Cursor::new(capture()), FrameConfig::default(), None).unwrap();

        assert_eq!(summary, DecodeSummary { good: 3, corrupt: 0, oversized: 0 });
        assert_eq!(frames[2].sequence, 2);
        assert_eq!(frames[2].name, "command_motor_speed");
        assert_eq!(frames[2].fields.as_ref().unwrap()["rpm"][0], 2);
    }

    #[test]
    fn damaged_frame_is_counted_and_skipped() {
        let mut wire = capture();
        wire[2] ^= 0x40;

        let (frames, summary) =
            decode_stream(Cursor::new(wire), FrameConfig::default(), None).unwrap();

        assert_eq!(summary.good, 2);
        assert_eq!(summary.corrupt, 1);
        assert_eq!(frames[0].sequence, 1);
    }

    #[test]
    fn count_stops_early() {
        let (frames, _) =
            decode_stream(Cursor::new(capture()), FrameConfig::default(), Some(1)).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn long_run_without_delimiter_is_oversized() {
        let mut wire = vec![0x11; 400];
        wire.push(0);
        wire.extend(capture());

        let (frames, summary) =
            decode_stream(Cursor::new(wire), FrameConfig::default(), None).unwrap();
        assert!(summary.oversized >= 1);
        assert_eq!(frames.len(), 3);
    }
}
