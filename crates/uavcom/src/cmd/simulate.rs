use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

use serde::Serialize;
use tracing::{debug, info};
use uavcom_frame::LinkStats;
use uavcom_link::{CommandMode, Link, LinkConfig, Vehicle};
use uavcom_transport::{pump, ByteQueue, ManualClock};

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, link_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_json, print_stats, OutputFormat};

/// Inbound queue size, a few frames of headroom like a UART RX ring.
const RX_QUEUE: usize = 1024;
/// Outbound queue size; the scheduler's worst tick fits with room to spare.
const TX_QUEUE: usize = 2048;

#[derive(Debug, Serialize)]
struct SimulateOutput {
    ticks: u64,
    commands: u64,
    timeouts: u64,
    active: bool,
    mode: CommandMode,
    downlink_bytes: u64,
    stats: LinkStats,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    if args.tick_us == 0 {
        return Err(CliError::new(USAGE, "--tick-us must be greater than zero"));
    }
    let config = match &args.config {
        Some(path) => LinkConfig::from_json_file(path)
            .map_err(|err| link_error(&format!("failed loading {}", path.display()), err))?,
        None => LinkConfig::default(),
    };
    let link = Link::with_config(config).map_err(|err| link_error("invalid configuration", err))?;

    let uplink: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::empty()),
    };
    let downlink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?,
        )),
        None => Box::new(io::sink()),
    };

    let out = simulate(link, uplink, downlink, &args)?;
    match format {
        OutputFormat::Json => print_json(&out),
        _ => {
            println!(
                "{} ticks, {} commands accepted, {} timeouts, link {}, mode {}, {} bytes sent",
                out.ticks,
                out.commands,
                out.timeouts,
                if out.active { "active" } else { "inactive" },
                out.mode,
                out.downlink_bytes
            );
            print_stats(&out.stats, format);
        }
    }
    Ok(SUCCESS)
}

fn simulate<R: Read, W: Write>(
    mut link: Link,
    mut uplink: R,
    mut downlink: W,
    args: &SimulateArgs,
) -> CliResult<SimulateOutput> {
    let mut rx = ByteQueue::<RX_QUEUE>::new();
    let mut tx = ByteQueue::<TX_QUEUE>::new();
    let mut vehicle = Vehicle::new();
    let clock = ManualClock::new(0);

    let mut commands = 0u64;
    let mut timeouts = 0u64;
    let mut downlink_bytes = 0u64;

    info!(ticks = args.ticks, tick_us = args.tick_us, "simulation started");
    for tick in 0..args.ticks {
        let mut chunk = (&mut uplink).take(args.bytes_per_tick);
        pump::fill_from(&mut chunk, &mut rx).map_err(|err| transport_error("uplink read failed", err))?;

        let summary = link.spin(&mut rx, &mut tx, &mut vehicle, &clock);
        commands += summary.commands as u64;
        if summary.timed_out {
            timeouts += 1;
            debug!(tick, "command timeout");
        }

        downlink_bytes += pump::drain_into(&mut tx, &mut downlink)
            .map_err(|err| transport_error("downlink write failed", err))? as u64;
        clock.advance(args.tick_us);
    }
    downlink
        .flush()
        .map_err(|err| io_error("downlink flush failed", err))?;

    Ok(SimulateOutput {
        ticks: args.ticks,
        commands,
        timeouts,
        active: link.is_active(),
        mode: vehicle.command.mode,
        downlink_bytes,
        stats: *link.stats(),
    })
}
