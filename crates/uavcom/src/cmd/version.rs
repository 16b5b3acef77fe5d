use uavcom_frame::{max_encoded_frame_size, DEFAULT_MAX_MESSAGE_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("uavcom {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: uavcom");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("UAVCOM_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("max_message_size: {DEFAULT_MAX_MESSAGE_SIZE}");
    println!(
        "max_frame_size: {}",
        max_encoded_frame_size(DEFAULT_MAX_MESSAGE_SIZE)
    );
    println!("checksum: crc-16/ccitt-false");
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
