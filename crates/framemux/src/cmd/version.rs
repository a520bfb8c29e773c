use framemux_frame::HEADER_SIZE;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::FRAME_LEN;

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("framemux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: framemux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("FRAMEMUX_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("FRAMEMUX_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("frame_len: {FRAME_LEN}");
    println!("payload_len: {}", FRAME_LEN - HEADER_SIZE);

    Ok(SUCCESS)
}
