use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("tlsmsg {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: tlsmsg");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("TLSMSG_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: rustls={}, cli=true", cfg!(feature = "rustls"));
    println!(
        "read_defaults: backoff={:?} first_attempts={} end_attempts={} chunk={}",
        tlsmsg_io::DEFAULT_BACKOFF,
        tlsmsg_io::MAX_ATTEMPTS_TO_START_READING,
        tlsmsg_io::MAX_ATTEMPTS_TO_STOP_READING,
        tlsmsg_io::DEFAULT_CHUNK_SIZE,
    );

    Ok(SUCCESS)
}
