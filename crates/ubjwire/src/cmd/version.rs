use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("ubjwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: ubjwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("UBJWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: peer={}, async={}, cli=true",
        cfg!(feature = "peer"),
        cfg!(feature = "async")
    );
    println!("max_depth: {}", ubjwire_codec::DEFAULT_MAX_DEPTH);
    println!(
        "max_message_size: {}",
        ubjwire_frame::DEFAULT_MAX_MESSAGE_SIZE
    );

    Ok(SUCCESS)
}
