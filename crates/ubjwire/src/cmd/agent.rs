use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;
use ubjwire_peer::{run_agent, ConnectConfig, MemoryPlayer, Player};

use crate::cmd::{install_ctrlc_handler, AgentArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};

pub fn run(args: AgentArgs) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let config = ConnectConfig {
        retry_interval: args.retry_interval,
        max_attempts: args.max_attempts,
        ..ConnectConfig::default()
    };
    let player = run_agent(&args.path, &config, MemoryPlayer::demo(), &running)
        .map_err(|err| peer_error("agent failed", err))?;

    info!(
        status = %player.playback_status(),
        position = player.position(),
        "agent stopped"
    );
    Ok(SUCCESS)
}
