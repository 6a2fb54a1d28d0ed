use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};
use ubjwire_peer::{Controller, ControllerListener, SessionConfig};

use crate::cmd::{install_ctrlc_handler, ServeArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::{print_watch, OutputFormat};

const ACCEPT_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let session_config = SessionConfig {
        keepalive_interval: args.interval,
        keepalive_timeout: args.keepalive_timeout,
        ..SessionConfig::default()
    };
    let listener = ControllerListener::bind(&args.path)
        .map_err(|err| peer_error("bind failed", err))?
        .with_session_config(session_config);
    info!(path = %listener.path().display(), "controller listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut rounds = 0usize;
    while running.load(Ordering::SeqCst) {
        let mut controller = match listener.accept_timeout(ACCEPT_SLICE) {
            Ok(Some(controller)) => controller,
            Ok(None) => continue,
            Err(err) if err.is_connection_error() => {
                warn!(error = %err, "accept failed, waiting for the next agent");
                continue;
            }
            Err(err) => return Err(peer_error("accept failed", err)),
        };

        while running.load(Ordering::SeqCst) {
            if let Err(err) = round(&mut controller, &args, format) {
                if err.is_connection_error() {
                    warn!(error = %err, "agent lost, waiting for the next one");
                    break;
                }
                warn!(error = %err, "agent sent an unexpected reply");
            }

            rounds = rounds.saturating_add(1);
            if args.count.is_some_and(|count| rounds >= count) {
                let _ = controller.shutdown();
                return Ok(SUCCESS);
            }
            sleep_while(&running, args.interval);
        }
    }

    Ok(SUCCESS)
}

fn round(
    controller: &mut Controller,
    args: &ServeArgs,
    format: OutputFormat,
) -> ubjwire_peer::Result<()> {
    controller.keepalive()?;
    if args.watch {
        let status = controller.playback_status()?;
        let position = controller.position()?;
        print_watch(status, position, format);
    }
    Ok(())
}

fn sleep_while(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(ACCEPT_SLICE));
    }
}
