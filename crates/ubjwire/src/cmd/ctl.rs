use tracing::debug;
use ubjwire_peer::{Command, ControllerListener, SessionConfig};

use crate::cmd::CtlArgs;
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: CtlArgs, format: OutputFormat) -> CliResult<i32> {
    let command = Command::from_parts(&args.command, args.offset, args.track_id.clone())
        .map_err(|err| CliError::new(USAGE, format!("invalid command: {err}")))?;

    let session_config = SessionConfig {
        request_timeout: args.timeout,
        ..SessionConfig::default()
    };
    let listener = ControllerListener::bind(&args.path)
        .map_err(|err| peer_error("bind failed", err))?
        .with_session_config(session_config);

    let mut controller = listener
        .accept_timeout(args.timeout)
        .map_err(|err| peer_error("accept failed", err))?
        .ok_or_else(|| {
            CliError::new(
                TIMEOUT,
                format!("no agent connected within {:?}", args.timeout),
            )
        })?;

    debug!(%command, "sending");
    let reply = controller
        .execute(&command)
        .map_err(|err| peer_error("command failed", err))?;
    if let Some(reply) = reply {
        print_reply(&command, &reply, format);
    }

    controller
        .shutdown()
        .map_err(|err| peer_error("shutdown failed", err))?;
    Ok(SUCCESS)
}
