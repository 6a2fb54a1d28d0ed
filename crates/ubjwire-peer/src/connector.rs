use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};
use ubjwire_transport::UnixDomainSocket;

use crate::dispatch::{Dispatcher, Player};
use crate::error::{PeerError, Result};
use crate::session::{IpcSession, SessionConfig};

/// Default wait between connection attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Agent connection settings.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Wait between attempts while the controller is not listening.
    pub retry_interval: Duration,
    /// Give up after this many attempts; `None` retries until stopped.
    pub max_attempts: Option<u32>,
    pub session: SessionConfig,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
            session: SessionConfig::default(),
        }
    }
}

/// Connect to a controller and send the hello.
pub fn connect(path: impl AsRef<Path>, config: &ConnectConfig) -> Result<IpcSession> {
    connect_while(path.as_ref(), config, &AtomicBool::new(true))
}

/// Connect and wrap the session in an [`Agent`] driving `player`.
pub fn connect_agent<P: Player>(
    path: impl AsRef<Path>,
    config: &ConnectConfig,
    player: P,
) -> Result<Agent<P>> {
    let session = connect(path, config)?;
    Ok(Agent::new(session, player))
}

/// Retry until connected, out of attempts, or `running` is cleared.
fn connect_while(path: &Path, config: &ConnectConfig, running: &AtomicBool) -> Result<IpcSession> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match UnixDomainSocket::connect(path) {
            Ok(stream) => {
                let mut session = IpcSession::from_stream(stream, config.session.clone())?;
                session.hello()?;
                info!(path = %path.display(), attempt, "connected to controller");
                return Ok(session);
            }
            Err(err) if err.is_not_listening() => {
                let exhausted = config.max_attempts.is_some_and(|max| attempt >= max);
                if exhausted || !running.load(Ordering::SeqCst) {
                    return Err(err.into());
                }
                debug!(path = %path.display(), attempt, "controller not listening, retrying");
                thread::sleep(config.retry_interval);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// The agent's end of a session: answers commands from a controller.
pub struct Agent<P> {
    session: IpcSession,
    dispatcher: Dispatcher<P>,
}

impl<P: Player> Agent<P> {
    pub fn new(session: IpcSession, player: P) -> Self {
        Self {
            session,
            dispatcher: Dispatcher::new(player),
        }
    }

    /// Handle at most one message. Returns whether one was handled.
    ///
    /// Rejected commands are logged and the session continues; connection
    /// errors are returned.
    pub fn run_once(&mut self) -> Result<bool> {
        let Some(message) = self.session.poll()? else {
            return Ok(false);
        };
        match self.dispatcher.handle(message.as_bytes()) {
            Ok(Some(reply)) => self.session.send(&reply)?,
            Ok(None) => {}
            Err(err) if err.is_connection_error() => return Err(err),
            Err(err) => warn!(error = %err, "rejected message"),
        }
        Ok(true)
    }

    /// Handle messages until `running` is cleared or the connection fails.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        while running.load(Ordering::SeqCst) {
            self.run_once()?;
        }
        Ok(())
    }

    pub fn player(&self) -> &P {
        self.dispatcher.player()
    }

    pub fn session(&self) -> &IpcSession {
        &self.session
    }

    pub fn into_player(self) -> P {
        self.dispatcher.into_player()
    }
}

/// Keep an agent connected until `running` is cleared.
///
/// Each lost connection is followed by a new connection and a fresh hello.
/// Returns the player once stopped.
pub fn run_agent<P: Player>(
    path: impl AsRef<Path>,
    config: &ConnectConfig,
    mut player: P,
    running: &AtomicBool,
) -> Result<P> {
    let path = path.as_ref();
    while running.load(Ordering::SeqCst) {
        let session = match connect_while(path, config, running) {
            Ok(session) => session,
            Err(err) if !running.load(Ordering::SeqCst) => {
                debug!(error = %err, "stopped while connecting");
                break;
            }
            Err(err) => return Err(err),
        };

        let mut agent = Agent::new(session, player);
        let outcome = agent.run(running);
        player = agent.into_player();
        match outcome {
            Ok(()) => break,
            Err(err) if err.is_connection_error() => {
                warn!(error = %err, "connection lost, reconnecting");
                thread::sleep(config.retry_interval);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(player)
}

impl<P> std::fmt::Debug for Agent<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("state", &self.session.state())
            .finish_non_exhaustive()
    }
}

/// Whether `err` means the controller socket is not there (yet).
pub fn is_not_listening(err: &PeerError) -> bool {
    matches!(err, PeerError::Transport(transport) if transport.is_not_listening())
}
