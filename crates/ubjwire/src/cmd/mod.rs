use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ubjwire_codec::{CodecConfig, FloatOrder};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod agent;
pub mod ctl;
pub mod decode;
pub mod encode;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a controller: accept agents and keep them alive.
    Serve(ServeArgs),
    /// Accept one agent, send it one command, print the reply.
    Ctl(CtlArgs),
    /// Run an agent over an in-memory player.
    Agent(AgentArgs),
    /// Encode a JSON document as a message.
    Encode(EncodeArgs),
    /// Decode a message and print its tree.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Ctl(args) => ctl::run(args, format),
        Command::Agent(args) => agent::run(args),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Keepalive interval (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,
    /// How long a probe may go unanswered.
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub keepalive_timeout: Duration,
    /// Print playback status and position every interval.
    #[arg(long)]
    pub watch: bool,
    /// Exit after N keepalive rounds.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CtlArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Command name (play, pause, playpause, next, previous, stop, seek,
    /// setposition, playbackstatus, metadata, position).
    pub command: String,
    /// Offset in microseconds for seek and setposition.
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<i64>,
    /// Track id for setposition.
    #[arg(long)]
    pub track_id: Option<String>,
    /// How long to wait for an agent and for its reply.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub timeout: Duration,
}

#[derive(Args, Debug)]
pub struct AgentArgs {
    /// Controller socket path to connect to.
    pub path: PathBuf,
    /// Wait between connection attempts.
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub retry_interval: Duration,
    /// Give up after N failed connection attempts.
    #[arg(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Args, Debug, Default)]
pub struct FloatArgs {
    /// Read and write float payloads big-endian instead of host order.
    #[arg(long)]
    pub big_endian_floats: bool,
}

impl FloatArgs {
    pub fn codec_config(&self) -> CodecConfig {
        CodecConfig {
            float_order: if self.big_endian_floats {
                FloatOrder::BigEndian
            } else {
                FloatOrder::Native
            },
            ..CodecConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// JSON document to encode.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON document from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
    /// Use the narrowest integer marker instead of always int64.
    #[arg(long)]
    pub compact_ints: bool,
    #[command(flatten)]
    pub floats: FloatArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Message bytes as hex.
    #[arg(long, conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read message bytes from a file. Reads stdin when neither is given.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub floats: FloatArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
