use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tracing::warn;
use ubjwire_codec::Value;
use ubjwire_peer::{Command, Metadata, PlaybackStatus, Reply};

use crate::json::{flatten, from_value, to_hex};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    command: &'a str,
    #[serde(flatten)]
    reply: &'a Reply,
}

/// Print a command reply. Raw output re-encodes it as a message.
pub fn print_reply(command: &Command, reply: &Reply, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                command: command.name(),
                reply,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in reply_rows(reply) {
                table.add_row(vec![field, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = reply_rows(reply)
                .into_iter()
                .map(|(field, value)| format!("{field}={value}"))
                .collect();
            println!("{} {}", command.name(), fields.join(" "));
        }
        OutputFormat::Raw => match reply.encode() {
            Ok(bytes) => print_raw(&bytes),
            Err(err) => warn!(error = %err, "reply could not be re-encoded"),
        },
    }
}

fn reply_rows(reply: &Reply) -> Vec<(String, String)> {
    match reply {
        Reply::Status(status) => vec![("status".into(), status.as_str().into())],
        Reply::Position(position) => vec![("position".into(), position.to_string())],
        Reply::Metadata(meta) if meta.is_nothing_playing() => {
            vec![("id".into(), meta.id.clone())]
        }
        Reply::Metadata(meta) => metadata_rows(meta),
    }
}

fn metadata_rows(meta: &Metadata) -> Vec<(String, String)> {
    vec![
        ("id".into(), meta.id.clone()),
        ("title".into(), meta.title.clone()),
        ("artist".into(), meta.artist.join(", ")),
        ("album".into(), meta.album.clone()),
        ("date".into(), meta.date.clone()),
        ("tracknumber".into(), meta.track_number.to_string()),
        ("length".into(), meta.length.to_string()),
        ("artUrl".into(), meta.art_url.clone()),
    ]
}

#[derive(Serialize)]
struct WatchOutput {
    status: PlaybackStatus,
    position: i64,
    timestamp: String,
}

/// One line of `serve --watch` output.
pub fn print_watch(status: PlaybackStatus, position: i64, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = WatchOutput {
                status,
                position,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["STATUS", "POSITION"]);
            table.add_row(vec![status.as_str().to_string(), position.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("status={} position={position}", status.as_str());
        }
    }
}

/// Print a decoded tree.
pub fn print_value(value: &Value, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", from_value(value)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PATH", "TYPE", "VALUE"]);
            for (path, ty, shown) in flatten(value) {
                table.add_row(vec![path, ty.to_string(), shown]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(&from_value(value)).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Raw => print_raw(raw),
    }
}

/// Print encoded message bytes, as hex unless raw output was asked for.
pub fn print_bytes(bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Raw => print_raw(bytes),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "size": bytes.len(), "hex": to_hex(bytes) })
        ),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", to_hex(bytes)),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
