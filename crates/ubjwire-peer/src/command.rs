//! Command vocabulary and reply payloads.
//!
//! A command is an object whose first key is `command`. Any further fields
//! follow in a fixed order and are read by position: a field whose key does
//! not match the expected name rejects the whole message, even when its type
//! is right.
//!
//! `hello` and `ping` are not listed here. They are fixed byte sequences and
//! are compared, not parsed (see [`crate::handshake`] and
//! [`crate::keepalive`]).

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;
use ubjwire_codec::{ArrayLen, CodecError, Context, Extract, ValueType};

use crate::error::ProtocolError;

type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Wire type of a command field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// One entry of [`COMMAND_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    /// Fields after `command`, in wire order.
    pub fields: &'static [FieldSpec],
    /// Whether the agent answers with a reply object.
    pub reply: bool,
}

impl CommandSpec {
    const fn bare(name: &'static str) -> Self {
        Self {
            name,
            fields: &[],
            reply: false,
        }
    }

    const fn query(name: &'static str) -> Self {
        Self {
            name,
            fields: &[],
            reply: true,
        }
    }
}

const OFFSET: FieldSpec = FieldSpec {
    name: "offset",
    kind: FieldKind::Int64,
};
const TRACK_ID: FieldSpec = FieldSpec {
    name: "track_id",
    kind: FieldKind::String,
};

const PLAY: CommandSpec = CommandSpec::bare("play");
const PAUSE: CommandSpec = CommandSpec::bare("pause");
const PLAY_PAUSE: CommandSpec = CommandSpec::bare("playpause");
const NEXT: CommandSpec = CommandSpec::bare("next");
const PREVIOUS: CommandSpec = CommandSpec::bare("previous");
const STOP: CommandSpec = CommandSpec::bare("stop");
const SEEK: CommandSpec = CommandSpec {
    name: "seek",
    fields: &[OFFSET],
    reply: false,
};
const SET_POSITION: CommandSpec = CommandSpec {
    name: "setposition",
    fields: &[TRACK_ID, OFFSET],
    reply: false,
};
const PLAYBACK_STATUS: CommandSpec = CommandSpec::query("playbackstatus");
const METADATA: CommandSpec = CommandSpec::query("metadata");
const POSITION: CommandSpec = CommandSpec::query("position");

/// Every command an agent understands.
pub const COMMAND_TABLE: &[CommandSpec] = &[
    PLAY,
    PAUSE,
    PLAY_PAUSE,
    NEXT,
    PREVIOUS,
    STOP,
    SEEK,
    SET_POSITION,
    PLAYBACK_STATUS,
    METADATA,
    POSITION,
];

/// Look up a command by its exact wire name.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMAND_TABLE.iter().find(|spec| spec.name == name)
}

/// A command sent from the controller to the agent.
///
/// Offsets and positions are microseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
    Stop,
    /// Relative seek by a signed delta.
    Seek { offset: i64 },
    /// Absolute seek, ignored unless `track_id` is the current track.
    SetPosition { track_id: String, offset: i64 },
    PlaybackStatus,
    Metadata,
    Position,
}

impl Command {
    pub fn spec(&self) -> &'static CommandSpec {
        match self {
            Command::Play => &PLAY,
            Command::Pause => &PAUSE,
            Command::PlayPause => &PLAY_PAUSE,
            Command::Next => &NEXT,
            Command::Previous => &PREVIOUS,
            Command::Stop => &STOP,
            Command::Seek { .. } => &SEEK,
            Command::SetPosition { .. } => &SET_POSITION,
            Command::PlaybackStatus => &PLAYBACK_STATUS,
            Command::Metadata => &METADATA,
            Command::Position => &POSITION,
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    pub fn expects_reply(&self) -> bool {
        self.spec().reply
    }

    /// Build a command from its name and optional arguments, as given on a
    /// command line.
    pub fn from_parts(
        name: &str,
        offset: Option<i64>,
        track_id: Option<String>,
    ) -> ProtocolResult<Self> {
        let need_offset = || offset.ok_or(ProtocolError::MissingField(OFFSET.name));
        let command = match name {
            "play" => Command::Play,
            "pause" => Command::Pause,
            "playpause" => Command::PlayPause,
            "next" => Command::Next,
            "previous" => Command::Previous,
            "stop" => Command::Stop,
            "seek" => Command::Seek {
                offset: need_offset()?,
            },
            "setposition" => Command::SetPosition {
                track_id: track_id.ok_or(ProtocolError::MissingField(TRACK_ID.name))?,
                offset: need_offset()?,
            },
            "playbackstatus" => Command::PlaybackStatus,
            "metadata" => Command::Metadata,
            "position" => Command::Position,
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Render the command with the construction cursor.
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut ctx = Context::new();
        ctx.create_object()?;
        ctx.add_kv_pair_string("command", self.name())?;
        match self {
            Command::Seek { offset } => ctx.add_kv_pair_int64(OFFSET.name, *offset)?,
            Command::SetPosition { track_id, offset } => {
                ctx.add_kv_pair_string(TRACK_ID.name, track_id)?;
                ctx.add_kv_pair_int64(OFFSET.name, *offset)?;
            }
            _ => {}
        }
        ctx.render_creation()?;
        Ok(Bytes::from(ctx.take_output()))
    }

    /// Parse a received command. Fields after the last expected one are
    /// ignored.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let mut fields = FieldReader::parse(bytes)?;
        let name: String = fields.field("command")?;
        let command = match name.as_str() {
            "seek" => Command::Seek {
                offset: fields.field(OFFSET.name)?,
            },
            "setposition" => {
                let track_id = fields.field(TRACK_ID.name)?;
                let offset = fields.field(OFFSET.name)?;
                Command::SetPosition { track_id, offset }
            }
            other => Command::from_parts(other, None, None)?,
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Player state as reported by `playbackstatus`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::Stopped => "Stopped",
        }
    }

    /// Anything other than `Playing` or `Paused` reads as stopped.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "Playing" => PlaybackStatus::Playing,
            "Paused" => PlaybackStatus::Paused,
            "Stopped" => PlaybackStatus::Stopped,
            other => {
                debug!(status = other, "unrecognised playback status");
                PlaybackStatus::Stopped
            }
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Track id sent alone when nothing is playing.
pub const NOTHING_PLAYING_ID: &str = "/";

/// Current track, as reported by `metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub id: String,
    /// Track length in microseconds.
    pub length: i64,
    #[serde(rename = "artUrl")]
    pub art_url: String,
    pub album: String,
    pub artist: Vec<String>,
    pub date: String,
    pub title: String,
    pub track_number: i16,
}

impl Metadata {
    pub fn nothing_playing() -> Self {
        Self {
            id: NOTHING_PLAYING_ID.to_string(),
            ..Self::default()
        }
    }

    pub fn is_nothing_playing(&self) -> bool {
        self.id == NOTHING_PLAYING_ID
    }
}

/// An agent's answer to a query command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reply {
    Status(PlaybackStatus),
    Metadata(Metadata),
    /// Playback position in microseconds.
    Position(i64),
}

impl Reply {
    pub fn encode(&self) -> Result<Bytes, CodecError> {
        let mut ctx = Context::new();
        ctx.create_object()?;
        match self {
            Reply::Status(status) => ctx.add_kv_pair_string("status", status.as_str())?,
            Reply::Position(position) => ctx.add_kv_pair_int64("position", *position)?,
            Reply::Metadata(meta) if meta.is_nothing_playing() => {
                ctx.add_kv_pair_string("id", NOTHING_PLAYING_ID)?;
            }
            Reply::Metadata(meta) => {
                ctx.add_kv_pair_string("id", &meta.id)?;
                ctx.add_kv_pair_int64("length", meta.length)?;
                ctx.add_kv_pair_string("artUrl", &meta.art_url)?;
                ctx.add_kv_pair_string("album", &meta.album)?;
                ctx.add_kv_pair_array("artist")?;
                ctx.enter_collection()?;
                for artist in &meta.artist {
                    ctx.add_string(artist)?;
                }
                ctx.exit_collection()?;
                ctx.add_kv_pair_string("date", &meta.date)?;
                ctx.add_kv_pair_string("title", &meta.title)?;
                ctx.add_kv_pair_int16("track_number", meta.track_number)?;
            }
        }
        ctx.render_creation()?;
        Ok(Bytes::from(ctx.take_output()))
    }

    /// Parse the reply to `command`.
    pub fn decode(command: &Command, bytes: &[u8]) -> ProtocolResult<Self> {
        let mut fields = FieldReader::parse(bytes)?;
        let reply = match command {
            Command::PlaybackStatus => {
                let status: String = fields.field("status")?;
                Reply::Status(PlaybackStatus::from_wire(&status))
            }
            Command::Position => Reply::Position(fields.field("position")?),
            Command::Metadata => Reply::Metadata(decode_metadata(&mut fields)?),
            other => {
                return Err(ProtocolError::UnexpectedReply {
                    command: other.name(),
                })
            }
        };
        Ok(reply)
    }
}

fn decode_metadata(fields: &mut FieldReader) -> ProtocolResult<Metadata> {
    let id: String = fields.field("id")?;
    if id == NOTHING_PLAYING_ID {
        return Ok(Metadata::nothing_playing());
    }
    Ok(Metadata {
        id,
        length: fields.field("length")?,
        art_url: fields.field("artUrl")?,
        album: fields.field("album")?,
        artist: fields.string_array("artist")?,
        date: fields.field("date")?,
        title: fields.field("title")?,
        track_number: fields.field("track_number")?,
    })
}

/// Positional reader over the entries of a parsed object.
struct FieldReader {
    ctx: Context,
    started: bool,
}

impl FieldReader {
    fn parse(bytes: &[u8]) -> ProtocolResult<Self> {
        let mut ctx = Context::new();
        ctx.parse(bytes)?;
        let found = ctx.collection_type()?;
        if found != ValueType::Object {
            return Err(CodecError::WrongCollection {
                expected: ValueType::Object,
                found,
            }
            .into());
        }
        Ok(Self {
            ctx,
            started: false,
        })
    }

    /// Move to the next entry, which must be named `name`.
    fn advance(&mut self, name: &'static str) -> ProtocolResult<()> {
        if self.started {
            match self.ctx.next_value() {
                Ok(()) => {}
                Err(CodecError::EndOfCollection { .. } | CodecError::EmptyCollection) => {
                    return Err(ProtocolError::MissingField(name))
                }
                Err(err) => return Err(err.into()),
            }
        } else if self.ctx.is_empty()? {
            return Err(ProtocolError::MissingField(name));
        }
        self.started = true;

        let key = self.ctx.current_key()?;
        if key != name.as_bytes() {
            return Err(ProtocolError::UnexpectedField {
                expected: name,
                found: String::from_utf8_lossy(key).into_owned(),
            });
        }
        Ok(())
    }

    fn field<T>(&mut self, name: &'static str) -> ProtocolResult<T>
    where
        T: for<'a> Extract<'a>,
    {
        self.advance(name)?;
        self.ctx
            .read_kv_pair_as::<T>()
            .map(|(_, value)| value)
            .map_err(|source| ProtocolError::InvalidValue { field: name, source })
    }

    fn string_array(&mut self, name: &'static str) -> ProtocolResult<Vec<String>> {
        let ArrayLen(len) = self.field::<ArrayLen>(name)?;
        let mut items = Vec::with_capacity(len);
        self.ctx.enter_collection()?;
        for i in 0..len {
            if i > 0 {
                self.ctx.next_value()?;
            }
            let item = self
                .ctx
                .read_as::<String>()
                .map_err(|source| ProtocolError::InvalidValue { field: name, source })?;
            items.push(item);
        }
        self.ctx.exit_collection()?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> Metadata {
        Metadata {
            id: "/0f343b0931126a20f133d67c2b018a3b".into(),
            length: 245_000_000,
            art_url: String::new(),
            album: "Blue Train".into(),
            artist: vec!["A".into(), "B".into(), "C".into()],
            date: "1957".into(),
            title: "Moment's Notice".into(),
            track_number: 2,
        }
    }

    #[test]
    fn table_lists_every_command_once() {
        for spec in COMMAND_TABLE {
            assert_eq!(lookup(spec.name), Some(spec));
        }
        assert_eq!(COMMAND_TABLE.len(), 11);
        assert!(lookup("hello").is_none());
        assert!(lookup("Play").is_none());
    }

    #[test]
    fn seek_encodes_fields_in_order() {
        let bytes = Command::Seek { offset: 5_000_000 }.encode().unwrap();
        assert_eq!(
            bytes.as_ref(),
            b"{i\x07commandSi\x04seeki\x06offsetL\x00\x00\x00\x00\x00\x4c\x4b\x40}"
        );
        assert_eq!(
            Command::decode(&bytes).unwrap(),
            Command::Seek { offset: 5_000_000 }
        );
    }

    #[test]
    fn every_command_decodes_from_its_encoding() {
        let commands = [
            Command::Play,
            Command::Pause,
            Command::PlayPause,
            Command::Next,
            Command::Previous,
            Command::Stop,
            Command::Seek { offset: -3_000_000 },
            Command::SetPosition {
                track_id: "/abc".into(),
                offset: 1_000,
            },
            Command::PlaybackStatus,
            Command::Metadata,
            Command::Position,
        ];
        for command in commands {
            let bytes = command.encode().unwrap();
            assert_eq!(Command::decode(&bytes).unwrap(), command);
        }
    }

    #[test]
    fn wrong_field_name_is_rejected() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_string("command", "seek").unwrap();
        ctx.add_kv_pair_int64("ofset", 10).unwrap();
        ctx.render_creation().unwrap();

        let err = Command::decode(ctx.output()).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedField { expected: "offset", ref found } if found == "ofset"
        ));
    }

    #[test]
    fn fields_are_positional() {
        let mut ctx = Context::new();
        ctx.create_object().unwrap();
        ctx.add_kv_pair_string("command", "setposition").unwrap();
        ctx.add_kv_pair_int64("offset", 10).unwrap();
        ctx.add_kv_pair_string("track_id", "/abc").unwrap();
        ctx.render_creation().unwrap();

        assert!(matches!(
            Command::decode(ctx.output()),
            Err(ProtocolError::UnexpectedField {
                expected: "track_id",
                ..
            })
        ));
    }

    #[test]
    fn wrong_field_type_and_missing_field() {
        let wrong_type = b"{i\x07commandSi\x04seeki\x06offsetSi\x01x}";
        assert!(matches!(
            Command::decode(wrong_type),
            Err(ProtocolError::InvalidValue {
                field: "offset",
                source: CodecError::TypeMismatch { .. }
            })
        ));

        let missing = b"{i\x07commandSi\x04seek}";
        assert!(matches!(
            Command::decode(missing),
            Err(ProtocolError::MissingField("offset"))
        ));
    }

    #[test]
    fn unknown_and_malformed_commands() {
        assert!(matches!(
            Command::decode(b"{i\x07commandSi\x04jump}"),
            Err(ProtocolError::UnknownCommand(ref name)) if name == "jump"
        ));
        assert!(matches!(
            Command::decode(b"{}"),
            Err(ProtocolError::MissingField("command"))
        ));
        assert!(matches!(
            Command::decode(b"[Si\x04play]"),
            Err(ProtocolError::Malformed(CodecError::WrongCollection { .. }))
        ));
        assert!(matches!(
            Command::decode(b"{i\x07command"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn from_parts_requires_arguments() {
        assert_eq!(
            Command::from_parts("seek", Some(7), None).unwrap(),
            Command::Seek { offset: 7 }
        );
        assert!(matches!(
            Command::from_parts("setposition", Some(7), None),
            Err(ProtocolError::MissingField("track_id"))
        ));
        assert!(Command::from_parts("rewind", None, None).is_err());
    }

    #[test]
    fn status_reply_roundtrip() {
        let reply = Reply::Status(PlaybackStatus::Paused);
        let bytes = reply.encode().unwrap();
        assert_eq!(bytes.as_ref(), b"{i\x06statusSi\x06Paused}");
        assert_eq!(Reply::decode(&Command::PlaybackStatus, &bytes).unwrap(), reply);
    }

    #[test]
    fn unknown_status_reads_as_stopped() {
        let reply = Reply::decode(&Command::PlaybackStatus, b"{i\x06statusSi\x04Busy}").unwrap();
        assert_eq!(reply, Reply::Status(PlaybackStatus::Stopped));
    }

    #[test]
    fn metadata_reply_keeps_artist_order() {
        let reply = Reply::Metadata(sample_metadata());
        let bytes = reply.encode().unwrap();
        let decoded = Reply::decode(&Command::Metadata, &bytes).unwrap();
        let Reply::Metadata(meta) = decoded else {
            panic!("expected metadata reply");
        };
        assert_eq!(meta.artist, ["A", "B", "C"]);
        assert_eq!(meta, sample_metadata());
    }

    #[test]
    fn metadata_with_no_artists() {
        let meta = Metadata {
            artist: Vec::new(),
            ..sample_metadata()
        };
        let bytes = Reply::Metadata(meta.clone()).encode().unwrap();
        assert_eq!(
            Reply::decode(&Command::Metadata, &bytes).unwrap(),
            Reply::Metadata(meta)
        );
    }

    #[test]
    fn nothing_playing_is_id_alone() {
        let bytes = Reply::Metadata(Metadata::nothing_playing()).encode().unwrap();
        assert_eq!(bytes.as_ref(), b"{i\x02idSi\x01/}");
        let Reply::Metadata(meta) = Reply::decode(&Command::Metadata, &bytes).unwrap() else {
            panic!("expected metadata reply");
        };
        assert!(meta.is_nothing_playing());
    }

    #[test]
    fn position_reply_and_reply_mismatch() {
        let bytes = Reply::Position(12_500_000).encode().unwrap();
        assert_eq!(
            Reply::decode(&Command::Position, &bytes).unwrap(),
            Reply::Position(12_500_000)
        );
        assert!(matches!(
            Reply::decode(&Command::Play, &bytes),
            Err(ProtocolError::UnexpectedReply { command: "play" })
        ));
        assert!(matches!(
            Reply::decode(&Command::PlaybackStatus, &bytes),
            Err(ProtocolError::UnexpectedField {
                expected: "status",
                ..
            })
        ));
    }
}
