//! Agent-side command handling.

use bytes::Bytes;
use tracing::{debug, info};

use crate::command::{Command, Metadata, PlaybackStatus, Reply};
use crate::error::Result;

/// The media player an agent drives.
///
/// Times are microseconds.
pub trait Player {
    fn play(&mut self);
    fn pause(&mut self);
    fn play_pause(&mut self);
    fn next(&mut self);
    fn previous(&mut self);
    fn stop(&mut self);
    /// Move by a signed delta from the current position.
    fn seek(&mut self, offset: i64);
    /// Move to an absolute position in the current track.
    fn set_position(&mut self, position: i64);
    fn playback_status(&self) -> PlaybackStatus;
    /// The current track, or `None` when nothing is playing.
    fn metadata(&self) -> Option<Metadata>;
    fn position(&self) -> i64;
}

/// Applies received commands to a [`Player`].
#[derive(Debug)]
pub struct Dispatcher<P> {
    player: P,
}

impl<P: Player> Dispatcher<P> {
    pub fn new(player: P) -> Self {
        Self { player }
    }

    /// Handle one command message and return the encoded reply, if the
    /// command has one.
    ///
    /// A rejected message leaves the player untouched.
    pub fn handle(&mut self, bytes: &[u8]) -> Result<Option<Bytes>> {
        let command = Command::decode(bytes)?;
        debug!(%command, "dispatching");
        match self.apply(command) {
            Some(reply) => Ok(Some(reply.encode()?)),
            None => Ok(None),
        }
    }

    /// Apply a decoded command.
    pub fn apply(&mut self, command: Command) -> Option<Reply> {
        let player = &mut self.player;
        match command {
            Command::Play => player.play(),
            Command::Pause => player.pause(),
            Command::PlayPause => player.play_pause(),
            Command::Next => player.next(),
            Command::Previous => player.previous(),
            Command::Stop => player.stop(),
            Command::Seek { offset } => player.seek(offset),
            Command::SetPosition { track_id, offset } => {
                let current = player.metadata().map(|meta| meta.id);
                if current.as_deref() == Some(track_id.as_str()) {
                    player.set_position(offset);
                } else {
                    info!(
                        requested = %track_id,
                        current = current.as_deref().unwrap_or("-"),
                        "ignoring setposition for a track that is not current"
                    );
                }
            }
            Command::PlaybackStatus => return Some(Reply::Status(player.playback_status())),
            Command::Metadata => {
                let meta = player.metadata().unwrap_or_else(Metadata::nothing_playing);
                return Some(Reply::Metadata(meta));
            }
            Command::Position => return Some(Reply::Position(player.position())),
        }
        None
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn into_player(self) -> P {
        self.player
    }
}

/// A player that keeps its state in memory: a playlist, a cursor into it,
/// and a position.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlayer {
    tracks: Vec<Metadata>,
    current: usize,
    status: PlaybackStatus,
    position: i64,
}

impl MemoryPlayer {
    pub fn new(tracks: Vec<Metadata>) -> Self {
        Self {
            tracks,
            ..Self::default()
        }
    }

    /// A small fixed playlist.
    pub fn demo() -> Self {
        let track = |n: i16, title: &str, length_secs: i64, artist: &[&str]| Metadata {
            id: format!("/org/ubjwire/track/{n}"),
            length: length_secs * 1_000_000,
            art_url: String::new(),
            album: "Demo Sessions".to_string(),
            artist: artist.iter().map(|a| a.to_string()).collect(),
            date: "2024".to_string(),
            title: title.to_string(),
            track_number: n,
        };
        Self::new(vec![
            track(1, "Opening", 185, &["Ada", "Brook"]),
            track(2, "Interlude", 64, &[]),
            track(3, "Closing", 242, &["Ada"]),
        ])
    }

    pub fn current_track(&self) -> Option<&Metadata> {
        self.tracks.get(self.current)
    }

    fn clamp_to_track(&self, position: i64) -> i64 {
        let length = self.current_track().map_or(0, |track| track.length);
        position.clamp(0, length.max(0))
    }

    fn change_track(&mut self, index: usize) {
        self.current = index;
        self.position = 0;
    }
}

impl Player for MemoryPlayer {
    fn play(&mut self) {
        if !self.tracks.is_empty() {
            self.status = PlaybackStatus::Playing;
        }
    }

    fn pause(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.status = PlaybackStatus::Paused;
        }
    }

    fn play_pause(&mut self) {
        match self.status {
            PlaybackStatus::Playing => self.status = PlaybackStatus::Paused,
            _ => self.play(),
        }
    }

    fn next(&mut self) {
        if !self.tracks.is_empty() {
            self.change_track((self.current + 1) % self.tracks.len());
        }
    }

    fn previous(&mut self) {
        self.change_track(self.current.saturating_sub(1));
    }

    fn stop(&mut self) {
        self.status = PlaybackStatus::Stopped;
        self.position = 0;
    }

    fn seek(&mut self, offset: i64) {
        self.position = self.clamp_to_track(self.position.saturating_add(offset));
    }

    fn set_position(&mut self, position: i64) {
        self.position = self.clamp_to_track(position);
    }

    fn playback_status(&self) -> PlaybackStatus {
        self.status
    }

    fn metadata(&self) -> Option<Metadata> {
        if self.status == PlaybackStatus::Stopped {
            return None;
        }
        self.current_track().cloned()
    }

    fn position(&self) -> i64 {
        self.position
    }
}
