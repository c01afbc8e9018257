//! Shared metadata shapes for both polling families
//!
//! A poll normalizes whatever the wire said into [`NowPlaying`]; the pool
//! merges that into a per-stream [`MetadataEntry`], which keeps a short
//! history of displaced songs so the request layer can show "previously
//! played" without any persistence.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// How many displaced songs a cache entry remembers.
pub const HISTORY_LIMIT: usize = 2;

/// One normalized poll result: the song a stream claims to be playing now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NowPlaying {
    pub artist: Option<String>,
    pub title: Option<String>,
    /// The unparsed title string as the stream sent it.
    pub raw: String,
}

impl NowPlaying {
    /// Build from a combined `"Artist - Title"` string.
    ///
    /// The split is on the first `" - "` only; a value with no separator
    /// becomes a title with no artist.
    pub fn from_stream_title(stream_title: &str) -> Self {
        match stream_title.split_once(" - ") {
            Some((artist, title)) => Self {
                artist: Some(artist.trim().to_string()),
                title: Some(title.trim().to_string()),
                raw: stream_title.to_string(),
            },
            None => Self {
                artist: None,
                title: Some(stream_title.to_string()),
                raw: stream_title.to_string(),
            },
        }
    }
}

/// A song that used to be current, kept in an entry's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistorySong {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Last-known metadata for one stream, plus its recent history.
///
/// Entries outlive their monitor on purpose: after `stop()` the entry stays
/// in the cache as a last-known value until a future monitor for the same
/// URL overwrites it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetadataEntry {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub raw: String,
    /// When this song was last confirmed by a poll.
    pub timestamp: DateTime<Utc>,
    /// Displaced songs, most recently displaced first, capped at
    /// [`HISTORY_LIMIT`].
    pub history: Vec<HistorySong>,
}

impl MetadataEntry {
    /// Entry for a stream polled for the first time. History starts empty.
    pub fn new(now: NowPlaying, at: DateTime<Utc>) -> Self {
        Self {
            artist: now.artist,
            title: now.title,
            raw: now.raw,
            timestamp: at,
            history: Vec::new(),
        }
    }

    /// Whether a poll result is the same song as this entry.
    ///
    /// Song identity is the `(artist, title)` pair; `raw` and timestamps do
    /// not participate.
    pub fn is_same_song(&self, now: &NowPlaying) -> bool {
        self.artist == now.artist && self.title == now.title
    }

    /// Merge a fresh poll result into the entry.
    ///
    /// An identical song only refreshes `timestamp` and `raw` and leaves
    /// the history untouched. A different song displaces the current one
    /// into the front of the history (truncated to [`HISTORY_LIMIT`]) and
    /// replaces the current fields. Returns whether the song changed.
    pub fn update(&mut self, now: NowPlaying, at: DateTime<Utc>) -> bool {
        if self.is_same_song(&now) {
            self.timestamp = at;
            self.raw = now.raw;
            return false;
        }

        self.history.insert(
            0,
            HistorySong {
                artist: self.artist.take(),
                title: self.title.take(),
                timestamp: self.timestamp,
            },
        );
        self.history.truncate(HISTORY_LIMIT);

        self.artist = now.artist;
        self.title = now.title;
        self.raw = now.raw;
        self.timestamp = at;
        true
    }
}
