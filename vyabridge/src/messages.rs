//! Messages carried by the bridge channels.
//!
//! Every time value crossing a channel is expressed in milliseconds (`f64`).
//! Conversion to seconds happens only inside the adapters, at the backend
//! boundary.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Identity of the component that published a message.
///
/// Consumers compare it against their own identity before acting, which is
/// what keeps a publisher from reacting to its own broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Originator {
    MediaBridge,
    AudioPlayer,
    ProgressBar,
}

impl Originator {
    /// Parses the identity used on the wire. Returns `None` for anything
    /// outside the closed set.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "MediaBridge" => Some(Originator::MediaBridge),
            "AudioPlayer" => Some(Originator::AudioPlayer),
            "ProgressBar" => Some(Originator::ProgressBar),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Originator::MediaBridge => "MediaBridge",
            Originator::AudioPlayer => "AudioPlayer",
            Originator::ProgressBar => "ProgressBar",
        }
    }
}

impl fmt::Display for Originator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `seekTime` channel payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeekTime {
    pub seek_to_ms: f64,
    pub originator: Originator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayCmd {
    Play,
    Pause,
    Stop,
}

/// `playPause` channel payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayPause {
    pub cmd: PlayCmd,
    pub playback: PlaybackDescriptor,
    pub originator: Originator,
}

/// Live position report read straight from a backend.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackInfo {
    pub is_playing: bool,
    pub current_time_ms: f64,
    pub duration_ms: f64,
    /// A play was requested and has not resolved yet, or was refused by the
    /// autoplay policy and waits for a user gesture.
    #[serde(default)]
    pub awaiting_start: bool,
}

impl PlaybackInfo {
    /// False until the backend knows its duration (NaN, infinite or zero).
    pub fn is_ready(&self) -> bool {
        self.duration_ms.is_finite() && self.duration_ms > 0.0 && self.current_time_ms.is_finite()
    }

    /// Played fraction in `[0, 1]`, or `None` while not ready.
    pub fn fraction(&self) -> Option<f64> {
        self.is_ready()
            .then(|| (self.current_time_ms / self.duration_ms).clamp(0.0, 1.0))
    }

    pub fn has_reached_end(&self) -> bool {
        self.is_ready() && self.current_time_ms >= self.duration_ms
    }
}

/// `heartbeat` channel payload.
///
/// A message without `current_playback_info` is a position request; the
/// active adapter answers with a message that carries it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub originator: Originator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_playback_info: Option<PlaybackInfo>,
}

impl Heartbeat {
    pub fn request(originator: Originator) -> Self {
        Self {
            originator,
            current_playback_info: None,
        }
    }

    pub fn echo(originator: Originator, info: PlaybackInfo) -> Self {
        Self {
            originator,
            current_playback_info: Some(info),
        }
    }
}

/// `playbackMeta` channel payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMeta {
    pub meta: PlaybackMetadata,
}

/// Now-playing metadata. Every field is optional so that partial updates can
/// be merged over what is already known.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(
        default,
        alias = "filePath",
        alias = "url",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artists: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,
}

impl PlaybackMetadata {
    /// Overlays `newer` on `self`: fields set in `newer` win, unset fields
    /// keep their previous value.
    pub fn merge(&mut self, newer: &PlaybackMetadata) {
        fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }

        overlay(&mut self.title, &newer.title);
        overlay(&mut self.duration, &newer.duration);
        overlay(&mut self.file_path, &newer.file_path);
        overlay(&mut self.artists, &newer.artists);
        overlay(&mut self.album, &newer.album);
        overlay(&mut self.artwork, &newer.artwork);
    }

    pub fn artist_line(&self) -> Option<String> {
        self.artists
            .as_ref()
            .filter(|artists| !artists.is_empty())
            .map(|artists| artists.join(", "))
    }
}

/// One playback intent as issued by the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackDescriptor {
    #[serde(default)]
    pub meta: PlaybackMetadata,
    /// Target state, when the server states one.
    #[serde(
        default,
        alias = "playing?",
        alias = "isPlaying",
        skip_serializing_if = "Option::is_none"
    )]
    pub playing: Option<bool>,
    /// Milliseconds already played when this descriptor was issued.
    #[serde(default)]
    pub elapsed: f64,
}

impl PlaybackDescriptor {
    pub fn locator(&self) -> Option<&str> {
        self.meta
            .file_path
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Logical playback clock derived from a descriptor.
///
/// Equivalent to `playbackBeganAt = now - elapsed`, kept as an anchor instant
/// plus an offset so that a large `elapsed` never underflows the clock.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackAnchor {
    anchored_at: Instant,
    elapsed_ms: f64,
}

impl PlaybackAnchor {
    pub fn new(elapsed_ms: f64) -> Self {
        let elapsed_ms = if elapsed_ms.is_finite() {
            elapsed_ms.max(0.0)
        } else {
            0.0
        };
        Self {
            anchored_at: Instant::now(),
            elapsed_ms,
        }
    }

    /// Where playback should be now, had it started when the anchor says.
    pub fn position_ms(&self) -> f64 {
        self.elapsed_ms + self.anchored_at.elapsed().as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_originator_wire_names() {
        assert_eq!(Originator::from_wire("MediaBridge"), Some(Originator::MediaBridge));
        assert_eq!(Originator::from_wire("ProgressBar"), Some(Originator::ProgressBar));
        assert_eq!(Originator::from_wire("SomethingElse"), None);
        assert_eq!(
            serde_json::to_value(Originator::AudioPlayer).unwrap(),
            json!("AudioPlayer")
        );
    }

    #[test]
    fn test_seek_time_uses_camel_case() {
        let msg = SeekTime {
            seek_to_ms: 2500.0,
            originator: Originator::ProgressBar,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"seekToMs": 2500.0, "originator": "ProgressBar"})
        );
    }

    #[test]
    fn test_descriptor_accepts_question_mark_key() {
        let desc: PlaybackDescriptor = serde_json::from_value(json!({
            "meta": {"file_path": "a.mp3"},
            "playing?": false,
            "elapsed": 5000
        }))
        .unwrap();
        assert_eq!(desc.locator(), Some("a.mp3"));
        assert_eq!(desc.playing, Some(false));
        assert_eq!(desc.elapsed, 5000.0);
    }

    #[test]
    fn test_metadata_merge_keeps_unspecified_fields() {
        let mut current = PlaybackMetadata {
            title: Some("Chapter 1".into()),
            artists: Some(vec!["Reader A".into()]),
            duration: Some(60_000.0),
            ..Default::default()
        };
        let update = PlaybackMetadata {
            title: Some("Chapter 2".into()),
            ..Default::default()
        };
        current.merge(&update);

        assert_eq!(current.title.as_deref(), Some("Chapter 2"));
        assert_eq!(current.artist_line().as_deref(), Some("Reader A"));
        assert_eq!(current.duration, Some(60_000.0));
    }

    #[test]
    fn test_playback_info_readiness() {
        let not_ready = PlaybackInfo {
            is_playing: true,
            current_time_ms: 10.0,
            duration_ms: f64::NAN,
            awaiting_start: false,
        };
        assert!(!not_ready.is_ready());
        assert_eq!(not_ready.fraction(), None);
        assert!(!not_ready.has_reached_end());

        let done = PlaybackInfo {
            is_playing: false,
            current_time_ms: 10_000.0,
            duration_ms: 10_000.0,
            awaiting_start: false,
        };
        assert!(done.has_reached_end());
        assert_eq!(done.fraction(), Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_anchor_advances_with_clock() {
        let anchor = PlaybackAnchor::new(5000.0);
        assert_eq!(anchor.position_ms(), 5000.0);
        tokio::time::advance(std::time::Duration::from_millis(250)).await;
        assert!((anchor.position_ms() - 5250.0).abs() < 1.0);
    }
}
