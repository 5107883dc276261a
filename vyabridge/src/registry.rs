//! The fixed set of bridge channels shared by one page session.

use crate::channel::EventChannel;
use crate::messages::{Heartbeat, PlayPause, PlaybackMeta, SeekTime};

pub const SEEK_TIME: &str = "seekTime";
pub const PLAY_PAUSE: &str = "playPause";
pub const HEARTBEAT: &str = "heartbeat";
pub const PLAYBACK_META: &str = "playbackMeta";

/// Channel registry. Built once per page session and handed to every
/// component at construction; clones share the same channels.
#[derive(Clone)]
pub struct Bridges {
    pub seek_time: EventChannel<SeekTime>,
    pub play_pause: EventChannel<PlayPause>,
    pub heartbeat: EventChannel<Heartbeat>,
    pub playback_meta: EventChannel<PlaybackMeta>,
}

impl Bridges {
    pub fn new() -> Self {
        Self {
            seek_time: EventChannel::new(SEEK_TIME),
            play_pause: EventChannel::new(PLAY_PAUSE),
            heartbeat: EventChannel::new(HEARTBEAT),
            playback_meta: EventChannel::new(PLAYBACK_META),
        }
    }
}

impl Default for Bridges {
    fn default() -> Self {
        Self::new()
    }
}
