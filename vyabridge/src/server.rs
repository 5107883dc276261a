//! Contract with the server-rendered process that owns canonical playback
//! state: commands it pushes to the client, and the side channel used to send
//! events back.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::messages::{Originator, PlayCmd, PlaybackDescriptor, PlaybackMetadata};
use crate::timeline::SegmentEvent;

/// Outbound side channel toward the server process.
pub trait ServerLink: Send + Sync {
    /// Sends `event` with `payload` to the server.
    fn push_event(&self, event: &str, payload: Value) -> Result<()>;

    /// Sends `event` to a specific component of the server-side view.
    fn push_event_to(&self, target: &str, event: &str, payload: Value) -> Result<()> {
        let _ = target;
        self.push_event(event, payload)
    }
}

/// Command pushed by the server, decoded from its event name and payload.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerCommand {
    PlayPause {
        cmd: PlayCmd,
        playback: PlaybackDescriptor,
        originator: Option<Originator>,
    },
    SeekTime {
        seek_to_ms: f64,
        originator: Option<Originator>,
    },
    RegisterEventsTimeline(Vec<SegmentEvent>),
    RegisterPlayback(PlaybackMetadata),
    ToggleFollowMode,
    InitSession(Value),
    Stop,
}

#[derive(Deserialize)]
struct PlayPausePayload {
    cmd: PlayCmd,
    #[serde(default)]
    playback: PlaybackDescriptor,
    #[serde(default)]
    originator: Option<String>,
}

#[derive(Deserialize)]
struct SeekTimePayload {
    #[serde(alias = "seekToMs", alias = "target_ms", alias = "positionMs")]
    seek_to_ms: f64,
    #[serde(default)]
    originator: Option<String>,
}

#[derive(Deserialize)]
struct TimelinePayload {
    #[serde(alias = "voice_events", alias = "events_timeline")]
    events: Vec<SegmentEvent>,
}

#[derive(Deserialize)]
struct RegisterPlaybackPayload {
    #[serde(alias = "playback")]
    meta: PlaybackMetadata,
}

impl ServerCommand {
    /// Decodes a pushed event.
    ///
    /// An originator outside the known set is reported with a warning and the
    /// command is still returned, with `originator` set to `None`.
    pub fn decode(event: &str, payload: Value) -> Result<Self> {
        match event {
            "play_pause" => {
                let p: PlayPausePayload = serde_json::from_value(payload)
                    .map_err(|e| Error::invalid_payload(event, e))?;
                Ok(ServerCommand::PlayPause {
                    cmd: p.cmd,
                    playback: p.playback,
                    originator: wire_originator(event, p.originator.as_deref()),
                })
            }
            "seekTime" => {
                let p: SeekTimePayload = serde_json::from_value(payload)
                    .map_err(|e| Error::invalid_payload(event, e))?;
                Ok(ServerCommand::SeekTime {
                    seek_to_ms: p.seek_to_ms,
                    originator: wire_originator(event, p.originator.as_deref()),
                })
            }
            "registerEventsTimeline" => {
                let p: TimelinePayload = serde_json::from_value(payload)
                    .map_err(|e| Error::invalid_payload(event, e))?;
                Ok(ServerCommand::RegisterEventsTimeline(p.events))
            }
            "registerPlayback" => {
                // accept either {meta: {...}} or the bare metadata object
                let meta = match serde_json::from_value::<RegisterPlaybackPayload>(payload.clone())
                {
                    Ok(p) => p.meta,
                    Err(_) => serde_json::from_value(payload)
                        .map_err(|e| Error::invalid_payload(event, e))?,
                };
                Ok(ServerCommand::RegisterPlayback(meta))
            }
            "toggleFollowMode" => Ok(ServerCommand::ToggleFollowMode),
            "initSession" => Ok(ServerCommand::InitSession(payload)),
            "stop" => Ok(ServerCommand::Stop),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

fn wire_originator(event: &str, value: Option<&str>) -> Option<Originator> {
    let raw = value?;
    let parsed = Originator::from_wire(raw);
    if parsed.is_none() {
        warn!(event, originator = raw, "unexpected originator on server command");
    }
    parsed
}
