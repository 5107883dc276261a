//! OS-level "now playing" integration.

use std::sync::Arc;

use crate::messages::PlaybackMetadata;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaAction {
    Play,
    Pause,
}

impl MediaAction {
    pub fn as_cmd(&self) -> &'static str {
        match self {
            MediaAction::Play => "play",
            MediaAction::Pause => "pause",
        }
    }
}

pub type ActionHandler = Arc<dyn Fn() + Send + Sync>;

/// Platform media session (lock screen, media keys, notification shade).
pub trait MediaSession: Send + Sync {
    fn set_metadata(&self, metadata: &PlaybackMetadata);
    fn set_action_handler(&self, action: MediaAction, handler: Option<ActionHandler>);
}

/// Session used where the platform exposes no media session.
pub struct NoMediaSession;

impl MediaSession for NoMediaSession {
    fn set_metadata(&self, _metadata: &PlaybackMetadata) {}

    fn set_action_handler(&self, _action: MediaAction, _handler: Option<ActionHandler>) {}
}
