//! Playback adapters.
//!
//! An adapter owns exactly one media backend and is the only component that
//! touches it. The rest of the bridge sees backends through
//! [`PlaybackAdapter`] alone, so the HTML5 element and the YouTube iframe are
//! interchangeable from the bus's point of view.

pub mod html5;
pub mod youtube;

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::{PlaybackAnchor, PlaybackDescriptor, PlaybackInfo};

/// Lifecycle of the backend as seen by its adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AdapterState {
    /// No source loaded.
    #[default]
    Idle,
    /// Source assigned, not yet playable.
    Loading,
    /// Playable and not playing ("Ready/Paused").
    Paused,
    Playing,
    Ended,
}

/// Result of a play attempt.
///
/// A refusal by the autoplay policy is an expected outcome, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// Playback needs a user gesture; the "enable audio" affordance was
    /// revealed.
    Blocked,
    /// Same source already playing; only the clock anchor was refreshed.
    AlreadyPlaying,
}

/// Readiness and state callbacks raised by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendEvent {
    MetadataLoaded,
    CanPlayThrough,
    /// The backend API itself finished initializing (iframe `onReady`).
    Ready,
    Playing,
    Paused,
    Ended,
}

impl BackendEvent {
    /// Events after which the media session may be wired to this backend.
    pub fn signals_readiness(&self) -> bool {
        matches!(self, BackendEvent::CanPlayThrough | BackendEvent::Ready)
    }
}

/// Contract shared by every media backend.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync + 'static {
    /// Backend name used in logs and errors.
    fn backend(&self) -> &'static str;

    /// Assigns the descriptor's source unless it is already loaded. Returns
    /// true when a new source was assigned.
    fn load_source(&self, descriptor: &PlaybackDescriptor) -> Result<bool>;

    /// Loads if needed and starts playback aligned on the descriptor's
    /// `elapsed`.
    async fn play_media(&self, descriptor: &PlaybackDescriptor) -> Result<PlayOutcome>;

    /// Plays the current source from where it is.
    async fn resume(&self) -> Result<PlayOutcome>;

    fn pause(&self) -> Result<()>;

    /// Pauses and rewinds to zero, keeping the source.
    fn stop(&self) -> Result<()>;

    /// Moves to `time_ms`. A playing backend is told to play again so that it
    /// refreshes its internal position.
    async fn seek(&self, time_ms: f64) -> Result<()>;

    /// Live position read from the backend, `None` while nothing is loaded.
    fn report_status(&self) -> Option<PlaybackInfo>;

    fn on_backend_event(&self, event: BackendEvent);

    fn state(&self) -> AdapterState;

    fn is_paused(&self) -> bool;

    /// True when the last play attempt was refused by the autoplay policy.
    fn is_blocked(&self) -> bool;

    /// Position the last descriptor or seek says playback should be at now.
    fn anchor_position_ms(&self) -> Option<f64>;

    /// Unlocks audio output from inside a user gesture. Returns true when the
    /// backend was actually primed.
    async fn prime(&self) -> Result<bool>;
}

/// Strips any query string or fragment so that signed or tokenized URLs of
/// the same file compare equal.
///
/// # Examples
/// ```
/// # use vyabridge::adapter::normalize_locator;
/// assert_eq!(normalize_locator("https://cdn/a.mp3?token=1"), "https://cdn/a.mp3");
/// assert_eq!(normalize_locator(" a.mp3#t=5 "), "a.mp3");
/// ```
pub fn normalize_locator(locator: &str) -> &str {
    let locator = locator.trim();
    let end = locator.find(['?', '#']).unwrap_or(locator.len());
    &locator[..end]
}

/// Bookkeeping common to every adapter.
#[derive(Debug, Default)]
pub(crate) struct AdapterCore {
    pub state: AdapterState,
    /// Normalized locator of the loaded source.
    pub loaded: Option<String>,
    pub anchor: Option<PlaybackAnchor>,
    pub blocked: bool,
    /// A play request is in flight.
    pub play_pending: bool,
}

impl AdapterCore {
    pub fn is_loaded(&self, normalized: &str) -> bool {
        self.loaded.as_deref() == Some(normalized)
    }

    /// The backend was asked to play and has not started yet.
    pub fn awaiting_start(&self) -> bool {
        self.play_pending || self.blocked
    }

    pub fn mark_loading(&mut self, normalized: &str) {
        self.loaded = Some(normalized.to_string());
        self.state = AdapterState::Loading;
    }

    pub fn apply_event(&mut self, event: BackendEvent) {
        self.state = match (event, self.state) {
            (BackendEvent::MetadataLoaded | BackendEvent::CanPlayThrough, AdapterState::Loading) => {
                AdapterState::Paused
            }
            (BackendEvent::Playing, _) => AdapterState::Playing,
            (BackendEvent::Paused, AdapterState::Playing | AdapterState::Loading) => {
                AdapterState::Paused
            }
            (BackendEvent::Ended, _) => AdapterState::Ended,
            (_, state) => state,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_locator() {
        assert_eq!(normalize_locator("a.mp3"), "a.mp3");
        assert_eq!(normalize_locator("a.mp3?x=1&y=2"), "a.mp3");
        assert_eq!(normalize_locator("a.mp3#frag?x"), "a.mp3");
        assert_eq!(normalize_locator("?only"), "");
    }

    #[test]
    fn test_core_state_transitions() {
        let mut core = AdapterCore::default();
        assert_eq!(core.state, AdapterState::Idle);

        core.mark_loading("a.mp3");
        assert!(core.is_loaded("a.mp3"));
        assert_eq!(core.state, AdapterState::Loading);

        core.apply_event(BackendEvent::CanPlayThrough);
        assert_eq!(core.state, AdapterState::Paused);
        core.apply_event(BackendEvent::Playing);
        assert_eq!(core.state, AdapterState::Playing);
        // readiness events never demote a playing backend
        core.apply_event(BackendEvent::MetadataLoaded);
        assert_eq!(core.state, AdapterState::Playing);
        core.apply_event(BackendEvent::Ended);
        assert_eq!(core.state, AdapterState::Ended);
    }

    #[test]
    fn test_awaiting_start_covers_pending_and_blocked() {
        let mut core = AdapterCore::default();
        assert!(!core.awaiting_start());
        core.play_pending = true;
        assert!(core.awaiting_start());
        core.play_pending = false;
        core.blocked = true;
        assert!(core.awaiting_start());
    }
}
