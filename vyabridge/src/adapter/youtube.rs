//! Adapter over an embedded YouTube iframe player.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::html5::PlayRejection;
use super::{AdapterCore, AdapterState, BackendEvent, PlayOutcome, PlaybackAdapter};
use crate::error::{Error, Result};
use crate::messages::{PlaybackAnchor, PlaybackDescriptor, PlaybackInfo};
use crate::server::ServerLink;
use crate::surface::UiAffordance;
use crate::time_utils::{ms_to_seconds, seconds_to_ms};

const BACKEND: &str = "youtube";

/// Server event receiving [`VideoStats`].
pub const REPORT_VIDEO_STATUS: &str = "reportVideoStatus";

/// `YT.PlayerState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IframePlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl IframePlayerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }

    pub fn backend_event(&self) -> Option<BackendEvent> {
        match self {
            Self::Playing => Some(BackendEvent::Playing),
            Self::Paused => Some(BackendEvent::Paused),
            Self::Ended => Some(BackendEvent::Ended),
            Self::Cued => Some(BackendEvent::CanPlayThrough),
            Self::Unstarted | Self::Buffering => None,
        }
    }
}

/// The iframe player API (`YT.Player`). Times are in seconds.
pub trait IframePlayer: Send + Sync + 'static {
    /// Loads and starts the video.
    fn load_video_by_id(&self, video_id: &str, start_seconds: f64);
    /// Loads the video without starting it.
    fn cue_video_by_id(&self, video_id: &str, start_seconds: f64);
    fn play_video(&self) -> std::result::Result<(), PlayRejection>;
    fn pause_video(&self);
    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool);
    fn get_current_time(&self) -> f64;
    /// Zero until the video metadata is known.
    fn get_duration(&self) -> f64;
    fn get_player_state(&self) -> IframePlayerState;
    fn get_video_url(&self) -> Option<String>;
}

/// Snapshot pushed to the server, times in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStats {
    pub duration: f64,
    pub video_url: Option<String>,
    pub current_time: f64,
}

pub struct YouTubeAdapter<P: IframePlayer> {
    player: Arc<P>,
    ui: Arc<dyn UiAffordance>,
    core: Mutex<AdapterCore>,
}

impl<P: IframePlayer> YouTubeAdapter<P> {
    pub fn new(player: Arc<P>, ui: Arc<dyn UiAffordance>) -> Self {
        Self {
            player,
            ui,
            core: Mutex::new(AdapterCore::default()),
        }
    }

    pub fn player(&self) -> &Arc<P> {
        &self.player
    }

    pub fn video_stats(&self) -> VideoStats {
        VideoStats {
            duration: seconds_to_ms(self.player.get_duration()),
            video_url: self.player.get_video_url(),
            current_time: seconds_to_ms(self.player.get_current_time()),
        }
    }

    /// Pushes the current [`VideoStats`] to the server.
    pub fn report_video_status(&self, server: &dyn ServerLink) -> Result<()> {
        let payload =
            serde_json::to_value(self.video_stats()).map_err(|e| Error::invalid_payload(REPORT_VIDEO_STATUS, e))?;
        server.push_event(REPORT_VIDEO_STATUS, payload)
    }

    fn start_playback(&self) -> Result<PlayOutcome> {
        match self.player.play_video() {
            Ok(()) => {
                let mut core = self.core.lock();
                core.state = AdapterState::Playing;
                core.blocked = false;
                Ok(PlayOutcome::Started)
            }
            Err(PlayRejection::NotAllowed) => {
                self.core.lock().blocked = true;
                info!("[YOUTUBE] autoplay blocked, waiting for a user gesture");
                self.ui.reveal_enable_audio();
                Ok(PlayOutcome::Blocked)
            }
            Err(PlayRejection::Other(message)) => Err(Error::playback(BACKEND, message)),
        }
    }

    fn is_player_active(&self) -> bool {
        matches!(
            self.player.get_player_state(),
            IframePlayerState::Playing | IframePlayerState::Buffering
        )
    }
}

#[async_trait]
impl<P: IframePlayer> PlaybackAdapter for YouTubeAdapter<P> {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn load_source(&self, descriptor: &PlaybackDescriptor) -> Result<bool> {
        let locator = descriptor.locator().ok_or(Error::MissingSource)?;
        let video_id = video_id_from_locator(locator)
            .ok_or_else(|| Error::playback(BACKEND, format!("not a video locator: {}", locator)))?;

        let mut core = self.core.lock();
        if core.is_loaded(&video_id) {
            debug!(video_id = %video_id, "[YOUTUBE] video already cued");
            return Ok(false);
        }
        self.player
            .cue_video_by_id(&video_id, ms_to_seconds(descriptor.elapsed.max(0.0)));
        core.mark_loading(&video_id);
        info!(video_id = %video_id, "[YOUTUBE] video cued");
        Ok(true)
    }

    async fn play_media(&self, descriptor: &PlaybackDescriptor) -> Result<PlayOutcome> {
        let anchor = PlaybackAnchor::new(descriptor.elapsed);
        self.core.lock().anchor = Some(anchor);

        if self.load_source(descriptor)? {
            return self.start_playback();
        }
        if !self.is_player_active() {
            self.player.seek_to(ms_to_seconds(anchor.position_ms()), true);
            return self.start_playback();
        }
        Ok(PlayOutcome::AlreadyPlaying)
    }

    async fn resume(&self) -> Result<PlayOutcome> {
        if self.core.lock().loaded.is_none() {
            return Err(Error::MissingSource);
        }
        self.start_playback()
    }

    fn pause(&self) -> Result<()> {
        self.player.pause_video();
        let mut core = self.core.lock();
        if core.state == AdapterState::Playing {
            core.state = AdapterState::Paused;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.player.pause_video();
        self.player.seek_to(0.0, true);
        let mut core = self.core.lock();
        if core.state != AdapterState::Idle {
            core.state = AdapterState::Paused;
        }
        Ok(())
    }

    async fn seek(&self, time_ms: f64) -> Result<()> {
        self.core.lock().anchor = Some(PlaybackAnchor::new(time_ms));
        self.player.seek_to(ms_to_seconds(time_ms), true);
        if self.is_player_active() {
            self.start_playback()?;
        }
        Ok(())
    }

    fn report_status(&self) -> Option<PlaybackInfo> {
        if self.core.lock().loaded.is_none() {
            return None;
        }
        Some(PlaybackInfo {
            is_playing: self.is_player_active(),
            current_time_ms: seconds_to_ms(self.player.get_current_time()),
            duration_ms: seconds_to_ms(self.player.get_duration()),
            awaiting_start: self.core.lock().awaiting_start(),
        })
    }

    fn on_backend_event(&self, event: BackendEvent) {
        self.core.lock().apply_event(event);
    }

    fn state(&self) -> AdapterState {
        self.core.lock().state
    }

    fn is_paused(&self) -> bool {
        !self.is_player_active()
    }

    fn is_blocked(&self) -> bool {
        self.core.lock().blocked
    }

    fn anchor_position_ms(&self) -> Option<f64> {
        self.core.lock().anchor.map(|anchor| anchor.position_ms())
    }

    async fn prime(&self) -> Result<bool> {
        // the iframe unlocks itself on the first in-frame gesture
        Ok(false)
    }
}

/// Extracts the video id from a raw id, a `youtube.com/watch?v=` URL, an
/// embed or shorts URL, or a `youtu.be/` short link.
///
/// # Examples
/// ```
/// # use vyabridge::adapter::youtube::video_id_from_locator;
/// let id = Some("dQw4w9WgXcQ".to_string());
/// assert_eq!(video_id_from_locator("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"), id);
/// assert_eq!(video_id_from_locator("https://youtu.be/dQw4w9WgXcQ"), id);
/// assert_eq!(video_id_from_locator("dQw4w9WgXcQ"), id);
/// assert_eq!(video_id_from_locator("https://example.com/a.mp3"), None);
/// ```
pub fn video_id_from_locator(locator: &str) -> Option<String> {
    let locator = locator.trim();
    if locator.is_empty() {
        return None;
    }

    let url = match Url::parse(locator) {
        Ok(url) => url,
        Err(_) if looks_like_video_id(locator) => return Some(locator.to_string()),
        Err(_) if locator.contains("youtu") => Url::parse(&format!("https://{}", locator)).ok()?,
        Err(_) => {
            warn!(locator, "[YOUTUBE] unrecognized locator");
            return None;
        }
    };

    let host = url.host_str()?;
    let host = host
        .strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host);

    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            match url.query_pairs().find(|(key, _)| key == "v") {
                Some((_, v)) => Some(v.into_owned()),
                None => {
                    let mut segments = url.path_segments()?;
                    match segments.next() {
                        Some("embed" | "shorts" | "live" | "v") => segments.next().map(str::to_string),
                        _ => None,
                    }
                }
            }
        }
        _ => None,
    };
    id.filter(|id| !id.is_empty())
}

fn looks_like_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
