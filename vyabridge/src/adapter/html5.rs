//! Adapter over an HTML5 `<audio>` element.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::{AdapterCore, AdapterState, BackendEvent, PlayOutcome, PlaybackAdapter, normalize_locator};
use crate::error::{Error, Result};
use crate::messages::{PlaybackAnchor, PlaybackDescriptor, PlaybackInfo};
use crate::surface::UiAffordance;
use crate::time_utils::{ms_to_seconds, seconds_to_ms};

const BACKEND: &str = "html5";

/// `HTMLMediaElement.readyState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Why a backend refused to play.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlayRejection {
    /// Autoplay policy: playback needs a user gesture.
    #[error("play() refused without a user gesture")]
    NotAllowed,
    #[error("{0}")]
    Other(String),
}

/// The subset of `HTMLMediaElement` the adapter drives. Times are in seconds,
/// as the element reports them.
#[async_trait]
pub trait MediaElement: Send + Sync + 'static {
    fn src(&self) -> Option<String>;
    fn set_src(&self, src: &str);
    fn load(&self);
    /// Resolves once playback actually started.
    async fn play(&self) -> std::result::Result<(), PlayRejection>;
    fn pause(&self);
    fn paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    /// NaN until metadata is loaded.
    fn duration(&self) -> f64;
    fn ready_state(&self) -> ReadyState;
}

pub struct Html5AudioAdapter<E: MediaElement> {
    element: Arc<E>,
    ui: Arc<dyn UiAffordance>,
    core: Mutex<AdapterCore>,
}

impl<E: MediaElement> Html5AudioAdapter<E> {
    pub fn new(element: Arc<E>, ui: Arc<dyn UiAffordance>) -> Self {
        Self {
            element,
            ui,
            core: Mutex::new(AdapterCore::default()),
        }
    }

    pub fn element(&self) -> &Arc<E> {
        &self.element
    }

    /// Calls `play()` and records its outcome. The element only counts as
    /// playing once the returned future resolves.
    async fn start_playback(&self) -> Result<PlayOutcome> {
        self.core.lock().play_pending = true;
        let result = self.element.play().await;
        self.core.lock().play_pending = false;

        match result {
            Ok(()) => {
                let mut core = self.core.lock();
                core.state = AdapterState::Playing;
                core.blocked = false;
                Ok(PlayOutcome::Started)
            }
            Err(PlayRejection::NotAllowed) => {
                self.core.lock().blocked = true;
                info!("[HTML5] autoplay blocked, waiting for a user gesture");
                self.ui.reveal_enable_audio();
                Ok(PlayOutcome::Blocked)
            }
            Err(PlayRejection::Other(message)) => Err(Error::playback(BACKEND, message)),
        }
    }
}

#[async_trait]
impl<E: MediaElement> PlaybackAdapter for Html5AudioAdapter<E> {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn load_source(&self, descriptor: &PlaybackDescriptor) -> Result<bool> {
        let locator = descriptor.locator().ok_or(Error::MissingSource)?;
        let normalized = normalize_locator(locator);

        let mut core = self.core.lock();
        if core.is_loaded(normalized) {
            debug!(src = normalized, "[HTML5] source already loaded");
            return Ok(false);
        }
        self.element.set_src(locator);
        self.element.load();
        core.mark_loading(normalized);
        info!(src = normalized, "[HTML5] source loaded");
        Ok(true)
    }

    async fn play_media(&self, descriptor: &PlaybackDescriptor) -> Result<PlayOutcome> {
        let anchor = PlaybackAnchor::new(descriptor.elapsed);
        {
            let mut core = self.core.lock();
            core.anchor = Some(anchor);
            // the position is moved before play() resolves
            core.play_pending = true;
        }

        let loaded = match self.load_source(descriptor) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.core.lock().play_pending = false;
                return Err(e);
            }
        };

        if loaded {
            self.element.set_current_time(ms_to_seconds(descriptor.elapsed.max(0.0)));
            return self.start_playback().await;
        }

        if self.element.paused() {
            // same source: realign on the server's clock and resume, no reload
            self.element
                .set_current_time(ms_to_seconds(anchor.position_ms()));
            return self.start_playback().await;
        }

        self.core.lock().play_pending = false;
        Ok(PlayOutcome::AlreadyPlaying)
    }

    async fn resume(&self) -> Result<PlayOutcome> {
        if self.element.src().is_none() {
            return Err(Error::MissingSource);
        }
        self.start_playback().await
    }

    fn pause(&self) -> Result<()> {
        self.element.pause();
        let mut core = self.core.lock();
        if core.state == AdapterState::Playing {
            core.state = AdapterState::Paused;
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.element.pause();
        self.element.set_current_time(0.0);
        let mut core = self.core.lock();
        if core.state != AdapterState::Idle {
            core.state = AdapterState::Paused;
        }
        Ok(())
    }

    async fn seek(&self, time_ms: f64) -> Result<()> {
        self.core.lock().anchor = Some(PlaybackAnchor::new(time_ms));
        self.element.set_current_time(ms_to_seconds(time_ms));
        if !self.element.paused() {
            self.start_playback().await?;
        }
        Ok(())
    }

    fn report_status(&self) -> Option<PlaybackInfo> {
        self.element.src()?;
        Some(PlaybackInfo {
            is_playing: !self.element.paused(),
            current_time_ms: seconds_to_ms(self.element.current_time()),
            duration_ms: seconds_to_ms(self.element.duration()),
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
        self.element.paused()
    }

    fn is_blocked(&self) -> bool {
        self.core.lock().blocked
    }

    fn anchor_position_ms(&self) -> Option<f64> {
        self.core.lock().anchor.map(|anchor| anchor.position_ms())
    }

    async fn prime(&self) -> Result<bool> {
        if self.element.src().is_none() || self.element.ready_state() != ReadyState::HaveNothing {
            return Ok(false);
        }
        match self.element.play().await {
            Ok(()) => {
                self.element.pause();
                debug!("[HTML5] element primed");
                Ok(true)
            }
            Err(PlayRejection::NotAllowed) => Ok(false),
            Err(PlayRejection::Other(message)) => Err(Error::playback(BACKEND, message)),
        }
    }
}
