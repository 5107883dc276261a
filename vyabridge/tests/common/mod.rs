#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;

use vyabridge::media_session::ActionHandler;
use vyabridge::surface::memory::{MemoryAffordance, MemoryDocument, MemoryFill, MemoryText};
use vyabridge::{
    BridgeSettings, Bridges, Html5AudioAdapter, IframePlayer, IframePlayerState, MediaAction,
    MediaBridge, MediaBridgeView, MediaElement, MediaSession, MemorySessionStore, PlayRejection,
    PlaybackMetadata, PlayerHook, ProgressBar, ProgressBarConfig, ReadyState, ServerLink,
    SessionStore,
};

/// Lets spawned tasks and timer ticks run.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advances the paused clock in `step_ms` increments, settling after each.
pub async fn advance_by(total_ms: u64, step_ms: u64) {
    let mut elapsed = 0;
    while elapsed < total_ms {
        tokio::time::advance(std::time::Duration::from_millis(step_ms)).await;
        settle().await;
        elapsed += step_ms;
    }
}

/// Playback clock shared by the fake backends, in seconds.
struct Clock {
    base: f64,
    since: Option<Instant>,
    duration: f64,
}

impl Clock {
    fn position(&self) -> f64 {
        let running = self
            .since
            .map(|since| since.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let position = self.base + running;
        if self.duration.is_finite() {
            position.min(self.duration)
        } else {
            position
        }
    }

    fn has_ended(&self) -> bool {
        self.duration.is_finite() && self.position() >= self.duration
    }

    fn run(&mut self) {
        if self.since.is_none() {
            self.since = Some(Instant::now());
        }
    }

    fn halt(&mut self) {
        self.base = self.position();
        self.since = None;
    }

    fn set(&mut self, seconds: f64) {
        self.base = seconds;
        if self.since.is_some() {
            self.since = Some(Instant::now());
        }
    }
}

/// `<audio>` element advancing on the tokio clock.
pub struct FakeAudioElement {
    src: Mutex<Option<String>>,
    clock: Mutex<Clock>,
    ready: Mutex<ReadyState>,
    media_duration: f64,
    pub refuse_play: AtomicBool,
    /// Time `play()` takes to resolve, like a browser buffering first.
    pub play_latency_ms: AtomicU64,
    pub loads: AtomicUsize,
    pub plays: AtomicUsize,
}

impl FakeAudioElement {
    /// Element whose sources all last `duration_s` seconds.
    pub fn new(duration_s: f64) -> Arc<Self> {
        Arc::new(Self {
            src: Mutex::new(None),
            clock: Mutex::new(Clock {
                base: 0.0,
                since: None,
                duration: f64::NAN,
            }),
            ready: Mutex::new(ReadyState::HaveNothing),
            media_duration: duration_s,
            refuse_play: AtomicBool::new(false),
            play_latency_ms: AtomicU64::new(0),
            loads: AtomicUsize::new(0),
            plays: AtomicUsize::new(0),
        })
    }

    /// Simulates the browser fetching metadata.
    pub fn finish_loading(&self) {
        *self.ready.lock() = ReadyState::HaveEnoughData;
        self.clock.lock().duration = self.media_duration;
    }
}

#[async_trait]
impl MediaElement for FakeAudioElement {
    fn src(&self) -> Option<String> {
        self.src.lock().clone()
    }

    fn set_src(&self, src: &str) {
        *self.src.lock() = Some(src.to_string());
        *self.ready.lock() = ReadyState::HaveNothing;
        *self.clock.lock() = Clock {
            base: 0.0,
            since: None,
            duration: f64::NAN,
        };
    }

    fn load(&self) {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.finish_loading();
    }

    async fn play(&self) -> Result<(), PlayRejection> {
        if self.src.lock().is_none() {
            return Err(PlayRejection::Other("no source".to_string()));
        }
        if self.refuse_play.load(Ordering::SeqCst) {
            return Err(PlayRejection::NotAllowed);
        }
        let latency = self.play_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        let mut clock = self.clock.lock();
        if clock.has_ended() {
            clock.set(0.0);
        }
        clock.run();
        Ok(())
    }

    fn pause(&self) {
        self.clock.lock().halt();
    }

    fn paused(&self) -> bool {
        let clock = self.clock.lock();
        clock.since.is_none() || clock.has_ended()
    }

    fn current_time(&self) -> f64 {
        self.clock.lock().position()
    }

    fn set_current_time(&self, seconds: f64) {
        self.clock.lock().set(seconds);
    }

    fn duration(&self) -> f64 {
        self.clock.lock().duration
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready.lock()
    }
}

/// YouTube iframe player advancing on the tokio clock.
pub struct FakeIframePlayer {
    video_id: Mutex<Option<String>>,
    clock: Mutex<Clock>,
    video_duration: f64,
    pub refuse_play: AtomicBool,
    pub seeks: Mutex<Vec<f64>>,
    pub cues: AtomicUsize,
}

impl FakeIframePlayer {
    pub fn new(duration_s: f64) -> Arc<Self> {
        Arc::new(Self {
            video_id: Mutex::new(None),
            clock: Mutex::new(Clock {
                base: 0.0,
                since: None,
                duration: 0.0,
            }),
            video_duration: duration_s,
            refuse_play: AtomicBool::new(false),
            seeks: Mutex::new(Vec::new()),
            cues: AtomicUsize::new(0),
        })
    }

    pub fn video_id(&self) -> Option<String> {
        self.video_id.lock().clone()
    }
}

impl IframePlayer for FakeIframePlayer {
    fn load_video_by_id(&self, video_id: &str, start_seconds: f64) {
        self.cue_video_by_id(video_id, start_seconds);
        self.clock.lock().run();
    }

    fn cue_video_by_id(&self, video_id: &str, start_seconds: f64) {
        self.cues.fetch_add(1, Ordering::SeqCst);
        *self.video_id.lock() = Some(video_id.to_string());
        *self.clock.lock() = Clock {
            base: start_seconds,
            since: None,
            duration: self.video_duration,
        };
    }

    fn play_video(&self) -> Result<(), PlayRejection> {
        if self.refuse_play.load(Ordering::SeqCst) {
            return Err(PlayRejection::NotAllowed);
        }
        self.clock.lock().run();
        Ok(())
    }

    fn pause_video(&self) {
        self.clock.lock().halt();
    }

    fn seek_to(&self, seconds: f64, _allow_seek_ahead: bool) {
        self.seeks.lock().push(seconds);
        self.clock.lock().set(seconds);
    }

    fn get_current_time(&self) -> f64 {
        self.clock.lock().position()
    }

    fn get_duration(&self) -> f64 {
        self.clock.lock().duration
    }

    fn get_player_state(&self) -> IframePlayerState {
        let clock = self.clock.lock();
        if self.video_id.lock().is_none() {
            IframePlayerState::Unstarted
        } else if clock.has_ended() {
            IframePlayerState::Ended
        } else if clock.since.is_some() {
            IframePlayerState::Playing
        } else {
            IframePlayerState::Paused
        }
    }

    fn get_video_url(&self) -> Option<String> {
        self.video_id
            .lock()
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
    }
}

/// One push toward the server.
#[derive(Clone, Debug)]
pub struct Pushed {
    pub target: Option<String>,
    pub event: String,
    pub payload: Value,
}

#[derive(Default)]
pub struct RecordingServerLink {
    pushed: Mutex<Vec<Pushed>>,
    /// Makes every push fail, as a dropped socket would.
    pub disconnected: AtomicBool,
}

impl RecordingServerLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn pushed(&self) -> Vec<Pushed> {
        self.pushed.lock().clone()
    }

    pub fn events_named(&self, event: &str) -> Vec<Pushed> {
        self.pushed
            .lock()
            .iter()
            .filter(|p| p.event == event)
            .cloned()
            .collect()
    }
}

impl RecordingServerLink {
    fn check_connected(&self) -> vyabridge::Result<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(vyabridge::Error::ServerLink("socket closed".to_string()));
        }
        Ok(())
    }
}

impl ServerLink for RecordingServerLink {
    fn push_event(&self, event: &str, payload: Value) -> vyabridge::Result<()> {
        self.check_connected()?;
        self.pushed.lock().push(Pushed {
            target: None,
            event: event.to_string(),
            payload,
        });
        Ok(())
    }

    fn push_event_to(&self, target: &str, event: &str, payload: Value) -> vyabridge::Result<()> {
        self.check_connected()?;
        self.pushed.lock().push(Pushed {
            target: Some(target.to_string()),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMediaSession {
    metadata: Mutex<Option<PlaybackMetadata>>,
    handlers: Mutex<HashMap<MediaAction, ActionHandler>>,
    pub handler_sets: AtomicUsize,
}

impl RecordingMediaSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn metadata(&self) -> Option<PlaybackMetadata> {
        self.metadata.lock().clone()
    }

    pub fn has_handler(&self, action: MediaAction) -> bool {
        self.handlers.lock().contains_key(&action)
    }

    /// Simulates the OS media control.
    pub fn trigger(&self, action: MediaAction) -> bool {
        let handler = self.handlers.lock().get(&action).cloned();
        match handler {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl MediaSession for RecordingMediaSession {
    fn set_metadata(&self, metadata: &PlaybackMetadata) {
        *self.metadata.lock() = Some(metadata.clone());
    }

    fn set_action_handler(&self, action: MediaAction, handler: Option<ActionHandler>) {
        self.handler_sets.fetch_add(1, Ordering::SeqCst);
        let mut handlers = self.handlers.lock();
        match handler {
            Some(handler) => {
                handlers.insert(action, handler);
            }
            None => {
                handlers.remove(&action);
            }
        }
    }
}

/// A page with every component mounted on headless surfaces.
pub struct Page {
    pub bridges: Bridges,
    pub server: Arc<RecordingServerLink>,
    pub sessions: Arc<dyn SessionStore>,
    pub media_session: Arc<RecordingMediaSession>,
    pub ui: Arc<MemoryAffordance>,
    pub document: Arc<MemoryDocument>,
    pub current_time: Arc<MemoryText>,
    pub duration: Arc<MemoryText>,
    pub fill: Arc<MemoryFill>,
    pub element: Arc<FakeAudioElement>,
    pub bridge: MediaBridge,
    pub hook: PlayerHook<Html5AudioAdapter<FakeAudioElement>>,
    pub bar: ProgressBar,
}

impl Page {
    pub fn mount(duration_s: f64) -> Self {
        Self::mount_with(duration_s, Arc::new(MemorySessionStore::new()))
    }

    pub fn mount_with_settings(duration_s: f64, settings: BridgeSettings) -> Self {
        Self::assemble(duration_s, Arc::new(MemorySessionStore::new()), settings)
    }

    pub fn mount_with(duration_s: f64, sessions: Arc<dyn SessionStore>) -> Self {
        Self::assemble(duration_s, sessions, BridgeSettings::default())
    }

    /// Page whose audio element takes `play_latency_ms` to start playing.
    pub fn mount_slow(duration_s: f64, play_latency_ms: u64) -> Self {
        let page = Self::mount(duration_s);
        page.element
            .play_latency_ms
            .store(play_latency_ms, Ordering::SeqCst);
        page
    }

    fn assemble(duration_s: f64, sessions: Arc<dyn SessionStore>, settings: BridgeSettings) -> Self {
        let bridges = Bridges::new();
        let server = RecordingServerLink::new();
        let media_session = RecordingMediaSession::new();
        let ui = MemoryAffordance::new();
        let document = MemoryDocument::new();
        document.insert("chapter-preamble");
        for id in 1..=5 {
            document.insert(&format!("verse-{}", id));
        }
        let current_time = MemoryText::new();
        let duration = MemoryText::new();
        let fill = MemoryFill::new();
        let element = FakeAudioElement::new(duration_s);

        let bridge = MediaBridge::mount(
            bridges.clone(),
            server.clone(),
            Arc::clone(&sessions),
            MediaBridgeView {
                current_time: current_time.clone(),
                duration: duration.clone(),
                document: document.clone(),
            },
            settings.clone(),
        );
        let adapter = Arc::new(Html5AudioAdapter::new(Arc::clone(&element), ui.clone()));
        let hook = PlayerHook::mount(
            adapter,
            bridges.clone(),
            server.clone(),
            media_session.clone(),
        );
        let bar = ProgressBar::mount(
            bridges.clone(),
            server.clone(),
            fill.clone(),
            ProgressBarConfig {
                max_duration_ms: Some(duration_s * 1000.0),
                target: settings.player_target.clone(),
            },
        );

        Self {
            bridges,
            server,
            sessions,
            media_session,
            ui,
            document,
            current_time,
            duration,
            fill,
            element,
            bridge,
            hook,
            bar,
        }
    }
}
