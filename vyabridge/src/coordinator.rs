//! The media bridge: entry point of server commands and owner of the time
//! displays, segment emphasis and heartbeat lifecycle.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::channel::{EventChannel, Subscription};
use crate::emphasis::EmphasisManager;
use crate::error::Result;
use crate::messages::{
    Heartbeat, Originator, PlayCmd, PlayPause, PlaybackDescriptor, PlaybackMeta, SeekTime,
};
use crate::registry::Bridges;
use crate::server::{ServerCommand, ServerLink};
use crate::session::{self, SessionStore};
use crate::settings::BridgeSettings;
use crate::surface::{Document, TextNode};
use crate::time_utils::format_display_time;
use crate::timeline::Timeline;
use crate::timer::ScheduledTask;

const IDENTITY: Originator = Originator::MediaBridge;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayKey {
    CurrentTime,
    Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayProperty {
    InnerText,
    StyleWidth,
}

/// Request to change a display node owned by the bridge.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayUpdate {
    pub key: DisplayKey,
    pub value: String,
    pub property: DisplayProperty,
}

/// Handle through which other components ask the bridge to update one of
/// its display nodes.
#[derive(Clone)]
pub struct DisplayHandle {
    channel: EventChannel<DisplayUpdate>,
}

impl DisplayHandle {
    fn new() -> Self {
        Self {
            channel: EventChannel::new("updateDisplayValue"),
        }
    }

    pub fn update(&self, update: DisplayUpdate) {
        self.channel.publish(&update);
    }

    pub fn set_text(&self, key: DisplayKey, value: impl Into<String>) {
        self.update(DisplayUpdate {
            key,
            value: value.into(),
            property: DisplayProperty::InnerText,
        });
    }
}

/// Nodes handed to the bridge at mount time. The bridge is their only
/// writer.
#[derive(Clone)]
pub struct MediaBridgeView {
    pub current_time: Arc<dyn TextNode>,
    pub duration: Arc<dyn TextNode>,
    pub document: Arc<dyn Document>,
}

struct BridgeInner {
    bridges: Bridges,
    server: Arc<dyn ServerLink>,
    sessions: Arc<dyn SessionStore>,
    settings: BridgeSettings,
    current_time: Arc<dyn TextNode>,
    duration: Arc<dyn TextNode>,
    emphasis: Mutex<EmphasisManager>,
    timeline: RwLock<Timeline>,
    heartbeat: ScheduledTask,
    next_timer: ScheduledTask,
    last_playback: Mutex<PlaybackDescriptor>,
    session_id: Mutex<Option<String>>,
}

pub struct MediaBridge {
    inner: Arc<BridgeInner>,
    display: DisplayHandle,
    subscriptions: Vec<Subscription>,
}

impl MediaBridge {
    /// Mounts the bridge on its view, subscribes it to the bus and bootstraps
    /// the anonymous session.
    pub fn mount(
        bridges: Bridges,
        server: Arc<dyn ServerLink>,
        sessions: Arc<dyn SessionStore>,
        view: MediaBridgeView,
        settings: BridgeSettings,
    ) -> Self {
        let emphasis = EmphasisManager::new(
            view.document,
            settings.emphasis_class.clone(),
            settings.segment_dom_prefix.clone(),
            &settings.preamble_dom_id,
            settings.follow_mode,
        );

        let inner = Arc::new(BridgeInner {
            bridges: bridges.clone(),
            server,
            sessions,
            settings,
            current_time: view.current_time,
            duration: view.duration,
            emphasis: Mutex::new(emphasis),
            timeline: RwLock::new(Timeline::default()),
            heartbeat: ScheduledTask::new("heartbeat"),
            next_timer: ScheduledTask::new("next_item"),
            last_playback: Mutex::new(PlaybackDescriptor::default()),
            session_id: Mutex::new(None),
        });

        let display = DisplayHandle::new();
        let weak = Arc::downgrade(&inner);
        let subscriptions = vec![
            bridges.heartbeat.subscribe(with_inner(&weak, BridgeInner::on_heartbeat)),
            bridges.play_pause.subscribe(with_inner(&weak, BridgeInner::on_play_pause)),
            bridges.seek_time.subscribe(with_inner(&weak, BridgeInner::on_seek)),
            display.channel.subscribe(with_inner(&weak, BridgeInner::on_display_update)),
        ];

        match session::fetch_or_create_session(inner.sessions.as_ref()) {
            Ok(record) => {
                *inner.session_id.lock() = session::session_id(&record).map(str::to_string);
            }
            Err(e) => warn!("[MEDIA BRIDGE] session bootstrap failed: {}", e),
        }

        info!("[MEDIA BRIDGE] mounted");
        Self {
            inner,
            display,
            subscriptions,
        }
    }

    /// Decodes and applies a command pushed by the server.
    pub fn handle_server_event(&self, event: &str, payload: Value) -> Result<()> {
        let command = ServerCommand::decode(event, payload)?;
        self.handle_server_command(command)
    }

    pub fn handle_server_command(&self, command: ServerCommand) -> Result<()> {
        let inner = &self.inner;
        match command {
            ServerCommand::PlayPause {
                cmd,
                playback,
                originator,
            } => {
                debug!(?cmd, originator = ?originator, "[MEDIA BRIDGE] play_pause from server");
                match cmd {
                    PlayCmd::Play => inner.play(playback)?,
                    PlayCmd::Pause => inner.pause(playback),
                    PlayCmd::Stop => inner.stop(),
                }
            }
            ServerCommand::SeekTime {
                seek_to_ms,
                originator,
            } => {
                if originator == Some(Originator::ProgressBar) {
                    debug!(seek_to_ms, "[MEDIA BRIDGE] dropping reflected progress bar seek");
                    return Ok(());
                }
                inner.bridges.seek_time.publish(&SeekTime {
                    seek_to_ms,
                    originator: IDENTITY,
                });
                inner.current_time.set_text(&format_display_time(seek_to_ms));
            }
            ServerCommand::RegisterEventsTimeline(events) => {
                info!(events = events.len(), "[MEDIA BRIDGE] timeline registered");
                *inner.timeline.write() = Timeline::new(events);
            }
            ServerCommand::RegisterPlayback(meta) => {
                if let Some(duration) = meta.duration {
                    inner.duration.set_text(&format_display_time(duration));
                }
                inner.bridges.playback_meta.publish(&PlaybackMeta { meta });
            }
            ServerCommand::ToggleFollowMode => {
                let enabled = inner.emphasis.lock().toggle_follow_mode();
                info!(enabled, "[MEDIA BRIDGE] follow mode toggled");
            }
            ServerCommand::InitSession(record) => {
                session::init_session(inner.sessions.as_ref(), &record)?;
                *inner.session_id.lock() = session::session_id(&record).map(str::to_string);
            }
            ServerCommand::Stop => inner.stop(),
        }
        Ok(())
    }

    /// Emphasizes a segment by its content id, without a timeline lookup.
    pub fn emphasize_segment(&self, segment_id: &str) -> bool {
        self.inner.emphasis.lock().emphasize_segment(segment_id)
    }

    pub fn display(&self) -> DisplayHandle {
        self.display.clone()
    }

    pub fn is_heartbeat_running(&self) -> bool {
        self.inner.heartbeat.is_running()
    }

    pub fn is_next_item_pending(&self) -> bool {
        self.inner.next_timer.is_running()
    }

    pub fn is_follow_mode(&self) -> bool {
        self.inner.emphasis.lock().is_follow_mode()
    }

    pub fn emphasized_dom_id(&self) -> Option<String> {
        self.inner.emphasis.lock().current_dom_id()
    }

    pub fn timeline_len(&self) -> usize {
        self.inner.timeline.read().len()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().clone()
    }

    /// Cancels both timers and leaves the bus. Safe to call more than once.
    pub fn destroy(&mut self) {
        self.inner.heartbeat.cancel();
        self.inner.next_timer.cancel();
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        info!("[MEDIA BRIDGE] destroyed");
    }
}

impl Drop for MediaBridge {
    fn drop(&mut self) {
        self.inner.heartbeat.cancel();
        self.inner.next_timer.cancel();
    }
}

fn with_inner<M: 'static>(
    weak: &Weak<BridgeInner>,
    handler: fn(&BridgeInner, &M),
) -> impl Fn(&M) + Send + Sync + 'static {
    let weak = weak.clone();
    move |msg: &M| {
        if let Some(inner) = weak.upgrade() {
            handler(&inner, msg);
        }
    }
}

impl BridgeInner {
    fn play(&self, playback: PlaybackDescriptor) -> Result<()> {
        self.next_timer.cancel();
        if let Some(duration) = playback.meta.duration {
            self.duration.set_text(&format_display_time(duration));
        }
        *self.last_playback.lock() = playback.clone();
        self.bridges.play_pause.publish(&PlayPause {
            cmd: PlayCmd::Play,
            playback,
            originator: IDENTITY,
        });
        self.start_heartbeat()
    }

    fn pause(&self, playback: PlaybackDescriptor) {
        self.bridges.play_pause.publish(&PlayPause {
            cmd: PlayCmd::Pause,
            playback,
            originator: IDENTITY,
        });
        self.heartbeat.cancel();
    }

    fn stop(&self) {
        self.heartbeat.cancel();
        self.next_timer.cancel();
        self.current_time.set_text("");
        self.duration.set_text("");
        let playback = self.last_playback.lock().clone();
        self.bridges.play_pause.publish(&PlayPause {
            cmd: PlayCmd::Stop,
            playback,
            originator: IDENTITY,
        });
    }

    fn start_heartbeat(&self) -> Result<()> {
        let bridges = self.bridges.clone();
        self.heartbeat
            .start_interval(self.settings.heartbeat_interval, move || {
                bridges.heartbeat.publish(&Heartbeat::request(IDENTITY));
            })
    }

    fn schedule_next_item(&self) {
        let max_delay_ms = self.settings.autoplay_max_delay.as_millis() as u64;
        let delay_ms = if max_delay_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..max_delay_ms)
        };

        let server = Arc::clone(&self.server);
        let event = self.settings.next_item_event.clone();
        let scheduled = self
            .next_timer
            .start_once(Duration::from_millis(delay_ms), move || {
                info!(event = %event, "[MEDIA BRIDGE] requesting next item");
                let payload = json!({ "originator": IDENTITY.as_str() });
                if let Err(e) = server.push_event(&event, payload) {
                    warn!("[MEDIA BRIDGE] next item request failed: {}", e);
                }
            });
        if let Err(e) = scheduled {
            warn!("[MEDIA BRIDGE] cannot schedule next item: {}", e);
        }
    }

    fn on_heartbeat(&self, msg: &Heartbeat) {
        if msg.originator == IDENTITY {
            return;
        }
        let Some(info) = msg.current_playback_info else {
            return;
        };
        if msg.originator != Originator::AudioPlayer {
            warn!(originator = %msg.originator, "[MEDIA BRIDGE] heartbeat echo from a non-player component");
        }
        if !info.is_ready() {
            debug!("[MEDIA BRIDGE] backend not ready, skipping heartbeat echo");
            return;
        }

        self.current_time
            .set_text(&format_display_time(info.current_time_ms));
        self.duration.set_text(&format_display_time(info.duration_ms));
        {
            let timeline = self.timeline.read();
            self.emphasis
                .lock()
                .emphasize_by_time(info.current_time_ms, &timeline);
        }

        if info.has_reached_end() {
            if !self.next_timer.is_running() {
                self.heartbeat.cancel();
                self.schedule_next_item();
            }
        } else if !info.is_playing && !info.awaiting_start && info.current_time_ms > 0.0 {
            // the backend paused on its own, stop polling it
            self.heartbeat.cancel();
        }
    }

    fn on_play_pause(&self, msg: &PlayPause) {
        if msg.originator != Originator::AudioPlayer {
            return;
        }
        match msg.cmd {
            PlayCmd::Play => {
                self.next_timer.cancel();
                if let Err(e) = self.start_heartbeat() {
                    warn!("[MEDIA BRIDGE] cannot start heartbeat: {}", e);
                }
            }
            PlayCmd::Pause | PlayCmd::Stop => {
                self.heartbeat.cancel();
            }
        }
    }

    fn on_seek(&self, msg: &SeekTime) {
        if msg.originator == IDENTITY {
            return;
        }
        self.current_time
            .set_text(&format_display_time(msg.seek_to_ms));
    }

    fn on_display_update(&self, update: &DisplayUpdate) {
        let node = match update.key {
            DisplayKey::CurrentTime => &self.current_time,
            DisplayKey::Duration => &self.duration,
        };
        match update.property {
            DisplayProperty::InnerText => node.set_text(&update.value),
            DisplayProperty::StyleWidth => {
                warn!(key = ?update.key, "[MEDIA BRIDGE] width update on a text node ignored");
            }
        }
    }
}
