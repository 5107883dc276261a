//! Binds one playback adapter to the bridge channels and to the platform
//! media session.
//!
//! The hook publishes with the [`Originator::AudioPlayer`] identity, whatever
//! the backend, and ignores every message carrying that identity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::adapter::{BackendEvent, PlayOutcome, PlaybackAdapter};
use crate::channel::Subscription;
use crate::error::Result;
use crate::media_session::{MediaAction, MediaSession};
use crate::messages::{
    Heartbeat, Originator, PlayCmd, PlayPause, PlaybackDescriptor, PlaybackMeta, PlaybackMetadata,
    SeekTime,
};
use crate::registry::Bridges;
use crate::server::ServerLink;
use crate::timer::spawn_detached;

/// Server event carrying play/pause requests from the media session.
pub const PLAY_PAUSE_EVENT: &str = "play_pause";

/// What a user gesture ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureEffect {
    /// A play refused by the autoplay policy was attempted again.
    Retried(PlayOutcome),
    Primed,
    Nothing,
}

struct HookInner<A: PlaybackAdapter> {
    adapter: Arc<A>,
    bridges: Bridges,
    server: Arc<dyn ServerLink>,
    session: Arc<dyn MediaSession>,
    metadata: Mutex<PlaybackMetadata>,
    last_playback: Mutex<Option<PlaybackDescriptor>>,
    session_wired: AtomicBool,
}

pub struct PlayerHook<A: PlaybackAdapter> {
    inner: Arc<HookInner<A>>,
    subscriptions: Vec<Subscription>,
}

impl<A: PlaybackAdapter> PlayerHook<A> {
    /// Mounts the hook: subscribes to `playPause`, `seekTime`, `heartbeat`
    /// and `playbackMeta`.
    pub fn mount(
        adapter: Arc<A>,
        bridges: Bridges,
        server: Arc<dyn ServerLink>,
        session: Arc<dyn MediaSession>,
    ) -> Self {
        let inner = Arc::new(HookInner {
            adapter,
            bridges: bridges.clone(),
            server,
            session,
            metadata: Mutex::new(PlaybackMetadata::default()),
            last_playback: Mutex::new(None),
            session_wired: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&inner);
        let subscriptions = vec![
            bridges.play_pause.subscribe(with_inner(&weak, |inner, msg: &PlayPause| {
                inner.on_play_pause(msg)
            })),
            bridges.seek_time.subscribe(with_inner(&weak, |inner, msg: &SeekTime| {
                inner.on_seek(msg)
            })),
            bridges.heartbeat.subscribe(with_inner(&weak, |inner, msg: &Heartbeat| {
                inner.on_heartbeat(msg)
            })),
            bridges.playback_meta.subscribe(with_inner(&weak, |inner, msg: &PlaybackMeta| {
                inner.on_playback_meta(msg)
            })),
        ];

        info!(backend = inner.adapter.backend(), "[PLAYER] hook mounted");
        Self {
            inner,
            subscriptions,
        }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.inner.adapter
    }

    /// Metadata currently shown by the media session.
    pub fn metadata(&self) -> PlaybackMetadata {
        self.inner.metadata.lock().clone()
    }

    /// Feeds a backend callback. The first readiness event wires the media
    /// session action handlers.
    pub fn handle_backend_event(&self, event: BackendEvent) {
        self.inner.adapter.on_backend_event(event);
        if event.signals_readiness() && !self.inner.session_wired.swap(true, Ordering::SeqCst) {
            self.inner.wire_media_session();
        }
    }

    /// Play/pause button on the player itself. Returns the command that was
    /// published, if any.
    pub async fn toggle_play_pause(&self) -> Result<Option<PlayCmd>> {
        let adapter = &self.inner.adapter;
        if adapter.is_paused() {
            if adapter.resume().await? != PlayOutcome::Started {
                return Ok(None);
            }
            self.inner.publish_play_pause(PlayCmd::Play);
            Ok(Some(PlayCmd::Play))
        } else {
            adapter.pause()?;
            self.inner.publish_play_pause(PlayCmd::Pause);
            Ok(Some(PlayCmd::Pause))
        }
    }

    /// Resumes where the server clock says playback should be.
    pub async fn listen_now(&self) -> Result<PlayOutcome> {
        let adapter = &self.inner.adapter;
        if let Some(position_ms) = adapter.anchor_position_ms() {
            adapter.seek(position_ms).await?;
        }
        let outcome = adapter.resume().await?;
        if outcome == PlayOutcome::Started {
            self.inner.publish_play_pause(PlayCmd::Play);
        }
        Ok(outcome)
    }

    /// Called from any user gesture on the page.
    pub async fn user_gesture(&self) -> Result<GestureEffect> {
        let adapter = &self.inner.adapter;
        if adapter.is_blocked() {
            let outcome = adapter.resume().await?;
            if outcome == PlayOutcome::Started {
                info!("[PLAYER] playback unlocked by user gesture");
                self.inner.publish_play_pause(PlayCmd::Play);
            }
            return Ok(GestureEffect::Retried(outcome));
        }
        if adapter.prime().await? {
            return Ok(GestureEffect::Primed);
        }
        Ok(GestureEffect::Nothing)
    }

    /// Unsubscribes from every channel and clears the media session
    /// handlers. Also done on drop, except for the session handlers.
    pub fn destroy(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        if self.inner.session_wired.swap(false, Ordering::SeqCst) {
            self.inner.session.set_action_handler(MediaAction::Play, None);
            self.inner.session.set_action_handler(MediaAction::Pause, None);
        }
        debug!("[PLAYER] hook destroyed");
    }
}

fn with_inner<A, M, F>(weak: &Weak<HookInner<A>>, handler: F) -> impl Fn(&M) + Send + Sync + 'static
where
    A: PlaybackAdapter,
    M: 'static,
    F: Fn(&HookInner<A>, &M) + Send + Sync + 'static,
{
    let weak = weak.clone();
    move |msg: &M| {
        if let Some(inner) = weak.upgrade() {
            handler(&inner, msg);
        }
    }
}

impl<A: PlaybackAdapter> HookInner<A> {
    fn on_play_pause(&self, msg: &PlayPause) {
        if msg.originator == Originator::AudioPlayer {
            return;
        }
        match msg.cmd {
            PlayCmd::Play => {
                *self.last_playback.lock() = Some(msg.playback.clone());
                let adapter = Arc::clone(&self.adapter);
                let playback = msg.playback.clone();
                let spawned = spawn_detached("play_media", async move {
                    match adapter.play_media(&playback).await {
                        Ok(outcome) => debug!(?outcome, "[PLAYER] play_media"),
                        Err(e) => warn!("[PLAYER] play_media failed: {}", e),
                    }
                });
                if let Err(e) = spawned {
                    warn!("[PLAYER] cannot start playback: {}", e);
                }
            }
            PlayCmd::Pause => {
                if let Err(e) = self.adapter.pause() {
                    warn!("[PLAYER] pause failed: {}", e);
                }
            }
            PlayCmd::Stop => {
                if let Err(e) = self.adapter.stop() {
                    warn!("[PLAYER] stop failed: {}", e);
                }
            }
        }
    }

    fn on_seek(&self, msg: &SeekTime) {
        if msg.originator == Originator::AudioPlayer {
            return;
        }
        let adapter = Arc::clone(&self.adapter);
        let seek_to_ms = msg.seek_to_ms;
        let spawned = spawn_detached("seek", async move {
            if let Err(e) = adapter.seek(seek_to_ms).await {
                warn!("[PLAYER] seek failed: {}", e);
            }
        });
        if let Err(e) = spawned {
            warn!("[PLAYER] cannot seek: {}", e);
        }
    }

    fn on_heartbeat(&self, msg: &Heartbeat) {
        if msg.originator == Originator::AudioPlayer || msg.current_playback_info.is_some() {
            return;
        }
        if let Some(info) = self.adapter.report_status() {
            self.bridges
                .heartbeat
                .publish(&Heartbeat::echo(Originator::AudioPlayer, info));
        }
    }

    fn on_playback_meta(&self, msg: &PlaybackMeta) {
        let merged = {
            let mut metadata = self.metadata.lock();
            metadata.merge(&msg.meta);
            metadata.clone()
        };
        self.session.set_metadata(&merged);
    }

    fn publish_play_pause(&self, cmd: PlayCmd) {
        let playback = self.last_playback.lock().clone().unwrap_or_default();
        self.bridges.play_pause.publish(&PlayPause {
            cmd,
            playback,
            originator: Originator::AudioPlayer,
        });
    }

    fn wire_media_session(&self) {
        for action in [MediaAction::Play, MediaAction::Pause] {
            let server = Arc::clone(&self.server);
            self.session.set_action_handler(
                action,
                Some(Arc::new(move || {
                    let payload = json!({
                        "cmd": action.as_cmd(),
                        "originator": Originator::AudioPlayer.as_str(),
                    });
                    if let Err(e) = server.push_event(PLAY_PAUSE_EVENT, payload) {
                        warn!("[PLAYER] media session {} not relayed: {}", action.as_cmd(), e);
                    }
                })),
            );
        }
        info!("[PLAYER] media session wired");
    }
}
