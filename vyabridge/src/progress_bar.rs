//! Progress bar: displays the playback position and turns pointer input into
//! seeks.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::channel::Subscription;
use crate::messages::{Heartbeat, Originator, PlaybackMeta, SeekTime};
use crate::registry::Bridges;
use crate::server::ServerLink;
use crate::surface::FillNode;
use crate::time_utils::percent_width;

const IDENTITY: Originator = Originator::ProgressBar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Click,
}

/// Pointer event in track coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerInput {
    pub kind: PointerKind,
    /// Distance from the left edge of the track.
    pub offset_px: f64,
    pub track_width_px: f64,
}

impl PointerInput {
    pub fn new(kind: PointerKind, offset_px: f64, track_width_px: f64) -> Self {
        Self {
            kind,
            offset_px,
            track_width_px,
        }
    }
}

/// Element configuration of a bar.
#[derive(Clone, Debug)]
pub struct ProgressBarConfig {
    pub max_duration_ms: Option<f64>,
    /// Server-side component receiving forwarded seeks.
    pub target: String,
}

#[derive(Default)]
struct BarState {
    max_duration_ms: Option<f64>,
    dragging: bool,
    // a release is followed by a click for the same gesture
    suppress_click: bool,
}

struct BarInner {
    bridges: Bridges,
    server: Arc<dyn ServerLink>,
    fill: Arc<dyn FillNode>,
    target: String,
    state: Mutex<BarState>,
}

pub struct ProgressBar {
    inner: Arc<BarInner>,
    _subscriptions: Vec<Subscription>,
}

impl ProgressBar {
    pub fn mount(
        bridges: Bridges,
        server: Arc<dyn ServerLink>,
        fill: Arc<dyn FillNode>,
        config: ProgressBarConfig,
    ) -> Self {
        let inner = Arc::new(BarInner {
            bridges: bridges.clone(),
            server,
            fill,
            target: config.target,
            state: Mutex::new(BarState {
                max_duration_ms: config.max_duration_ms,
                ..Default::default()
            }),
        });

        let weak = Arc::downgrade(&inner);
        let subscriptions = vec![
            bridges.heartbeat.subscribe(with_inner(&weak, BarInner::on_heartbeat)),
            bridges.seek_time.subscribe(with_inner(&weak, BarInner::on_seek)),
            bridges
                .playback_meta
                .subscribe(with_inner(&weak, BarInner::on_playback_meta)),
        ];

        Self {
            inner,
            _subscriptions: subscriptions,
        }
    }

    pub fn set_max_duration(&self, max_duration_ms: f64) {
        self.inner.state.lock().max_duration_ms = Some(max_duration_ms);
    }

    pub fn max_duration(&self) -> Option<f64> {
        self.inner.state.lock().max_duration_ms
    }

    pub fn is_dragging(&self) -> bool {
        self.inner.state.lock().dragging
    }

    /// Handles one pointer event. Returns the position published as a seek,
    /// if any.
    ///
    /// Press and drag only repaint a preview. The release publishes once and
    /// swallows the click that follows it; a click on its own publishes
    /// immediately.
    pub fn handle_pointer(&self, input: PointerInput) -> Option<f64> {
        let publish = {
            let mut state = self.inner.state.lock();
            match input.kind {
                PointerKind::Down => {
                    state.dragging = true;
                    state.suppress_click = false;
                    false
                }
                PointerKind::Move if !state.dragging => return None,
                PointerKind::Move => false,
                PointerKind::Up if !state.dragging => return None,
                PointerKind::Up => {
                    state.dragging = false;
                    state.suppress_click = true;
                    true
                }
                PointerKind::Click if state.suppress_click => {
                    state.suppress_click = false;
                    return None;
                }
                PointerKind::Click => true,
            }
        };

        let (fraction, position_ms) = self.inner.position_for(&input)?;
        self.inner.paint(fraction);
        if !publish {
            return None;
        }

        debug!(position_ms, "[PROGRESS] seek");
        self.inner.bridges.seek_time.publish_and_forward(
            &SeekTime {
                seek_to_ms: position_ms,
                originator: IDENTITY,
            },
            self.inner.server.as_ref(),
            &self.inner.target,
        );
        Some(position_ms)
    }
}

fn with_inner<M: 'static>(
    weak: &Weak<BarInner>,
    handler: fn(&BarInner, &M),
) -> impl Fn(&M) + Send + Sync + 'static {
    let weak = weak.clone();
    move |msg: &M| {
        if let Some(inner) = weak.upgrade() {
            handler(&inner, msg);
        }
    }
}

impl BarInner {
    fn position_for(&self, input: &PointerInput) -> Option<(f64, f64)> {
        let Some(max_duration_ms) = self
            .state
            .lock()
            .max_duration_ms
            .filter(|d| d.is_finite() && *d > 0.0)
        else {
            warn!("[PROGRESS] no usable duration, ignoring pointer");
            return None;
        };
        if !(input.track_width_px > 0.0) {
            warn!(width = input.track_width_px, "[PROGRESS] track has no width, ignoring pointer");
            return None;
        }

        let fraction = (input.offset_px / input.track_width_px).clamp(0.0, 1.0);
        Some((fraction, fraction * max_duration_ms))
    }

    fn paint(&self, fraction: f64) {
        self.fill.set_width(&percent_width(fraction));
    }

    fn on_heartbeat(&self, msg: &Heartbeat) {
        if msg.originator == IDENTITY || self.state.lock().dragging {
            return;
        }
        if let Some(fraction) = msg.current_playback_info.and_then(|info| info.fraction()) {
            self.paint(fraction);
        }
    }

    fn on_seek(&self, msg: &SeekTime) {
        if msg.originator == IDENTITY {
            return;
        }
        let max_duration_ms = {
            let state = self.state.lock();
            if state.dragging {
                return;
            }
            state.max_duration_ms
        };
        match max_duration_ms.filter(|d| d.is_finite() && *d > 0.0) {
            Some(max) => self.paint(msg.seek_to_ms / max),
            None => debug!("[PROGRESS] seek received before any duration"),
        }
    }

    fn on_playback_meta(&self, msg: &PlaybackMeta) {
        if let Some(duration) = msg.meta.duration.filter(|d| d.is_finite() && *d > 0.0) {
            self.state.lock().max_duration_ms = Some(duration);
        }
    }
}
