mod logs;
mod simulated;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use vyabridge::surface::memory::{MemoryAffordance, MemoryDocument, MemoryFill, MemoryText};
use vyabridge::surface::{FillNode, TextNode};
use vyabridge::{
    BackendEvent, BridgeConfigExt, Bridges, FileSessionStore, Html5AudioAdapter, MediaBridge,
    MediaBridgeView, PlayerHook, PointerInput, PointerKind, ProgressBar, ProgressBarConfig,
    media_session::NoMediaSession,
};
use vyaconfig::get_config;

use crate::simulated::{LoggingServerLink, SimulatedAudio};

/// One scripted server push.
#[derive(Debug, Deserialize)]
struct ScriptStep {
    /// Delay before this step, in milliseconds.
    #[serde(default)]
    after_ms: u64,
    event: String,
    #[serde(default)]
    payload: Value,
}

fn default_script() -> Vec<ScriptStep> {
    let step = |after_ms, event: &str, payload| ScriptStep {
        after_ms,
        event: event.to_string(),
        payload,
    };
    vec![
        step(0, "initSession", json!({"id": "vyasim-session"})),
        step(
            0,
            "registerEventsTimeline",
            json!({"events": [
                {"origin": 0, "duration": 1000, "segment_id": 1},
                {"origin": 1000, "duration": 1000, "segment_id": 2},
                {"origin": 2000, "duration": 1000, "segment_id": 3}
            ]}),
        ),
        step(
            0,
            "registerPlayback",
            json!({"meta": {"title": "Chapter 1", "artists": ["Reader"], "duration": 3000}}),
        ),
        step(0, "toggleFollowMode", json!({})),
        step(
            0,
            "play_pause",
            json!({
                "cmd": "play",
                "playback": {"meta": {"file_path": "chapter-1.mp3"}, "playing?": false, "elapsed": 0},
                "originator": "MediaBridge"
            }),
        ),
        step(1200, "play_pause", json!({"cmd": "pause", "originator": "MediaBridge"})),
        step(500, "seekTime", json!({"seekToMs": 1500, "originator": "MediaBridge"})),
        step(
            0,
            "play_pause",
            json!({
                "cmd": "play",
                "playback": {"meta": {"file_path": "chapter-1.mp3?t=abc"}, "elapsed": 1500},
                "originator": "MediaBridge"
            }),
        ),
    ]
}

fn load_script(path: &str) -> Result<Vec<ScriptStep>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let level = logs::init_logging();
    if let Ok(requested) = std::env::var("VYASIM_LEVEL") {
        logs::set_level(&level, &requested)?;
    }

    let config = get_config();
    let settings = config.bridge_settings()?;
    let session_path = config.session_file_path()?;
    info!(config_dir = config.dir(), "🎧 vyasim starting");

    let script = match std::env::args().nth(1) {
        Some(path) => load_script(&path)?,
        None => default_script(),
    };

    // ========== Page ==========
    let bridges = Bridges::new();
    let server = Arc::new(LoggingServerLink);
    let document = MemoryDocument::new();
    document.insert(&settings.preamble_dom_id);
    for id in 1..=3 {
        document.insert(&format!("{}{}", settings.segment_dom_prefix, id));
    }
    let current_time = MemoryText::new();
    let duration = MemoryText::new();
    let fill = MemoryFill::new();

    let bridge = MediaBridge::mount(
        bridges.clone(),
        server.clone(),
        Arc::new(FileSessionStore::new(session_path)),
        MediaBridgeView {
            current_time: current_time.clone(),
            duration: duration.clone(),
            document: document.clone(),
        },
        settings.clone(),
    );

    let element = Arc::new(SimulatedAudio::new(3.0));
    let adapter = Arc::new(Html5AudioAdapter::new(element, MemoryAffordance::new()));
    let hook = PlayerHook::mount(
        adapter,
        bridges.clone(),
        server.clone(),
        Arc::new(NoMediaSession),
    );
    hook.handle_backend_event(BackendEvent::CanPlayThrough);

    let bar = ProgressBar::mount(
        bridges.clone(),
        server.clone(),
        fill.clone(),
        ProgressBarConfig {
            max_duration_ms: None,
            target: settings.player_target.clone(),
        },
    );

    // ========== Script ==========
    for step in script {
        if step.after_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.after_ms)).await;
        }
        info!(event = %step.event, "[SERVER] -> push");
        if let Err(e) = bridge.handle_server_event(&step.event, step.payload) {
            warn!("⚠️ command '{}' rejected: {}", step.event, e);
        }
        info!(
            time = %current_time.text(),
            duration = %duration.text(),
            progress = %fill.width(),
            emphasized = ?bridge.emphasized_dom_id(),
            "📺 display"
        );
    }

    // a listener scrubbing the bar, then waiting for the end of the chapter
    tokio::time::sleep(Duration::from_millis(300)).await;
    bar.handle_pointer(PointerInput::new(PointerKind::Click, 150.0, 200.0));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(250)).await;
        info!(
            time = %current_time.text(),
            progress = %fill.width(),
            emphasized = ?bridge.emphasized_dom_id(),
            heartbeat = bridge.is_heartbeat_running(),
            "📺 display"
        );
        if !bridge.is_heartbeat_running() && !bridge.is_next_item_pending() {
            break;
        }
    }

    info!(session = ?bridge.session_id(), "✅ vyasim done");
    Ok(())
}
