//! # vyabridge - Media playback synchronization bridge
//!
//! Keeps one logical playback clock consistent across an interchangeable
//! media backend (HTML5 audio element or YouTube iframe) and several display
//! surfaces (time texts, progress bar, segment emphasis, OS media session),
//! under the authority of a server-rendered view that pushes commands.
//!
//! # Architecture
//!
//! - **Bridges**: the fixed set of in-process channels (`seekTime`,
//!   `playPause`, `heartbeat`, `playbackMeta`)
//! - **MediaBridge**: receives server commands, republishes them as its own,
//!   runs the heartbeat poll and owns the time displays and emphasis
//! - **PlayerHook**: binds a [`PlaybackAdapter`] to the channels and to the
//!   media session
//! - **ProgressBar**: turns pointer input into seeks and follows the others
//!
//! Every message carries its [`Originator`]; components drop their own
//! messages, which is what prevents republish loops.
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use std::sync::Arc;
//! use vyabridge::surface::memory::{MemoryDocument, MemoryText};
//! use vyabridge::{
//!     BridgeSettings, Bridges, MediaBridge, MediaBridgeView, MemorySessionStore, ServerLink,
//! };
//!
//! struct Printer;
//!
//! impl ServerLink for Printer {
//!     fn push_event(&self, event: &str, payload: serde_json::Value) -> vyabridge::Result<()> {
//!         println!("{} {}", event, payload);
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> vyabridge::Result<()> {
//! let bridges = Bridges::new();
//! let view = MediaBridgeView {
//!     current_time: MemoryText::new(),
//!     duration: MemoryText::new(),
//!     document: MemoryDocument::new(),
//! };
//! let bridge = MediaBridge::mount(
//!     bridges.clone(),
//!     Arc::new(Printer),
//!     Arc::new(MemorySessionStore::new()),
//!     view,
//!     BridgeSettings::default(),
//! );
//! bridge.handle_server_event(
//!     "play_pause",
//!     serde_json::json!({"cmd": "play", "playback": {"meta": {"file_path": "a.mp3"}}}),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod channel;
pub mod coordinator;
pub mod emphasis;
mod error;
pub mod media_session;
pub mod messages;
pub mod player_hook;
pub mod progress_bar;
pub mod registry;
pub mod server;
pub mod session;
mod settings;
pub mod surface;
pub mod time_utils;
pub mod timeline;
pub mod timer;

mod config_ext;

// Réexports publics
pub use adapter::html5::{Html5AudioAdapter, MediaElement, PlayRejection, ReadyState};
pub use adapter::youtube::{IframePlayer, IframePlayerState, VideoStats, YouTubeAdapter};
pub use adapter::{AdapterState, BackendEvent, PlayOutcome, PlaybackAdapter};
pub use channel::{EventChannel, Subscription};
pub use coordinator::{DisplayHandle, DisplayKey, DisplayProperty, DisplayUpdate, MediaBridge, MediaBridgeView};
pub use emphasis::{EmphasisManager, EmphasizedNode};
pub use error::{Error, Result};
pub use media_session::{MediaAction, MediaSession};
pub use messages::{
    Heartbeat, Originator, PlayCmd, PlayPause, PlaybackAnchor, PlaybackDescriptor, PlaybackInfo,
    PlaybackMeta, PlaybackMetadata, SeekTime,
};
pub use player_hook::{GestureEffect, PlayerHook};
pub use progress_bar::{PointerInput, PointerKind, ProgressBar, ProgressBarConfig};
pub use registry::Bridges;
pub use server::{ServerCommand, ServerLink};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};
pub use settings::BridgeSettings;
pub use timeline::{SegmentEvent, Timeline};
pub use timer::ScheduledTask;

pub use config_ext::BridgeConfigExt;
