//! Runtime settings of the bridge components.

use std::time::Duration;

use vyaconfig::{
    DEFAULT_AUTOPLAY_MAX_DELAY_MS, DEFAULT_EMPHASIS_CLASS, DEFAULT_FOLLOW_MODE,
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_NEXT_ITEM_EVENT, DEFAULT_PLAYER_TARGET,
    DEFAULT_PREAMBLE_DOM_ID, DEFAULT_SEGMENT_DOM_PREFIX,
};

#[derive(Clone, Debug)]
pub struct BridgeSettings {
    /// Period of the heartbeat position poll.
    pub heartbeat_interval: Duration,
    /// Upper bound of the random delay before an auto-advance request.
    pub autoplay_max_delay: Duration,
    pub follow_mode: bool,
    pub emphasis_class: String,
    pub preamble_dom_id: String,
    pub segment_dom_prefix: String,
    /// Server-side component that receives forwarded seeks.
    pub player_target: String,
    /// Server event requesting the next item once playback ends.
    pub next_item_event: String,
}

/// Defaults are the ones vyaconfig falls back to, so a missing config key and
/// a settings value built in code agree.
impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            autoplay_max_delay: Duration::from_millis(DEFAULT_AUTOPLAY_MAX_DELAY_MS),
            follow_mode: DEFAULT_FOLLOW_MODE,
            emphasis_class: DEFAULT_EMPHASIS_CLASS.to_string(),
            preamble_dom_id: DEFAULT_PREAMBLE_DOM_ID.to_string(),
            segment_dom_prefix: DEFAULT_SEGMENT_DOM_PREFIX.to_string(),
            player_target: DEFAULT_PLAYER_TARGET.to_string(),
            next_item_event: DEFAULT_NEXT_ITEM_EVENT.to_string(),
        }
    }
}
