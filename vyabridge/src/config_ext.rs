//! Extension de vyaconfig pour le bridge

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::settings::BridgeSettings;

/// Trait d'extension pour vyaconfig::Config
pub trait BridgeConfigExt {
    /// Builds the bridge settings, falling back to defaults key by key.
    fn bridge_settings(&self) -> Result<BridgeSettings>;

    /// Path of the durable session record.
    fn session_file_path(&self) -> Result<PathBuf>;
}

impl BridgeConfigExt for vyaconfig::Config {
    fn bridge_settings(&self) -> Result<BridgeSettings> {
        Ok(BridgeSettings {
            heartbeat_interval: Duration::from_millis(self.get_heartbeat_interval_ms()?.max(1)),
            autoplay_max_delay: Duration::from_millis(self.get_autoplay_max_delay_ms()?),
            follow_mode: self.get_follow_mode()?,
            emphasis_class: self.get_emphasis_class()?,
            preamble_dom_id: self.get_preamble_dom_id()?,
            segment_dom_prefix: self.get_segment_dom_prefix()?,
            player_target: self.get_player_target()?,
            next_item_event: self.get_next_item_event()?,
        })
    }

    fn session_file_path(&self) -> Result<PathBuf> {
        let session_dir = self.get_managed_dir(&["session", "directory"], "session")?;
        Ok(PathBuf::from(session_dir).join("session.json"))
    }
}
