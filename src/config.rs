//! Host-supplied configuration (§6). A plain record, filled in by the host
//! and handed to [`crate::engine::PanelLink::new`] — no file/env parsing is
//! in scope.

use crate::tables::Language;

/// Factory-default Powerlink download code, used when enrolling against a
/// panel that has not had its download code changed.
pub const DEFAULT_DOWNLOAD_CODE: [u8; 2] = [0x56, 0x50];

/// The six options enumerated in §6, consumed at startup and on change.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Seconds before a triggered motion sensor auto-clears (§4.8 AB/3).
    pub motion_off_delay: u32,
    /// Pin used when a command caller omits one; `None` = unset.
    pub override_code: Option<u16>,
    /// User-facing table language.
    pub plugin_language: Language,
    /// Skip Powerlink enrollment entirely; run in Standard/observer mode.
    pub force_standard: bool,
    /// Send Set-Time after Panel-Info.
    pub auto_sync_time: bool,
    /// Gate for the Arm command.
    pub enable_remote_arm: bool,
    /// Gate for the Bypass command.
    pub enable_sensor_bypass: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            motion_off_delay: 120,
            override_code: None,
            plugin_language: Language::En,
            force_standard: false,
            auto_sync_time: true,
            enable_remote_arm: true,
            enable_sensor_bypass: true,
        }
    }
}
