//! Settings for formdata-rs.
//!
//! [`Settings`] holds the logging options and the global [`DecodeConfig`] that
//! per-route overrides are merged over. Load it with
//! [`settings_loader`](crate::settings_loader) or build it directly.

use serde::{Deserialize, Serialize};

use crate::config::DecodeConfig;

/// Top-level configuration.
///
/// # Examples
///
/// ```
/// use formdata_rs_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.log_level, "info");
/// assert!(settings.form_data.auto_delete_file);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log filter (e.g. "info", "debug", "formdata_rs_http=trace").
    pub log_level: String,

    // ── Decoding ─────────────────────────────────────────────────────

    /// The global decode configuration.
    pub form_data: DecodeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            form_data: DecodeConfig::default(),
        }
    }
}
