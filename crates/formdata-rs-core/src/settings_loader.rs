//! Settings loading from configuration files.
//!
//! Provides functions to load [`Settings`] from TOML and JSON files and to
//! apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FORMDATA_DEBUG` | `debug` |
//! | `FORMDATA_LOG_LEVEL` | `log_level` |
//! | `FORMDATA_AUTO_DELETE_FILE` | `form_data.auto_delete_file` |
//! | `FORMDATA_DESTINATION` | `form_data.destination` |
//! | `FORMDATA_MAX_FILE_SIZE` | `form_data.max_file_size` |
//! | `FORMDATA_MAX_FIELD_SIZE` | `form_data.max_field_size` |
//! | `FORMDATA_MAX_FIELDS` | `form_data.max_fields` |
//! | `FORMDATA_MAX_FILES` | `form_data.max_files` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use formdata_rs_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("config/formdata.toml").unwrap();
//! let settings = settings_loader::from_json_file_with_env("config/formdata.json").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::FormDataError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Keys missing from the TOML keep their default values, including keys
/// inside the `[form_data]` table.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, FormDataError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormDataError::Configuration(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, FormDataError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        FormDataError::Configuration(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, FormDataError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, FormDataError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormDataError::Configuration(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, FormDataError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        FormDataError::Configuration(format!(
            "Failed to read JSON file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_json_str(&content)
}

/// Loads settings from a JSON file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> Result<Settings, FormDataError> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Boolean variables accept "true"/"1"/"yes" (case-insensitive) as true and
/// anything else as false. Numeric variables that fail to parse are ignored.
/// The limit variables accept "none" (or an empty value) to lift the limit.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("FORMDATA_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("FORMDATA_LOG_LEVEL") {
        settings.log_level = val;
    }

    let form_data = &mut settings.form_data;

    if let Ok(val) = std::env::var("FORMDATA_AUTO_DELETE_FILE") {
        form_data.auto_delete_file = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("FORMDATA_DESTINATION") {
        if !val.trim().is_empty() {
            form_data.destination = PathBuf::from(val);
        }
    }

    if let Ok(val) = std::env::var("FORMDATA_MAX_FILE_SIZE") {
        if let Some(limit) = parse_limit::<u64>(&val) {
            form_data.max_file_size = limit;
        }
    }

    if let Ok(val) = std::env::var("FORMDATA_MAX_FIELD_SIZE") {
        if let Ok(size) = val.trim().parse::<u64>() {
            form_data.max_field_size = size;
        }
    }

    if let Ok(val) = std::env::var("FORMDATA_MAX_FIELDS") {
        if let Some(limit) = parse_limit::<usize>(&val) {
            form_data.max_fields = limit;
        }
    }

    if let Ok(val) = std::env::var("FORMDATA_MAX_FILES") {
        if let Some(limit) = parse_limit::<usize>(&val) {
            form_data.max_files = limit;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Parses an optional limit. `Some(None)` lifts the limit, `None` means the
/// value was not understood and should be ignored.
fn parse_limit<T: std::str::FromStr>(val: &str) -> Option<Option<T>> {
    let val = val.trim();
    if val.is_empty() || val.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    val.parse::<T>().ok().map(Some)
}

fn merge_over_defaults(
    value: serde_json::Value,
    format: &str,
) -> Result<Settings, FormDataError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FormDataError::Configuration(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        FormDataError::Configuration(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
