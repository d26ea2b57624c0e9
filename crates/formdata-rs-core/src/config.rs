//! Decode configuration.
//!
//! [`DecodeConfig`] is the fully-resolved set of options consumed by the
//! multipart reader. [`RouteDecodeConfig`] is a sparse per-route override: any
//! field it sets wins over the global config, and any field it leaves unset
//! falls back to the global value.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default cap on a single scalar field (1 MiB).
pub const DEFAULT_MAX_FIELD_SIZE: u64 = 1_048_576;

/// Default cap on the number of scalar fields in one body.
pub const DEFAULT_MAX_FIELDS: usize = 1000;

/// Default cap on a single part's header block (8 KiB).
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8192;

/// Options for decoding one multipart body.
///
/// # Examples
///
/// ```
/// use formdata_rs_core::config::DecodeConfig;
///
/// let config = DecodeConfig::default();
/// assert!(config.auto_delete_file);
/// assert_eq!(config.max_fields, Some(1000));
/// assert_eq!(config.max_file_size, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Delete temp files once the request completes, whatever the outcome.
    pub auto_delete_file: bool,
    /// Directory where uploaded files are written. Created on demand.
    pub destination: PathBuf,
    /// Maximum size of one uploaded file in bytes. `None` means unlimited.
    pub max_file_size: Option<u64>,
    /// Maximum size of one scalar field in bytes.
    pub max_field_size: u64,
    /// Maximum number of scalar fields. `None` means unlimited.
    pub max_fields: Option<usize>,
    /// Maximum number of file parts. `None` means unlimited.
    pub max_files: Option<usize>,
    /// Maximum size of a single part's header block in bytes.
    pub max_header_size: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            auto_delete_file: true,
            destination: std::env::temp_dir(),
            max_file_size: None,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            max_fields: Some(DEFAULT_MAX_FIELDS),
            max_files: None,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
        }
    }
}

impl DecodeConfig {
    /// Returns the effective config for a route: fields set on `route` take
    /// precedence, unset fields keep the value from `self`.
    ///
    /// The `Option`-typed limits use a nested `Option` in the override so a
    /// route can explicitly lift a global limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use formdata_rs_core::config::{DecodeConfig, RouteDecodeConfig};
    ///
    /// let global = DecodeConfig::default();
    /// let route = RouteDecodeConfig {
    ///     auto_delete_file: Some(false),
    ///     max_file_size: Some(Some(1024)),
    ///     ..RouteDecodeConfig::default()
    /// };
    ///
    /// let merged = global.merged_with(&route);
    /// assert!(!merged.auto_delete_file);
    /// assert_eq!(merged.max_file_size, Some(1024));
    /// assert_eq!(merged.max_field_size, global.max_field_size);
    /// ```
    #[must_use]
    pub fn merged_with(&self, route: &RouteDecodeConfig) -> Self {
        Self {
            auto_delete_file: route.auto_delete_file.unwrap_or(self.auto_delete_file),
            destination: route
                .destination
                .clone()
                .unwrap_or_else(|| self.destination.clone()),
            max_file_size: route.max_file_size.unwrap_or(self.max_file_size),
            max_field_size: route.max_field_size.unwrap_or(self.max_field_size),
            max_fields: route.max_fields.unwrap_or(self.max_fields),
            max_files: route.max_files.unwrap_or(self.max_files),
            max_header_size: route.max_header_size.unwrap_or(self.max_header_size),
        }
    }

    /// Merges an optional route override, returning a copy of `self` when
    /// the route has no override.
    #[must_use]
    pub fn resolve(&self, route: Option<&RouteDecodeConfig>) -> Self {
        route.map_or_else(|| self.clone(), |route| self.merged_with(route))
    }
}

/// A sparse, per-route override of [`DecodeConfig`].
///
/// Every field is optional; see [`DecodeConfig::merged_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteDecodeConfig {
    /// Override for [`DecodeConfig::auto_delete_file`].
    pub auto_delete_file: Option<bool>,
    /// Override for [`DecodeConfig::destination`].
    pub destination: Option<PathBuf>,
    /// Override for [`DecodeConfig::max_file_size`].
    pub max_file_size: Option<Option<u64>>,
    /// Override for [`DecodeConfig::max_field_size`].
    pub max_field_size: Option<u64>,
    /// Override for [`DecodeConfig::max_fields`].
    pub max_fields: Option<Option<usize>>,
    /// Override for [`DecodeConfig::max_files`].
    pub max_files: Option<Option<usize>>,
    /// Override for [`DecodeConfig::max_header_size`].
    pub max_header_size: Option<usize>,
}
