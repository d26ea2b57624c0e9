//! # formdata-rs-core
//!
//! Core types for the formdata-rs decoder. This crate has no HTTP or async
//! dependencies and provides the foundation for `formdata-rs-http`.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result alias
//! - [`config`] - Decode configuration and per-route overrides
//! - [`settings`] - Top-level settings (logging plus decode defaults)
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use config::{DecodeConfig, RouteDecodeConfig};
pub use error::{FormDataError, FormDataResult};
pub use settings::Settings;
