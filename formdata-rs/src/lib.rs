//! # formdata-rs
//!
//! Streaming `multipart/form-data` decoding with typed field coercion and
//! temp file cleanup.
//!
//! This is the meta-crate that re-exports the sub-crates for convenient
//! access. Depend on `formdata-rs` to get everything, or on the individual
//! crates for finer-grained control.
//!
//! ## Quick start
//!
//! ```no_run
//! use formdata_rs::prelude::*;
//!
//! let settings = formdata_rs::core::settings_loader::from_env();
//! formdata_rs::core::logging::setup_logging(&settings);
//!
//! let interceptor = FormDataInterceptor::new(settings.form_data);
//! assert!(interceptor.global_config().auto_delete_file);
//! ```

/// Configuration, settings loading, logging, and error types.
pub use formdata_rs_core as core;

/// Multipart parsing, the streaming reader, coercion, and the interceptor.
pub use formdata_rs_http as http;

/// Third-party crates re-exported for convenience.
pub use bytes;
pub use futures;
pub use serde_json;
pub use tracing;

/// The most commonly used types, for glob import.
pub mod prelude {
    pub use formdata_rs_core::{
        DecodeConfig, FormDataError, FormDataResult, RouteDecodeConfig, Settings,
    };
    pub use formdata_rs_http::{
        coerce, BodyValue, DecodedBody, DecodedField, FormDataInterceptor, FormReader,
        InterceptError, RawForm, RequestBody, TemporaryFileSet, UploadedFile,
    };
}
