//! # formdata-rs-http
//!
//! Decodes `multipart/form-data` request bodies. A [`FormReader`] streams the
//! body into scalar fields and temp files, [`coerce`] turns the scalar fields
//! into typed JSON values, and [`FormDataInterceptor`] ties both to a handler
//! call and deletes the temp files once the handler settles.
//!
//! ## Modules
//!
//! - [`content_type`] - Multipart detection and boundary extraction
//! - [`parser`] - Incremental multipart state machine
//! - [`upload`] - Uploaded file handles and raw decoded fields
//! - [`temp_files`] - Tracking and cleanup of files written while decoding
//! - [`reader`] - The streaming [`FormReader`]
//! - [`coerce`] - Best-effort typing of scalar field values
//! - [`interceptor`] - Decode, call the handler, clean up

pub mod coerce;
pub mod content_type;
pub mod interceptor;
pub mod parser;
pub mod reader;
pub mod temp_files;
pub mod upload;

pub use coerce::{coerce, coerce_value, BodyValue, DecodedBody};
pub use content_type::{extract_boundary, is_multipart};
pub use interceptor::{FormDataInterceptor, InterceptError, RequestBody};
pub use reader::FormReader;
pub use temp_files::TemporaryFileSet;
pub use upload::{DecodedField, RawForm, UploadedFile};
