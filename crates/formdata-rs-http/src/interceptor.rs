//! Request-scoped decode and cleanup.
//!
//! [`FormDataInterceptor`] wraps a handler call: it decodes multipart bodies
//! (and leaves every other body alone), hands the result to the handler, and
//! deletes the temp files once the handler has settled.
//!
//! ## Cleanup rules
//!
//! - Decode failure: files are always deleted; nothing else can reach them.
//! - Handler success or failure: files are deleted when the effective
//!   config has `auto_delete_file` set.
//! - The returned future is dropped mid-flight: files are deleted
//!   synchronously when the handler never received them, or when
//!   `auto_delete_file` is set.

use std::fmt::Display;
use std::future::Future;

use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

use formdata_rs_core::{DecodeConfig, FormDataError, RouteDecodeConfig};

use crate::coerce::{coerce, DecodedBody};
use crate::content_type::is_multipart;
use crate::reader::FormReader;

/// The body handed to the downstream handler.
#[derive(Debug)]
pub enum RequestBody<S> {
    /// Not a multipart request: the original, unread body stream.
    Raw(S),
    /// A fully decoded and coerced multipart body.
    Form(DecodedBody),
}

impl<S> RequestBody<S> {
    /// Returns the decoded form, if the body was multipart.
    pub const fn as_form(&self) -> Option<&DecodedBody> {
        match self {
            Self::Form(body) => Some(body),
            Self::Raw(_) => None,
        }
    }

    /// Consumes `self`, returning the raw stream if the body was not decoded.
    pub fn into_raw(self) -> Option<S> {
        match self {
            Self::Raw(stream) => Some(stream),
            Self::Form(_) => None,
        }
    }
}

/// Why an intercepted request failed.
#[derive(Error, Debug)]
pub enum InterceptError<E> {
    /// The multipart body could not be decoded.
    #[error(transparent)]
    Decode(#[from] FormDataError),

    /// The downstream handler failed.
    #[error("{0}")]
    Handler(E),
}

impl<E> InterceptError<E> {
    /// Returns the decode error, if decoding failed.
    pub const fn as_decode(&self) -> Option<&FormDataError> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Handler(_) => None,
        }
    }
}

/// Decodes multipart requests for a handler and cleans up afterwards.
///
/// # Examples
///
/// ```no_run
/// use bytes::Bytes;
/// use formdata_rs_core::DecodeConfig;
/// use formdata_rs_http::{FormDataInterceptor, InterceptError, RequestBody};
///
/// # async fn run() {
/// let interceptor = FormDataInterceptor::new(DecodeConfig::default());
/// let body = "--b\r\nContent-Disposition: form-data; name=\"active\"\r\n\r\ntrue\r\n--b--\r\n";
/// let stream = futures::stream::iter([Ok::<_, std::io::Error>(Bytes::from(body))]);
///
/// let result = interceptor
///     .intercept(Some("multipart/form-data; boundary=b"), stream, None, |body| async move {
///         let form = body.as_form().expect("multipart body");
///         Ok::<_, std::convert::Infallible>(form.to_json())
///     })
///     .await;
/// assert_eq!(result.unwrap()["active"], serde_json::json!(true));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormDataInterceptor {
    global: DecodeConfig,
}

impl FormDataInterceptor {
    /// Creates an interceptor with the given global configuration.
    pub const fn new(global: DecodeConfig) -> Self {
        Self { global }
    }

    /// The global configuration route overrides are merged over.
    pub const fn global_config(&self) -> &DecodeConfig {
        &self.global
    }

    /// Runs `handler` with the request body, decoding it first if it is
    /// multipart.
    ///
    /// `route_config` overrides the global config field by field for this
    /// call only.
    pub async fn intercept<S, E, H, Fut, T, HE>(
        &self,
        content_type: Option<&str>,
        body: S,
        route_config: Option<&RouteDecodeConfig>,
        handler: H,
    ) -> Result<T, InterceptError<HE>>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
        H: FnOnce(RequestBody<S>) -> Fut,
        Fut: Future<Output = Result<T, HE>>,
    {
        let Some(content_type) = content_type.filter(|ct| is_multipart(ct)) else {
            tracing::trace!("not a multipart request, passing body through");
            return handler(RequestBody::Raw(body))
                .await
                .map_err(InterceptError::Handler);
        };

        let config = self.global.resolve(route_config);
        let auto_delete = config.auto_delete_file;
        let mut guard = CleanupGuard::new(FormReader::new(config));

        let decoded = match guard.reader.handle(content_type, body).await {
            Ok(raw) => coerce(raw),
            Err(err) => {
                tracing::debug!(error = %err, "multipart decode failed");
                guard.cleanup().await;
                return Err(InterceptError::Decode(err));
            }
        };

        guard.armed = auto_delete;
        let result = handler(RequestBody::Form(decoded)).await;
        if auto_delete {
            guard.cleanup().await;
        }
        result.map_err(InterceptError::Handler)
    }
}

/// Owns the reader for one request and deletes its files if the request
/// future is dropped while `armed`.
#[derive(Debug)]
struct CleanupGuard {
    reader: FormReader,
    armed: bool,
}

impl CleanupGuard {
    const fn new(reader: FormReader) -> Self {
        Self {
            reader,
            armed: true,
        }
    }

    async fn cleanup(&mut self) {
        self.reader.delete_files().await;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if self.armed && !self.reader.temporary_files().is_empty() {
            tracing::debug!("request dropped before cleanup, deleting temporary files");
            self.reader.delete_files_blocking();
        }
    }
}
