//! Logging integration for formdata-rs.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-decode spans.

use crate::settings::Settings;

/// Target of the decoder's per-part and cleanup events.
pub const DECODER_TARGET: &str = "formdata_rs_http";

/// Builds the subscriber filter for `settings`.
///
/// The base filter comes from `settings.log_level`, falling back to `info`
/// when it does not parse. In debug mode the decoder's own events are raised
/// to `debug` unless the log level already says something about them.
pub fn log_filter(settings: &Settings) -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::filter::Directive;
    use tracing_subscriber::EnvFilter;

    let mut filter =
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if settings.debug && !settings.log_level.contains(DECODER_TARGET) {
        if let Ok(directive) = format!("{DECODER_TARGET}=debug").parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Sets up the global tracing subscriber based on the given settings.
///
/// In debug mode a pretty, human-readable format is used; otherwise a
/// structured JSON format that carries the enclosing `multipart_decode` span,
/// so every event of one decode can be grouped by boundary.
///
/// Installing a second subscriber is a no-op, so this is safe to call from
/// tests and from applications that already configured tracing.
pub fn setup_logging(settings: &Settings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(settings))
        .with_target(true);

    let installed = if settings.debug {
        builder.pretty().with_file(true).with_line_number(true).try_init()
    } else {
        builder.json().with_current_span(true).with_span_list(false).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Creates a tracing span for decoding one multipart body.
///
/// # Examples
///
/// ```
/// use formdata_rs_core::logging::decode_span;
///
/// let span = decode_span("----WebKitFormBoundary7MA4YWxk");
/// let _guard = span.enter();
/// tracing::debug!("decoding multipart body");
/// ```
pub fn decode_span(boundary: &str) -> tracing::Span {
    tracing::debug_span!("multipart_decode", boundary = boundary)
}
