//! Content-Type helpers.
//!
//! [`is_multipart`] decides whether a request body should be decoded at all;
//! [`extract_boundary`] pulls the delimiter out of the header.

use mime::Mime;

use crate::parser::header_params;

/// Returns `true` if the Content-Type header names any `multipart/*` type.
///
/// Malformed headers are treated as not multipart, so the body is passed
/// through untouched.
///
/// # Examples
///
/// ```
/// use formdata_rs_http::is_multipart;
///
/// assert!(is_multipart("multipart/form-data; boundary=abc"));
/// assert!(is_multipart("multipart/mixed; boundary=abc"));
/// assert!(!is_multipart("application/json"));
/// ```
pub fn is_multipart(content_type: &str) -> bool {
    essence(content_type).is_some_and(|mime| mime.type_() == mime::MULTIPART)
}

/// Extracts the boundary string from a `Content-Type: multipart/...` header.
///
/// Quoted boundaries are unquoted. Returns `None` if the header cannot be
/// parsed, is not multipart, or carries no (or an empty) boundary.
pub fn extract_boundary(content_type: &str) -> Option<String> {
    if !is_multipart(content_type) {
        return None;
    }

    // Boundaries are not always valid MIME tokens, so parameters are
    // scanned by hand.
    header_params(content_type)
        .into_iter()
        .find(|(key, _)| key == "boundary")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Parses only the `type/subtype` portion of a Content-Type header.
fn essence(content_type: &str) -> Option<Mime> {
    let essence = content_type.split(';').next()?.trim();
    essence.parse::<Mime>().ok()
}
