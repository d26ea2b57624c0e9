//! Best-effort typing of scalar form fields.
//!
//! Multipart fields arrive as text. [`coerce_value`] turns that text into the
//! most specific JSON-shaped value it plausibly represents, applying these
//! rules in order (first match wins):
//!
//! 1. `"undefined"` -> [`BodyValue::Undefined`]
//! 2. `"null"` -> JSON `null`
//! 3. a complete numeric literal -> JSON number
//! 4. `"true"` / `"false"`, case-insensitively -> JSON boolean
//! 5. anything else -> the original string
//!
//! Coercion never fails. File parts are passed through untouched.

use std::collections::HashMap;

use serde_json::{Number, Value};

use crate::upload::{DecodedField, RawForm, UploadedFile};

/// Largest integer magnitude that a JSON number can carry exactly as a double.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A decoded and coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyValue {
    /// The client sent the literal string `undefined`.
    Undefined,
    /// A coerced scalar.
    Json(Value),
    /// An uploaded file.
    File(UploadedFile),
}

impl BodyValue {
    /// Returns the JSON value, if this is a coerced scalar.
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Undefined | Self::File(_) => None,
        }
    }

    /// Returns the file handle, if this is a file part.
    pub const fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Undefined | Self::Json(_) => None,
        }
    }

    /// Returns `true` for [`BodyValue::Undefined`].
    pub const fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }
}

/// The decoded request body: field name -> coerced value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBody {
    fields: HashMap<String, BodyValue>,
}

impl DecodedBody {
    /// Creates an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `name`.
    pub fn get(&self, name: &str) -> Option<&BodyValue> {
        self.fields.get(name)
    }

    /// Sets `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: BodyValue) {
        self.fields.insert(name.into(), value);
    }

    /// Returns `true` if `name` is present (including as `Undefined`).
    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BodyValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over the uploaded files.
    pub fn files(&self) -> impl Iterator<Item = &UploadedFile> {
        self.fields.values().filter_map(BodyValue::as_file)
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders the body as a JSON object.
    ///
    /// `Undefined` fields are omitted. Files become objects with their
    /// original name, content type, size, and stored path.
    pub fn to_json(&self) -> Value {
        let map = self
            .fields
            .iter()
            .filter_map(|(name, value)| {
                let json = match value {
                    BodyValue::Undefined => return None,
                    BodyValue::Json(value) => value.clone(),
                    BodyValue::File(file) => serde_json::json!({
                        "fieldName": file.field_name,
                        "originalName": file.name,
                        "mimeType": file.content_type,
                        "size": file.size,
                        "path": file.path.display().to_string(),
                    }),
                };
                Some((name.clone(), json))
            })
            .collect();
        Value::Object(map)
    }
}

impl IntoIterator for DecodedBody {
    type Item = (String, BodyValue);
    type IntoIter = std::collections::hash_map::IntoIter<String, BodyValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(String, BodyValue)> for DecodedBody {
    fn from_iter<I: IntoIterator<Item = (String, BodyValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Coerces every scalar field of a raw form; files pass through.
pub fn coerce(raw: RawForm) -> DecodedBody {
    raw.into_iter()
        .map(|(name, field)| {
            let value = match field {
                DecodedField::Scalar(text) => coerce_value(&text),
                DecodedField::File(file) => BodyValue::File(file),
            };
            (name, value)
        })
        .collect()
}

/// Coerces one scalar field value.
///
/// # Examples
///
/// ```
/// use formdata_rs_http::{coerce_value, BodyValue};
/// use serde_json::json;
///
/// assert_eq!(coerce_value("29"), BodyValue::Json(json!(29)));
/// assert_eq!(coerce_value("007"), BodyValue::Json(json!(7)));
/// assert_eq!(coerce_value("FALSE"), BodyValue::Json(json!(false)));
/// assert_eq!(coerce_value("null"), BodyValue::Json(json!(null)));
/// assert_eq!(coerce_value("undefined"), BodyValue::Undefined);
/// assert_eq!(coerce_value(""), BodyValue::Json(json!("")));
/// assert_eq!(coerce_value("42abc"), BodyValue::Json(json!("42abc")));
/// ```
pub fn coerce_value(raw: &str) -> BodyValue {
    if raw == "undefined" {
        return BodyValue::Undefined;
    }
    if raw == "null" {
        return BodyValue::Json(Value::Null);
    }
    if let Some(number) = parse_number(raw) {
        return BodyValue::Json(Value::Number(number));
    }

    let lower = raw.to_lowercase();
    if lower == "true" || lower == "false" {
        return BodyValue::Json(Value::Bool(lower == "true"));
    }

    BodyValue::Json(Value::String(raw.to_string()))
}

/// Parses `raw` if the whole string (ignoring surrounding whitespace) is a
/// numeric literal with a finite value.
///
/// Blank strings are rejected rather than read as zero.
#[allow(clippy::cast_possible_truncation)]
fn parse_number(raw: &str) -> Option<Number> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let value = match parse_radix_integer(text) {
        Some(value) => value,
        None if is_decimal_literal(text) => text.parse::<f64>().ok()?,
        None => return None,
    };
    if !value.is_finite() {
        return None;
    }

    if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}

/// Parses unsigned `0x`, `0o`, and `0b` integer literals.
///
/// Literals too wide for exact representation are rounded like any other
/// float; overlong ones overflow to infinity and are rejected by the caller.
fn parse_radix_integer(text: &str) -> Option<f64> {
    let prefix = text.get(..2)?;
    let radix = match prefix {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    Some(
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc: f64, d| acc.mul_add(f64::from(radix), f64::from(d))),
    )
}

/// Checks `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`.
fn is_decimal_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return false;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    fn json(value: Value) -> BodyValue {
        BodyValue::Json(value)
    }

    // ── Literal markers ─────────────────────────────────────────────

    #[test]
    fn test_undefined_and_null() {
        assert_eq!(coerce_value("undefined"), BodyValue::Undefined);
        assert_eq!(coerce_value("null"), json(Value::Null));
        // Only the exact lower-case spellings are markers.
        assert_eq!(coerce_value("NULL"), json(json!("NULL")));
        assert_eq!(coerce_value("Undefined"), json(json!("Undefined")));
    }

    // ── Numbers ─────────────────────────────────────────────────────

    #[test]
    fn test_integers() {
        assert_eq!(coerce_value("42"), json(json!(42)));
        assert_eq!(coerce_value("-17"), json(json!(-17)));
        assert_eq!(coerce_value("+5"), json(json!(5)));
        assert_eq!(coerce_value("007"), json(json!(7)));
        assert_eq!(coerce_value("-0"), json(json!(0)));
    }

    #[test]
    fn test_floats_and_exponents() {
        assert_eq!(coerce_value("3.25"), json(json!(3.25)));
        assert_eq!(coerce_value(".5"), json(json!(0.5)));
        assert_eq!(coerce_value("5."), json(json!(5)));
        assert_eq!(coerce_value("1e3"), json(json!(1000)));
        assert_eq!(coerce_value("2.5E-1"), json(json!(0.25)));
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(coerce_value(" 42 "), json(json!(42)));
        assert_eq!(coerce_value("\n7\t"), json(json!(7)));
    }

    #[test]
    fn test_blank_strings_are_not_zero() {
        assert_eq!(coerce_value(""), json(json!("")));
        assert_eq!(coerce_value("   "), json(json!("   ")));
        assert_eq!(coerce_value("\r\n"), json(json!("\r\n")));
    }

    #[test]
    fn test_radix_literals() {
        assert_eq!(coerce_value("0x1F"), json(json!(31)));
        assert_eq!(coerce_value("0o17"), json(json!(15)));
        assert_eq!(coerce_value("0b101"), json(json!(5)));
        assert_eq!(coerce_value("0x"), json(json!("0x")));
        assert_eq!(coerce_value("-0x10"), json(json!("-0x10")));
        assert_eq!(coerce_value("0b102"), json(json!("0b102")));
    }

    #[test]
    fn test_wide_radix_literals_become_floats() {
        assert_eq!(coerce_value("0x1FFFFFFFFFFFFF"), json(json!(9_007_199_254_740_991_i64)));
        assert_eq!(coerce_value("0x10000000000000000"), json(json!(18_446_744_073_709_551_616.0)));
        assert_eq!(coerce_value("0xFFFFFFFFFFFFFFFFFF"), json(json!(4_722_366_482_869_645_213_696.0)));
        let overlong = format!("0x{}", "F".repeat(300));
        assert_eq!(coerce_value(&overlong), json(json!(overlong.clone())));
    }

    #[test]
    fn test_partial_and_non_finite_numbers_stay_strings() {
        assert_eq!(coerce_value("42abc"), json(json!("42abc")));
        assert_eq!(coerce_value("1,000"), json(json!("1,000")));
        assert_eq!(coerce_value("1_000"), json(json!("1_000")));
        assert_eq!(coerce_value("1e"), json(json!("1e")));
        assert_eq!(coerce_value("."), json(json!(".")));
        assert_eq!(coerce_value("-"), json(json!("-")));
        assert_eq!(coerce_value("Infinity"), json(json!("Infinity")));
        assert_eq!(coerce_value("NaN"), json(json!("NaN")));
        assert_eq!(coerce_value("inf"), json(json!("inf")));
        assert_eq!(coerce_value("1e400"), json(json!("1e400")));
    }

    #[test]
    fn test_large_integers_become_floats() {
        let value = coerce_value("12345678901234567890");
        let number = value.as_json().and_then(Value::as_f64).unwrap();
        assert!((number - 1.234_567_890_123_456_8e19).abs() < 1e4);
    }

    // ── Booleans ────────────────────────────────────────────────────

    #[test]
    fn test_booleans_case_insensitive() {
        assert_eq!(coerce_value("true"), json(json!(true)));
        assert_eq!(coerce_value("FALSE"), json(json!(false)));
        assert_eq!(coerce_value("True"), json(json!(true)));
        assert_eq!(coerce_value(" true"), json(json!(" true")));
        assert_eq!(coerce_value("yes"), json(json!("yes")));
    }

    // ── Strings ─────────────────────────────────────────────────────

    #[test]
    fn test_other_text_is_kept() {
        assert_eq!(coerce_value("hello"), json(json!("hello")));
        assert_eq!(coerce_value("{\"a\":1}"), json(json!("{\"a\":1}")));
    }

    #[test]
    fn test_coercion_is_deterministic() {
        for raw in ["", "0", "007", "true", "x", "null", "undefined", "1e3"] {
            assert_eq!(coerce_value(raw), coerce_value(raw), "input {raw:?}");
        }
    }

    // ── Whole forms ─────────────────────────────────────────────────

    #[test]
    fn test_coerce_form_passes_files_through() {
        let file = UploadedFile {
            field_name: "avatar".to_string(),
            name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            size: 4,
            path: PathBuf::from("/tmp/abc.png"),
        };
        let mut raw = RawForm::new();
        raw.insert("age".to_string(), DecodedField::Scalar("29".to_string()));
        raw.insert("gone".to_string(), DecodedField::Scalar("undefined".to_string()));
        raw.insert("avatar".to_string(), DecodedField::File(file.clone()));

        let body = coerce(raw);
        assert_eq!(body.len(), 3);
        assert_eq!(body.get("age"), Some(&json(json!(29))));
        assert!(body.get("gone").is_some_and(BodyValue::is_undefined));
        assert_eq!(body.get("avatar").and_then(BodyValue::as_file), Some(&file));
        assert_eq!(body.files().count(), 1);

        let rendered = body.to_json();
        assert_eq!(rendered["age"], json!(29));
        assert!(rendered.get("gone").is_none());
        assert_eq!(rendered["avatar"]["originalName"], json!("me.png"));
        assert_eq!(rendered["avatar"]["size"], json!(4));
    }
}
