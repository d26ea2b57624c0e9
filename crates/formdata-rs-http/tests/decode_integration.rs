//! Integration tests for decoding multipart bodies end to end.
//!
//! Tests cover: the reader plus coercion on a realistic upload, chunked
//! delivery, temp file cleanup on success, handler failure, and limit
//! violations, idempotent deletion, and per-route config overrides.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::Stream;
use serde_json::json;

use formdata_rs_core::{DecodeConfig, FormDataError, RouteDecodeConfig};
use formdata_rs_http::{
    coerce, BodyValue, FormDataInterceptor, FormReader, InterceptError, RequestBody,
};

const CONTENT_TYPE: &str = "multipart/form-data; boundary=----formdata-rs-7MA4YWxk";

// ── Helpers ─────────────────────────────────────────────────────────

fn profile_body() -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in [("age", "29"), ("active", "true"), ("note", "hello")] {
        body.extend_from_slice(b"------formdata-rs-7MA4YWxk\r\n");
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    body.extend_from_slice(b"------formdata-rs-7MA4YWxk\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
          Content-Type: image/png\r\n\r\n",
    );
    body.extend_from_slice(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x00, 0xff]);
    body.extend_from_slice(b"\r\n------formdata-rs-7MA4YWxk--\r\n");
    body
}

/// Splits `body` into chunks of `size` bytes.
fn chunked(body: &[u8], size: usize) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
    let chunks: Vec<_> = body
        .chunks(size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    futures::stream::iter(chunks)
}

fn config_in(dir: &std::path::Path) -> DecodeConfig {
    DecodeConfig {
        destination: dir.to_path_buf(),
        ..DecodeConfig::default()
    }
}

fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// ═════════════════════════════════════════════════════════════════════
// 1. Reader + coercion produce typed fields and a stored file
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_profile_upload_decodes_and_coerces() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = FormReader::new(config_in(dir.path()));

    let raw = reader
        .handle(CONTENT_TYPE, chunked(&profile_body(), 7))
        .await
        .unwrap();
    let body = coerce(raw);

    assert_eq!(body.len(), 4);
    assert_eq!(body.get("age"), Some(&BodyValue::Json(json!(29))));
    assert_eq!(body.get("active"), Some(&BodyValue::Json(json!(true))));
    assert_eq!(body.get("note"), Some(&BodyValue::Json(json!("hello"))));

    let avatar = body.get("avatar").and_then(BodyValue::as_file).unwrap();
    assert_eq!(avatar.field_name, "avatar");
    assert_eq!(avatar.name, "me.png");
    assert_eq!(avatar.content_type, "image/png");
    assert_eq!(avatar.size, 8);
    assert!(avatar.path.starts_with(dir.path()));
    assert_eq!(
        avatar.read().await.unwrap(),
        vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x00, 0xff]
    );
    assert!(reader.temporary_files().contains(&avatar.path));

    reader.delete_files().await;
    assert!(!avatar.exists().await);
}

#[tokio::test]
async fn test_json_view_of_decoded_body() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = FormReader::new(config_in(dir.path()));
    let body = coerce(
        reader
            .handle(CONTENT_TYPE, chunked(&profile_body(), 64))
            .await
            .unwrap(),
    );

    let value = body.to_json();
    assert_eq!(value["age"], json!(29));
    assert_eq!(value["active"], json!(true));
    assert_eq!(value["avatar"]["originalName"], json!("me.png"));
    assert_eq!(value["avatar"]["mimeType"], json!("image/png"));
    assert_eq!(value["avatar"]["size"], json!(8));

    reader.delete_files().await;
}

// ═════════════════════════════════════════════════════════════════════
// 2. Interceptor cleanup lifecycle
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_interceptor_deletes_files_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let interceptor = FormDataInterceptor::new(config_in(dir.path()));
    let seen: Arc<Mutex<Option<PathBuf>>> = Arc::default();
    let seen_in_handler = Arc::clone(&seen);

    let json = interceptor
        .intercept(
            Some(CONTENT_TYPE),
            chunked(&profile_body(), 16),
            None,
            |body| async move {
                let form = body.as_form().unwrap();
                let avatar = form.files().next().unwrap();
                assert!(avatar.exists().await);
                *seen_in_handler.lock().unwrap() = Some(avatar.path.clone());
                Ok::<_, std::io::Error>(form.to_json())
            },
        )
        .await
        .unwrap();

    assert_eq!(json["note"], json!("hello"));
    assert!(!seen.lock().unwrap().as_ref().unwrap().exists());
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_interceptor_deletes_files_after_handler_error() {
    let dir = tempfile::tempdir().unwrap();
    let interceptor = FormDataInterceptor::new(config_in(dir.path()));

    let result: Result<(), InterceptError<String>> = interceptor
        .intercept(
            Some(CONTENT_TYPE),
            chunked(&profile_body(), 16),
            None,
            |_| async move { Err("validation failed".to_string()) },
        )
        .await;

    match result {
        Err(InterceptError::Handler(msg)) => assert_eq!(msg, "validation failed"),
        other => panic!("expected handler error, got {other:?}"),
    }
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_oversized_file_rejected_and_cleaned_up() {
    let dir = tempfile::tempdir().unwrap();
    let interceptor = FormDataInterceptor::new(DecodeConfig {
        max_file_size: Some(4),
        ..config_in(dir.path())
    });

    let result = interceptor
        .intercept(
            Some(CONTENT_TYPE),
            chunked(&profile_body(), 3),
            None,
            |_| async move { Ok::<_, std::io::Error>(()) },
        )
        .await;

    let err = result.unwrap_err();
    let decode = err.as_decode().unwrap();
    assert!(matches!(decode, FormDataError::PayloadTooLarge(_)));
    assert!(decode.is_limit_error());
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_truncated_body_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let interceptor = FormDataInterceptor::new(config_in(dir.path()));
    let mut body = profile_body();
    body.truncate(body.len() - 40);

    let err = interceptor
        .intercept(
            Some(CONTENT_TYPE),
            chunked(&body, 32),
            None,
            |_| async move { Ok::<_, std::io::Error>(()) },
        )
        .await
        .unwrap_err();

    let decode = err.as_decode().unwrap();
    assert!(decode.is_parse_error());
    assert_eq!(decode.status_code(), 400);
    assert_eq!(files_in(dir.path()), 0);
}

#[tokio::test]
async fn test_route_override_keeps_files() {
    let dir = tempfile::tempdir().unwrap();
    let interceptor = FormDataInterceptor::new(config_in(dir.path()));
    let route = RouteDecodeConfig {
        auto_delete_file: Some(false),
        ..RouteDecodeConfig::default()
    };

    let path = interceptor
        .intercept(
            Some(CONTENT_TYPE),
            chunked(&profile_body(), 128),
            Some(&route),
            |body| async move {
                let form = body.as_form().unwrap();
                Ok::<_, std::io::Error>(form.files().next().unwrap().path.clone())
            },
        )
        .await
        .unwrap();

    assert!(path.exists());
    assert!(interceptor.global_config().auto_delete_file);
}

#[tokio::test]
async fn test_non_multipart_body_untouched() {
    let interceptor = FormDataInterceptor::default();
    let payload = br#"{"age": 29}"#;

    let passed_through = interceptor
        .intercept(
            Some("application/json"),
            chunked(payload, 4),
            None,
            |body| async move { Ok::<_, std::io::Error>(matches!(body, RequestBody::Raw(_))) },
        )
        .await
        .unwrap();
    assert!(passed_through);
}

// ═════════════════════════════════════════════════════════════════════
// 3. Deletion is idempotent
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_delete_files_twice() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = FormReader::new(config_in(dir.path()));
    reader
        .handle(CONTENT_TYPE, chunked(&profile_body(), 64))
        .await
        .unwrap();
    assert_eq!(reader.temporary_files().len(), 1);

    reader.delete_files().await;
    reader.delete_files().await;
    reader.delete_files_blocking();
    assert!(reader.temporary_files().is_empty());
    assert_eq!(files_in(dir.path()), 0);
}
