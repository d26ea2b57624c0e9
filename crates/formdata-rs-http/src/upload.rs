//! Uploaded files and raw decoded fields.
//!
//! [`FormReader`](crate::FormReader) produces a [`RawForm`]: one
//! [`DecodedField`] per field name, where file parts have already been
//! written to disk and are represented by an [`UploadedFile`] handle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use formdata_rs_core::FormDataResult;

/// Content type assumed for file parts that do not declare one.
pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// An uploaded file from a multipart form submission, stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// The form field the file was submitted under.
    pub field_name: String,
    /// The original filename as provided by the client.
    pub name: String,
    /// The MIME content type of the file.
    pub content_type: String,
    /// The size of the file content in bytes.
    pub size: u64,
    /// Where the content was written.
    pub path: PathBuf,
}

impl UploadedFile {
    /// Returns the extension of the original filename, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|ext| ext.to_str())
    }

    /// Reads the stored content back into memory.
    pub async fn read(&self) -> FormDataResult<Vec<u8>> {
        Ok(tokio::fs::read(&self.path).await?)
    }

    /// Returns `true` if the stored file is still present on disk.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }
}

/// One decoded part, before coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedField {
    /// A part without a filename.
    Scalar(String),
    /// A part with a filename, already written to disk.
    File(UploadedFile),
}

impl DecodedField {
    /// Returns the scalar value, if this is a scalar field.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::File(_) => None,
        }
    }

    /// Returns the file handle, if this is a file part.
    pub const fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Scalar(_) => None,
        }
    }
}

/// The result of reading a multipart body: field name -> last decoded value.
pub type RawForm = HashMap<String, DecodedField>;
