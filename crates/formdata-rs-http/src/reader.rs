//! Streaming multipart reader.
//!
//! [`FormReader`] consumes a request body stream chunk by chunk, feeding a
//! [`MultipartParser`] and routing each part either into an in-memory string
//! (scalar fields) or straight into a temp file (file parts). Every temp file
//! is tracked in the reader's [`TemporaryFileSet`] as soon as it is created,
//! so it can be deleted even if decoding later fails.

use std::fmt::Display;
use std::path::PathBuf;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::Instrument;

use formdata_rs_core::logging::decode_span;
use formdata_rs_core::{DecodeConfig, FormDataError, FormDataResult};

use crate::content_type::extract_boundary;
use crate::parser::{MultipartParser, ParserEvent, PartHeaders};
use crate::temp_files::TemporaryFileSet;
use crate::upload::{DecodedField, RawForm, UploadedFile, DEFAULT_FILE_CONTENT_TYPE};

/// Decodes one multipart body and owns the temp files it writes.
///
/// A reader is meant for exactly one request. Call
/// [`delete_files`](Self::delete_files) when the request is done, whether or
/// not [`handle`](Self::handle) succeeded.
///
/// # Examples
///
/// ```no_run
/// use bytes::Bytes;
/// use formdata_rs_core::DecodeConfig;
/// use formdata_rs_http::FormReader;
///
/// # async fn run() -> formdata_rs_core::FormDataResult<()> {
/// let body = "--b\r\nContent-Disposition: form-data; name=\"age\"\r\n\r\n29\r\n--b--\r\n";
/// let stream = futures::stream::iter([Ok::<_, std::io::Error>(Bytes::from(body))]);
///
/// let mut reader = FormReader::new(DecodeConfig::default());
/// let form = reader.handle("multipart/form-data; boundary=b", stream).await?;
/// assert_eq!(form["age"].as_scalar(), Some("29"));
/// reader.delete_files().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FormReader {
    config: DecodeConfig,
    files: TemporaryFileSet,
}

/// Where the body of the part currently being read goes.
enum PartSink {
    Field {
        name: String,
        value: Vec<u8>,
    },
    File {
        writer: BufWriter<File>,
        upload: UploadedFile,
    },
    Discard,
}

/// Per-body counters used to enforce the count limits.
#[derive(Debug, Default)]
struct Counts {
    fields: usize,
    files: usize,
}

impl FormReader {
    /// Creates a reader with the given (already merged) configuration.
    pub const fn new(config: DecodeConfig) -> Self {
        Self {
            config,
            files: TemporaryFileSet::new(),
        }
    }

    /// The configuration this reader enforces.
    pub const fn config(&self) -> &DecodeConfig {
        &self.config
    }

    /// The temp files written so far.
    pub const fn temporary_files(&self) -> &TemporaryFileSet {
        &self.files
    }

    /// Reads the whole body and returns its fields.
    ///
    /// The returned map is only produced once the stream has been consumed up
    /// to the closing boundary and every file has been flushed to disk.
    ///
    /// # Errors
    ///
    /// - [`FormDataError::Parse`] if the content type has no boundary, the
    ///   body is malformed or truncated, or the stream yields an error.
    /// - [`FormDataError::PayloadTooLarge`] if a field or file exceeds its cap.
    /// - [`FormDataError::TooManyFields`] if a count cap is exceeded.
    /// - [`FormDataError::Io`] if a temp file cannot be written.
    ///
    /// Temp files created before a failure stay tracked.
    pub async fn handle<S, E>(&mut self, content_type: &str, body: S) -> FormDataResult<RawForm>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let boundary = extract_boundary(content_type).ok_or_else(|| {
            FormDataError::Parse(format!(
                "content type '{content_type}' is not multipart or has no boundary"
            ))
        })?;

        let span = decode_span(&boundary);
        self.read_parts(&boundary, body).instrument(span).await
    }

    /// Deletes every temp file written by this reader.
    ///
    /// Failures are logged, never returned. Calling this more than once is
    /// harmless.
    pub async fn delete_files(&mut self) {
        self.files.delete_all().await;
    }

    /// Blocking variant of [`delete_files`](Self::delete_files).
    pub fn delete_files_blocking(&mut self) {
        self.files.delete_all_blocking();
    }

    async fn read_parts<S, E>(&mut self, boundary: &str, body: S) -> FormDataResult<RawForm>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        let mut body = std::pin::pin!(body);
        let mut parser = MultipartParser::new(boundary, self.config.max_header_size);
        let mut form = RawForm::new();
        let mut counts = Counts::default();
        let mut sink = PartSink::Discard;

        loop {
            while let Some(event) = parser.next_event()? {
                match event {
                    ParserEvent::PartStart(headers) => {
                        sink = self.start_part(headers, &mut counts).await?;
                    }
                    ParserEvent::Data(chunk) => {
                        self.write_chunk(&mut sink, &chunk).await?;
                    }
                    ParserEvent::PartEnd => {
                        let finished = std::mem::replace(&mut sink, PartSink::Discard);
                        if let Some((name, field)) = finish_part(finished).await? {
                            form.insert(name, field);
                        }
                    }
                    ParserEvent::Finished => {
                        tracing::debug!(
                            fields = counts.fields,
                            files = counts.files,
                            "multipart body decoded"
                        );
                        return Ok(form);
                    }
                }
            }

            match body.next().await {
                Some(Ok(chunk)) => parser.feed(&chunk),
                Some(Err(e)) => {
                    return Err(FormDataError::Parse(format!(
                        "failed to read request body: {e}"
                    )));
                }
                None => {
                    parser.finish()?;
                    return Ok(form);
                }
            }
        }
    }

    async fn start_part(
        &mut self,
        headers: PartHeaders,
        counts: &mut Counts,
    ) -> FormDataResult<PartSink> {
        let PartHeaders {
            name,
            filename,
            content_type,
        } = headers;

        let Some(name) = name else {
            tracing::debug!("skipping multipart part without a name");
            return Ok(PartSink::Discard);
        };

        let Some(filename) = filename else {
            counts.fields += 1;
            if let Some(limit) = self.config.max_fields {
                if counts.fields > limit {
                    tracing::debug!(limit, "field count limit reached");
                    return Err(FormDataError::TooManyFields(format!(
                        "more than {limit} fields"
                    )));
                }
            }
            tracing::debug!(field = %name, "reading field");
            return Ok(PartSink::Field {
                name,
                value: Vec::new(),
            });
        };

        counts.files += 1;
        if let Some(limit) = self.config.max_files {
            if counts.files > limit {
                tracing::debug!(limit, "file count limit reached");
                return Err(FormDataError::TooManyFields(format!(
                    "more than {limit} files"
                )));
            }
        }

        let path = self.temp_path(&filename);
        if self.files.is_empty() {
            tokio::fs::create_dir_all(&self.config.destination).await?;
        }
        self.files.track(&path);
        let file = File::create(&path).await?;
        tracing::debug!(field = %name, filename = %filename, path = %path.display(), "writing file");

        Ok(PartSink::File {
            writer: BufWriter::new(file),
            upload: UploadedFile {
                field_name: name,
                name: filename,
                content_type: content_type
                    .unwrap_or_else(|| DEFAULT_FILE_CONTENT_TYPE.to_string()),
                size: 0,
                path,
            },
        })
    }

    async fn write_chunk(&self, sink: &mut PartSink, chunk: &[u8]) -> FormDataResult<()> {
        match sink {
            PartSink::Field { name, value } => {
                let size = (value.len() + chunk.len()) as u64;
                if size > self.config.max_field_size {
                    tracing::debug!(field = %name, limit = self.config.max_field_size, "field size limit reached");
                    return Err(FormDataError::PayloadTooLarge(format!(
                        "field '{name}' exceeds {} bytes",
                        self.config.max_field_size
                    )));
                }
                value.extend_from_slice(chunk);
            }
            PartSink::File { writer, upload } => {
                let size = upload.size + chunk.len() as u64;
                if let Some(limit) = self.config.max_file_size {
                    if size > limit {
                        tracing::debug!(field = %upload.field_name, limit, "file size limit reached");
                        return Err(FormDataError::PayloadTooLarge(format!(
                            "file '{}' in field '{}' exceeds {limit} bytes",
                            upload.name, upload.field_name
                        )));
                    }
                }
                writer.write_all(chunk).await?;
                upload.size = size;
            }
            PartSink::Discard => {}
        }
        Ok(())
    }

    /// Picks a fresh path under the destination, keeping the original extension.
    fn temp_path(&self, filename: &str) -> PathBuf {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));
        let file_name = match extension {
            Some(ext) => format!("{id}.{ext}"),
            None => id,
        };
        self.config.destination.join(file_name)
    }
}

async fn finish_part(sink: PartSink) -> FormDataResult<Option<(String, DecodedField)>> {
    match sink {
        PartSink::Field { name, value } => {
            let value = match String::from_utf8(value) {
                Ok(value) => value,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            Ok(Some((name, DecodedField::Scalar(value))))
        }
        PartSink::File {
            mut writer,
            upload,
        } => {
            writer.flush().await?;
            Ok(Some((upload.field_name.clone(), DecodedField::File(upload))))
        }
        PartSink::Discard => Ok(None),
    }
}
