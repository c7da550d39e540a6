//! Source file handling — the reference file a story is grounded in.
//!
//! Accepts images, PDFs and plain text. The MIME type comes from the upload when it is
//! usable, otherwise from the file extension. The file travels upstream as a base64
//! inline payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use thiserror::Error;

use crate::llm_client::InlineData;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceFileError {
    #[error("unsupported file type '{0}': upload an image, PDF, or plain text file")]
    UnsupportedType(String),
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub mime_type: String,
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl SourceFile {
    /// Builds a source file from an upload, resolving and checking its MIME type.
    ///
    /// Returns `Ok(None)` for an empty upload: callers treat that as "no file".
    pub fn from_upload(
        file_name: Option<String>,
        declared_mime: Option<&str>,
        bytes: Bytes,
    ) -> Result<Option<Self>, SourceFileError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let mime_type = resolve_mime_type(declared_mime, file_name.as_deref())?;
        Ok(Some(Self {
            mime_type,
            file_name,
            bytes,
        }))
    }

    /// Base64 inline payload for the upstream request.
    pub fn to_inline_data(&self) -> InlineData {
        InlineData {
            mime_type: self.mime_type.clone(),
            data: STANDARD.encode(&self.bytes),
        }
    }
}

fn is_supported(mime: &str) -> bool {
    mime.starts_with("image/") || mime == "application/pdf" || mime == "text/plain"
}

/// Picks the declared MIME type when it is specific, otherwise infers from the extension.
fn resolve_mime_type(
    declared: Option<&str>,
    file_name: Option<&str>,
) -> Result<String, SourceFileError> {
    // "text/plain; charset=utf-8" → "text/plain"
    let declared = declared
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_lowercase())
        .filter(|m| !m.is_empty() && m != "application/octet-stream");

    if let Some(mime) = declared {
        return if is_supported(&mime) {
            Ok(mime)
        } else {
            Err(SourceFileError::UnsupportedType(mime))
        };
    }

    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    let inferred = match extension.as_str() {
        "txt" | "md" | "text" => "text/plain",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        other => {
            let shown = if other.is_empty() { "unknown" } else { other };
            return Err(SourceFileError::UnsupportedType(shown.to_string()));
        }
    };
    Ok(inferred.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_upload_is_absent() {
        let file = SourceFile::from_upload(Some("a.txt".into()), Some("text/plain"), Bytes::new());
        assert!(matches!(file, Ok(None)));
    }

    #[test]
    fn test_declared_mime_wins_and_drops_parameters() {
        let file = SourceFile::from_upload(
            Some("notes.bin".into()),
            Some("text/plain; charset=utf-8"),
            Bytes::from_static(b"hello"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(file.mime_type, "text/plain");
    }

    #[test]
    fn test_octet_stream_falls_back_to_extension() {
        let file = SourceFile::from_upload(
            Some("Map.PDF".into()),
            Some("application/octet-stream"),
            Bytes::from_static(b"%PDF-1.4"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(file.mime_type, "application/pdf");
    }

    #[test]
    fn test_any_image_type_is_accepted() {
        let file = SourceFile::from_upload(None, Some("image/heic"), Bytes::from_static(b"x"))
            .unwrap()
            .unwrap();
        assert_eq!(file.mime_type, "image/heic");
    }

    #[test]
    fn test_rejects_unsupported_types() {
        let err = SourceFile::from_upload(None, Some("application/zip"), Bytes::from_static(b"x"))
            .unwrap_err();
        assert_eq!(err, SourceFileError::UnsupportedType("application/zip".into()));

        let err = SourceFile::from_upload(Some("archive".into()), None, Bytes::from_static(b"x"))
            .unwrap_err();
        assert_eq!(err, SourceFileError::UnsupportedType("unknown".into()));
    }

    #[test]
    fn test_inline_data_is_base64() {
        let file = SourceFile::from_upload(None, Some("text/plain"), Bytes::from_static(b"hi"))
            .unwrap()
            .unwrap();
        let inline = file.to_inline_data();
        assert_eq!(inline.mime_type, "text/plain");
        assert_eq!(inline.data, "aGk=");
    }
}
