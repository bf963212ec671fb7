//! Document intake.

use std::path::Path;

pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Please upload a PDF file")]
    NotPdf { mime: String },
}

/// A document accepted for annotation.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedPdf {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedPdf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedPdf").field("name", &self.name).field("bytes", &self.bytes.len()).finish()
    }
}

/// Accept a single uploaded file. Only the declared MIME type is checked;
/// the bytes are parsed later by the PDF collaborator.
pub fn accept_upload(name: &str, mime: &str, bytes: Vec<u8>) -> Result<UploadedPdf, UploadError> {
    if !mime.trim().eq_ignore_ascii_case(PDF_MIME) {
        log::warn!("rejected upload {name:?} with type {mime:?}");
        return Err(UploadError::NotPdf { mime: mime.to_owned() });
    }

    log::debug!("accepted upload {name:?} ({} bytes)", bytes.len());
    Ok(UploadedPdf { name: name.to_owned(), bytes })
}

/// Best-effort MIME type for a file read from disk: the `.pdf` extension or
/// the `%PDF-` header marks a PDF.
pub fn infer_mime(path: &Path, bytes: &[u8]) -> &'static str {
    let has_pdf_extension =
        path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if has_pdf_extension || bytes.starts_with(PDF_MAGIC) {
        PDF_MIME
    } else {
        "application/octet-stream"
    }
}
