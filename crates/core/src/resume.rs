//! Resume text extraction: PDF bytes in, plain text out.
//!
//! Extraction may legitimately fail on encrypted or scanned input; the typed
//! errors let the HTTP surface answer with a reason instead of a bare 500.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("No PDF content provided")]
    Empty,
    #[error("The PDF file is encrypted or password-protected. Please provide an unprotected file.")]
    Encrypted,
    #[error("No text content found in the PDF. The file might be scanned or image-based.")]
    NoText,
    #[error("Failed to extract text from PDF: {0}")]
    Unreadable(String),
}

/// Extract the text of a PDF resume. CPU-bound; callers on an async runtime
/// should run it under `spawn_blocking`.
pub fn extract_text(pdf_bytes: &[u8]) -> Result<String, ResumeError> {
    if pdf_bytes.is_empty() {
        return Err(ResumeError::Empty);
    }

    match pdf_extract::extract_text_from_mem(pdf_bytes) {
        Ok(text) if text.trim().is_empty() => Err(ResumeError::NoText),
        Ok(text) => Ok(text),
        Err(e) => {
            let message = e.to_string();
            if message.to_lowercase().contains("encrypt") {
                Err(ResumeError::Encrypted)
            } else {
                Err(ResumeError::Unreadable(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(extract_text(&[]), Err(ResumeError::Empty)));
    }

    #[test]
    fn non_pdf_bytes_are_unreadable() {
        let result = extract_text(b"plain text pretending to be a pdf");
        assert!(matches!(
            result,
            Err(ResumeError::Unreadable(_)) | Err(ResumeError::NoText)
        ));
    }
}
