//! Upload validation and text extraction for uploaded study notes.
//!
//! Plain-text files are decoded here; PDF and DOCX pass the extension check
//! (the upload itself is kept on disk) but their text extraction lives behind
//! this seam and currently reports [`ExtractError::NoExtractor`] rather than
//! guessing at binary formats. Callers treat any failure here as an opaque
//! upstream error.

use thiserror::Error;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];

#[derive(Debug, Error)]
pub enum ExtractError {
  #[error("Invalid file type. Only PDF, DOCX, and TXT are allowed.")]
  InvalidType,
  #[error("No text extractor available for .{0} files; upload plain text instead.")]
  NoExtractor(String),
}

/// Lowercased extension, if the name has one.
pub fn file_extension(filename: &str) -> Option<String> {
  let (_, ext) = filename.rsplit_once('.')?;
  if ext.is_empty() {
    return None;
  }
  Some(ext.to_ascii_lowercase())
}

/// Extension allow-list check (`pdf` / `docx` / `txt`, case-insensitive).
pub fn allowed_file(filename: &str) -> bool {
  file_extension(filename)
    .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
    .unwrap_or(false)
}

/// Turn an uploaded file into plain text.
///
/// TXT decodes as UTF-8 with invalid sequences replaced (ignore-errors
/// semantics). PDF/DOCX surface [`ExtractError::NoExtractor`].
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
  match file_extension(filename).as_deref() {
    Some("txt") => Ok(String::from_utf8_lossy(bytes).into_owned()),
    Some(ext @ ("pdf" | "docx")) => Err(ExtractError::NoExtractor(ext.to_string())),
    _ => Err(ExtractError::InvalidType),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allow_list_is_case_insensitive_and_requires_an_extension() {
    assert!(allowed_file("notes.txt"));
    assert!(allowed_file("NOTES.PDF"));
    assert!(allowed_file("report.docx"));
    assert!(!allowed_file("archive.zip"));
    assert!(!allowed_file("noextension"));
    assert!(!allowed_file("trailingdot."));
  }

  #[test]
  fn txt_extraction_replaces_invalid_utf8() {
    let bytes = b"hello \xff world";
    let text = extract_text("notes.txt", bytes).unwrap();
    assert!(text.starts_with("hello "));
    assert!(text.ends_with(" world"));
  }

  #[test]
  fn binary_formats_report_the_missing_extractor() {
    let err = extract_text("slides.pdf", b"%PDF-1.4").unwrap_err();
    assert!(matches!(err, ExtractError::NoExtractor(ref ext) if ext == "pdf"));
    let err = extract_text("notes.docx", b"PK").unwrap_err();
    assert!(matches!(err, ExtractError::NoExtractor(ref ext) if ext == "docx"));
  }

  #[test]
  fn unknown_extension_is_an_invalid_type() {
    assert!(matches!(extract_text("x.zip", b""), Err(ExtractError::InvalidType)));
  }
}
