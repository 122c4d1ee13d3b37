//! Turns an uploaded file into clean résumé text.
//!
//! PDF uploads go through the PDF text extractor; everything else is
//! treated as plain UTF-8 text. Cleanup is deliberately minimal: unify
//! line endings, collapse runs of blank lines, trim. Skill extraction is
//! not done here; the scorer works on the raw text.

use crate::errors::AppError;
use crate::pipeline::scorer::MIN_RESUME_CHARS;

/// Extracts text from an uploaded file based on its filename extension.
pub fn extract_text(filename: &str, data: &[u8]) -> Result<String, AppError> {
    if filename.to_lowercase().ends_with(".pdf") {
        pdf_extract::extract_text_from_mem(data)
            .map_err(|e| AppError::Validation(format!("Could not extract text from PDF: {e}")))
    } else {
        String::from_utf8(data.to_vec())
            .map_err(|_| AppError::Validation("File is not valid UTF-8 text".to_string()))
    }
}

/// Normalizes whitespace and enforces the minimum usable length.
pub fn clean_content(text: &str) -> Result<String, AppError> {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = collapse_blank_lines(&unified).trim().to_string();

    if trimmed.chars().count() < MIN_RESUME_CHARS {
        return Err(AppError::Validation(
            "Resume text is too short or empty".to_string(),
        ));
    }

    Ok(trimmed)
}

/// Caps consecutive newlines at two, so at most one blank line survives.
fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0;

    for c in text.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }

    out
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
