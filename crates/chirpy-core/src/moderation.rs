//! Chirp body validation and word redaction

use crate::{ChirpyError, Result};

/// Longest accepted chirp body, in characters
pub const MAX_CHIRP_LENGTH: usize = 140;

const REDACTED: &str = "****";

const PROFANE_WORDS: &[&str] = &["kerfuffle", "sharbert", "fornax"];

/// Replace profane words with `****`.
///
/// Words are split on single spaces and compared case-insensitively; words
/// with attached punctuation (`Sharbert!`) are left alone.
pub fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                REDACTED
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check the length limit and return the cleaned body
pub fn validate_chirp_body(body: &str) -> Result<String> {
    if body.chars().count() > MAX_CHIRP_LENGTH {
        return Err(ChirpyError::ValidationError("Chirp is too long".to_string()));
    }

    Ok(clean_body(body))
}
