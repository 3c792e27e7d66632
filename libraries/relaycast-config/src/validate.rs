//! Validation primitives shared by every setter
//!
//! Setters receive raw text from the config file and either store a typed
//! value or reject it with a [`ValidationError`].

use crate::error::ValidationError;
use relaycast_core::Placeholder;
use std::num::IntErrorKind;

/// Result of a single field validation
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Bound for path-like values
pub const PATH_MAX: usize = 4096;
/// Bound for host names
pub const HOST_MAX: usize = 1025;
/// Bound for user names and passwords
pub const CREDENTIALS_MAX: usize = 1024;
/// Bound for TLS cipher suite strings
pub const CIPHER_SUITE_MAX: usize = 2048;

/// Parse a boolean: `true`/`yes`/`1` or `false`/`no`/`0`, any case.
pub fn validate_boolean(s: &str) -> ValidationResult<bool> {
    let s = s.trim();
    if ["true", "yes", "1"].iter().any(|v| s.eq_ignore_ascii_case(v)) {
        return Ok(true);
    }
    if ["false", "no", "0"].iter().any(|v| s.eq_ignore_ascii_case(v)) {
        return Ok(false);
    }
    Err(ValidationError::InvalidValue)
}

/// Accept a non-empty string shorter than `max_len` bytes.
pub fn validate_bounded_string(s: &str, max_len: usize) -> ValidationResult<&str> {
    if s.is_empty() {
        return Err(ValidationError::Empty);
    }
    if s.len() >= max_len {
        return Err(ValidationError::TooLong);
    }
    Ok(s)
}

/// Accept any non-empty string.
pub fn validate_string(s: &str) -> ValidationResult<&str> {
    if s.is_empty() {
        Err(ValidationError::Empty)
    } else {
        Ok(s)
    }
}

/// Parse a signed integer within `lo..=hi`.
pub fn validate_int_range(s: &str, lo: i64, hi: i64) -> ValidationResult<i64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValidationError::Empty);
    }
    let n = s.parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ValidationError::OutOfRange,
        _ => ValidationError::NotANumber,
    })?;
    if n < lo || n > hi {
        return Err(ValidationError::OutOfRange);
    }
    Ok(n)
}

/// Parse an unsigned integer within `lo..=hi`.
pub fn validate_uint_range(s: &str, lo: u64, hi: u64) -> ValidationResult<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ValidationError::Empty);
    }
    // A leading minus is a number, just not one that fits
    if let Some(rest) = s.strip_prefix('-') {
        return match rest.parse::<u64>() {
            Ok(_) => Err(ValidationError::OutOfRange),
            Err(_) => Err(ValidationError::NotANumber),
        };
    }
    let n = s.parse::<u64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => ValidationError::OutOfRange,
        _ => ValidationError::NotANumber,
    })?;
    if n < lo || n > hi {
        return Err(ValidationError::OutOfRange);
    }
    Ok(n)
}

/// Fail if `marker` occurs in `s` at all.
pub fn prohibited(s: &str, marker: Placeholder) -> ValidationResult<()> {
    if marker.count_in(s) > 0 {
        Err(ValidationError::ProhibitedPlaceholder(marker))
    } else {
        Ok(())
    }
}

/// Fail if `marker` occurs more than once anywhere in `s`.
pub fn duplicate(s: &str, marker: Placeholder) -> ValidationResult<()> {
    if marker.count_in(s) > 1 {
        Err(ValidationError::DuplicatePlaceholder(marker))
    } else {
        Ok(())
    }
}

/// Fail if `marker` does not occur in `s`.
pub fn required(s: &str, marker: Placeholder) -> ValidationResult<()> {
    if marker.count_in(s) == 0 {
        Err(ValidationError::MissingPlaceholder(marker))
    } else {
        Ok(())
    }
}

/// Decoder command: exactly one `@T@`, no `@s@`, no repeated `@M@`/`@a@`/`@t@`.
pub fn check_decoder_program(s: &str) -> ValidationResult<()> {
    prohibited(s, Placeholder::String)?;
    duplicate(s, Placeholder::Track)?;
    duplicate(s, Placeholder::Metadata)?;
    duplicate(s, Placeholder::Artist)?;
    duplicate(s, Placeholder::Title)?;
    required(s, Placeholder::Track)
}

/// Encoder command: no `@T@` or `@s@`, no repeated `@M@`/`@a@`/`@t@`.
pub fn check_encoder_program(s: &str) -> ValidationResult<()> {
    prohibited(s, Placeholder::Track)?;
    prohibited(s, Placeholder::String)?;
    duplicate(s, Placeholder::Metadata)?;
    duplicate(s, Placeholder::Artist)?;
    duplicate(s, Placeholder::Title)
}

/// Metadata format template: no `@M@`, every other marker at most once.
pub fn check_metadata_format(s: &str) -> ValidationResult<()> {
    prohibited(s, Placeholder::Metadata)?;
    for marker in [
        Placeholder::Track,
        Placeholder::String,
        Placeholder::Artist,
        Placeholder::Album,
        Placeholder::Title,
    ] {
        duplicate(s, marker)?;
    }
    Ok(())
}
