//! # Input Validation
//!
//! Boundary checks applied before anything reaches a store.
//!
//! - Reject empty or oversized names and links
//! - Reject links without an http(s) scheme
//! - No normalization beyond trimming surrounding whitespace

use crate::StagegateError;
use crate::primitives::{ALLOWED_LINK_SCHEMES, MAX_NAME_LENGTH, MAX_PAYLOAD_LENGTH};

/// Validate a submission or payment-proof link and return it trimmed.
pub fn validate_link(link: &str) -> Result<&str, StagegateError> {
    let link = link.trim();

    if link.is_empty() {
        return Err(StagegateError::InvalidArgument(
            "link must not be empty".to_string(),
        ));
    }

    if link.len() > MAX_PAYLOAD_LENGTH {
        return Err(StagegateError::InvalidArgument(format!(
            "link length {} exceeds maximum {} bytes",
            link.len(),
            MAX_PAYLOAD_LENGTH
        )));
    }

    // The part after the scheme must be non-empty.
    let remainder = ALLOWED_LINK_SCHEMES.iter().find_map(|scheme| {
        link.get(..scheme.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .and_then(|_| link.get(scheme.len()..))
    });

    match remainder {
        Some(rest) if !rest.is_empty() => Ok(link),
        _ => Err(StagegateError::InvalidArgument(format!(
            "link '{}' is not an http(s) URL",
            link
        ))),
    }
}

/// Validate a display name (team, track or stage).
pub fn validate_name<'a>(kind: &str, name: &'a str) -> Result<&'a str, StagegateError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(StagegateError::InvalidArgument(format!(
            "{} name must not be empty",
            kind
        )));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(StagegateError::InvalidArgument(format!(
            "{} name length {} exceeds maximum {} bytes",
            kind,
            name.len(),
            MAX_NAME_LENGTH
        )));
    }

    Ok(name)
}
