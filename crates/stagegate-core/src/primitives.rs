//! # Engine Primitives
//!
//! Fixed runtime constants for the Stagegate engine.
//!
//! These are compiled into the binary and immutable at runtime.

/// Display name of the synthesized payment stage.
pub const PAYMENT_STAGE_NAME: &str = "Payment";

/// Accepted URL schemes for submission and payment-proof links.
pub const ALLOWED_LINK_SCHEMES: [&str; 2] = ["https://", "http://"];

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of a submission link.
///
/// Longer payloads are rejected before any store access.
pub const MAX_PAYLOAD_LENGTH: usize = 2048;

/// Maximum length of team, track and stage display names.
pub const MAX_NAME_LENGTH: usize = 128;

/// Maximum number of records in one seed document.
///
/// Seeds larger than this are rejected to keep a single unit of work bounded.
pub const MAX_SEED_RECORDS: usize = 10000;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Format tag written at the top of every JSON snapshot.
pub const SNAPSHOT_FORMAT: &str = "stagegate-snapshot";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Maximum accepted size of a snapshot or seed file (64 MiB).
///
/// Checked before parsing.
pub const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_is_accepted_first() {
        assert_eq!(ALLOWED_LINK_SCHEMES[0], "https://");
    }
}
