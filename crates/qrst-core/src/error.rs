//! Error taxonomy for the analyzer and resynthesizer.

use thiserror::Error;

/// Errors surfaced at the analyzer/resynthesizer boundary.
///
/// Internal arithmetic never panics on in-range input; these variants cover
/// the only ways a caller can misuse the API or run off the end of a stream.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QrstError {
    /// `N < 8` or `numOctaves` outside `[1, 15]`. The call is rejected
    /// without mutating analyzer state.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// The compressed stream ended mid-record, e.g. after an escape byte
    /// or partway through the 4-byte record body.
    #[error("truncated record in compressed stream")]
    TruncatedRecord,
}
