use thiserror::Error;

/// Categorized errors returned by the engines.
///
/// The coordinator never propagates these upward; it translates them into
/// status-flag updates and keeps ticking (a failed add/next must not stall
/// the broadcast).
#[derive(Debug, Error)]
pub enum PadError {
    /// Rejected path, unsupported format or malformed text. No state mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Content fingerprint already seen within the dedup window.
    #[error("duplicate content")]
    Duplicate,

    /// The codec could not fit the payload under the configured byte cap.
    #[error("encoded size {size} exceeds cap {cap}")]
    SizeExceeded { size: usize, cap: usize },

    /// Image decode/encode exceeded its time budget.
    #[error("codec timed out")]
    CodecTimeout,

    /// Selection on an empty cache or queue. Not an error at the
    /// coordinator layer, which re-emits its last known-good item.
    #[error("no content available")]
    NoContent,

    /// Charset decode of a byte sequence that does not carry the Thai
    /// profile tag.
    #[error("invalid charset profile byte {0:#04x}")]
    InvalidProfile(u8),

    /// Cache full with no evictable entry.
    #[error("resource exhausted")]
    ResourceExhausted,

    /// Invariant violation; the owning engine degrades to re-emitting its
    /// previous known-good item and raises the health flag.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PadError {
    /// True for errors that leave engine state untouched and are safe to
    /// report to the ingest caller verbatim.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PadError::InvalidInput(_)
                | PadError::Duplicate
                | PadError::SizeExceeded { .. }
                | PadError::CodecTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_classified() {
        assert!(PadError::Duplicate.is_rejection());
        assert!(PadError::InvalidInput("x".into()).is_rejection());
        assert!(!PadError::NoContent.is_rejection());
        assert!(!PadError::Internal("bug".into()).is_rejection());
    }

    #[test]
    fn display_includes_sizes() {
        let err = PadError::SizeExceeded { size: 51200, cap: 50000 };
        assert!(err.to_string().contains("51200"));
        assert!(err.to_string().contains("50000"));
    }
}
