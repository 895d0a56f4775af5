//! Error types for mediamux-codec

/// Result type for codec header operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or rewriting codec headers
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The bitstream ended early or a seek went out of range
    #[error("Bitstream error: {0}")]
    Bits(#[from] mediamux_bits::Error),

    /// NAL unit shorter than its header
    #[error("NAL unit too short: {0} bytes")]
    TooShort(usize),

    /// A syntax element holds a value the standard does not allow
    #[error("Invalid syntax: {0}")]
    Invalid(String),

    /// Valid input that this crate does not handle
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Colour rewrite requested for an SPS without a colour description
    #[error("SPS carries no colour description")]
    NoColourDescription,
}

impl Error {
    /// Whether the error means the input was cut short.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Bits(bits) if bits.is_out_of_data()) || matches!(self, Self::TooShort(_))
    }
}
