use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnexbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NAL unit truncated: need at least 4 bytes, got {got}")]
    TruncatedNalUnit { got: usize },

    #[error("declared NAL length {declared} plus 4-byte prefix exceeds buffer of {available} bytes")]
    LengthOverrun { declared: usize, available: usize },

    #[error("length-prefixed NAL unit declares an empty payload")]
    EmptyNalUnit,

    #[error("no NAL start code found from offset {offset}")]
    MissingStartCode { offset: u64 },
}

pub type Result<T> = std::result::Result<T, AnnexbError>;
