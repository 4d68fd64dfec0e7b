use thiserror::Error;

/// Errors raised while decoding a byte stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// The reader ran out of bytes before the value was complete
    #[error("Unexpected end of buffer: needed {needed} bytes at offset {offset}, {remaining} remaining")]
    UnexpectedEnd {
        needed: usize,
        offset: usize,
        remaining: usize,
    },

    /// An enum tag did not match any known variant
    #[error("Unknown tag {tag} while decoding {type_name}")]
    UnknownTag { type_name: &'static str, tag: u32 },

    /// A string field did not hold valid UTF-8
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A length prefix exceeded what the buffer could possibly hold
    #[error("Length {length} exceeds remaining {remaining} bytes")]
    LengthOverflow { length: usize, remaining: usize },
}
