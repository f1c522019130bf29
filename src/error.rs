use crate::stream::StreamKind;
use thiserror::Error;

/// Custom error types for the flatgraph library.
///
/// None of these conditions are retried. Each one points at either an
/// asymmetric `Flatten`/`Unflatten` pair or a corrupted payload.
#[derive(Error, Debug)]
pub enum Error {
    /// A typed stream had no more values when one was required.
    #[error("stream {stream} exhausted")]
    StreamExhausted { stream: StreamKind },

    /// The value read does not have the statically expected type.
    ///
    /// Flattenables are named by their type tag, every other value by its
    /// Rust type name without module paths (`String`, `Vec<u32>`).
    #[error("type mismatch in {stream} at position {position}: expected {expected}, found {actual}")]
    TypeMismatch {
        stream: StreamKind,
        position: usize,
        expected: String,
        actual: String,
    },

    /// A non-nullable read encountered a null value.
    #[error("unexpected null in {stream} at position {position}")]
    UnexpectedNull { stream: StreamKind, position: usize },

    /// A handle referenced an object whose construction has not finished.
    #[error("unsupported cycle: handle {handle} refers to an object still under construction")]
    UnsupportedCycle { handle: i32 },

    /// A handle that no writer could have produced (forward or negative reference).
    #[error("invalid handle {handle}: handle table holds {table_len} entries")]
    InvalidHandle { handle: i32, table_len: usize },

    /// A type identifier cannot be resolved, or resolves to a type without a factory.
    #[error("unsupported type {type_name}: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    /// The completeness check found unread values.
    #[error("incomplete consumption: {remaining} unread value(s) left in {stream}")]
    IncompleteConsumption { stream: StreamKind, remaining: usize },

    /// A collection count is negative, over the configured limit, or too
    /// large for the int stream.
    #[error("invalid length {length} in {stream} at position {position} (limit {limit})")]
    InvalidLength {
        stream: StreamKind,
        position: usize,
        length: i64,
        limit: usize,
    },
}

impl Error {
    pub fn unsupported_type(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn type_mismatch(
        stream: StreamKind,
        position: usize,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            stream,
            position,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Returns the stream an error is attributed to, if any.
    pub fn stream(&self) -> Option<StreamKind> {
        match self {
            Self::StreamExhausted { stream }
            | Self::TypeMismatch { stream, .. }
            | Self::UnexpectedNull { stream, .. }
            | Self::IncompleteConsumption { stream, .. }
            | Self::InvalidLength { stream, .. } => Some(*stream),
            _ => None,
        }
    }
}

/// Result type alias for the library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_stream() {
        let err = Error::StreamExhausted {
            stream: StreamKind::Int,
        };
        assert_eq!(err.to_string(), "stream intValues exhausted");

        let err = Error::type_mismatch(StreamKind::Any, 3, "String", "i32");
        assert_eq!(
            err.to_string(),
            "type mismatch in anyValues at position 3: expected String, found i32"
        );
        assert_eq!(err.stream(), Some(StreamKind::Any));

        let err = Error::unsupported_type("demo::Gone", "no factory registered");
        assert_eq!(err.stream(), None);
    }
}
