//! The flattened payload: three ordered sequences produced and consumed together.
//!
//! How the streams are packaged for transport is left to the caller. With the
//! `serde` feature enabled the payload derives `Serialize`/`Deserialize`, so
//! any serde format can carry it.

use crate::stream::StreamKind;
use crate::value::AnyValue;

/// The three streams produced by one writer session.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Payload {
    pub any_values: Vec<AnyValue>,
    pub int_values: Vec<i32>,
    pub bool_values: Vec<bool>,
}

impl Payload {
    pub fn new(any_values: Vec<AnyValue>, int_values: Vec<i32>, bool_values: Vec<bool>) -> Self {
        Self {
            any_values,
            int_values,
            bool_values,
        }
    }

    /// Number of values held by one stream.
    pub fn stream_len(&self, stream: StreamKind) -> usize {
        match stream {
            StreamKind::Any => self.any_values.len(),
            StreamKind::Int => self.int_values.len(),
            StreamKind::Bool => self.bool_values.len(),
        }
    }

    /// Total number of values across the three streams.
    pub fn value_count(&self) -> usize {
        self.any_values.len() + self.int_values.len() + self.bool_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value_count() == 0
    }
}
