//! Typed stream buffers (write side) and cursors (read side).
//!
//! A payload is made of three parallel streams, one per value category. The
//! writer only ever appends; the reader consumes strictly in order, so each
//! stream behaves as a FIFO queue shared by exactly one writer and one reader.

use crate::error::{Error, Result};
use std::fmt;

/// Names one of the three payload streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamKind {
    /// Heterogeneous values: nulls, primitives, strings, byte blobs.
    Any,
    /// Integers: handles, counts and explicit `add_int` values.
    Int,
    /// Booleans written with `add_bool`.
    Bool,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [StreamKind::Any, StreamKind::Int, StreamKind::Bool];

    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Any => "anyValues",
            StreamKind::Int => "intValues",
            StreamKind::Bool => "boolValues",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Append-only buffer for one stream.
#[derive(Debug, Clone)]
pub struct StreamBuffer<T> {
    kind: StreamKind,
    values: Vec<T>,
}

impl<T> StreamBuffer<T> {
    pub fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            values: Vec::new(),
        }
    }

    #[inline]
    pub fn append(&mut self, value: T) {
        self.values.push(value);
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.values
    }
}

/// Sequential cursor over one stream.
///
/// Values are moved out as they are read; `position` is the index of the
/// next value and is what error reports refer to.
#[derive(Debug)]
pub struct StreamCursor<T> {
    kind: StreamKind,
    values: std::vec::IntoIter<T>,
    position: usize,
}

impl<T> StreamCursor<T> {
    pub fn new(kind: StreamKind, values: Vec<T>) -> Self {
        Self {
            kind,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Pops the next value, failing with `StreamExhausted` naming this stream.
    #[inline]
    pub fn read_next(&mut self) -> Result<T> {
        match self.values.next() {
            Some(value) => {
                self.position += 1;
                Ok(value)
            }
            None => Err(Error::StreamExhausted { stream: self.kind }),
        }
    }

    pub fn at_end(&self) -> bool {
        self.values.as_slice().is_empty()
    }

    /// Index of the next value to be read.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }
}
