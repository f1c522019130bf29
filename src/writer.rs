//! The serialization session.

use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::stream::{StreamBuffer, StreamKind};
use crate::traits::{FlatValue, Flatten};
use crate::value::{AnyValue, TypeTag};
use log::{debug, trace};
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

/// Handle written for a null reference.
pub const NULL_HANDLE: i32 = -1;

/// Identity of a handle-table entry.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum HandleKey {
    /// Address of an `Rc` allocation.
    Object(usize),
    /// A type identifier, deduplicated by name.
    Tag(&'static str),
}

/// Walks an object graph depth-first, flattening it into three streams.
///
/// A writer is used for exactly one graph walk and then consumed by
/// [`into_payload`](Self::into_payload). It is not `Sync`; keep it on the
/// thread that runs the walk.
///
/// ```rust
/// use flatgraph::{FlatWriter, FlatReader};
///
/// let mut writer = FlatWriter::new();
/// writer.add_array(&[1i32, 2, 3])?;
/// let payload = writer.into_payload();
///
/// let mut reader = FlatReader::new(payload);
/// assert_eq!(reader.get_array::<i32>()?, vec![1, 2, 3]);
/// reader.signal_finished()?;
/// # Ok::<(), flatgraph::Error>(())
/// ```
pub struct FlatWriter {
    any_values: StreamBuffer<AnyValue>,
    int_values: StreamBuffer<i32>,
    bool_values: StreamBuffer<bool>,
    handles: HashMap<HandleKey, i32>,
    // Keeps every recorded allocation alive so its address is not reused
    // by a different object during the walk.
    retained: Vec<Rc<dyn Any>>,
}

impl FlatWriter {
    pub fn new() -> Self {
        Self {
            any_values: StreamBuffer::new(StreamKind::Any),
            int_values: StreamBuffer::new(StreamKind::Int),
            bool_values: StreamBuffer::new(StreamKind::Bool),
            handles: HashMap::new(),
            retained: Vec::new(),
        }
    }

    #[inline]
    pub fn add_int(&mut self, value: i32) {
        self.int_values.append(value);
    }

    #[inline]
    pub fn add_bool(&mut self, value: bool) {
        self.bool_values.append(value);
    }

    /// Writes any [`FlatValue`]: primitives land on the any-value stream,
    /// type tags and Flattenables go through the handle path, containers
    /// write a count and then their elements.
    #[inline]
    pub fn add_value<T: FlatValue>(&mut self, value: &T) -> Result<()> {
        value.add_to(self)
    }

    /// Writes the null form of `T`.
    pub fn add_null<T: FlatValue>(&mut self) -> Result<()> {
        T::add_null(self)
    }

    /// Writes a type identifier through the handle path: the handle, then
    /// the name on its first occurrence only.
    pub fn add_type(&mut self, tag: TypeTag) {
        let key = HandleKey::Tag(tag.name());
        if let Some(&handle) = self.handles.get(&key) {
            self.int_values.append(handle);
            return;
        }
        let handle = self.assign(key);
        self.int_values.append(handle);
        self.any_values.append(AnyValue::Str(tag.name().to_owned()));
    }

    /// Writes a Flattenable: its concrete type tag, then whatever fields it
    /// appends itself. A `None` writes only the null type handle.
    pub fn add_flattenable(&mut self, value: Option<&dyn Flatten>) -> Result<()> {
        match value {
            Some(value) => {
                self.add_type(value.type_tag());
                value.flatten(self)
            }
            None => {
                self.push_null_marker();
                Ok(())
            }
        }
    }

    /// Writes the element count followed by every element in order.
    pub fn add_array<T: FlatValue>(&mut self, values: &[T]) -> Result<()> {
        self.add_collection(values)
    }

    /// Writes an `i32` array entirely on the int stream: count, then elements.
    pub fn add_int_array(&mut self, values: &[i32]) -> Result<()> {
        self.add_count(values.len())?;
        for &value in values {
            self.int_values.append(value);
        }
        Ok(())
    }

    /// Writes the element count followed by every element in iteration order.
    pub fn add_collection<'a, T, I>(&mut self, values: I) -> Result<()>
    where
        T: FlatValue + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = values.into_iter();
        self.add_count(iter.len())?;
        for value in iter {
            self.add_value(value)?;
        }
        Ok(())
    }

    /// Writes a shared reference, deduplicated by identity.
    ///
    /// The first occurrence of an allocation writes a fresh handle and then
    /// the value; later occurrences write only the handle. `None` writes `-1`.
    pub fn add_handle<T: FlatValue + 'static>(&mut self, value: Option<&Rc<T>>) -> Result<()> {
        let value = match value {
            Some(value) => value,
            None => {
                self.push_null_marker();
                return Ok(());
            }
        };

        let key = HandleKey::Object(Rc::as_ptr(value) as *const () as usize);
        if let Some(&handle) = self.handles.get(&key) {
            self.int_values.append(handle);
            return Ok(());
        }

        let handle = self.assign(key);
        let retained: Rc<dyn Any> = Rc::clone(value) as Rc<dyn Any>;
        self.retained.push(retained);
        self.int_values.append(handle);
        self.add_value(&**value)
    }

    /// Number of handles assigned so far (objects and type identifiers).
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Ends the session and returns the three streams.
    pub fn into_payload(self) -> Payload {
        debug!(
            "flattened graph: {} any, {} int, {} bool values, {} handles",
            self.any_values.len(),
            self.int_values.len(),
            self.bool_values.len(),
            self.handles.len()
        );
        Payload::new(
            self.any_values.into_inner(),
            self.int_values.into_inner(),
            self.bool_values.into_inner(),
        )
    }

    pub(crate) fn add_count(&mut self, len: usize) -> Result<()> {
        let count = i32::try_from(len).map_err(|_| Error::InvalidLength {
            stream: StreamKind::Int,
            position: self.int_values.len(),
            length: i64::try_from(len).unwrap_or(i64::MAX),
            limit: i32::MAX as usize,
        })?;
        self.int_values.append(count);
        Ok(())
    }

    #[inline]
    pub(crate) fn push_any(&mut self, value: AnyValue) {
        self.any_values.append(value);
    }

    #[inline]
    pub(crate) fn push_null_marker(&mut self) {
        self.int_values.append(NULL_HANDLE);
    }

    fn assign(&mut self, key: HandleKey) -> i32 {
        // Handles are dense and start at 0; the table never outgrows i32 in
        // practice because every entry also costs at least one int slot.
        let handle = self.handles.len() as i32;
        self.handles.insert(key, handle);
        trace!("assigned handle {}", handle);
        handle
    }
}

impl Default for FlatWriter {
    fn default() -> Self {
        Self::new()
    }
}
