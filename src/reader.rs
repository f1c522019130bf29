//! The deserialization session.

use crate::error::{Error, Result};
use crate::payload::Payload;
use crate::registry::{self, TypeRegistry};
use crate::stream::{StreamCursor, StreamKind};
use crate::traits::{FlatValue, Flatten, Unflatten, PREALLOC_LIMIT};
use crate::value::{short_type_name, AnyPrimitive, AnyValue, TypeTag};
use crate::writer::NULL_HANDLE;
use log::{debug, trace};
use std::any::Any;
use std::rc::Rc;
use std::sync::Arc;

/// Reader configuration.
#[derive(Clone, Debug)]
pub struct ReaderOptions {
    /// Largest element count accepted for arrays, collections and maps.
    pub max_collection_len: usize,
    /// Registry used to resolve type identifiers.
    pub registry: Arc<TypeRegistry>,
    /// When set, reading a concrete `T: Unflatten` whose payload names
    /// `T::TYPE_TAG` registers `T` in [`registry`](Self::registry), whichever
    /// registry that is. Clear it to keep a hand-built registry closed: only
    /// types registered up front are then reconstructed.
    pub auto_register: bool,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self {
            max_collection_len: i32::MAX as usize,
            registry: registry::global(),
            auto_register: true,
        }
    }

    pub fn with_auto_register(mut self, enabled: bool) -> Self {
        self.auto_register = enabled;
        self
    }

    pub fn with_max_collection_len(mut self, max: usize) -> Self {
        self.max_collection_len = max;
        self
    }

    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry of the read-side handle table.
enum Slot {
    /// Handle seen, value still under construction.
    Pending,
    Ready {
        value: Rc<dyn Any>,
        type_name: &'static str,
    },
}

/// Reconstructs one root value from a [`Payload`].
///
/// Every `get_*` call must mirror the `add_*` call that produced the data,
/// in the same order. After the root value is read, call
/// [`signal_finished`](Self::signal_finished) to verify that nothing was
/// left unread.
pub struct FlatReader {
    any_values: StreamCursor<AnyValue>,
    int_values: StreamCursor<i32>,
    bool_values: StreamCursor<bool>,
    handles: Vec<Slot>,
    options: ReaderOptions,
}

impl FlatReader {
    pub fn new(payload: Payload) -> Self {
        Self::with_options(payload, ReaderOptions::default())
    }

    pub fn with_options(payload: Payload, options: ReaderOptions) -> Self {
        let Payload {
            any_values,
            int_values,
            bool_values,
        } = payload;
        Self {
            any_values: StreamCursor::new(StreamKind::Any, any_values),
            int_values: StreamCursor::new(StreamKind::Int, int_values),
            bool_values: StreamCursor::new(StreamKind::Bool, bool_values),
            handles: Vec::new(),
            options,
        }
    }

    #[inline]
    pub fn get_int(&mut self) -> Result<i32> {
        self.int_values.read_next()
    }

    #[inline]
    pub fn get_bool(&mut self) -> Result<bool> {
        self.bool_values.read_next()
    }

    /// Pops the next raw entry of the any-value stream.
    pub fn get_any(&mut self) -> Result<AnyValue> {
        self.any_values.read_next()
    }

    /// Reads a non-null value of type `T`.
    pub fn get_value<T: FlatValue>(&mut self) -> Result<T> {
        let stream_and_position = self.null_site::<T>();
        match T::get_from(self)? {
            Some(value) => Ok(value),
            None => {
                let (stream, position) = stream_and_position;
                Err(Error::UnexpectedNull { stream, position })
            }
        }
    }

    /// Reads a value of type `T`, mapping its null form to `None`.
    pub fn get_nullable_value<T: FlatValue>(&mut self) -> Result<Option<T>> {
        T::get_from(self)
    }

    /// Reconstructs a Flattenable of concrete type `T`; null is rejected.
    pub fn get_flattenable<T: Unflatten>(&mut self) -> Result<T> {
        let position = self.int_values.position();
        self.get_nullable_flattenable::<T>()?
            .ok_or(Error::UnexpectedNull {
                stream: StreamKind::Int,
                position,
            })
    }

    /// Reconstructs a Flattenable of concrete type `T`, or `None` for a null
    /// reference.
    ///
    /// `T` is registered on first use if the payload names its own tag and
    /// [`ReaderOptions::auto_register`] is set. Any other tag must already be
    /// registered.
    pub fn get_nullable_flattenable<T: Unflatten>(&mut self) -> Result<Option<T>> {
        let position = self.int_values.position();
        let hint = (T::TYPE_TAG, ensure_registered::<T> as fn(&TypeRegistry));
        let value = match self.read_flattenable(Some(hint))? {
            Some(value) => value,
            None => return Ok(None),
        };
        let actual = value.type_tag();
        match value.into_any().downcast::<T>() {
            Ok(value) => Ok(Some(*value)),
            Err(_) => Err(Error::type_mismatch(
                StreamKind::Int,
                position,
                T::TYPE_TAG.name(),
                actual.name(),
            )),
        }
    }

    /// Reconstructs a Flattenable of whatever registered type the payload names.
    pub fn get_dyn_flattenable(&mut self) -> Result<Box<dyn Flatten>> {
        let position = self.int_values.position();
        self.get_nullable_dyn_flattenable()?
            .ok_or(Error::UnexpectedNull {
                stream: StreamKind::Int,
                position,
            })
    }

    pub fn get_nullable_dyn_flattenable(&mut self) -> Result<Option<Box<dyn Flatten>>> {
        self.read_flattenable(None)
    }

    /// Reads a count followed by that many values.
    pub fn get_array<T: FlatValue>(&mut self) -> Result<Vec<T>> {
        self.get_value::<Vec<T>>()
    }

    /// Reads an array written by `add_int_array`.
    pub fn get_int_array(&mut self) -> Result<Vec<i32>> {
        let position = self.int_values.position();
        let count = self.read_count()?.ok_or(Error::UnexpectedNull {
            stream: StreamKind::Int,
            position,
        })?;
        let mut values = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        for _ in 0..count {
            values.push(self.int_values.read_next()?);
        }
        Ok(values)
    }

    /// Reads a count followed by that many values, appending them to `target`.
    pub fn fill_collection<T, C>(&mut self, target: &mut C) -> Result<()>
    where
        T: FlatValue,
        C: Extend<T>,
    {
        let position = self.int_values.position();
        let count = self.read_count()?.ok_or(Error::UnexpectedNull {
            stream: StreamKind::Int,
            position,
        })?;
        for _ in 0..count {
            let value = self.get_value::<T>()?;
            target.extend(std::iter::once(value));
        }
        Ok(())
    }

    /// Reads a shared reference written with `add_handle`; null is rejected.
    pub fn get_value_for_handle<T: FlatValue + 'static>(&mut self) -> Result<Rc<T>> {
        let position = self.int_values.position();
        self.get_nullable_value_for_handle::<T>()?
            .ok_or(Error::UnexpectedNull {
                stream: StreamKind::Int,
                position,
            })
    }

    /// Reads a shared reference written with `add_handle`.
    ///
    /// The first occurrence of a handle reads the value and caches it; later
    /// occurrences return the same `Rc`. A handle whose value is still being
    /// constructed is a cycle and fails with `UnsupportedCycle`.
    pub fn get_nullable_value_for_handle<T: FlatValue + 'static>(
        &mut self,
    ) -> Result<Option<Rc<T>>> {
        self.resolve_handle(|reader| reader.get_value::<T>())
    }

    /// Verifies that all three streams were consumed.
    pub fn signal_finished(&self) -> Result<()> {
        for stream in StreamKind::ALL {
            let remaining = self.remaining(stream);
            if remaining > 0 {
                return Err(Error::IncompleteConsumption { stream, remaining });
            }
        }
        debug!(
            "reconstruction finished: {} handles resolved",
            self.handles.len()
        );
        Ok(())
    }

    /// Number of unread values left in `stream`.
    pub fn remaining(&self, stream: StreamKind) -> usize {
        match stream {
            StreamKind::Any => self.any_values.remaining(),
            StreamKind::Int => self.int_values.remaining(),
            StreamKind::Bool => self.bool_values.remaining(),
        }
    }

    /// Number of handles seen so far, including those still under construction.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.options.registry
    }

    pub(crate) fn read_primitive<T: AnyPrimitive>(&mut self) -> Result<Option<T>> {
        let position = self.any_values.position();
        match self.any_values.read_next()? {
            AnyValue::Null => Ok(None),
            value => T::from_any(value).map(Some).map_err(|actual| {
                Error::type_mismatch(StreamKind::Any, position, T::TYPE_NAME, actual.type_name())
            }),
        }
    }

    /// Reads a collection count; `None` for the null marker.
    pub(crate) fn read_count(&mut self) -> Result<Option<usize>> {
        let position = self.int_values.position();
        let count = self.int_values.read_next()?;
        if count == NULL_HANDLE {
            return Ok(None);
        }
        let limit = self.options.max_collection_len;
        match usize::try_from(count) {
            Ok(len) if len <= limit => Ok(Some(len)),
            _ => Err(Error::InvalidLength {
                stream: StreamKind::Int,
                position,
                length: i64::from(count),
                limit,
            }),
        }
    }

    /// Reads a type identifier through the handle path. When `expected`
    /// names the identifier read and auto-registration is on, that type is
    /// registered on first use.
    pub(crate) fn read_type_tag(
        &mut self,
        expected: Option<(TypeTag, fn(&TypeRegistry))>,
    ) -> Result<Option<TypeTag>> {
        let tag = self.resolve_handle(|reader| {
            let name = reader.get_value::<String>()?;
            if let Some((tag, ensure)) = expected {
                if reader.options.auto_register && tag.name() == name {
                    ensure(&*reader.options.registry);
                    return Ok(tag);
                }
            }
            reader.options.registry.resolve(&name)
        })?;
        Ok(tag.map(|tag| *tag))
    }

    fn read_flattenable(
        &mut self,
        expected: Option<(TypeTag, fn(&TypeRegistry))>,
    ) -> Result<Option<Box<dyn Flatten>>> {
        let tag = match self.read_type_tag(expected)? {
            Some(tag) => tag,
            None => return Ok(None),
        };
        // The lock is released before the factory runs: factories recurse
        // into this reader and may register further types.
        let factory = self.options.registry.factory(tag)?;
        factory(self).map(Some)
    }

    fn resolve_handle<T: 'static>(
        &mut self,
        read_fresh: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Option<Rc<T>>> {
        let position = self.int_values.position();
        let handle = self.int_values.read_next()?;
        if handle == NULL_HANDLE {
            return Ok(None);
        }

        let table_len = self.handles.len();
        let index = match usize::try_from(handle) {
            Ok(index) if index <= table_len => index,
            _ => return Err(Error::InvalidHandle { handle, table_len }),
        };

        if index < table_len {
            return match &self.handles[index] {
                Slot::Pending => Err(Error::UnsupportedCycle { handle }),
                Slot::Ready { value, type_name } => {
                    let type_name = *type_name;
                    Rc::clone(value).downcast::<T>().map(Some).map_err(|_| {
                        Error::type_mismatch(
                            StreamKind::Int,
                            position,
                            short_type_name(std::any::type_name::<T>()),
                            short_type_name(type_name),
                        )
                    })
                }
            };
        }

        // First sight: reserve the slot before construction so that any
        // reference back to it from inside is recognised as a cycle.
        trace!("reading fresh value for handle {}", handle);
        self.handles.push(Slot::Pending);
        let value = Rc::new(read_fresh(self)?);
        self.handles[index] = Slot::Ready {
            value: Rc::clone(&value) as Rc<dyn Any>,
            type_name: std::any::type_name::<T>(),
        };
        Ok(Some(value))
    }

    /// Where a null of kind `T` would be reported.
    fn null_site<T: FlatValue>(&self) -> (StreamKind, usize) {
        match T::NULL_STREAM {
            StreamKind::Any => (StreamKind::Any, self.any_values.position()),
            StreamKind::Int => (StreamKind::Int, self.int_values.position()),
            StreamKind::Bool => (StreamKind::Bool, self.bool_values.position()),
        }
    }
}

fn ensure_registered<T: Unflatten>(registry: &TypeRegistry) {
    registry.ensure::<T>();
}
