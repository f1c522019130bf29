//! Core traits for the flatgraph library.

use crate::error::Result;
use crate::reader::FlatReader;
use crate::stream::StreamKind;
use crate::value::{AnyPrimitive, TypeTag};
use crate::writer::FlatWriter;
use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

// Counts come from the payload; never trust them for up-front allocation.
pub(crate) const PREALLOC_LIMIT: usize = 1024;

/// Object-safe access to `Any` for trait objects.
///
/// Implemented for every `'static` type; call it through an explicit deref
/// (`(*boxed).as_any()`) so the box itself is not picked as the receiver.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// The write half of the Flattenable contract.
///
/// An implementation appends exactly the fields it wants persisted, in a
/// fixed order. The matching [`Unflatten::unflatten`] must read the same
/// fields back in the same order with the same types; the reader's
/// completeness check and type checks catch asymmetries, the type system
/// does not.
pub trait Flatten: AsAny {
    /// Identifier of the concrete runtime type, written ahead of the fields.
    fn type_tag(&self) -> TypeTag;

    fn flatten(&self, writer: &mut FlatWriter) -> Result<()>;
}

/// The reconstruction half of the Flattenable contract.
pub trait Unflatten: Flatten + Sized {
    /// Must equal what [`Flatten::type_tag`] returns for every value of this type.
    const TYPE_TAG: TypeTag;

    /// Builds a fresh instance by pulling its fields from the session.
    fn unflatten(reader: &mut FlatReader) -> Result<Self>;
}

/// A value that can be written with `add_value` and read with `get_value`.
///
/// This is where the writer's dispatch lives: primitives go to the
/// any-value stream, type tags and Flattenable objects go through the
/// handle path, containers write a count followed by their elements.
pub trait FlatValue: Sized {
    /// Stream that carries the null form of this kind of value.
    const NULL_STREAM: StreamKind = StreamKind::Int;

    /// Set when the null form is itself a value of this type, so an outer
    /// `Option` needs its own presence flag.
    const NULLABLE: bool = false;

    fn add_to(&self, writer: &mut FlatWriter) -> Result<()>;

    /// Writes the null form of this kind of value.
    fn add_null(writer: &mut FlatWriter) -> Result<()>;

    /// Reads one value; `Ok(None)` when the null form was found.
    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>>;
}

macro_rules! flat_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FlatValue for $ty {
                const NULL_STREAM: StreamKind = StreamKind::Any;

                #[inline]
                fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
                    writer.push_any(AnyPrimitive::into_any(self.clone()));
                    Ok(())
                }

                #[inline]
                fn add_null(writer: &mut FlatWriter) -> Result<()> {
                    writer.push_any(crate::value::AnyValue::Null);
                    Ok(())
                }

                #[inline]
                fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
                    reader.read_primitive::<$ty>()
                }
            }
        )*
    };
}

flat_primitive!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, char, String, Box<[u8]>);

impl FlatValue for TypeTag {
    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_type(*self);
        Ok(())
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        writer.push_null_marker();
        Ok(())
    }

    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        reader.read_type_tag(None)
    }
}

// `Option<T>` reuses the null form of `T`. When `T` is nullable itself that
// form is already taken, so presence goes to the bool stream instead.
impl<T: FlatValue> FlatValue for Option<T> {
    const NULL_STREAM: StreamKind = if T::NULLABLE {
        StreamKind::Bool
    } else {
        T::NULL_STREAM
    };
    const NULLABLE: bool = true;

    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        if T::NULLABLE {
            writer.add_bool(self.is_some());
        }
        match self {
            Some(value) => value.add_to(writer),
            None if T::NULLABLE => Ok(()),
            None => T::add_null(writer),
        }
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        if T::NULLABLE {
            writer.add_bool(false);
            Ok(())
        } else {
            T::add_null(writer)
        }
    }

    // A null is a valid `Option<T>`, so this never reports null itself.
    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        if T::NULLABLE && !reader.get_bool()? {
            return Ok(Some(None));
        }
        T::get_from(reader).map(Some)
    }
}

impl<T: FlatValue> FlatValue for Vec<T> {
    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_array(self)
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        writer.push_null_marker();
        Ok(())
    }

    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        match reader.read_count()? {
            Some(count) => {
                let mut values = Vec::with_capacity(count.min(PREALLOC_LIMIT));
                for _ in 0..count {
                    values.push(reader.get_value::<T>()?);
                }
                Ok(Some(values))
            }
            None => Ok(None),
        }
    }
}

impl<K: FlatValue + Ord, V: FlatValue> FlatValue for BTreeMap<K, V> {
    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_count(self.len())?;
        for (key, value) in self {
            writer.add_value(key)?;
            writer.add_value(value)?;
        }
        Ok(())
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        writer.push_null_marker();
        Ok(())
    }

    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        match reader.read_count()? {
            Some(count) => {
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = reader.get_value::<K>()?;
                    let value = reader.get_value::<V>()?;
                    map.insert(key, value);
                }
                Ok(Some(map))
            }
            None => Ok(None),
        }
    }
}

// A shared reference always travels through the handle path, so every `Rc`
// reachable from a graph is written once and read back as one allocation.
impl<T: FlatValue + 'static> FlatValue for Rc<T> {
    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_handle(Some(self))
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        writer.push_null_marker();
        Ok(())
    }

    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        reader.get_nullable_value_for_handle::<T>()
    }
}

// Flattenables are values in their own right; only `Rc` shares them.
impl<T: Unflatten> FlatValue for T {
    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        let value: &dyn Flatten = self;
        writer.add_flattenable(Some(value))
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        writer.add_flattenable(None)
    }

    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        reader.get_nullable_flattenable::<T>()
    }
}

impl FlatValue for Box<dyn Flatten> {
    fn add_to(&self, writer: &mut FlatWriter) -> Result<()> {
        writer.add_flattenable(Some(&**self))
    }

    fn add_null(writer: &mut FlatWriter) -> Result<()> {
        writer.add_flattenable(None)
    }

    fn get_from(reader: &mut FlatReader) -> Result<Option<Self>> {
        reader.get_nullable_dyn_flattenable()
    }
}
