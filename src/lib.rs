//! # flatgraph (v0.1.0)
//!
//! A codec that flattens an object graph into three homogeneous streams and
//! reconstructs it again, preserving shared references.
//!
//! ## Overview
//!
//! A [`FlatWriter`] walks a graph depth-first. Primitives go to the
//! any-value stream, integers and booleans written explicitly go to their own
//! streams, and shared references are replaced by integer handles so each
//! object is emitted only once. The result is a [`Payload`]: three ordered
//! sequences that are produced together and consumed together.
//!
//! A [`FlatReader`] replays the same calls in the same order. Types that take
//! part implement [`Flatten`] (write side) and [`Unflatten`] (read side) and
//! are found again through a [`TypeRegistry`] keyed by their [`TypeTag`].
//!
//! ## Quick Start
//!
//! ```rust
//! use flatgraph::*;
//! use std::rc::Rc;
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//! }
//!
//! impl Flatten for Point {
//!     fn type_tag(&self) -> TypeTag {
//!         Self::TYPE_TAG
//!     }
//!
//!     fn flatten(&self, writer: &mut FlatWriter) -> Result<()> {
//!         writer.add_int(self.x);
//!         writer.add_int(self.y);
//!         Ok(())
//!     }
//! }
//!
//! impl Unflatten for Point {
//!     const TYPE_TAG: TypeTag = TypeTag::new("quickstart::Point");
//!
//!     fn unflatten(reader: &mut FlatReader) -> Result<Self> {
//!         Ok(Point {
//!             x: reader.get_int()?,
//!             y: reader.get_int()?,
//!         })
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let origin = Rc::new(Point { x: 0, y: 0 });
//!
//!     let mut writer = FlatWriter::new();
//!     writer.add_handle(Some(&origin))?;
//!     writer.add_handle(Some(&origin))?;
//!     let payload = writer.into_payload();
//!
//!     let mut reader = FlatReader::new(payload);
//!     let a = reader.get_value_for_handle::<Point>()?;
//!     let b = reader.get_value_for_handle::<Point>()?;
//!     reader.signal_finished()?;
//!
//!     assert!(Rc::ptr_eq(&a, &b));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **`stream`**: typed append buffers and sequential cursors, one per stream
//! * **`writer`** / **`reader`**: the two sessions and their handle tables
//! * **`traits`**: the Flattenable contract and the `FlatValue` dispatch
//! * **`registry`**: type tag to factory lookup, shared across threads
//! * **`payload`**: the three streams handed to whatever transport the caller uses

pub mod error;
pub mod payload;
pub mod reader;
pub mod registry;
pub mod stream;
pub mod traits;
pub mod value;
pub mod writer;

// Re-export the main public API for user convenience.
pub use error::{Error, Result};
pub use payload::Payload;
pub use reader::{FlatReader, ReaderOptions};
pub use registry::TypeRegistry;
pub use stream::StreamKind;
pub use traits::{AsAny, FlatValue, Flatten, Unflatten};
pub use value::{AnyValue, TypeTag};
pub use writer::{FlatWriter, NULL_HANDLE};

/// Flattens a single root value into a fresh payload.
pub fn flatten_root<T: FlatValue>(root: &T) -> Result<Payload> {
    let mut writer = FlatWriter::new();
    writer.add_value(root)?;
    Ok(writer.into_payload())
}

/// Reconstructs a root value written by [`flatten_root`] and checks that the
/// payload was consumed completely.
pub fn unflatten_root<T: FlatValue>(payload: Payload) -> Result<T> {
    unflatten_root_with(payload, ReaderOptions::default())
}

/// [`unflatten_root`] with explicit reader options.
pub fn unflatten_root_with<T: FlatValue>(payload: Payload, options: ReaderOptions) -> Result<T> {
    let mut reader = FlatReader::with_options(payload, options);
    let root = reader.get_value::<T>()?;
    reader.signal_finished()?;
    Ok(root)
}
