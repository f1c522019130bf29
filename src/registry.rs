//! The type registry: type identifiers to reconstruction factories.
//!
//! Every type that can be reconstructed from a payload is registered here
//! under its [`TypeTag`]. The registered factory is a monomorphised function
//! pointer, so lookups never involve reflection and the set of reconstructable
//! types stays closed and auditable (see [`TypeRegistry::tags`]).
//!
//! A registry is shared by any number of sessions on any number of threads.
//! Reads take a shared lock; registration takes the write lock briefly and
//! the first registration of a tag wins.

use crate::error::{Error, Result};
use crate::reader::FlatReader;
use crate::traits::{Flatten, Unflatten};
use crate::value::TypeTag;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A reconstruction factory: builds a fresh instance from a reading session.
pub type Factory = fn(&mut FlatReader) -> Result<Box<dyn Flatten>>;

fn factory_for<T: Unflatten>(reader: &mut FlatReader) -> Result<Box<dyn Flatten>> {
    Ok(Box::new(T::unflatten(reader)?))
}

/// The factory the registry stores for `T`.
pub fn factory_of<T: Unflatten>() -> Factory {
    factory_for::<T>
}

#[derive(Clone, Copy)]
struct Entry {
    tag: TypeTag,
    factory: Option<Factory>,
}

#[derive(Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<&'static str, Entry>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reconstructable type. Returns `false` if its tag was
    /// already registered; the existing entry is kept.
    pub fn register<T: Unflatten>(&self) -> bool {
        self.insert(T::TYPE_TAG, Some(factory_of::<T>()))
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<T: Unflatten>(self) -> Self {
        self.register::<T>();
        self
    }

    /// Registers a resolvable identifier with no factory, for types that are
    /// only ever written as type values.
    pub fn register_tag(&self, tag: TypeTag) -> bool {
        self.insert(tag, None)
    }

    fn insert(&self, tag: TypeTag, factory: Option<Factory>) -> bool {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get_mut(tag.name()) {
            // A tag-only entry is upgraded when its factory shows up later.
            if existing.factory.is_none() && factory.is_some() {
                existing.factory = factory;
                debug!("registered factory for existing type tag {}", tag);
                return true;
            }
            if factory.is_none() && existing.factory.is_some() {
                warn!("type tag {} already has a factory; tag-only registration ignored", tag);
            } else {
                debug!("type tag {} already registered; keeping the first entry", tag);
            }
            return false;
        }
        entries.insert(tag.name(), Entry { tag, factory });
        debug!(
            "registered type tag {} (factory: {})",
            tag,
            factory.is_some()
        );
        true
    }

    /// Ensures `T` is registered, registering it on first use.
    pub(crate) fn ensure<T: Unflatten>(&self) {
        let present = self
            .entries
            .read()
            .get(T::TYPE_TAG.name())
            .map_or(false, |entry| entry.factory.is_some());
        if !present {
            self.register::<T>();
        }
    }

    /// Resolves a type identifier read from a payload.
    pub fn resolve(&self, name: &str) -> Result<TypeTag> {
        self.entries
            .read()
            .get(name)
            .map(|entry| entry.tag)
            .ok_or_else(|| Error::unsupported_type(name, "type identifier is not registered"))
    }

    /// Returns the factory for `tag`, or `UnsupportedType` when the tag is
    /// unknown or was registered without one.
    pub fn factory(&self, tag: TypeTag) -> Result<Factory> {
        match self.entries.read().get(tag.name()) {
            Some(Entry {
                factory: Some(factory),
                ..
            }) => Ok(*factory),
            Some(_) => Err(Error::unsupported_type(
                tag.name(),
                "no reconstruction factory registered",
            )),
            None => Err(Error::unsupported_type(
                tag.name(),
                "type identifier is not registered",
            )),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All registered tags, sorted by name.
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<TypeTag> = self.entries.read().values().map(|e| e.tag).collect();
        tags.sort();
        tags
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

/// The process-wide registry used by sessions that are not given one.
pub fn global() -> Arc<TypeRegistry> {
    static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(TypeRegistry::new())))
}
