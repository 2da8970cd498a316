//! Entity types shared by the reconciler and its callers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Reserved name of the synthesized fallback entity.
pub const DEFAULT_ENTITY_NAME: &str = "Default";

/// A syncable record identified by a unique name within its collection.
pub trait SyncEntity: Clone {
    fn name(&self) -> &str;

    /// Attributes for an entity that is referenced but never declared.
    /// Must be deterministic for a given name.
    fn make_implicit(name: &str) -> Self;

    /// The entity synthesized under [`DEFAULT_ENTITY_NAME`] when nothing
    /// declares or references it. `None` for collections without one.
    fn make_default() -> Option<Self> {
        None
    }
}

// ---------------------------------------------------------------------------
// Persisted / desired rows
// ---------------------------------------------------------------------------

/// A persisted row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingEntity<T> {
    /// `None` for legacy rows that were never numbered.
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub implicit: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: SyncEntity> ExistingEntity<T> {
    pub fn new(number: Option<u32>, implicit: bool, data: T) -> Self {
        Self {
            number,
            implicit,
            data,
        }
    }

    pub fn name(&self) -> &str {
        self.data.name()
    }
}

/// The computed target state for one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredEntity<T> {
    pub name: String,
    pub number: u32,
    pub implicit: bool,
    pub data: T,
}

impl<T> DesiredEntity<T> {
    /// The row this entity becomes once applied.
    pub fn into_existing(self) -> ExistingEntity<T> {
        ExistingEntity {
            number: Some(self.number),
            implicit: self.implicit,
            data: self.data,
        }
    }
}

// ---------------------------------------------------------------------------
// OrderedEntities
// ---------------------------------------------------------------------------

/// Name-keyed map that iterates in insertion order.
///
/// Re-inserting a name replaces its value but keeps its original position.
#[derive(Debug, Clone)]
pub struct OrderedEntities<V> {
    entries: Vec<(String, V)>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedEntities<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> OrderedEntities<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. Returns `true` if the name was new.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> bool {
        let name = name.into();
        match self.index.get(&name) {
            Some(&pos) => {
                self.entries[pos].1 = value;
                false
            }
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
                true
            }
        }
    }

    /// Insert only if the name is absent. Returns `true` if inserted.
    pub fn insert_if_absent(&mut self, name: impl Into<String>, value: V) -> bool {
        let name = name.into();
        if self.index.contains_key(&name) {
            return false;
        }
        self.insert(name, value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    /// 0-based insertion position of `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<V> IntoIterator for OrderedEntities<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
