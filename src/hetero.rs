use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::MemoError;
use crate::key::{ErasedKey, ErasedValue, Key, Tag, TagId, Value};
use crate::map::{HeteroMap, Section};
use crate::table::MemoTable;

/// A memo table shared by many key type / value type pairings.
///
/// Each pairing is selected by a [`Tag`]. The tag is part of every compound
/// key, so different tags never see each other's entries, even if their keys
/// compare equal. All operations have the semantics of the corresponding
/// [`MemoTable`] operations.
///
/// ```
/// # use memotable::{HeteroMemoTable, Tag};
/// const SQUARES: Tag<u32, u64> = Tag::new("squares");
/// const LABELS: Tag<u32, String> = Tag::new("labels");
///
/// let table = HeteroMemoTable::new();
/// assert_eq!(table.memoize(&SQUARES, 3, || 9), 9);
/// assert_eq!(table.memoize(&LABELS, 3, || "three".to_string()), "three");
/// assert_eq!(table.get(&SQUARES, &3), Some(9));
/// ```
#[derive(Debug, Default)]
pub struct HeteroMemoTable {
    table: MemoTable<ErasedKey, ErasedValue>,
}

impl HeteroMemoTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self { table: MemoTable::new() }
    }

    /// Return the value for `key` under `tag`, computing it with `func` if no
    /// value exists yet.
    pub fn memoize<K, V, F>(&self, tag: &Tag<K, V>, key: K, func: F) -> V
    where
        K: Key,
        V: Value,
        F: FnOnce() -> V,
    {
        let value = self.table.memoize(erase(tag, key), || erase_value(func()));
        reveal(&value)
    }

    /// Return the value for `key` under `tag`, computing it with the fallible
    /// `func` if no value exists yet.
    pub fn try_memoize<K, V, E, F>(&self, tag: &Tag<K, V>, key: K, func: F) -> Result<V, E>
    where
        K: Key,
        V: Value,
        F: FnOnce() -> Result<V, E>,
    {
        let value = self.table.try_memoize(erase(tag, key), || func().map(erase_value))?;
        Ok(reveal(&value))
    }

    /// Like [`try_memoize`](Self::try_memoize), but with a bound on how long
    /// to wait for another thread's computation.
    pub fn try_memoize_within<K, V, E, F>(
        &self,
        tag: &Tag<K, V>,
        key: K,
        timeout: Duration,
        func: F,
    ) -> Result<V, MemoError<E>>
    where
        K: Key,
        V: Value,
        F: FnOnce() -> Result<V, E>,
    {
        let value = self.table.try_memoize_within(erase(tag, key), timeout, || {
            func().map(erase_value)
        })?;
        Ok(reveal(&value))
    }

    /// Return the finished value for `key` under `tag`, if any.
    pub fn get<K: Key, V: Value>(&self, tag: &Tag<K, V>, key: &K) -> Option<V> {
        self.table.get(&erase(tag, key.clone())).map(|value| reveal(&value))
    }

    /// Return all finished entries, grouped into one map per tag.
    pub fn snapshot(&self) -> HeteroMap {
        let mut map = HeteroMap::new();
        for (key, value) in self.table.snapshot() {
            map.insert_erased(&key, &value);
        }
        debug!(entries = map.len(), "took grouped snapshot");
        map
    }

    /// Load precomputed entries under `tag`. Keys that already have a value
    /// keep it.
    pub fn load_map<K, V, I>(&self, tag: &Tag<K, V>, entries: I) -> &Self
    where
        K: Key,
        V: Value,
        I: IntoIterator<Item = (K, V)>,
    {
        self.table.load_map(
            entries
                .into_iter()
                .map(|(key, value)| (erase(tag, key), erase_value(value))),
        );
        self
    }

    /// Load every `(tag, section)` pair, for example from
    /// [`HeteroMap::sections`]. Keys that already have a value keep it.
    pub fn load_sections<'a, I>(&self, sections: I) -> &Self
    where
        I: IntoIterator<Item = (TagId, &'a Section)>,
    {
        for (tag, section) in sections {
            self.table.load_map(section.erased_entries(tag));
        }
        self
    }

    /// The number of finished entries across all tags.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no entry has finished yet.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn erase<K: Key, V: Value>(tag: &Tag<K, V>, key: K) -> ErasedKey {
    ErasedKey::new::<K, V>(tag.id(), key)
}

fn erase_value<V: Value>(value: V) -> ErasedValue {
    Arc::new(value)
}

/// Recover a value stored under a `Tag<_, V>`.
fn reveal<V: Value>(value: &ErasedValue) -> V {
    value
        .downcast_ref::<V>()
        .expect("tag fixes the value type")
        .clone()
}
