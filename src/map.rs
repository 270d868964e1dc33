use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::MapError;
use crate::key::{ErasedKey, ErasedValue, Key, Tag, TagId, Value};

/// A collection of homogeneous maps, one per [`Tag`].
///
/// This is the shape in which a [`HeteroMemoTable`](crate::HeteroMemoTable)
/// hands out snapshots and accepts preloaded entries.
///
/// ```
/// # use memotable::{HeteroMap, Tag};
/// const AGES: Tag<&str, u32> = Tag::new("ages");
/// const NAMES: Tag<u32, String> = Tag::new("names");
///
/// let mut map = HeteroMap::new();
/// map.insert(&AGES, "ada", 36);
/// map.insert(&NAMES, 1, "ada".to_string());
/// assert_eq!(map.get(&AGES, &"ada"), Some(&36));
/// assert_eq!(map.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct HeteroMap {
    sections: FxHashMap<TagId, Section>,
}

impl HeteroMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(tag, section)` pairs.
    ///
    /// Fails if a section's key and value types are not those of its tag or if
    /// a tag occurs twice.
    pub fn from_sections<I>(sections: I) -> Result<Self, MapError>
    where
        I: IntoIterator<Item = (TagId, Section)>,
    {
        let mut map = Self::new();
        for (tag, section) in sections {
            if !tag.holds(section.0.types()) {
                return Err(MapError::SectionMismatch(tag.name()));
            }
            if map.sections.insert(tag, section).is_some() {
                return Err(MapError::DuplicateSection(tag.name()));
            }
        }
        Ok(map)
    }

    /// Add a whole section, replacing any previous section for the tag.
    pub fn with_section<K: Key, V: Value>(
        mut self,
        tag: &Tag<K, V>,
        entries: FxHashMap<K, V>,
    ) -> Self {
        self.sections.insert(tag.id(), Section::new(entries));
        self
    }

    /// Insert an entry, returning the previous value for the key.
    pub fn insert<K: Key, V: Value>(&mut self, tag: &Tag<K, V>, key: K, value: V) -> Option<V> {
        self.sections
            .entry(tag.id())
            .or_insert_with(|| Section::new(FxHashMap::<K, V>::default()))
            .typed_mut::<K, V>()
            .expect("tag fixes the section type")
            .insert(key, value)
    }

    /// The value for `key` under `tag`.
    pub fn get<K: Key, V: Value>(&self, tag: &Tag<K, V>, key: &K) -> Option<&V> {
        self.section(tag)?.get(key)
    }

    /// The homogeneous map stored under `tag`.
    pub fn section<K: Key, V: Value>(&self, tag: &Tag<K, V>) -> Option<&FxHashMap<K, V>> {
        self.sections.get(&tag.id())?.typed()
    }

    /// Iterate over all `(tag, section)` pairs in unspecified order.
    pub fn sections(&self) -> impl Iterator<Item = (TagId, &Section)> {
        self.sections.iter().map(|(&tag, section)| (tag, section))
    }

    /// Iterate over the tags that have a section.
    pub fn tags(&self) -> impl Iterator<Item = TagId> + '_ {
        self.sections.keys().copied()
    }

    /// The total number of entries across all sections.
    pub fn len(&self) -> usize {
        self.sections.values().map(Section::len).sum()
    }

    /// Whether there are no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an erased entry to the section of its tag.
    pub(crate) fn insert_erased(&mut self, key: &ErasedKey, value: &ErasedValue) {
        self.sections
            .entry(key.tag())
            .or_insert_with(|| Section(key.new_section()))
            .0
            .insert_erased(key, value);
    }
}

impl Debug for HeteroMap {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.sections.iter()).finish()
    }
}

/// A homogeneous map whose key and value types are erased.
pub struct Section(Box<dyn ErasedSection>);

impl Section {
    /// Erase the types of a homogeneous map.
    pub fn new<K: Key, V: Value>(entries: FxHashMap<K, V>) -> Self {
        Self(Box::new(entries))
    }

    /// The underlying map, if it has key type `K` and value type `V`.
    pub fn typed<K: Key, V: Value>(&self) -> Option<&FxHashMap<K, V>> {
        self.0.as_any().downcast_ref()
    }

    fn typed_mut<K: Key, V: Value>(&mut self) -> Option<&mut FxHashMap<K, V>> {
        self.0.as_any_mut().downcast_mut()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the section has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The section's entries as compound keys of `tag` and erased values.
    pub(crate) fn erased_entries(&self, tag: TagId) -> Vec<(ErasedKey, ErasedValue)> {
        self.0.erased_entries(tag)
    }
}

impl Clone for Section {
    fn clone(&self) -> Self {
        Self(self.0.clone_box())
    }
}

impl Debug for Section {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Section({} entries)", self.len())
    }
}

/// Object-safe operations on a `FxHashMap<K, V>` with unknown `K` and `V`.
pub(crate) trait ErasedSection: Send + Sync {
    /// The type id of the `(K, V)` pairing.
    fn types(&self) -> TypeId;

    fn len(&self) -> usize;

    /// Insert an erased entry. Entries of other types are ignored.
    fn insert_erased(&mut self, key: &ErasedKey, value: &ErasedValue);

    fn erased_entries(&self, tag: TagId) -> Vec<(ErasedKey, ErasedValue)>;

    fn clone_box(&self) -> Box<dyn ErasedSection>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<K: Key, V: Value> ErasedSection for FxHashMap<K, V> {
    fn types(&self) -> TypeId {
        TypeId::of::<(K, V)>()
    }

    fn len(&self) -> usize {
        FxHashMap::len(self)
    }

    fn insert_erased(&mut self, key: &ErasedKey, value: &ErasedValue) {
        match (key.downcast::<K>(), value.downcast_ref::<V>()) {
            (Some(key), Some(value)) => {
                self.insert(key.clone(), value.clone());
            }
            _ => debug_assert!(false, "erased entry does not match its section"),
        }
    }

    fn erased_entries(&self, tag: TagId) -> Vec<(ErasedKey, ErasedValue)> {
        self.iter()
            .map(|(key, value)| {
                let value: ErasedValue = Arc::new(value.clone());
                (ErasedKey::new::<K, V>(tag, key.clone()), value)
            })
            .collect()
    }

    fn clone_box(&self) -> Box<dyn ErasedSection> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Create an empty section for the `(K, V)` pairing.
pub(crate) fn empty_section<K: Key, V: Value>() -> Box<dyn ErasedSection> {
    Box::new(FxHashMap::<K, V>::default())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const INTS: Tag<String, i64> = Tag::new("ints");
    const TEXTS: Tag<String, String> = Tag::new("texts");

    fn fx<K: Key, V: Value>(iter: impl IntoIterator<Item = (K, V)>) -> FxHashMap<K, V> {
        iter.into_iter().collect()
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = HeteroMap::new();
        assert!(map.is_empty());
        assert_eq!(map.insert(&INTS, "a".into(), 1), None);
        assert_eq!(map.insert(&INTS, "a".into(), 2), Some(1));
        assert_eq!(map.insert(&TEXTS, "a".into(), "x".into()), None);
        assert_eq!(map.get(&INTS, &"a".into()), Some(&2));
        assert_eq!(map.get(&TEXTS, &"a".into()), Some(&"x".to_string()));
        assert_eq!(map.len(), 2);
        assert_eq!(map.tags().count(), 2);
    }

    #[test]
    fn test_from_sections() {
        let map = HeteroMap::from_sections([
            (INTS.id(), Section::new(fx([("a".to_string(), 1_i64)]))),
            (TEXTS.id(), Section::new(fx([("a".to_string(), "x".to_string())]))),
        ])
        .unwrap();
        assert_eq!(map.section(&INTS), Some(&fx([("a".to_string(), 1)])));
        assert_eq!(map.section(&TEXTS), Some(&fx([("a".to_string(), "x".to_string())])));

        let rebuilt =
            HeteroMap::from_sections(map.sections().map(|(tag, s)| (tag, s.clone()))).unwrap();
        assert_eq!(rebuilt.len(), 2);
        assert_eq!(rebuilt.get(&INTS, &"a".into()), Some(&1));
    }

    #[test]
    fn test_from_sections_mismatch() {
        let section = Section::new(fx([("a".to_string(), 1_i64)]));
        assert_eq!(
            HeteroMap::from_sections([(TEXTS.id(), section)]).unwrap_err(),
            MapError::SectionMismatch("texts"),
        );
    }

    #[test]
    fn test_from_sections_duplicate() {
        let section = Section::new(fx([("a".to_string(), 1_i64)]));
        assert_eq!(
            HeteroMap::from_sections([(INTS.id(), section.clone()), (INTS.id(), section)])
                .unwrap_err(),
            MapError::DuplicateSection("ints"),
        );
    }

    #[quickcheck_macros::quickcheck]
    fn test_erased_round_trip_preserves_sections(
        ints: HashMap<String, i64>,
        texts: HashMap<String, String>,
    ) {
        let map = HeteroMap::new()
            .with_section(&INTS, fx(ints.clone()))
            .with_section(&TEXTS, fx(texts.clone()));

        let mut regrouped = HeteroMap::new();
        for (tag, section) in map.sections() {
            for (key, value) in section.erased_entries(tag) {
                regrouped.insert_erased(&key, &value);
            }
        }

        assert_eq!(regrouped.len(), ints.len() + texts.len());
        for (key, value) in &ints {
            assert_eq!(regrouped.get(&INTS, key), Some(value));
        }
        for (key, value) in &texts {
            assert_eq!(regrouped.get(&TEXTS, key), Some(value));
        }
    }
}
