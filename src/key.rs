use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use siphasher::sip128::{Hasher128, SipHasher13};

use crate::map::{self, ErasedSection};

/// Bounds for keys of the heterogeneous layer.
pub trait Key: Hash + Eq + Clone + Send + Sync + 'static {}

impl<T: Hash + Eq + Clone + Send + Sync + 'static> Key for T {}

/// Bounds for values of the heterogeneous layer.
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

/// Evidence for one key type / value type pairing.
///
/// A tag names a logical table inside a
/// [`HeteroMemoTable`](crate::HeteroMemoTable) or a
/// [`HeteroMap`](crate::HeteroMap). Because the tag's type fixes `K` and `V`,
/// the compiler ensures that everything stored under a tag has the right
/// types.
///
/// ```
/// # use memotable::Tag;
/// const LENGTHS: Tag<String, usize> = Tag::new("lengths");
/// assert_eq!(LENGTHS.name(), "lengths");
/// ```
pub struct Tag<K, V> {
    name: &'static str,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Tag<K, V> {
    /// Create a tag with a human-readable name.
    ///
    /// Two tags are the same if they have the same name _and_ the same key
    /// and value types.
    pub const fn new(name: &'static str) -> Self {
        Self { name, marker: PhantomData }
    }

    /// The tag's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<K: 'static, V: 'static> Tag<K, V> {
    /// The tag's runtime identity.
    pub fn id(&self) -> TagId {
        TagId { name: self.name, types: TypeId::of::<(K, V)>() }
    }
}

impl<K, V> Copy for Tag<K, V> {}

impl<K, V> Clone for Tag<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Debug for Tag<K, V> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Tag({:?})", self.name)
    }
}

/// The runtime identity of a [`Tag`], with its types erased.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TagId {
    name: &'static str,
    types: TypeId,
}

impl TagId {
    /// The tag's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this identity belongs to a tag whose `(K, V)` pairing has the
    /// given type id.
    pub(crate) fn holds(&self, types: TypeId) -> bool {
        self.types == types
    }
}

impl Debug for TagId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "TagId({:?})", self.name)
    }
}

/// A type-erased value of the heterogeneous layer.
pub(crate) type ErasedValue = Arc<dyn Any + Send + Sync>;

/// A compound key: a tag identity plus a typed key with its type erased.
///
/// Hashing only touches the tag and a precomputed 128-bit hash of the key.
#[derive(Clone)]
pub(crate) struct ErasedKey {
    tag: TagId,
    hash: u128,
    key: Arc<dyn Any + Send + Sync>,
    /// Typed equality for the erased keys.
    eq: fn(&dyn Any, &dyn Any) -> bool,
    /// Creates an empty section of this key's tag.
    section: fn() -> Box<dyn ErasedSection>,
}

impl ErasedKey {
    /// Erase a key of the tag with the given identity.
    ///
    /// `tag` must be the identity of a `Tag<K, V>`.
    pub fn new<K: Key, V: Value>(tag: TagId, key: K) -> Self {
        debug_assert!(tag.holds(TypeId::of::<(K, V)>()));
        Self {
            tag,
            hash: hash(&key),
            key: Arc::new(key),
            eq: eq_erased::<K>,
            section: map::empty_section::<K, V>,
        }
    }

    /// The tag half of the compound key.
    pub fn tag(&self) -> TagId {
        self.tag
    }

    /// The key half, if it is of type `K`.
    pub fn downcast<K: Key>(&self) -> Option<&K> {
        self.key.downcast_ref()
    }

    /// An empty section for this key's tag.
    pub fn new_section(&self) -> Box<dyn ErasedSection> {
        (self.section)()
    }
}

impl Hash for ErasedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
        state.write_u128(self.hash);
    }
}

impl Eq for ErasedKey {}

impl PartialEq for ErasedKey {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && self.hash == other.hash
            && (self.eq)(&*self.key, &*other.key)
    }
}

impl Debug for ErasedKey {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "ErasedKey({:?}, {:032x})", self.tag.name, self.hash)
    }
}

/// Compare two erased values of type `K`.
fn eq_erased<K: Eq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<K>(), b.downcast_ref::<K>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Produce a 128-bit hash of a value.
#[inline]
pub(crate) fn hash<T: Hash>(value: &T) -> u128 {
    let mut state = SipHasher13::new();
    value.hash(&mut state);
    state.finish128().as_u128()
}
