use std::any::type_name;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::{debug, trace};

use crate::error::MemoError;

/// A concurrent table that computes the value for each key at most once.
///
/// Every key moves through three states: absent, in progress and finished.
/// The first caller for an absent key becomes the key's _owner_ and runs the
/// computation. Concurrent callers for the same key block until the owner is
/// done and then re-read the key's state. Once a computation succeeded, its
/// value is returned to every later caller, no matter which computation they
/// pass.
///
/// If the owner's computation fails (by returning an error or by panicking),
/// the key reverts to absent and one of the blocked callers takes over as the
/// new owner. The failure itself is only ever seen by the owner.
///
/// The table lock is never held while a computation runs, so computations may
/// freely memoize _other_ keys in the same table. Memoizing the same key from
/// within its own computation deadlocks.
///
/// ```
/// # use memotable::MemoTable;
/// let table = MemoTable::new();
/// assert_eq!(table.memoize(0, || 1), 1);
/// assert_eq!(table.memoize(0, || unreachable!()), 1);
/// assert_eq!(table.get(&0), Some(1));
/// ```
pub struct MemoTable<K, V> {
    entries: RwLock<FxHashMap<K, Entry<V>>>,
}

/// The state of a present key.
enum Entry<V> {
    /// Some thread owns the computation for this key.
    InProgress(Arc<Signal>),
    /// The computation succeeded. This is terminal.
    Finished(V),
}

impl<K, V> MemoTable<K, V> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self { entries: RwLock::new(HashMap::with_hasher(FxBuildHasher)) }
    }
}

impl<K, V> MemoTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Return the value for `key`, computing it with `func` if no value
    /// exists yet.
    ///
    /// If `func` panics, the key is left absent and the panic resumes in this
    /// caller.
    pub fn memoize<F>(&self, key: K, func: F) -> V
    where
        F: FnOnce() -> V,
    {
        match self.acquire(key, None) {
            Some(Acquired::Ready(value)) => value,
            Some(Acquired::Owner(claim)) => claim.publish(func()),
            None => unreachable!("waiting without a deadline never times out"),
        }
    }

    /// Return the value for `key`, computing it with the fallible `func` if
    /// no value exists yet.
    ///
    /// An error is returned to this caller only and leaves the key absent, so
    /// a later call retries the computation.
    pub fn try_memoize<F, E>(&self, key: K, func: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.acquire(key, None) {
            Some(Acquired::Ready(value)) => Ok(value),
            Some(Acquired::Owner(claim)) => Ok(claim.publish(func()?)),
            None => unreachable!("waiting without a deadline never times out"),
        }
    }

    /// Like [`try_memoize`](Self::try_memoize), but gives up with
    /// [`MemoError::Timeout`] if another thread's computation for `key` does
    /// not finish within `timeout`.
    ///
    /// The timeout only bounds waiting. Once this caller owns the key, its
    /// computation runs to completion.
    pub fn try_memoize_within<F, E>(
        &self,
        key: K,
        timeout: Duration,
        func: F,
    ) -> Result<V, MemoError<E>>
    where
        F: FnOnce() -> Result<V, E>,
    {
        // A deadline too far out to represent means waiting without a bound.
        match self.acquire(key, Instant::now().checked_add(timeout)) {
            Some(Acquired::Ready(value)) => Ok(value),
            Some(Acquired::Owner(claim)) => {
                let value = func().map_err(MemoError::Failed)?;
                Ok(claim.publish(value))
            }
            None => Err(MemoError::Timeout),
        }
    }

    /// Return the finished value for `key`, if any.
    ///
    /// Never blocks on in-flight computations and never computes anything.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.read().get(key)? {
            Entry::Finished(value) => Some(value.clone()),
            Entry::InProgress(_) => None,
        }
    }

    /// Return all finished entries.
    ///
    /// Every computation that succeeded before this call is included.
    /// Computations finishing concurrently may or may not be.
    pub fn snapshot(&self) -> FxHashMap<K, V> {
        self.entries
            .read()
            .iter()
            .filter_map(|(key, entry)| match entry {
                Entry::Finished(value) => Some((key.clone(), value.clone())),
                Entry::InProgress(_) => None,
            })
            .collect()
    }

    /// Load precomputed entries into the table.
    ///
    /// Keys that already have a value keep it.
    pub fn load_map<I>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.memoize(key, || value);
        }
        self
    }

    /// The number of finished entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|entry| matches!(entry, Entry::Finished(_)))
            .count()
    }

    /// Whether no entry has finished yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Either find a finished value or claim the key.
    ///
    /// Returns `None` if the deadline passed while waiting for another owner.
    fn acquire(&self, key: K, deadline: Option<Instant>) -> Option<Acquired<'_, K, V>> {
        loop {
            // Fast path: shared access only.
            if let Some(Entry::Finished(value)) = self.entries.read().get(&key) {
                #[cfg(feature = "testing")]
                crate::testing::register_hit();
                return Some(Acquired::Ready(value.clone()));
            }

            let signal = {
                let mut entries = self.entries.write();
                match entries.get(&key) {
                    Some(Entry::Finished(value)) => {
                        #[cfg(feature = "testing")]
                        crate::testing::register_hit();
                        return Some(Acquired::Ready(value.clone()));
                    }
                    Some(Entry::InProgress(signal)) => signal.clone(),
                    None => {
                        let signal = Arc::new(Signal::new());
                        entries.insert(key.clone(), Entry::InProgress(signal.clone()));
                        trace!(key = type_name::<K>(), "claimed entry");
                        return Some(Acquired::Owner(Claim {
                            table: self,
                            key: Some(key),
                            signal,
                        }));
                    }
                }
            };

            trace!(key = type_name::<K>(), "waiting on in-flight computation");
            if !signal.wait(deadline) {
                debug!(key = type_name::<K>(), "timed out waiting on in-flight computation");
                return None;
            }
        }
    }
}

impl<K, V> Default for MemoTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for MemoTable<K, V> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let entries = self.entries.read();
        let finished = entries
            .values()
            .filter(|entry| matches!(entry, Entry::Finished(_)))
            .count();
        f.debug_struct("MemoTable")
            .field("finished", &finished)
            .field("in_progress", &(entries.len() - finished))
            .finish()
    }
}

/// The outcome of looking up a key for memoization.
enum Acquired<'a, K, V>
where
    K: Hash + Eq,
{
    /// The key already has a value.
    Ready(V),
    /// The caller owns the key and must compute its value.
    Owner(Claim<'a, K, V>),
}

/// Ownership of an in-progress key.
///
/// Dropping a claim without publishing a value reverts the key to absent and
/// wakes all waiters. This covers both error returns and panics.
struct Claim<'a, K, V>
where
    K: Hash + Eq,
{
    table: &'a MemoTable<K, V>,
    /// `None` once the claim was settled.
    key: Option<K>,
    signal: Arc<Signal>,
}

impl<K, V> Claim<'_, K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Finish the key with `value` and wake all waiters.
    fn publish(mut self, value: V) -> V {
        if let Some(key) = self.key.take() {
            self.table.entries.write().insert(key, Entry::Finished(value.clone()));
        }
        self.signal.release();
        trace!(key = type_name::<K>(), "published entry");

        #[cfg(feature = "testing")]
        crate::testing::register_miss();

        value
    }
}

impl<K, V> Drop for Claim<'_, K, V>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.table.entries.write().remove(&key);
            self.signal.release();
            debug!(key = type_name::<K>(), "computation failed, entry released");

            #[cfg(feature = "testing")]
            crate::testing::register_miss();
        }
    }
}

/// A one-shot broadcast signal for the waiters on a single key.
struct Signal {
    released: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    fn new() -> Self {
        Self { released: Mutex::new(false), cond: Condvar::new() }
    }

    /// Wake all current and future waiters. Idempotent.
    fn release(&self) {
        *self.released.lock() = true;
        self.cond.notify_all();
    }

    /// Block until the signal is released or the deadline passes.
    ///
    /// Returns whether the signal was released.
    fn wait(&self, deadline: Option<Instant>) -> bool {
        let mut released = self.released.lock();
        while !*released {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut released, deadline).timed_out() {
                        return *released;
                    }
                }
                None => self.cond.wait(&mut released),
            }
        }
        true
    }
}
