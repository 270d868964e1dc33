//! Concurrent exactly-once memoization.
//!
//! A [`MemoTable`] computes the value for each key at most once and shares it
//! with every caller, including callers that arrive while the computation is
//! still running. A [`HeteroMemoTable`] multiplexes many key type / value type
//! pairings onto one table, each selected by a [`Tag`], and hands out grouped
//! snapshots as a [`HeteroMap`].
//!
//! With the `macros` feature, the [`memoize`] attribute backs a function with
//! its own static table.

mod error;
mod hetero;
mod key;
mod map;
mod memoize;
mod table;
#[cfg(feature = "testing")]
mod testing;

pub use crate::error::{MapError, MemoError};
pub use crate::hetero::HeteroMemoTable;
pub use crate::key::{Key, Tag, TagId, Value};
pub use crate::map::{HeteroMap, Section};
pub use crate::table::MemoTable;

/// Memoize a function.
///
/// The function gets a private static [`MemoTable`] keyed by its arguments.
/// Arguments must be owned values that are `Hash + Eq + Clone + Send + Sync`
/// and the return type must be `Clone + Send + Sync`.
///
/// ```
/// #[memotable::memoize]
/// fn fib(n: u64) -> u64 {
///     if n < 2 { n } else { fib(n - 1) + fib(n - 2) }
/// }
///
/// assert_eq!(fib(80), 23416728348467685);
/// ```
#[cfg(feature = "macros")]
pub use memotable_macros::memoize;

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    pub use crate::memoize::{assert_key, memoized};

    #[cfg(feature = "testing")]
    pub use crate::testing::last_was_hit;
}
