use std::hash::Hash;

use crate::table::MemoTable;

/// Ensure that the arguments of a memoized function can form a table key.
pub fn assert_key<T: Hash + Eq + Clone + Send + Sync + 'static>() {}

/// Executes a memoized function's body, or reuses the result of an earlier
/// execution with the same arguments.
///
/// This is what `#[memoize]` expands to. The `table` is a static private to
/// the memoized function.
pub fn memoized<Args, Out, F>(table: &MemoTable<Args, Out>, args: Args, func: F) -> Out
where
    Args: Hash + Eq + Clone,
    Out: Clone,
    F: FnOnce(Args) -> Out,
{
    let key = args.clone();
    table.memoize(key, || func(args))
}
