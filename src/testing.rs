use std::cell::Cell;

thread_local! {
    /// Whether this thread's last memoize call was served without computing.
    static LAST_WAS_HIT: Cell<bool> = const { Cell::new(false) };
}

/// Whether this thread's last memoize call found an existing value.
///
/// A call that waited for another thread's computation counts as a hit. A call
/// that ran its own computation to success counts as a miss.
pub fn last_was_hit() -> bool {
    LAST_WAS_HIT.with(Cell::get)
}

/// Marks the last call as a hit.
pub(crate) fn register_hit() {
    LAST_WAS_HIT.with(|cell| cell.set(true))
}

/// Marks the last call as a miss.
pub(crate) fn register_miss() {
    LAST_WAS_HIT.with(|cell| cell.set(false))
}
