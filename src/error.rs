use thiserror::Error;

/// An error from a memoized computation with a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError<E> {
    /// Another thread's computation for the key did not finish in time.
    #[error("timed out waiting for an in-flight computation")]
    Timeout,
    /// This caller owned the key and its computation failed.
    #[error(transparent)]
    Failed(E),
}

/// An error when assembling a [`HeteroMap`](crate::HeteroMap) from sections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// The section's key and value types differ from those fixed by its tag.
    #[error("section for tag `{0}` does not hold the tag's key and value types")]
    SectionMismatch(&'static str),
    /// The same tag was given more than one section.
    #[error("tag `{0}` has more than one section")]
    DuplicateSection(&'static str),
}
