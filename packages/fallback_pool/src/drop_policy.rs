/// Determines how the pool treats slots that are still acquired when the pool is dropped.
///
/// By default, the pool may be dropped regardless of outstanding acquisitions. Dropping the
/// pool frees the slot storage, so any pool-backed pointer that has not been released becomes
/// dangling, and any heap-backed pointer from the overflow path is leaked. Neither is detected
/// in the default configuration - releasing every pointer exactly once remains the caller's
/// obligation either way.
///
/// # Examples
///
/// ```
/// use fallback_pool::{DropPolicy, FallbackPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = FallbackPool::<u64>::builder()
///     .capacity(16)
///     .drop_policy(DropPolicy::MustNotDropAcquired)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool may be dropped while slots are still acquired. This is the default.
    #[default]
    MayDropAcquired,

    /// The pool will panic if any pool-backed slot is still acquired when the pool is dropped.
    ///
    /// This may be valuable if it is known that callers hold pointers into the pool - a drop
    /// with acquisitions outstanding would turn those pointers dangling, so detecting the
    /// situation early is preferable to debugging the memory corruption later.
    ///
    /// Heap-backed pointers from the overflow path are not tracked by the pool and are not
    /// covered by this policy.
    MustNotDropAcquired,
}
