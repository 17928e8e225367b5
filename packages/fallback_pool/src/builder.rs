use std::marker::PhantomData;

use crate::{DropPolicy, FallbackPool};

/// Builder for creating an instance of [`FallbackPool`].
///
/// [`FallbackPool`] requires the slot capacity to be specified at construction time - there is
/// no default and the pool never grows, so choose the bound for the expected steady-state
/// population (overflow beyond it is served from the heap, not an error).
///
/// The capacity is mandatory, whereas other settings are optional.
///
/// # Examples
///
/// ```
/// use fallback_pool::{DropPolicy, FallbackPool};
///
/// let pool = FallbackPool::<u64>::builder()
///     .capacity(1000)
///     .drop_policy(DropPolicy::MustNotDropAcquired)
///     .build();
/// ```
#[must_use]
pub struct FallbackPoolBuilder<T> {
    capacity: Option<usize>,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T> std::fmt::Debug for FallbackPoolBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPoolBuilder")
            .field(
                "item_type",
                &std::format_args!("{}", std::any::type_name::<T>()),
            )
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

impl<T> FallbackPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            capacity: None,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the number of slots in the pool's fixed storage.
    ///
    /// The capacity cannot be changed after the pool is built.
    ///
    /// # Examples
    ///
    /// ```
    /// use fallback_pool::FallbackPool;
    ///
    /// let pool = FallbackPool::<u64>::builder().capacity(64).build();
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "FallbackPool must have non-zero capacity");
        self.capacity = Some(capacity);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat slots that are still acquired when the pool is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use fallback_pool::{DropPolicy, FallbackPool};
    ///
    /// let pool = FallbackPool::<u64>::builder()
    ///     .capacity(16)
    ///     .drop_policy(DropPolicy::MustNotDropAcquired)
    ///     .build();
    /// ```
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if no capacity has been set using [`capacity()`](Self::capacity) or
    /// if `T` is zero-sized.
    ///
    /// # Examples
    ///
    /// ```
    /// use fallback_pool::FallbackPool;
    ///
    /// let pool = FallbackPool::<u64>::builder().capacity(8).build();
    /// ```
    #[must_use]
    pub fn build(self) -> FallbackPool<T> {
        let capacity = self
            .capacity
            .expect("capacity must be set using .capacity() before calling .build()");

        FallbackPool::new_inner(capacity, self.drop_policy)
    }
}
