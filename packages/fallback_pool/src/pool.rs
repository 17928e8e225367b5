use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::any::type_name;
use std::ptr::NonNull;
use std::thread;

use crate::{DropPolicy, FallbackPoolBuilder, SlotArray};

/// A fixed-capacity object pool for values of type `T` that hands out zero-filled memory and
/// gracefully falls back to the general heap allocator when exhausted.
///
/// The pool pre-allocates a contiguous array of `capacity` slots at construction time. Slot
/// addresses never change afterwards - there is no growth, shrinking or relocation. On top of
/// that storage, [`acquire()`][1] and [`release()`][2] form a calloc/free-like pair:
///
/// * [`acquire()`][1] returns a pointer to zero-filled memory for one `T`, preferring (in strict
///   order) the most recently released slot, then a never-yet-used slot, then - once all
///   `capacity` slots are simultaneously in use - a fresh heap allocation. The pool paths
///   perform no heap traffic and cannot fail; exhaustion is not an error.
/// * [`release()`][2] decides where the pointer belongs with a single O(1) address range
///   comparison against the slot storage: pool-backed pointers are pushed onto an internal
///   LIFO free stack for reuse, anything else is returned to the heap allocator.
///
/// The caller cannot (and need not) tell pool-backed and heap-backed pointers apart - that
/// distinction is internal bookkeeping, applied at release time.
///
/// # Caller contract
///
/// Every pointer returned by [`acquire()`][1] must be passed to [`release()`][2] on the same
/// pool exactly once, and must not be used afterwards. The pool deliberately performs no
/// validity checking beyond the range test - releasing a pointer twice or releasing a pointer
/// that did not come from this pool is undefined behavior. Debug builds carry assertions that
/// catch slot double-release and misaligned pointers, but those are a development aid, not a
/// contract change.
///
/// # No destructors
///
/// The pool never runs `Drop` for `T`. Released slot contents are abandoned as-is and
/// zero-filled on the next acquisition, and dropping the pool frees raw storage only. The pool
/// is intended for plain-old-data values; if `T` owns resources, the caller must run teardown
/// through the pointer before releasing.
///
/// # Out of band access
///
/// The pool does not keep references to slot contents and never creates any unless asked, so
/// it is valid to read and write through acquired pointers without holding a borrow of the
/// pool. A zero-filled `T` is only a valid `T` if the all-zero bit pattern is valid for the
/// type; otherwise the caller must initialize the memory through the pointer before reading
/// it as `T`.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`] when `T: Send`) but not thread-safe (never [`Sync`]).
/// Bookkeeping is mutated without synchronization, matching the single-threaded contract;
/// callers that share a pool across threads must serialize access externally.
///
/// # Example
///
/// ```rust
/// use fallback_pool::FallbackPool;
///
/// let mut pool = FallbackPool::<u64>::with_capacity(128);
///
/// let value = pool.acquire();
///
/// // Acquired memory is zero-filled on every path.
/// // SAFETY: The pointer is valid for reads and writes of one u64,
/// // and the all-zero bit pattern is a valid u64.
/// unsafe {
///     assert_eq!(value.read(), 0);
///     value.write(42);
/// }
///
/// // SAFETY: The pointer came from this pool's acquire() and is released exactly once,
/// // with no further use afterwards.
/// unsafe { pool.release(value) };
/// ```
///
/// [1]: Self::acquire
/// [2]: Self::release
#[derive(Debug)]
pub struct FallbackPool<T> {
    /// The contiguous slot storage plus the address bounds for the ownership routing test.
    slots: SlotArray<T>,

    /// Indices of released slots, most recently released on top. Pre-allocated to `capacity`
    /// at construction, so pushes within the caller contract never touch the heap.
    free_stack: Vec<usize>,

    /// Count of slots ever handed out through the "never used before" path. Slots at index
    /// `>= next_unused` have not been touched since construction.
    next_unused: usize,

    drop_policy: DropPolicy,
}

impl<T> FallbackPool<T> {
    #[must_use]
    pub(crate) fn new_inner(capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            slots: SlotArray::new(capacity),
            free_stack: Vec::with_capacity(capacity),
            next_unused: 0,
            drop_policy,
        }
    }

    /// Creates a new [`FallbackPool`] with the given capacity and the default configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fallback_pool::FallbackPool;
    ///
    /// let pool = FallbackPool::<u64>::with_capacity(1000);
    ///
    /// assert_eq!(pool.capacity(), 1000);
    /// assert!(pool.is_empty());
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or if `T` is zero-sized.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::builder().capacity(capacity).build()
    }

    /// Starts building a new [`FallbackPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fallback_pool::{DropPolicy, FallbackPool};
    ///
    /// let pool = FallbackPool::<u64>::builder()
    ///     .capacity(16)
    ///     .drop_policy(DropPolicy::MustNotDropAcquired)
    ///     .build();
    ///
    /// assert_eq!(pool.capacity(), 16);
    /// ```
    pub fn builder() -> FallbackPoolBuilder<T> {
        FallbackPoolBuilder::new()
    }

    /// The number of slots in the pool's fixed storage.
    ///
    /// This is fixed at construction time. It does not bound how many values can be acquired
    /// simultaneously - it bounds how many of them are served without heap traffic.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// The number of pool-backed slots currently acquired.
    ///
    /// Heap-backed pointers from the overflow path are not tracked and do not count.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fallback_pool::FallbackPool;
    ///
    /// let mut pool = FallbackPool::<u64>::with_capacity(4);
    /// assert_eq!(pool.len(), 0);
    ///
    /// let first = pool.acquire();
    /// let second = pool.acquire();
    /// assert_eq!(pool.len(), 2);
    ///
    /// // SAFETY: Both pointers came from this pool's acquire() and are released exactly once.
    /// unsafe {
    ///     pool.release(first);
    ///     pool.release(second);
    /// }
    ///
    /// assert_eq!(pool.len(), 0);
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to always-empty, which only starves reuse.
    pub fn len(&self) -> usize {
        self.next_unused.checked_sub(self.free_stack.len()).expect(
            "more slots were released than ever acquired - the release-exactly-once contract was violated",
        )
    }

    /// Whether no pool-backed slots are currently acquired.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether all slots are currently acquired, meaning the next [`acquire()`][1] will be
    /// served from the heap.
    ///
    /// [1]: Self::acquire
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_stack.is_empty() && self.next_unused == self.slots.capacity()
    }

    /// Whether the pointer addresses a slot in this pool's storage.
    ///
    /// This is the same O(1) address range test that [`release()`][1] uses for ownership
    /// routing, exposed read-only. It never dereferences the pointer.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fallback_pool::FallbackPool;
    ///
    /// let mut pool = FallbackPool::<u64>::with_capacity(1);
    ///
    /// let pooled = pool.acquire();
    /// let overflow = pool.acquire();
    ///
    /// assert!(pool.contains(pooled));
    /// assert!(!pool.contains(overflow));
    ///
    /// // SAFETY: Both pointers came from this pool's acquire() and are released exactly once.
    /// unsafe {
    ///     pool.release(pooled);
    ///     pool.release(overflow);
    /// }
    /// ```
    ///
    /// [1]: Self::release
    #[must_use]
    pub fn contains(&self, ptr: NonNull<T>) -> bool {
        self.slots.contains(ptr)
    }

    /// Acquires a pointer to zero-filled memory for one `T`.
    ///
    /// In strict priority order, the memory comes from:
    ///
    /// 1. the most recently released slot (LIFO reuse, no heap traffic),
    /// 2. a slot that has never been handed out before (no heap traffic),
    /// 3. a fresh zero-initialized heap allocation, once all `capacity` slots are
    ///    simultaneously acquired.
    ///
    /// Every byte of the returned memory is zero regardless of the path taken. The returned
    /// pointer is valid for reads and writes of one `T` until it is passed to
    /// [`release()`][1], which the caller must eventually do exactly once.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fallback_pool::FallbackPool;
    ///
    /// let mut pool = FallbackPool::<[u8; 64]>::with_capacity(8);
    ///
    /// let buffer = pool.acquire();
    ///
    /// // SAFETY: The pointer is valid for reads of one [u8; 64], which is zero-filled.
    /// let contents = unsafe { buffer.read() };
    /// assert_eq!(contents, [0; 64]);
    ///
    /// // SAFETY: The pointer came from this pool's acquire() and is released exactly once.
    /// unsafe { pool.release(buffer) };
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the heap fallback path is taken and the global allocator reports failure.
    ///
    /// [1]: Self::release
    #[must_use = "the memory leaks (or, for a pool slot, stays unavailable) unless released"]
    pub fn acquire(&mut self) -> NonNull<T> {
        #[cfg(debug_assertions)]
        self.integrity_check();

        if let Some(index) = self.free_stack.pop() {
            let ptr = self.slots.slot_ptr(index);

            // SAFETY: The pointer spans exactly one slot that is vacant, so it is valid for
            // writes of one T and nothing else is reading or writing through it.
            unsafe { ptr.write_bytes(0, 1) };

            return ptr;
        }

        if self.next_unused < self.slots.capacity() {
            let index = self.next_unused;

            self.next_unused = index
                .checked_add(1)
                .expect("guarded by the capacity bound above");

            let ptr = self.slots.slot_ptr(index);

            // SAFETY: As above - the slot has never been handed out, so we are the only writer.
            unsafe { ptr.write_bytes(0, 1) };

            return ptr;
        }

        // Every slot is in use, so we defer to the general heap allocator. This is defined
        // fallback behavior, not a failure - the caller never observes the difference until
        // release time, and not even then.
        //
        // SAFETY: The layout is not zero-sized; zero-sized T is rejected at construction.
        let ptr = unsafe { alloc_zeroed(Layout::new::<T>()) };

        NonNull::new(ptr.cast::<T>()).expect(
            "we do not intend to handle allocation failure as a real possibility - OOM is panic",
        )
    }

    /// Releases a pointer previously returned by [`acquire()`][1].
    ///
    /// A single address range comparison routes the pointer: if it lies within the pool's slot
    /// storage, its slot index goes onto the free stack for LIFO reuse (contents are left
    /// as-is until the next acquisition zero-fills them); otherwise the pointer is returned to
    /// the general heap allocator. Both branches are O(1).
    ///
    /// # Safety
    ///
    /// The pointer must have been returned by [`acquire()`][1] on this same pool, must not
    /// have been released before, and must not be used in any way after this call. The pool
    /// does not detect violations: a double release corrupts the free stack and a foreign
    /// pointer is handed to the wrong allocator, both of which are undefined behavior.
    ///
    /// [1]: Self::acquire
    pub unsafe fn release(&mut self, ptr: NonNull<T>) {
        if self.slots.contains(ptr) {
            let index = self.slots.index_of(ptr);

            debug_assert!(
                index < self.next_unused,
                "released slot {index} was never acquired in pool of {}",
                type_name::<T>()
            );
            debug_assert!(
                !self.free_stack.contains(&index),
                "double release of slot {index} in pool of {}",
                type_name::<T>()
            );

            self.free_stack.push(index);

            return;
        }

        // Not ours, so it came from the heap fallback path in acquire().
        //
        // SAFETY: The caller guarantees the pointer came from acquire() and has not been
        // released; every acquire() result outside the slot range was obtained from the
        // global allocator with exactly this layout.
        unsafe { dealloc(ptr.as_ptr().cast::<u8>(), Layout::new::<T>()) };
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    fn integrity_check(&self) {
        assert!(
            self.next_unused <= self.slots.capacity(),
            "high watermark {} exceeds capacity {} in pool of {}",
            self.next_unused,
            self.slots.capacity(),
            type_name::<T>()
        );

        assert!(
            self.free_stack.len() <= self.next_unused,
            "free stack holds more slots than were ever acquired in pool of {}",
            type_name::<T>()
        );

        // Deliberately allocation-free so debug builds can still assert "no heap traffic".
        for (position, index) in self.free_stack.iter().enumerate() {
            assert!(
                *index < self.next_unused,
                "free stack refers to slot {index} that was never acquired in pool of {}",
                type_name::<T>()
            );

            let later_entries = position
                .checked_add(1)
                .expect("position is bounded by the free stack length");

            assert!(
                !self
                    .free_stack
                    .iter()
                    .skip(later_entries)
                    .any(|other| other == index),
                "free stack holds slot {index} more than once in pool of {}",
                type_name::<T>()
            );
        }
    }
}

impl<T> Drop for FallbackPool<T> {
    fn drop(&mut self) {
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropAcquired && !thread::panicking() {
            assert!(
                self.is_empty(),
                "dropped a pool of {} with acquired slots outstanding, under a policy that forbids it",
                type_name::<T>()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::arithmetic_side_effects,
        clippy::indexing_slicing,
        clippy::multiple_unsafe_ops_per_block,
        clippy::undocumented_unsafe_blocks,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use std::slice;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(FallbackPool<u64>: Send, std::fmt::Debug);
    assert_not_impl_any!(FallbackPool<u64>: Sync);
    assert_not_impl_any!(FallbackPool<std::rc::Rc<u64>>: Send);

    /// Views the pointee as raw bytes. Only meaningful for currently-acquired pointers.
    fn bytes_of<'a, T>(ptr: NonNull<T>) -> &'a [u8] {
        unsafe { slice::from_raw_parts(ptr.as_ptr().cast::<u8>(), size_of::<T>()) }
    }

    #[test]
    fn smoke_test() {
        let mut pool = FallbackPool::<u64>::with_capacity(3);

        assert_eq!(pool.capacity(), 3);
        assert!(pool.is_empty());
        assert!(!pool.is_full());

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        assert_eq!(pool.len(), 3);
        assert!(pool.is_full());

        assert!(pool.contains(a));
        assert!(pool.contains(b));
        assert!(pool.contains(c));

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }

        assert!(pool.is_empty());
        assert!(!pool.is_full());
    }

    #[test]
    fn never_used_slots_hand_out_in_ascending_address_order() {
        let mut pool = FallbackPool::<u64>::with_capacity(3);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        assert_eq!(b.addr().get() - a.addr().get(), size_of::<u64>());
        assert_eq!(c.addr().get() - b.addr().get(), size_of::<u64>());

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }
    }

    #[test]
    fn reuse_is_lifo() {
        let mut pool = FallbackPool::<u64>::with_capacity(3);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }

        // Most recently released comes back first.
        assert_eq!(pool.acquire(), c);
        assert_eq!(pool.acquire(), b);
        assert_eq!(pool.acquire(), a);

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }
    }

    #[test]
    fn acquired_memory_is_zero_filled_on_first_use() {
        let mut pool = FallbackPool::<[u8; 32]>::with_capacity(2);

        let ptr = pool.acquire();
        assert!(bytes_of(ptr).iter().all(|byte| *byte == 0));

        unsafe { pool.release(ptr) };
    }

    #[test]
    fn acquired_memory_is_zero_filled_on_reuse() {
        let mut pool = FallbackPool::<[u8; 32]>::with_capacity(2);

        let ptr = pool.acquire();

        // Scribble over the slot, then hand it back with the garbage still in place.
        unsafe { ptr.as_ptr().write_bytes(0xAB, 1) };
        unsafe { pool.release(ptr) };

        let reused = pool.acquire();
        assert_eq!(reused, ptr);
        assert!(bytes_of(reused).iter().all(|byte| *byte == 0));

        unsafe { pool.release(reused) };
    }

    #[test]
    fn acquired_memory_is_zero_filled_on_heap_fallback() {
        let mut pool = FallbackPool::<[u8; 32]>::with_capacity(1);

        let pooled = pool.acquire();
        let overflow = pool.acquire();

        assert!(!pool.contains(overflow));
        assert!(bytes_of(overflow).iter().all(|byte| *byte == 0));

        unsafe {
            pool.release(overflow);
            pool.release(pooled);
        }
    }

    #[test]
    fn exhaustion_routes_to_heap_without_failing() {
        let mut pool = FallbackPool::<u64>::with_capacity(2);

        let a = pool.acquire();
        let b = pool.acquire();
        assert!(pool.is_full());

        let c = pool.acquire();

        assert!(pool.contains(a));
        assert!(pool.contains(b));
        assert!(!pool.contains(c));

        // The heap-backed pointer is not tracked by the pool.
        assert_eq!(pool.len(), 2);

        unsafe {
            pool.release(c);
            pool.release(b);
            pool.release(a);
        }
    }

    #[test]
    fn releasing_heap_pointer_does_not_affect_slot_bookkeeping() {
        let mut pool = FallbackPool::<u64>::with_capacity(2);

        let a = pool.acquire();
        let b = pool.acquire();
        let overflow = pool.acquire();

        unsafe { pool.release(overflow) };

        // Releasing heap-backed memory must not create a free slot.
        assert_eq!(pool.len(), 2);
        assert!(pool.is_full());

        // With the pool still full, the next acquisition goes to the heap again
        // rather than reusing a slot address.
        let overflow_again = pool.acquire();
        assert!(!pool.contains(overflow_again));

        unsafe {
            pool.release(overflow_again);
            pool.release(a);
            pool.release(b);
        }
    }

    #[test]
    fn exhausted_pool_round_trip() {
        // Capacity 2, 8-byte items: fill the pool, overflow once, then cycle a slot.
        let mut pool = FallbackPool::<u64>::with_capacity(2);

        let ptr1 = pool.acquire();
        let ptr2 = pool.acquire();
        let ptr3 = pool.acquire();

        assert!(pool.contains(ptr1));
        assert!(pool.contains(ptr2));
        assert!(!pool.contains(ptr3));

        unsafe { pool.release(ptr2) };
        assert_eq!(pool.len(), 1);

        // The freed slot is reused in preference to everything else.
        let reacquired = pool.acquire();
        assert_eq!(reacquired, ptr2);
        assert_eq!(pool.len(), 2);

        unsafe { pool.release(ptr3) };
        assert_eq!(pool.len(), 2);

        unsafe {
            pool.release(reacquired);
            pool.release(ptr1);
        }
    }

    #[test]
    fn freed_slot_is_preferred_over_never_used_slot() {
        let mut pool = FallbackPool::<u64>::with_capacity(3);

        let a = pool.acquire();
        let b = pool.acquire();

        unsafe { pool.release(a) };

        // Slot 2 has never been used, but the freed slot wins.
        assert_eq!(pool.acquire(), a);

        unsafe {
            pool.release(a);
            pool.release(b);
        }
    }

    #[test]
    fn pools_do_not_share_storage() {
        let mut first = FallbackPool::<u64>::with_capacity(4);
        let mut second = FallbackPool::<u64>::with_capacity(4);

        let from_first = first.acquire();
        let from_second = second.acquire();

        assert!(first.contains(from_first));
        assert!(!first.contains(from_second));
        assert!(second.contains(from_second));
        assert!(!second.contains(from_first));

        unsafe {
            first.release(from_first);
            second.release(from_second);
        }

        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[test]
    fn capacity_one_pool_cycles_a_single_slot() {
        let mut pool = FallbackPool::<u64>::with_capacity(1);

        let first = pool.acquire();
        unsafe { pool.release(first) };

        let second = pool.acquire();
        assert_eq!(first, second);

        unsafe { pool.release(second) };
    }

    #[test]
    fn bounded_use_never_overflows() {
        // Capacity acquisitions, capacity releases, capacity acquisitions again:
        // every pointer must be pool-backed throughout.
        const CAPACITY: usize = 16;

        let mut pool = FallbackPool::<u64>::with_capacity(CAPACITY);
        let mut pointers = Vec::with_capacity(CAPACITY);

        for _ in 0..2 {
            for _ in 0..CAPACITY {
                let ptr = pool.acquire();
                assert!(pool.contains(ptr));
                pointers.push(ptr);
            }

            for ptr in pointers.drain(..) {
                unsafe { pool.release(ptr) };
            }
        }

        assert!(pool.is_empty());
    }

    #[test]
    fn large_items_route_correctly() {
        let mut pool = FallbackPool::<[u8; 4096]>::with_capacity(2);

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        assert!(pool.contains(a));
        assert!(pool.contains(b));
        assert!(!pool.contains(c));

        unsafe {
            pool.release(b);
            pool.release(c);
            pool.release(a);
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn double_release_is_caught_in_debug_builds() {
        let mut pool = FallbackPool::<u64>::with_capacity(2);

        let ptr = pool.acquire();

        unsafe {
            pool.release(ptr);
            pool.release(ptr);
        }
    }

    #[test]
    #[should_panic]
    fn drop_with_acquired_under_forbidding_policy_panics() {
        let mut pool = FallbackPool::<u64>::builder()
            .capacity(2)
            .drop_policy(DropPolicy::MustNotDropAcquired)
            .build();

        _ = pool.acquire();
    }

    #[test]
    fn drop_after_release_under_forbidding_policy_ok() {
        let mut pool = FallbackPool::<u64>::builder()
            .capacity(2)
            .drop_policy(DropPolicy::MustNotDropAcquired)
            .build();

        let ptr = pool.acquire();
        unsafe { pool.release(ptr) };
    }

    #[test]
    fn drop_with_acquired_under_default_policy_ok() {
        let mut pool = FallbackPool::<u64>::with_capacity(2);

        // The pointer is never released; the default policy tolerates that on drop.
        _ = pool.acquire();
    }

    #[test]
    #[should_panic]
    fn zero_capacity_is_panic() {
        drop(FallbackPool::<u64>::with_capacity(0));
    }

    #[test]
    #[should_panic]
    fn zst_is_panic() {
        drop(FallbackPool::<()>::with_capacity(3));
    }
}
