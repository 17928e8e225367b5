use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::ptr::NonNull;

use num_integer::Integer;

/// This is the backing storage of a `FallbackPool`: a contiguous, fixed-length, heap-allocated
/// array of `T` slots. It is allocated once at construction and never relocated or resized, so
/// slot addresses are stable for the lifetime of the array.
///
/// The array does not know which slots are in use - it only provides stable addresses, the
/// index-to-pointer mapping and the pointer membership test. Occupancy bookkeeping is the
/// pool's job.
///
/// The membership test is a single inclusive range comparison on the start addresses of the
/// first and last slots, computed once at construction. Addresses are compared as plain
/// integers (`NonNull::addr()`), so comparing against pointers from unrelated allocations
/// is well-defined.
#[derive(Debug)]
pub(crate) struct SlotArray<T> {
    first_slot_ptr: NonNull<T>,

    /// Start address of slot 0. Low bound of the membership test.
    first_slot_addr: usize,

    /// Start address of the last slot. High bound of the membership test, inclusive because
    /// the pool only ever hands out slot start addresses.
    last_slot_addr: usize,

    capacity: usize,
}

impl<T> SlotArray<T> {
    /// # Panics
    ///
    /// Panics if the array would be zero-sized either due to capacity or item size being zero.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SlotArray must have non-zero capacity");
        assert!(
            size_of::<T>() > 0,
            "SlotArray must have non-zero item size"
        );

        // SAFETY: The layout must be valid for the target type (sure, we calculate it correctly)
        // and not zero-sized (guarded by assertions above).
        let first_slot_ptr = NonNull::new(unsafe { alloc(Self::layout(capacity)).cast::<T>() })
            .expect(
            "we do not intend to handle allocation failure as a real possibility - OOM is panic",
        );

        let last_slot_index = capacity
            .checked_sub(1)
            .expect("guarded by capacity > 0 above");

        // SAFETY: The last slot is within the allocation we just made.
        let last_slot_ptr = unsafe { first_slot_ptr.add(last_slot_index) };

        Self {
            first_slot_ptr,
            first_slot_addr: first_slot_ptr.addr().get(),
            last_slot_addr: last_slot_ptr.addr().get(),
            capacity,
        }
    }

    #[must_use]
    fn layout(capacity: usize) -> Layout {
        Layout::array::<T>(capacity).expect("simple flat array layout must be calculable")
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        assert!(
            index < self.capacity,
            "slot {index} index out of bounds in slot array of {}",
            type_name::<T>()
        );

        // SAFETY: Guarded by bounds check above, so we are guaranteed that the pointer is valid.
        unsafe { self.first_slot_ptr.add(index) }
    }

    /// Whether the pointer addresses a slot of this array.
    ///
    /// This is the ownership routing test: O(1), no scanning, merely two integer comparisons
    /// against bounds computed at construction. It never dereferences the pointer, so it is
    /// valid to probe with any pointer, including one from an unrelated heap allocation.
    #[must_use]
    pub(crate) fn contains(&self, ptr: NonNull<T>) -> bool {
        let addr = ptr.addr().get();

        addr >= self.first_slot_addr && addr <= self.last_slot_addr
    }

    /// Recovers the slot index from a pointer previously produced by [`slot_ptr()`][1].
    ///
    /// [1]: Self::slot_ptr
    #[must_use]
    pub(crate) fn index_of(&self, ptr: NonNull<T>) -> usize {
        debug_assert!(
            self.contains(ptr),
            "index_of() called with a pointer outside the slot array of {}",
            type_name::<T>()
        );

        let offset = ptr
            .addr()
            .get()
            .checked_sub(self.first_slot_addr)
            .expect("caller guarantees the pointer is within the slot range");

        let (index, remainder) = offset.div_rem(&size_of::<T>());

        debug_assert!(
            remainder == 0,
            "pointer is not aligned to a slot boundary in slot array of {}",
            type_name::<T>()
        );

        index
    }
}

impl<T> Drop for SlotArray<T> {
    fn drop(&mut self) {
        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(
                self.first_slot_ptr.as_ptr().cast::<u8>(),
                Self::layout(self.capacity),
            );
        }
    }
}

// SAFETY: Yes, there are raw pointers involved here but nothing inherently non-thread-mobile
// about it, so as long as T itself can move between threads, the slot array can do so, too.
unsafe impl<T: Send> Send for SlotArray<T> {}
