//! Heap traffic tests for the `fallback_pool` package.
//!
//! These install an allocation-tracking global allocator and verify that the pool's
//! bounded-use paths perform no heap traffic at all, while the overflow path does.

#![allow(
    clippy::undocumented_unsafe_blocks,
    reason = "test code exercises the unsafe API heavily; the safety argument is the test itself"
)]

use std::ptr::NonNull;

use alloc_tracker::{Allocator, Session};
use fallback_pool::FallbackPool;

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

const CAPACITY: usize = 64;

#[test]
fn bounded_use_performs_no_heap_traffic() {
    let session = Session::new();

    // All allocations happen up front: the slot storage and the free stack backing.
    let mut pool = FallbackPool::<u64>::with_capacity(CAPACITY);
    let mut pointers: Vec<NonNull<u64>> = Vec::with_capacity(CAPACITY);

    let operation = session.operation("acquire_release_within_capacity");

    {
        let _span = operation.measure_thread();

        // Fill, drain, fill again, drain again - the classic bounded churn.
        for _ in 0..2 {
            for _ in 0..CAPACITY {
                pointers.push(pool.acquire());
            }

            for ptr in pointers.drain(..) {
                unsafe { pool.release(ptr) };
            }
        }
    }

    assert_eq!(
        operation.total_bytes_allocated(),
        0,
        "bounded acquire/release cycles must never touch the heap"
    );
}

#[test]
fn overflow_is_served_from_the_heap() {
    let session = Session::new();

    let mut pool = FallbackPool::<u64>::with_capacity(2);

    let a = pool.acquire();
    let b = pool.acquire();

    let operation = session.operation("acquire_beyond_capacity");

    let overflow = {
        let _span = operation.measure_thread();
        pool.acquire()
    };

    assert!(!pool.contains(overflow));
    assert!(
        operation.total_bytes_allocated() >= u64::try_from(size_of::<u64>()).unwrap(),
        "the overflow acquisition must have come from the heap"
    );

    unsafe {
        pool.release(overflow);
        pool.release(b);
        pool.release(a);
    }
}

#[test]
fn releasing_heap_pointer_frees_rather_than_pools() {
    let session = Session::new();

    let mut pool = FallbackPool::<u64>::with_capacity(1);

    let pooled = pool.acquire();
    let overflow = pool.acquire();

    unsafe { pool.release(overflow) };

    // The slot freed by a later release is pool-backed; acquiring it again is heap-silent.
    unsafe { pool.release(pooled) };

    let operation = session.operation("reacquire_released_slot");

    let reacquired = {
        let _span = operation.measure_thread();
        pool.acquire()
    };

    assert_eq!(reacquired, pooled);
    assert_eq!(operation.total_bytes_allocated(), 0);

    unsafe { pool.release(reacquired) };
}
