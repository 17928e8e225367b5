//! Basic usage of the `fallback_pool` crate:
//!
//! * Creating a pool.
//! * Acquiring zero-filled memory.
//! * Releasing it for LIFO reuse.
//! * Overflowing past capacity into the heap.

use fallback_pool::FallbackPool;

fn main() {
    let mut pool = FallbackPool::<[u8; 256]>::with_capacity(4);

    println!(
        "Pool created: capacity {}, {} slots acquired",
        pool.capacity(),
        pool.len()
    );

    // Acquire a few message buffers. Each is zero-filled.
    let first = pool.acquire();
    let second = pool.acquire();

    println!("Acquired two buffers, {} slots in use", pool.len());

    // SAFETY: The pointers are valid for writes of one buffer each.
    unsafe {
        (*first.as_ptr())[0] = 0x01;
        (*second.as_ptr())[0] = 0x02;
    }

    // Release and re-acquire: the most recently released buffer comes back first,
    // zero-filled again.
    // SAFETY: The pointer came from this pool's acquire() and is released exactly once.
    unsafe { pool.release(second) };

    let reused = pool.acquire();
    assert_eq!(reused, second);

    // SAFETY: Acquired memory is zero-filled, so reading the buffer is valid.
    let lead_byte = unsafe { (*reused.as_ptr())[0] };
    println!("Reused buffer is zero-filled again (lead byte: {lead_byte})");

    // Push past capacity: the pool routes the excess to the heap, transparently.
    let third = pool.acquire();
    let fourth = pool.acquire();
    let overflow = pool.acquire();

    println!(
        "Pool full: {}; overflow buffer is pool-backed: {}",
        pool.is_full(),
        pool.contains(overflow)
    );

    // Release routes every pointer back to where it came from.
    // SAFETY: All pointers came from this pool's acquire() and are released exactly once.
    unsafe {
        pool.release(overflow);
        pool.release(fourth);
        pool.release(third);
        pool.release(reused);
        pool.release(first);
    }

    println!("All released, {} slots in use", pool.len());
}
