//! Example usage of `fallback_pool` matching the package description: a request-object pool
//! that serves the common case without heap traffic and degrades gracefully under load.

use fallback_pool::FallbackPool;

/// A plain-old-data request record; the all-zero bit pattern is a valid instance.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
struct Request {
    id: u64,
    flags: u32,
    payload_len: u32,
}

fn main() {
    // Size the pool for the expected steady-state concurrency.
    let mut pool = FallbackPool::<Request>::with_capacity(128);

    let mut in_flight = Vec::new();

    // A burst of requests arrives. Within capacity, no heap allocation happens here.
    for id in 0..100_u64 {
        let request = pool.acquire();

        // SAFETY: The pointer is valid for writes of one Request.
        unsafe {
            (*request.as_ptr()).id = id;
            (*request.as_ptr()).flags = 0x1;
        }

        in_flight.push(request);
    }

    println!(
        "{} requests in flight, pool capacity {}, pool full: {}",
        pool.len(),
        pool.capacity(),
        pool.is_full()
    );

    // Requests complete and their records are recycled.
    for request in in_flight.drain(..) {
        // SAFETY: Each pointer came from this pool's acquire() and is released exactly once.
        unsafe { pool.release(request) };
    }

    println!("All requests completed, {} slots in use", pool.len());
}
