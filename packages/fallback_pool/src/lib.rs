//! A fixed-capacity typed object pool that hands out zero-filled memory and gracefully falls
//! back to the heap when exhausted.
//!
//! This crate provides [`FallbackPool`], a pool of `capacity` pre-allocated slots for one value
//! type `T`, exposing a calloc/free-like pair of operations. It targets bounded, short-lived
//! allocations - request objects, protocol messages, per-connection state - where the common
//! case fits the pool and should never touch the general heap allocator.
//!
//! # Key Features
//!
//! - **O(1) acquire and release**: a LIFO free stack and a high watermark track slot reuse
//!   without scanning
//! - **Zero-filled memory**: every acquisition returns all-zero bytes, on every path
//! - **Graceful overflow**: once all slots are in use, acquisitions are served from the heap -
//!   exhaustion is defined fallback behavior, never an error
//! - **Branch-minimal ownership routing**: release decides pool-vs-heap with a single address
//!   range comparison computed once at construction
//! - **Stable addresses**: slot storage is allocated once and never relocated or resized
//! - **Thread mobility**: the pool can move between threads (when `T: Send`) but is never
//!   [`Sync`] - access from multiple threads must be serialized externally
//!
//! # Caller contract
//!
//! The pool trades safety checks for minimal overhead, exactly like a raw allocator: every
//! pointer returned by [`acquire()`](FallbackPool::acquire) must be passed to
//! [`release()`](FallbackPool::release) on the same pool exactly once and never used again.
//! Double release and release of foreign pointers are undefined behavior; debug builds carry
//! assertions that catch the common mistakes, release builds check nothing beyond the range
//! test. The pool never runs destructors for `T`.
//!
//! # Examples
//!
//! ```rust
//! use fallback_pool::FallbackPool;
//!
//! // One pool per pooled type, capacity fixed up front.
//! let mut pool = FallbackPool::<[u8; 512]>::with_capacity(64);
//!
//! // The common case: bounded churn that stays within capacity and off the heap.
//! let message = pool.acquire();
//!
//! // SAFETY: The pointer is valid for writes of one [u8; 512].
//! unsafe { (*message.as_ptr())[0] = 0x2A };
//!
//! // SAFETY: The pointer came from this pool's acquire() and is released exactly once.
//! unsafe { pool.release(message) };
//! ```
//!
//! Overflow beyond capacity is transparent:
//!
//! ```rust
//! use fallback_pool::FallbackPool;
//!
//! let mut pool = FallbackPool::<u64>::with_capacity(2);
//!
//! let a = pool.acquire();
//! let b = pool.acquire();
//! let c = pool.acquire(); // All slots in use - this one comes from the heap.
//!
//! assert!(pool.contains(a));
//! assert!(pool.contains(b));
//! assert!(!pool.contains(c));
//!
//! // Release routes each pointer back to where it came from.
//! // SAFETY: All three pointers came from this pool's acquire() and are released exactly once.
//! unsafe {
//!     pool.release(c);
//!     pool.release(b);
//!     pool.release(a);
//! }
//! ```

mod builder;
mod drop_policy;
mod pool;
mod slots;

pub use builder::*;
pub use drop_policy::*;
pub use pool::FallbackPool;
pub(crate) use slots::*;
