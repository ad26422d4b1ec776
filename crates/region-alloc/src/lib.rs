//! Fixed-region dynamic memory allocation for `no_std` environments.
//!
//! This crate provides a general-purpose allocator that manages a single
//! caller-supplied byte buffer, for embedded, freestanding, or sandboxed
//! contexts where the process allocator is unavailable or insufficiently
//! deterministic.
//!
//! # Design
//!
//! The region is tiled by blocks on an address-ordered, doubly linked
//! intrusive list; free blocks form a second doubly linked sublist
//! threaded through their payload bytes:
//!
//! ```text
//!   Region:
//!   ┌────────────┬──────────────┬────────────┬─────────────────────┐
//!   │ hdr │ used │ hdr │  free  │ hdr │ used │ hdr │     free      │
//!   └────────────┴──────────────┴────────────┴─────────────────────┘
//!          │        ▲    │                      ▲
//!          └ block  └────┼──────────────────────┘ free sublist
//!            list        └ links stored in the free payload
//! ```
//!
//! Allocation is first-fit with split-on-leftover; deallocation reinserts
//! the block in address order and immediately coalesces with free
//! neighbors, so adjacent free blocks never exist between operations.
//!
//! # Components
//!
//! - [`RegionAllocator`] ([`region`]): the byte-level allocator.
//! - [`TypedAllocator`] ([`typed`]): a thin element-typed adapter.
//! - The `static-heap` companion crate stores allocator instances in
//!   static storage and hooks them up as a global allocator.
//!
//! # Usage Example
//!
//! ```rust
//! use region_alloc::RegionAllocator;
//!
//! let mut backing = vec![0u8; 4096];
//! let mut heap = unsafe { RegionAllocator::new(backing.as_mut_ptr(), backing.len()) };
//!
//! let ptr = heap.allocate(100).unwrap();
//! unsafe {
//!     heap.deallocate(ptr, 100);
//! }
//! assert_eq!(heap.allocated(), 0);
//! ```
//!
//! # Thread Safety
//!
//! Allocators are `Send` but not `Sync`; wrap them in a lock for shared
//! use.

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod block;
pub mod region;
pub mod typed;

pub use block::{BLOCK_ALIGN, HEADER_SIZE, MIN_BLOCK_SIZE};
pub use region::RegionAllocator;
pub use typed::TypedAllocator;
