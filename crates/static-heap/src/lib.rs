//! Process-wide static heaps backed by fixed memory regions.
//!
//! This crate stores [`region_alloc::RegionAllocator`] instances in
//! static storage so they can serve as default heaps. Each heap lives in
//! one of [`MAX_HEAPS`] independent slots selected by a const-generic
//! index, with a `create`-then-`get` lifecycle:
//!
//! ```rust
//! use static_heap::Heap;
//!
//! let backing = Box::leak(vec![0u8; 4096].into_boxed_slice());
//! unsafe {
//!     Heap::<7>::create(backing.as_mut_ptr(), backing.len()).unwrap();
//! }
//!
//! let heap = Heap::<7>::get().unwrap();
//! let mut guard = heap.lock();
//! if let Some(ptr) = guard.allocate(128) {
//!     drop(guard);
//!     unsafe {
//!         heap.lock().deallocate(ptr, 128);
//!     }
//! }
//! ```
//!
//! [`GlobalHeap`] forwards Rust's global allocation interface to a slot,
//! so a created heap can back `alloc::boxed::Box` and friends in
//! freestanding binaries:
//!
//! ```rust,ignore
//! use static_heap::GlobalHeap;
//!
//! #[global_allocator]
//! static GLOBAL: GlobalHeap = GlobalHeap;
//!
//! fn main() {
//!     // Heap::<0>::create(...) must run before the first allocation.
//! }
//! ```

#![no_std]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod global;
mod heap;

pub use global::GlobalHeap;
pub use heap::{Heap, HeapError, MAX_HEAPS};
