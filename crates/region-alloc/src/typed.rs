//! Typed adapter over the byte-level region allocator.
//!
//! [`TypedAllocator`] owns a [`RegionAllocator`] and converts element
//! counts to byte counts, so callers can work with `*mut T` instead of
//! raw bytes. The element type must fit the allocator's natural block
//! alignment; larger alignment requirements are not supported.

use core::{fmt, marker::PhantomData};

use crate::{block::BLOCK_ALIGN, region::RegionAllocator};

/// A typed view of a fixed-region allocator.
///
/// Forwards every operation to the underlying byte allocator after
/// multiplying counts by `size_of::<T>()`.
pub struct TypedAllocator<T> {
    inner: RegionAllocator,
    _element: PhantomData<T>,
}

impl<T> TypedAllocator<T> {
    /// Creates a typed allocator over `base..base + len`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or needs more alignment than
    /// [`BLOCK_ALIGN`](crate::BLOCK_ALIGN).
    ///
    /// # Safety
    ///
    /// Same contract as [`RegionAllocator::init`].
    #[must_use]
    pub unsafe fn new(base: *mut u8, len: usize) -> Self {
        assert!(
            align_of::<T>() <= BLOCK_ALIGN,
            "element alignment exceeds the block alignment"
        );
        assert!(size_of::<T>() > 0, "zero-sized element type");
        Self {
            inner: unsafe { RegionAllocator::new(base, len) },
            _element: PhantomData,
        }
    }

    /// Returns a pointer to uninitialized storage for `count` elements, or
    /// `None` if no free block is large enough (or the byte count
    /// overflows).
    pub fn allocate(&mut self, count: usize) -> Option<*mut T> {
        let bytes = count.checked_mul(size_of::<T>())?;
        self.inner.allocate(bytes).map(<*mut u8>::cast)
    }

    /// Returns the storage at `ptr` to the free state. `count` is ignored;
    /// the block size is recovered from its header.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer returned by
    /// [`allocate`](Self::allocate) on this allocator that has not been
    /// deallocated since.
    pub unsafe fn deallocate(&mut self, ptr: *mut T, count: usize) {
        unsafe {
            self.inner
                .deallocate(ptr.cast(), count.saturating_mul(size_of::<T>()));
        }
    }

    /// Payload capacity currently associated with `ptr`, in **bytes**, not
    /// elements.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live pointer returned by
    /// [`allocate`](Self::allocate) on this allocator.
    #[must_use]
    pub unsafe fn allocation_size(&self, ptr: *const T) -> usize {
        unsafe { self.inner.allocation_size(ptr.cast()) }
    }

    /// Whether `addr` lies inside the managed region.
    #[must_use]
    pub fn contains(&self, addr: *const T) -> bool {
        self.inner.contains(addr.cast())
    }

    /// Live bytes of the underlying byte allocator.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.inner.allocated()
    }

    /// Adjusted region size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.size()
    }
}

impl<T> fmt::Debug for TypedAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAllocator")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    extern crate alloc;

    use core::alloc::Layout;

    use super::*;

    fn with_typed_allocator<T, F>(heap_size: usize, test_fn: F)
    where
        F: FnOnce(&mut TypedAllocator<T>),
    {
        unsafe {
            let layout = Layout::from_size_align(heap_size, BLOCK_ALIGN).unwrap();
            let heap_start = alloc::alloc::alloc(layout);
            let mut allocator = TypedAllocator::<T>::new(heap_start, heap_size);
            test_fn(&mut allocator);
            alloc::alloc::dealloc(heap_start, layout);
        }
    }

    #[test]
    fn test_element_allocation() {
        with_typed_allocator::<u64, _>(4096, |allocator| unsafe {
            let ptr = allocator.allocate(4).unwrap();
            assert!(ptr.addr().is_multiple_of(align_of::<u64>()));
            assert!(allocator.contains(ptr));
            assert!(allocator.allocation_size(ptr) >= 4 * size_of::<u64>());

            for i in 0..4 {
                ptr.add(i).write(u64::try_from(i).unwrap() * 7);
            }
            for i in 0..4 {
                assert_eq!(ptr.add(i).read(), u64::try_from(i).unwrap() * 7);
            }

            allocator.deallocate(ptr, 4);
            assert_eq!(allocator.allocated(), 0);
        });
    }

    #[test]
    fn test_count_overflow() {
        with_typed_allocator::<u64, _>(4096, |allocator| {
            assert!(allocator.allocate(usize::MAX).is_none());
            assert!(allocator.allocate(usize::MAX / 2).is_none());
            assert_eq!(allocator.allocated(), 0);
        });
    }

    #[test]
    fn test_allocation_size_in_bytes() {
        with_typed_allocator::<u32, _>(4096, |allocator| unsafe {
            let ptr = allocator.allocate(3).unwrap();
            // Reported in bytes, never in elements.
            assert!(allocator.allocation_size(ptr) >= 3 * size_of::<u32>());
            allocator.deallocate(ptr, 3);
        });
    }

    #[test]
    fn test_distinct_allocations() {
        with_typed_allocator::<u32, _>(4096, |allocator| unsafe {
            let a = allocator.allocate(8).unwrap();
            let b = allocator.allocate(8).unwrap();
            assert_ne!(a, b);
            allocator.deallocate(a, 8);
            allocator.deallocate(b, 8);
            assert_eq!(allocator.allocated(), 0);
        });
    }
}
