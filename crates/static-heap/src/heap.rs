//! Static heap slots with a one-shot `create`/`get` lifecycle.

use region_alloc::RegionAllocator;
use snafu::{OptionExt as _, Snafu};
use spin::{Mutex, Once};

/// Number of independent heap slots.
pub const MAX_HEAPS: usize = 8;

static SLOTS: [Once<Mutex<RegionAllocator>>; MAX_HEAPS] = [const { Once::new() }; MAX_HEAPS];

/// Lifecycle errors of a heap slot.
#[derive(Debug, Snafu)]
pub enum HeapError {
    /// `create` was called on a slot that already holds an allocator.
    #[snafu(display("heap {index} has already been created"))]
    AlreadyCreated {
        index: usize,
        #[snafu(implicit)]
        location: snafu::Location,
    },
    /// `get` was called before `create`.
    #[snafu(display("heap {index} has not been created"))]
    NotCreated {
        index: usize,
        #[snafu(implicit)]
        location: snafu::Location,
    },
}

/// A process-wide heap slot.
///
/// Distinct `INDEX` values name fully independent heaps. The slot must be
/// created exactly once before it can be obtained; both misuses are
/// reported as [`HeapError`] values.
#[derive(Debug, Clone, Copy)]
pub struct Heap<const INDEX: usize = 0>;

impl<const INDEX: usize> Heap<INDEX> {
    fn slot() -> &'static Once<Mutex<RegionAllocator>> {
        const { assert!(INDEX < MAX_HEAPS, "heap index out of range") };
        &SLOTS[INDEX]
    }

    /// Constructs the slot's allocator over `base..base + len`.
    ///
    /// # Errors
    ///
    /// [`HeapError::AlreadyCreated`] if the slot was created before.
    ///
    /// # Safety
    ///
    /// Same contract as [`RegionAllocator::init`]; additionally the buffer
    /// must stay valid for the rest of the process, since the slot is
    /// never destroyed.
    pub unsafe fn create(base: *mut u8, len: usize) -> Result<(), HeapError> {
        let mut created = false;
        Self::slot().call_once(|| {
            created = true;
            Mutex::new(unsafe { RegionAllocator::new(base, len) })
        });
        if created {
            Ok(())
        } else {
            AlreadyCreatedSnafu { index: INDEX }.fail()
        }
    }

    /// Obtains the slot's allocator.
    ///
    /// # Errors
    ///
    /// [`HeapError::NotCreated`] before [`create`](Self::create).
    pub fn get() -> Result<&'static Mutex<RegionAllocator>, HeapError> {
        Self::slot().get().context(NotCreatedSnafu { index: INDEX })
    }
}
