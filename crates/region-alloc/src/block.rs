//! Block layout and intrusive list primitives.
//!
//! The managed region is tiled by blocks, each a fixed [`BlockHeader`]
//! followed by a payload. Every block is linked to its address-order
//! neighbors through the header; free blocks are additionally linked into
//! the free sublist through two pointers stored in the first payload bytes
//! (the [`FreeBlock`] view). Those bytes belong to the caller while the
//! block is allocated, which is fine: nothing reads the free links of an
//! allocated block.
//!
//! ```text
//! Allocated block:                      Free block:
//! ┌────────────────────┬────────────┐   ┌────────────────────┬───────────┬───────────┬─────┐
//! │ next │ prev │ size │  payload   │   │ next │ prev │ size │ next_free │ prev_free │ ... │
//! └────────────────────┴────────────┘   └────────────────────┴───────────┴───────────┴─────┘
//!                      ▲ low bit of size: 0 = free, 1 = allocated
//! ```
//!
//! Block sizes always include the header and are multiples of
//! [`BLOCK_ALIGN`], so the low bit of a true size is zero and can carry the
//! allocation state.

use core::ptr;

/// Alignment of every block and of every pointer handed out by the
/// allocator.
pub const BLOCK_ALIGN: usize = align_of::<FreeBlock>();

/// Metadata bytes at the start of every block.
pub const HEADER_SIZE: usize = size_of::<BlockHeader>();

/// Smallest block the allocator will create.
///
/// Every block, allocated or not, must be able to hold the free-sublist
/// links once it returns to the free state.
pub const MIN_BLOCK_SIZE: usize = size_of::<FreeBlock>();

const ALLOCATED_BIT: usize = 0b1;

const _: () = assert!(BLOCK_ALIGN >= 2, "state bit needs an even alignment");
const _: () = assert!(HEADER_SIZE % BLOCK_ALIGN == 0);
const _: () = assert!(MIN_BLOCK_SIZE % BLOCK_ALIGN == 0);
const _: () = assert!(MIN_BLOCK_SIZE >= HEADER_SIZE + 2 * size_of::<*mut FreeBlock>());

/// Metadata at the start of every block, free or allocated.
#[repr(C)]
pub(crate) struct BlockHeader {
    /// Address-order successor, or null for the last block.
    pub(crate) next: *mut BlockHeader,
    /// Address-order predecessor, or null for the first block.
    pub(crate) prev: *mut BlockHeader,
    /// Block size in bytes, header included; low bit set while allocated.
    size: usize,
}

/// View of a free block: the header plus the free-sublist links occupying
/// the first payload bytes.
#[repr(C)]
pub(crate) struct FreeBlock {
    pub(crate) header: BlockHeader,
    /// Next free block in address order, or null.
    pub(crate) next_free: *mut FreeBlock,
    /// Previous free block in address order, or null.
    pub(crate) prev_free: *mut FreeBlock,
}

impl BlockHeader {
    /// Block size with the state bit masked off.
    pub(crate) fn true_size(&self) -> usize {
        self.size & !ALLOCATED_BIT
    }

    pub(crate) fn is_free(&self) -> bool {
        self.size & ALLOCATED_BIT == 0
    }

    pub(crate) fn set_free(&mut self) {
        self.size &= !ALLOCATED_BIT;
    }

    pub(crate) fn set_allocated(&mut self) {
        self.size |= ALLOCATED_BIT;
    }

    /// Replaces the size of a free block.
    pub(crate) fn set_size(&mut self, size: usize) {
        debug_assert!(self.is_free());
        debug_assert!(size.is_multiple_of(BLOCK_ALIGN));
        self.size = size;
    }

    /// Writes a fresh, unlinked free block over `ptr` and returns it.
    ///
    /// # Safety
    ///
    /// `ptr..ptr + size` must be valid, unused memory aligned to
    /// [`BLOCK_ALIGN`].
    pub(crate) unsafe fn init(ptr: *mut u8, size: usize) -> *mut FreeBlock {
        let block = ptr.cast::<FreeBlock>();
        assert!(!block.is_null(), "block pointer must not be null");
        assert!(block.is_aligned(), "block pointer must be aligned");
        assert!(size >= MIN_BLOCK_SIZE, "block too small for free links");
        assert!(size.is_multiple_of(BLOCK_ALIGN), "block size must be aligned");

        unsafe {
            (*block).header = Self {
                next: ptr::null_mut(),
                prev: ptr::null_mut(),
                size,
            };
            (*block).next_free = ptr::null_mut();
            (*block).prev_free = ptr::null_mut();
        }

        block
    }

    /// Payload address of `block`, the pointer handed to callers.
    ///
    /// # Safety
    ///
    /// `block` must point to a live block header.
    pub(crate) unsafe fn payload(block: *mut Self) -> *mut u8 {
        block.cast::<u8>().map_addr(|addr| addr + HEADER_SIZE)
    }

    /// Recovers the header from a payload pointer handed out by the
    /// allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be a payload address previously produced by
    /// [`BlockHeader::payload`].
    pub(crate) unsafe fn from_payload(ptr: *mut u8) -> *mut Self {
        ptr.map_addr(|addr| addr - HEADER_SIZE).cast()
    }

    /// One past the last byte of `block`.
    ///
    /// # Safety
    ///
    /// `block` must point to a live block header.
    pub(crate) unsafe fn end(block: *mut Self) -> *mut u8 {
        unsafe { block.cast::<u8>().map_addr(|addr| addr + (*block).true_size()) }
    }

    /// Links `new` into the block list immediately after `block`.
    ///
    /// # Safety
    ///
    /// Both must point to live block headers; `new` must not be linked.
    pub(crate) unsafe fn insert_after(block: *mut Self, new: *mut Self) {
        unsafe {
            let next = (*block).next;
            if !next.is_null() {
                (*next).prev = new;
            }
            (*new).next = next;
            (*new).prev = block;
            (*block).next = new;
        }
    }

    /// Unlinks `block` from the block list. The block's own links are left
    /// untouched so the caller may still read its old neighbors.
    ///
    /// # Safety
    ///
    /// `block` must point to a live, linked block header.
    pub(crate) unsafe fn unlink(block: *mut Self) {
        unsafe {
            if !(*block).prev.is_null() {
                (*(*block).prev).next = (*block).next;
            }
            if !(*block).next.is_null() {
                (*(*block).next).prev = (*block).prev;
            }
        }
    }
}

impl FreeBlock {
    /// Reinterprets a header known to be in the free state.
    ///
    /// # Safety
    ///
    /// `header` must point to a live block header whose state bit is clear.
    pub(crate) unsafe fn assume_free(header: *mut BlockHeader) -> *mut Self {
        debug_assert!(unsafe { (*header).is_free() });
        header.cast()
    }

    /// Links `block` into the free sublist immediately after `prev`.
    ///
    /// # Safety
    ///
    /// Both must point to live free blocks; `block` must not be linked and
    /// must sit at a higher address than `prev`.
    pub(crate) unsafe fn link_after(prev: *mut Self, block: *mut Self) {
        debug_assert!(prev < block);
        unsafe {
            let next = (*prev).next_free;
            if !next.is_null() {
                (*next).prev_free = block;
            }
            (*block).next_free = next;
            (*block).prev_free = prev;
            (*prev).next_free = block;
        }
    }

    /// Links `block` into the free sublist immediately before `next`.
    ///
    /// # Safety
    ///
    /// Both must point to live free blocks; `block` must not be linked and
    /// must sit at a lower address than `next`.
    pub(crate) unsafe fn link_before(next: *mut Self, block: *mut Self) {
        debug_assert!(block < next);
        unsafe {
            let prev = (*next).prev_free;
            if !prev.is_null() {
                (*prev).next_free = block;
            }
            (*block).prev_free = prev;
            (*block).next_free = next;
            (*next).prev_free = block;
        }
    }

    /// Unlinks `block` from the free sublist. The block's own links are
    /// left untouched so the caller may still read its old neighbors.
    ///
    /// # Safety
    ///
    /// `block` must point to a live free block currently on the sublist.
    pub(crate) unsafe fn unlink_free(block: *mut Self) {
        unsafe {
            if !(*block).prev_free.is_null() {
                (*(*block).prev_free).next_free = (*block).next_free;
            }
            if !(*block).next_free.is_null() {
                (*(*block).next_free).prev_free = (*block).prev_free;
            }
        }
    }

    /// Splits `block` in two: the head keeps `size` bytes, the tail becomes
    /// a new free block linked into both lists right after the head.
    ///
    /// # Safety
    ///
    /// `block` must point to a live free block of at least
    /// `size + MIN_BLOCK_SIZE` bytes; `size` must be a multiple of
    /// [`BLOCK_ALIGN`].
    pub(crate) unsafe fn split(block: *mut Self, size: usize) -> *mut Self {
        unsafe {
            let header = block.cast::<BlockHeader>();
            assert!((*header).is_free(), "only free blocks can be split");
            assert!(
                (*header).true_size() >= size + MIN_BLOCK_SIZE,
                "split tail would be smaller than a block"
            );

            let tail_addr = block.cast::<u8>().map_addr(|addr| addr + size);
            let tail = BlockHeader::init(tail_addr, (*header).true_size() - size);
            (*header).set_size(size);
            BlockHeader::insert_after(header, tail.cast());
            Self::link_after(block, tail);
            tail
        }
    }

    /// Merges `block`'s free-sublist successor into `block`, removing the
    /// successor from both lists.
    ///
    /// # Safety
    ///
    /// `block` must point to a live free block whose free-sublist successor
    /// exists and is address-adjacent to it.
    pub(crate) unsafe fn merge_next(block: *mut Self) {
        unsafe {
            let header = block.cast::<BlockHeader>();
            let next = (*block).next_free;
            debug_assert!(ptr::eq(BlockHeader::end(header), next.cast::<u8>()));

            (*header).set_size((*header).true_size() + (*next).header.true_size());
            Self::unlink_free(next);
            BlockHeader::unlink(next.cast());
        }
    }
}

/// Total block size needed to serve a payload of `size` bytes: header plus
/// payload, rounded up to the block alignment and clamped to the minimum
/// block size. `None` if the request overflows `usize`.
pub(crate) fn block_size_for(size: usize) -> Option<usize> {
    let total = size.checked_add(HEADER_SIZE)?;
    let total = total.checked_next_multiple_of(BLOCK_ALIGN)?;
    Some(total.max(MIN_BLOCK_SIZE))
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_rounding() {
        assert_eq!(block_size_for(0), Some(MIN_BLOCK_SIZE));
        assert_eq!(block_size_for(1), Some(MIN_BLOCK_SIZE));
        // One full alignment step past the minimum block.
        let payload = MIN_BLOCK_SIZE - HEADER_SIZE + 1;
        assert_eq!(
            block_size_for(payload),
            Some(MIN_BLOCK_SIZE + BLOCK_ALIGN)
        );
        for size in 1..256 {
            let block = block_size_for(size).unwrap();
            assert!(block >= size + HEADER_SIZE);
            assert!(block >= MIN_BLOCK_SIZE);
            assert!(block.is_multiple_of(BLOCK_ALIGN));
            assert!(block < size + HEADER_SIZE + BLOCK_ALIGN + MIN_BLOCK_SIZE);
        }
    }

    #[test]
    fn test_block_size_overflow() {
        assert_eq!(block_size_for(usize::MAX), None);
        assert_eq!(block_size_for(usize::MAX - HEADER_SIZE), None);
    }

    #[test]
    fn test_state_bit() {
        let mut header = BlockHeader {
            next: core::ptr::null_mut(),
            prev: core::ptr::null_mut(),
            size: 2 * MIN_BLOCK_SIZE,
        };
        assert!(header.is_free());
        assert_eq!(header.true_size(), 2 * MIN_BLOCK_SIZE);

        header.set_allocated();
        assert!(!header.is_free());
        assert_eq!(header.true_size(), 2 * MIN_BLOCK_SIZE);

        header.set_free();
        assert!(header.is_free());
        assert_eq!(header.true_size(), 2 * MIN_BLOCK_SIZE);
    }

    #[test]
    fn test_layout_constants() {
        assert!(BLOCK_ALIGN >= align_of::<usize>());
        assert!(BLOCK_ALIGN >= align_of::<*mut u8>());
        assert_eq!(MIN_BLOCK_SIZE, HEADER_SIZE + 2 * size_of::<*mut FreeBlock>());
    }
}
