//! Block-partitioned ring buffer shared by the producer and consumer
//!
//! The ring is a fixed array of equally sized blocks, each with its own
//! mutex, plus two counting semaphores tracking global occupancy:
//!
//! - `empty_slots` starts at the full capacity and gates the producer
//! - `full_slots` starts at zero and gates the consumer
//!
//! A single global lock would serialize the two sides even when they work
//! on disjoint regions; per-block locks let them proceed concurrently
//! whenever their cursors sit in different blocks, while the semaphores
//! alone provide flow control, so neither side ever needs to see the
//! other's cursor.
//!
//! The ring knows nothing about producer or consumer logic. It hands out
//! permits and block guards; the byte-pump loops in [`crate::producer`]
//! and [`crate::consumer`] implement the crossing protocol on top.

mod cursor;
mod semaphore;

pub(crate) use cursor::Cursor;

use crate::error::CopyError;
use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};
use semaphore::Semaphore;

/// Reserved byte value marking end-of-stream inside the ring.
///
/// The producer pushes exactly one sentinel after the last source byte;
/// the consumer stops at the first sentinel it pops. This is in-band
/// signalling inherited from the legacy wire format: a source stream that
/// legitimately contains a 0x00 byte is truncated at that byte. Callers
/// copying arbitrary binary data should be aware of this limitation.
pub const SENTINEL: u8 = 0x00;

/// Guard over one block's bytes; holding it is holding the block's lock.
pub(crate) type BlockGuard<'a> = MutexGuard<'a, Box<[u8]>>;

/// One lockable region of the ring
struct Block {
    /// Block bytes, only mutated while the mutex is held
    data: Mutex<Box<[u8]>>,
}

impl Block {
    fn new(block_size: usize) -> Self {
        Self {
            data: Mutex::new(vec![0u8; block_size].into_boxed_slice()),
        }
    }
}

/// Fixed-capacity circular buffer partitioned into independently
/// lockable blocks, with semaphore-based flow control.
///
/// Created once by the orchestrator, shared behind an `Arc` by the two
/// worker threads, and dropped only after both have been joined.
pub struct BlockRing {
    /// The blocks, fixed at construction, never resized
    blocks: Box<[Block]>,
    /// Slots available for writing; producer-hot
    empty_slots: CachePadded<Semaphore>,
    /// Slots available for reading; consumer-hot
    full_slots: CachePadded<Semaphore>,
    /// Total capacity in bytes
    capacity: usize,
    /// Bytes per block
    block_size: usize,
}

impl BlockRing {
    /// Create a ring of `capacity` bytes partitioned into blocks of
    /// `block_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::Geometry`] unless `capacity` is a positive
    /// multiple of a positive `block_size`.
    pub fn new(capacity: usize, block_size: usize) -> Result<Self, CopyError> {
        if capacity == 0 || block_size == 0 || capacity % block_size != 0 {
            return Err(CopyError::Geometry {
                buffer_size: capacity,
                block_size,
            });
        }

        let num_blocks = capacity / block_size;
        let blocks: Vec<Block> = (0..num_blocks).map(|_| Block::new(block_size)).collect();

        Ok(Self {
            blocks: blocks.into_boxed_slice(),
            empty_slots: CachePadded::new(Semaphore::new(capacity)),
            full_slots: CachePadded::new(Semaphore::new(0)),
            capacity,
            block_size,
        })
    }

    /// Total ring capacity in bytes
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of each block in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks in the ring
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Lock block `idx` and return its guard
    pub(crate) fn lock_block(&self, idx: usize) -> BlockGuard<'_> {
        self.blocks[idx].data.lock()
    }

    /// Block until a slot is free for writing, then claim it
    pub(crate) fn acquire_write_slot(&self) {
        self.empty_slots.acquire();
    }

    /// Claim a write slot only if one is immediately free
    pub(crate) fn try_acquire_write_slot(&self) -> bool {
        self.empty_slots.try_acquire()
    }

    /// Block until a byte is available for reading, then claim it
    pub(crate) fn acquire_read_slot(&self) {
        self.full_slots.acquire();
    }

    /// Claim a readable byte only if one is immediately available
    pub(crate) fn try_acquire_read_slot(&self) -> bool {
        self.full_slots.try_acquire()
    }

    /// Publish a written byte to the consumer, waking it if blocked
    pub(crate) fn release_read_slot(&self) {
        self.full_slots.release();
    }

    /// Return a drained slot to the producer, waking it if blocked
    pub(crate) fn release_write_slot(&self) {
        self.empty_slots.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_validation() {
        assert!(BlockRing::new(2048, 32).is_ok());
        assert!(BlockRing::new(4, 4).is_ok());

        // Not a multiple
        assert!(matches!(
            BlockRing::new(10, 3),
            Err(CopyError::Geometry { .. })
        ));
        // Zero sizes
        assert!(matches!(
            BlockRing::new(0, 4),
            Err(CopyError::Geometry { .. })
        ));
        assert!(matches!(
            BlockRing::new(8, 0),
            Err(CopyError::Geometry { .. })
        ));
        // Block larger than buffer
        assert!(matches!(
            BlockRing::new(4, 8),
            Err(CopyError::Geometry { .. })
        ));
    }

    #[test]
    fn test_derived_geometry() {
        let ring = BlockRing::new(2048, 32).unwrap();
        assert_eq!(ring.capacity(), 2048);
        assert_eq!(ring.block_size(), 32);
        assert_eq!(ring.num_blocks(), 64);
    }

    #[test]
    fn test_slot_accounting() {
        let ring = BlockRing::new(4, 2).unwrap();

        // Fresh ring: all slots writable, none readable
        assert!(!ring.try_acquire_read_slot());
        for _ in 0..4 {
            assert!(ring.try_acquire_write_slot());
        }
        assert!(!ring.try_acquire_write_slot());

        // Publishing makes bytes readable
        ring.release_read_slot();
        ring.release_read_slot();
        assert!(ring.try_acquire_read_slot());
        assert!(ring.try_acquire_read_slot());
        assert!(!ring.try_acquire_read_slot());

        // Draining frees write slots again
        ring.release_write_slot();
        assert!(ring.try_acquire_write_slot());
    }

    #[test]
    fn test_block_guard_access() {
        let ring = BlockRing::new(8, 4).unwrap();

        {
            let mut guard = ring.lock_block(1);
            guard[0] = 0xAB;
            guard[3] = 0xCD;
        }

        let guard = ring.lock_block(1);
        assert_eq!(guard[0], 0xAB);
        assert_eq!(guard[3], 0xCD);
    }
}
