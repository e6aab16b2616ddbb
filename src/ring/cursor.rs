//! Cursor tracking a side's position in the block ring
//!
//! Each side of the copy (producer and consumer) owns one cursor. The
//! cursor is a wrapping byte position plus the derived block index and the
//! position at which the current block ends. Advancing past the block end
//! is a *crossing*: the caller must hand its block lock off to the next
//! block before touching another byte.

/// Per-side position in the ring, wrapping modulo the buffer capacity.
///
/// The producer's and consumer's cursors are independent state; they never
/// require joint locking. The invariant each side maintains is that the
/// block lock it holds (if any) is exactly `blocks[cursor.block()]`.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    /// Next slot to read or write, in `[0, capacity)`
    pos: usize,
    /// Block containing `pos`
    block: usize,
    /// Position at which `pos` would leave the current block
    block_end: usize,
    /// Total ring capacity in bytes
    capacity: usize,
    /// Bytes per block
    block_size: usize,
    /// Number of blocks in the ring
    num_blocks: usize,
}

impl Cursor {
    /// Create a cursor at position 0 for a ring of the given geometry.
    ///
    /// The geometry must already be validated (`capacity` a positive
    /// multiple of `block_size`).
    pub fn new(capacity: usize, block_size: usize) -> Self {
        Self {
            pos: 0,
            block: 0,
            block_end: block_size % capacity,
            capacity,
            block_size,
            num_blocks: capacity / block_size,
        }
    }

    /// Block currently containing the cursor
    pub fn block(&self) -> usize {
        self.block
    }

    /// Offset of the cursor within its current block
    pub fn offset(&self) -> usize {
        self.pos % self.block_size
    }

    /// Advance one slot, wrapping at the end of the ring.
    ///
    /// Returns `true` if the cursor crossed into a new block, in which
    /// case the caller must release the old block's lock and acquire the
    /// new one before the next transfer.
    pub fn advance(&mut self) -> bool {
        self.pos = (self.pos + 1) % self.capacity;
        if self.pos == self.block_end {
            self.block = (self.block + 1) % self.num_blocks;
            self.block_end = (self.block_end + self.block_size) % self.capacity;
            true
        } else {
            false
        }
    }
}
