//! Producer side of the buffered copy
//!
//! The producer pulls chunks from the source stream into a small staging
//! buffer and pushes them into the ring one byte at a time. Each byte
//! follows the same critical section: claim a write slot, write under the
//! current block's lock, advance the cursor, publish the byte to the
//! consumer, then run the non-blocking lookahead for the next slot.
//!
//! The lookahead is the deadlock-avoidance rule of the whole design: when
//! the ring is full the consumer may need this very block's lock to drain
//! it, so the producer must never sit in the blocking semaphore wait while
//! holding a block lock. `try_acquire` runs with the lock held; only after
//! it fails and the lock is released does the producer fall back to the
//! blocking wait.

use crate::error::CopyError;
use crate::ring::{BlockGuard, BlockRing, Cursor, SENTINEL};
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Handle to the producer worker thread.
///
/// Dropped without `join`, the thread keeps running until it has pushed
/// its sentinel; `join` returns the number of source bytes transferred.
pub struct Producer {
    handle: JoinHandle<Result<u64, CopyError>>,
}

impl Producer {
    /// Spawn the producer thread.
    ///
    /// Reads `read_chunk`-byte chunks from `reader` and pushes every byte
    /// into `ring`, followed by one [`SENTINEL`]. The sentinel is pushed
    /// even after a source read error so the consumer terminates instead
    /// of blocking forever; the error itself comes back from [`join`].
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::Spawn`] if the OS refuses the thread.
    ///
    /// [`join`]: Producer::join
    pub fn spawn<R>(reader: R, ring: Arc<BlockRing>, read_chunk: usize) -> Result<Self, CopyError>
    where
        R: Read + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("cpy-producer".to_string())
            .spawn(move || pump(reader, &ring, read_chunk))
            .map_err(|source| CopyError::Spawn {
                thread: "producer",
                source,
            })?;

        Ok(Self { handle })
    }

    /// Wait for the producer to finish.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::SourceRead`] if the source stream failed, or
    /// [`CopyError::WorkerPanicked`] if the thread panicked.
    pub fn join(self) -> Result<u64, CopyError> {
        self.handle
            .join()
            .map_err(|_| CopyError::WorkerPanicked("producer"))?
    }
}

/// Read the source to EOF, pushing every byte plus the final sentinel.
fn pump<R: Read>(mut reader: R, ring: &BlockRing, read_chunk: usize) -> Result<u64, CopyError> {
    let mut cursor = Cursor::new(ring.capacity(), ring.block_size());
    let mut staging = vec![0u8; read_chunk.max(1)];
    let mut guard: Option<BlockGuard<'_>> = None;
    let mut slot_held = false;
    let mut total: u64 = 0;
    let mut read_err = None;

    debug!(
        capacity = ring.capacity(),
        block_size = ring.block_size(),
        "producer started"
    );

    loop {
        // Never hold a block lock across the source read; a claimed but
        // unused slot is kept for the next byte.
        drop(guard.take());

        let n = match reader.read(&mut staging) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                read_err = Some(e);
                break;
            }
        };
        trace!(bytes = n, "producer read chunk from source");

        for &byte in &staging[..n] {
            push_byte(ring, &mut cursor, &mut guard, &mut slot_held, byte);
        }
        total += n as u64;
    }

    // The sentinel goes out even after a read error so the consumer can
    // drain what it has and terminate.
    push_byte(ring, &mut cursor, &mut guard, &mut slot_held, SENTINEL);
    drop(guard);

    debug!(bytes = total, "producer finished");
    match read_err {
        Some(e) => Err(CopyError::SourceRead(e)),
        None => Ok(total),
    }
}

/// One byte through the producer's critical section.
///
/// `slot_held` carries a slot claimed by the previous call's lookahead;
/// `guard` carries the block lock when it could be kept. The invariant is
/// that the blocking slot wait only ever runs with no block lock held.
fn push_byte<'a>(
    ring: &'a BlockRing,
    cursor: &mut Cursor,
    guard: &mut Option<BlockGuard<'a>>,
    slot_held: &mut bool,
    byte: u8,
) {
    if !*slot_held {
        // Lock is always released by the time we get here
        ring.acquire_write_slot();
    }
    *slot_held = false;

    let mut block = guard
        .take()
        .unwrap_or_else(|| ring.lock_block(cursor.block()));
    block[cursor.offset()] = byte;
    let crossed = cursor.advance();
    ring.release_read_slot();

    // Lookahead for the next slot while the lock is still held. On
    // failure the lock must go before the blocking wait: with the ring
    // full, the consumer's cursor may be in this very block.
    *slot_held = ring.try_acquire_write_slot();
    if !*slot_held {
        trace!("producer out of buffer space, releasing block lock");
        drop(block);
    } else if crossed {
        drop(block);
        *guard = Some(ring.lock_block(cursor.block()));
        trace!(block = cursor.block(), "producer crossed into new block");
    } else {
        *guard = Some(block);
    }
}
