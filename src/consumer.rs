//! Consumer side of the buffered copy
//!
//! The consumer pops bytes out of the ring through the mirror image of
//! the producer's critical section, stages them in a small write buffer,
//! and flushes the staging buffer to the destination with a single write
//! call whenever it fills and once more at the end. The first sentinel
//! byte terminates the copy; anything the producer pushes after it is
//! never written.
//!
//! A write failure (including a short write) is fatal for the copy, but
//! the consumer keeps draining the ring — discarding bytes — until the
//! sentinel arrives, so the producer is never left blocked on a full
//! buffer with nobody to wake it. The failure itself is reported from
//! `join`.

use crate::error::CopyError;
use crate::ring::{BlockGuard, BlockRing, Cursor, SENTINEL};
use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Handle to the consumer worker thread.
///
/// `join` returns the number of bytes written to the destination.
pub struct Consumer {
    handle: JoinHandle<Result<u64, CopyError>>,
}

impl Consumer {
    /// Spawn the consumer thread.
    ///
    /// Pops bytes from `ring` until the first [`SENTINEL`], staging up to
    /// `write_chunk` bytes between writes to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::Spawn`] if the OS refuses the thread.
    pub fn spawn<W>(writer: W, ring: Arc<BlockRing>, write_chunk: usize) -> Result<Self, CopyError>
    where
        W: Write + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("cpy-consumer".to_string())
            .spawn(move || pump(writer, &ring, write_chunk))
            .map_err(|source| CopyError::Spawn {
                thread: "consumer",
                source,
            })?;

        Ok(Self { handle })
    }

    /// Wait for the consumer to finish.
    ///
    /// # Errors
    ///
    /// Returns [`CopyError::DestinationWrite`] or [`CopyError::ShortWrite`]
    /// if the destination failed, or [`CopyError::WorkerPanicked`] if the
    /// thread panicked.
    pub fn join(self) -> Result<u64, CopyError> {
        self.handle
            .join()
            .map_err(|_| CopyError::WorkerPanicked("consumer"))?
    }
}

/// Drain the ring to the first sentinel, writing staged bytes out.
fn pump<W: Write>(mut writer: W, ring: &BlockRing, write_chunk: usize) -> Result<u64, CopyError> {
    let mut cursor = Cursor::new(ring.capacity(), ring.block_size());
    let staging_cap = write_chunk.max(1);
    let mut staging = Vec::with_capacity(staging_cap);
    let mut guard: Option<BlockGuard<'_>> = None;
    let mut slot_held = false;
    let mut total: u64 = 0;
    let mut failure: Option<CopyError> = None;

    debug!(
        capacity = ring.capacity(),
        block_size = ring.block_size(),
        "consumer started"
    );

    loop {
        let byte = pop_byte(ring, &mut cursor, &mut guard, &mut slot_held);
        if byte == SENTINEL {
            break;
        }

        // After a destination failure, keep draining so the producer is
        // not stranded on a full buffer; the bytes are dropped.
        if failure.is_some() {
            continue;
        }

        staging.push(byte);
        if staging.len() == staging_cap {
            // No block lock across the destination write
            drop(guard.take());
            match write_staged(&mut writer, &staging) {
                Ok(()) => {
                    total += staging.len() as u64;
                    staging.clear();
                }
                Err(e) => {
                    warn!(error = %e, "consumer write failed, draining ring");
                    staging.clear();
                    failure = Some(e);
                }
            }
        }
    }
    drop(guard);

    if let Some(e) = failure {
        return Err(e);
    }

    if !staging.is_empty() {
        write_staged(&mut writer, &staging)?;
        total += staging.len() as u64;
    }
    writer.flush().map_err(CopyError::DestinationWrite)?;

    debug!(bytes = total, "consumer finished");
    Ok(total)
}

/// Hand the staged bytes to the destination in one write call.
///
/// A short write is not retried; the legacy format treats it as fatal.
fn write_staged<W: Write>(writer: &mut W, staged: &[u8]) -> Result<(), CopyError> {
    let accepted = writer.write(staged).map_err(CopyError::DestinationWrite)?;
    if accepted < staged.len() {
        return Err(CopyError::ShortWrite {
            requested: staged.len(),
            accepted,
        });
    }
    trace!(bytes = accepted, "consumer flushed staging buffer");
    Ok(())
}

/// One byte through the consumer's critical section; mirror of the
/// producer's `push_byte`, gated on `full_slots` instead of `empty_slots`.
fn pop_byte<'a>(
    ring: &'a BlockRing,
    cursor: &mut Cursor,
    guard: &mut Option<BlockGuard<'a>>,
    slot_held: &mut bool,
) -> u8 {
    if !*slot_held {
        ring.acquire_read_slot();
    }
    *slot_held = false;

    let block = guard
        .take()
        .unwrap_or_else(|| ring.lock_block(cursor.block()));
    let byte = block[cursor.offset()];
    let crossed = cursor.advance();
    ring.release_write_slot();

    // Lookahead for the next readable byte while the lock is held; on an
    // empty ring the producer may need this block, so release before the
    // blocking wait.
    *slot_held = ring.try_acquire_read_slot();
    if !*slot_held {
        trace!("consumer drained the buffer, releasing block lock");
        drop(block);
    } else if crossed {
        drop(block);
        *guard = Some(ring.lock_block(cursor.block()));
        trace!(block = cursor.block(), "consumer crossed into new block");
    } else {
        *guard = Some(block);
    }

    byte
}
