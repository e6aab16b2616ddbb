//! blkcpy - a buffered byte-stream copy through a block-partitioned
//! circular buffer shared by one producer and one consumer thread.
//!
//! # Overview
//!
//! blkcpy moves bytes from any `Read` source to any `Write` destination
//! through a fixed-capacity ring buffer split into equally sized,
//! independently lockable blocks:
//!
//! 1. The producer thread reads the source and pushes bytes into the ring
//! 2. The consumer thread pops bytes out and batches them to the destination
//!
//! Two counting semaphores provide flow control over individual byte
//! slots, while mutual exclusion is per block, so the two sides only
//! contend when their cursors sit in the same block. When a cursor passes
//! a block boundary the side hands its lock off to the next block, and a
//! non-blocking slot lookahead guarantees no block lock is ever held
//! across an indefinite semaphore wait.
//!
//! # Key Features
//!
//! - Per-block locking: producer and consumer run concurrently on
//!   disjoint blocks
//! - Semaphore flow control with a deadlock-free lock hand-off protocol
//! - Batched stream I/O with independently tunable staging sizes
//! - Fallible join: worker failures come back from [`copy`] instead of
//!   hanging the counterpart thread
//!
//! End-of-stream travels in-band as a single [`SENTINEL`] byte (0x00), a
//! legacy framing decision that truncates binary input at the first 0x00.
//!
//! # Usage
//!
//! ```no_run
//! use blkcpy::{copy, CopyConfig};
//! use std::fs::File;
//!
//! let source = File::open("input.dat").unwrap();
//! let dest = File::create("output.dat").unwrap();
//! let report = copy(source, dest, CopyConfig::default()).unwrap();
//! println!("copied {} bytes", report.bytes_written);
//! ```

#![deny(missing_docs)]

mod consumer;
mod error;
mod producer;
mod ring;

pub use consumer::Consumer;
pub use error::CopyError;
pub use producer::Producer;
pub use ring::{BlockRing, SENTINEL};

use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// Configuration for a copy operation
#[derive(Debug, Clone, Copy)]
pub struct CopyConfig {
    /// Total ring capacity in bytes; must be a positive multiple of
    /// `block_size`
    pub buffer_size: usize,
    /// Lock granularity in bytes
    pub block_size: usize,
    /// Producer staging buffer size (source read batching)
    pub read_chunk: usize,
    /// Consumer staging buffer size (destination write batching)
    pub write_chunk: usize,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            buffer_size: 2048,
            block_size: 32, // 64 blocks
            read_chunk: 64,
            write_chunk: 32,
        }
    }
}

/// Outcome of a successful copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyReport {
    /// Bytes pulled from the source (the sentinel is not counted)
    pub bytes_read: u64,
    /// Bytes written to the destination
    pub bytes_written: u64,
}

/// Copy `reader` to `writer` through a shared block ring.
///
/// Spawns the producer and consumer threads, waits for both to
/// terminate, and only then drops the ring. If both sides fail, the
/// producer's error is reported.
///
/// # Errors
///
/// Returns [`CopyError::Geometry`] for an invalid `buffer_size` /
/// `block_size` pair, [`CopyError::Spawn`] if a worker thread cannot be
/// started, and otherwise whichever error a worker reported from its
/// stream.
pub fn copy<R, W>(reader: R, writer: W, config: CopyConfig) -> Result<CopyReport, CopyError>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let ring = Arc::new(BlockRing::new(config.buffer_size, config.block_size)?);
    debug!(
        buffer_size = config.buffer_size,
        block_size = config.block_size,
        num_blocks = ring.num_blocks(),
        "starting buffered copy"
    );

    let producer = Producer::spawn(reader, ring.clone(), config.read_chunk)?;

    // If the consumer cannot be spawned the producer is left running
    // detached; it parks once the ring fills and exits with the process.
    let consumer = Consumer::spawn(writer, ring, config.write_chunk)?;

    // Join both before reporting anything: the ring must outlive both
    // workers, and a failure on one side still lets the other terminate
    // through the sentinel handshake.
    let produced = producer.join();
    let consumed = consumer.join();

    let bytes_read = produced?;
    let bytes_written = consumed?;

    Ok(CopyReport {
        bytes_read,
        bytes_written,
    })
}
