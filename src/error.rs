//! Error types for the buffered copy

use std::io;
use thiserror::Error;

/// Errors surfaced by a copy operation.
///
/// Worker-thread failures are carried back through `join`, so `copy`
/// is the single fallible surface: there is no cross-thread error
/// channel beyond the sentinel-on-error / drain-on-error termination
/// handshake that keeps the other side from blocking forever.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The requested ring geometry is invalid: the buffer size must be
    /// a positive multiple of a positive block size.
    #[error("invalid ring geometry: buffer size {buffer_size} is not a positive multiple of block size {block_size}")]
    Geometry {
        /// Requested total capacity in bytes
        buffer_size: usize,
        /// Requested block size in bytes
        block_size: usize,
    },

    /// Reading from the source stream failed
    #[error("failed to read from source: {0}")]
    SourceRead(#[source] io::Error),

    /// Writing to the destination stream failed
    #[error("failed to write to destination: {0}")]
    DestinationWrite(#[source] io::Error),

    /// The destination accepted fewer bytes than requested.
    ///
    /// A short write is fatal for the copy; staged bytes past this
    /// point are dropped.
    #[error("short write to destination: accepted {accepted} of {requested} bytes")]
    ShortWrite {
        /// Bytes handed to the destination
        requested: usize,
        /// Bytes the destination actually accepted
        accepted: usize,
    },

    /// A worker thread could not be spawned
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        /// Which worker failed to start
        thread: &'static str,
        /// Underlying OS error
        source: io::Error,
    },

    /// A worker thread panicked before reporting a result
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}
