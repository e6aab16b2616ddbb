//! Stress tests exercising the blocking and wake paths of the ring
//!
//! A tiny two-block ring with inputs much longer than the buffer forces
//! both cursors through the same blocks repeatedly; slowing one side down
//! drives the other into its blocking semaphore wait, covering the
//! lock-release-before-wait fallback of the crossing protocol.

use blkcpy::{copy, CopyConfig};
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Clone)]
struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl SharedWriter {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }

    fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Injects a delay before every write, starving the producer
struct SlowWriter<W> {
    inner: W,
    delay: Duration,
}

impl<W: Write> Write for SlowWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Injects a delay before every read, starving the consumer
struct SlowReader<R> {
    inner: R,
    delay: Duration,
}

impl<R: Read> Read for SlowReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(self.delay);
        self.inner.read(buf)
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 255) as u8 + 1).collect()
}

/// Minimal geometry: 4 bytes, 2 blocks of 2
fn tiny_config() -> CopyConfig {
    CopyConfig {
        buffer_size: 4,
        block_size: 2,
        read_chunk: 3,
        write_chunk: 3,
    }
}

#[test]
fn test_tiny_ring_long_input() {
    let input = pattern(1024);
    let output = SharedWriter::new();

    let report = copy(Cursor::new(input.clone()), output.clone(), tiny_config()).unwrap();

    assert_eq!(output.contents(), input);
    assert_eq!(report.bytes_written, 1024);
}

#[test]
fn test_slow_consumer_forces_producer_to_block() {
    let input = pattern(512);
    let output = SharedWriter::new();
    let writer = SlowWriter {
        inner: output.clone(),
        delay: Duration::from_micros(200),
    };

    copy(Cursor::new(input.clone()), writer, tiny_config()).unwrap();
    assert_eq!(output.contents(), input);
}

#[test]
fn test_slow_producer_forces_consumer_to_block() {
    let input = pattern(512);
    let output = SharedWriter::new();
    let reader = SlowReader {
        inner: Cursor::new(input.clone()),
        delay: Duration::from_micros(200),
    };

    copy(reader, output.clone(), tiny_config()).unwrap();
    assert_eq!(output.contents(), input);
}

#[test]
fn test_single_block_ring() {
    // One block: every crossing hands the lock back to the same block,
    // and producer and consumer always contend on it
    let config = CopyConfig {
        buffer_size: 8,
        block_size: 8,
        read_chunk: 5,
        write_chunk: 7,
    };
    let input = pattern(300);
    let output = SharedWriter::new();

    copy(Cursor::new(input.clone()), output.clone(), config).unwrap();
    assert_eq!(output.contents(), input);
}

#[test]
fn test_large_copy_default_geometry() {
    let input = pattern(256 * 1024);
    let output = SharedWriter::new();

    let report = copy(
        Cursor::new(input.clone()),
        output.clone(),
        CopyConfig::default(),
    )
    .unwrap();

    assert_eq!(report.bytes_read, input.len() as u64);
    assert_eq!(output.contents(), input);
}
