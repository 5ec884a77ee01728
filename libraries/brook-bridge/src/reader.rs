//! Reader task
//!
//! Dedicated worker that services read requests against the byte source.
//! One reader per bridge, alive for the whole connected lifetime; it must
//! outlive the engine's container so that teardown-time reads are still
//! serviced.

use crate::handshake::{PendingRead, ReadHandshake};
use brook_core::{ByteSource, ReadOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Spawn the reader task for a connected bridge.
pub(crate) fn spawn_reader(
    source: Arc<dyn ByteSource>,
    handshake: Arc<ReadHandshake>,
    sink_connected: Arc<AtomicBool>,
    file_size: u64,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("bridge-reader".to_string())
        .spawn(move || {
            debug!("reader task started");
            // Default offset advances monotonically past the last served
            // byte unless the engine asks for an absolute offset.
            let mut next_offset: u64 = 0;
            while sink_connected.load(Ordering::Acquire) {
                let Some(request) = handshake.wait_request() else {
                    break;
                };
                let outcome = service_read(source.as_ref(), file_size, &mut next_offset, request);
                handshake.complete(outcome);
            }
            debug!("reader task exiting");
        })
        .expect("Failed to spawn reader thread")
}

fn service_read(
    source: &dyn ByteSource,
    file_size: u64,
    next_offset: &mut u64,
    request: PendingRead,
) -> ReadOutcome {
    let offset = request.offset.unwrap_or(*next_offset);
    if offset >= file_size {
        warn!(offset, length = request.length, "read past end of stream");
        return ReadOutcome::EndOfStream;
    }

    let length = u64::from(request.length).min(file_size - offset);
    *next_offset = offset + length;

    let mut buffer = vec![0u8; usize::try_from(length).unwrap_or(usize::MAX)];
    match source.read(offset, &mut buffer) {
        Ok(()) => ReadOutcome::Data(buffer),
        Err(err) => {
            error!(offset, length, "byte source read failed: {err}");
            ReadOutcome::Failed
        }
    }
}
