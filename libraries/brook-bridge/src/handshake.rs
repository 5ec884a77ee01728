//! Read-request handshake
//!
//! Single-slot synchronous bridge between the engine's pull model and the
//! reader task. The engine posts one request at a time through the
//! [`ByteRequester`] face and blocks until the reader marks it complete.
//!
//! ```text
//! Engine Thread                     Reader Task
//!       │                               │
//!       │  request(offset, length)      │
//!       │──────── posted ──────────────>│
//!       │                               │ ByteSource::read()
//!       │<─────── completed ────────────│
//!       │                               │
//! ```
//!
//! At most one request is in flight at any instant. That is a protocol
//! invariant the engine must honor, not one the type system enforces; the
//! slot asserts it in debug builds.

use brook_core::{ByteRequester, ReadOutcome};
use std::sync::{Condvar, Mutex};

/// A posted, not-yet-serviced read request
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingRead {
    /// Absolute offset, or `None` to continue after the last served byte
    pub offset: Option<u64>,
    /// Requested length in bytes
    pub length: u32,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingRead>,
    outcome: Option<ReadOutcome>,
    shutdown: bool,
}

/// The single-slot handshake shared by the engine and the reader task
pub struct ReadHandshake {
    slot: Mutex<Slot>,
    posted: Condvar,
    completed: Condvar,
}

impl ReadHandshake {
    pub(crate) fn new() -> Self {
        ReadHandshake {
            slot: Mutex::new(Slot::default()),
            posted: Condvar::new(),
            completed: Condvar::new(),
        }
    }

    /// Reader side: block until a request is posted or the handshake shuts
    /// down. Returns `None` on shutdown, leaving any pending request
    /// un-serviced.
    pub(crate) fn wait_request(&self) -> Option<PendingRead> {
        let mut slot = self.slot.lock().unwrap();
        loop {
            if slot.shutdown {
                return None;
            }
            if let Some(request) = slot.pending.take() {
                return Some(request);
            }
            slot = self.posted.wait(slot).unwrap();
        }
    }

    /// Reader side: complete the in-flight request and wake the engine.
    pub(crate) fn complete(&self, outcome: ReadOutcome) {
        let mut slot = self.slot.lock().unwrap();
        slot.outcome = Some(outcome);
        self.completed.notify_one();
    }

    /// Wake both sides and refuse all further requests.
    pub(crate) fn shutdown(&self) {
        let mut slot = self.slot.lock().unwrap();
        slot.shutdown = true;
        self.posted.notify_all();
        self.completed.notify_all();
    }
}

impl ByteRequester for ReadHandshake {
    fn request(&self, offset: Option<u64>, length: u32) -> ReadOutcome {
        let mut slot = self.slot.lock().unwrap();
        if slot.shutdown {
            return ReadOutcome::Failed;
        }
        debug_assert!(
            slot.pending.is_none() && slot.outcome.is_none(),
            "a second read request was posted before the first completed"
        );
        slot.pending = Some(PendingRead { offset, length });
        self.posted.notify_one();
        loop {
            if let Some(outcome) = slot.outcome.take() {
                return outcome;
            }
            if slot.shutdown {
                return ReadOutcome::Failed;
            }
            slot = self.completed.wait(slot).unwrap();
        }
    }
}
