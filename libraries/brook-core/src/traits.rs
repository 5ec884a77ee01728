//! Collaborator traits for the Brook bridge
//!
//! The bridge consumes a pull-based `ByteSource` and a push-based
//! `ParsingEngine`, and exposes per-stream delivery to a `StreamSink`.
//! All three are injected behind these seams; the bridge owns the threads
//! and the synchronization between them.

use crate::descriptor::TypeDescriptor;
use crate::error::SinkError;
use crate::types::{
    ElementaryFormat, EngineEvent, Positioning, ReadOutcome, ReferenceTime, StreamId,
};
use std::sync::Arc;

/// Synchronous, pull-based byte-stream source
///
/// Reads are stateless with respect to position; every call names its
/// absolute offset. `begin_flush`/`end_flush` bracket a seek so a blocking
/// source can abandon in-flight work.
pub trait ByteSource: Send + Sync {
    /// Content descriptor of the stream; must be stream-typed for the
    /// bridge to accept it
    fn descriptor(&self) -> TypeDescriptor;

    /// Total byte length of the stream
    ///
    /// # Errors
    /// Returns an error when the source cannot determine its length.
    fn length(&self) -> std::io::Result<u64>;

    /// Read `dst.len()` bytes starting at `offset`
    ///
    /// # Errors
    /// Returns an error on I/O failure; short reads are an error, the
    /// bridge clamps lengths before calling.
    fn read(&self, offset: u64, dst: &mut [u8]) -> std::io::Result<()>;

    /// A flush is starting; abandon blocking work
    fn begin_flush(&self) {}

    /// The flush is over
    fn end_flush(&self) {}
}

/// Engine-facing face of the read-request handshake
///
/// The engine receives one of these at `open` and posts read requests
/// through it. Calls block until the bridge's reader task services the
/// request. Protocol invariant (not enforced by the type system): the
/// engine never posts a second request before the previous call returns.
pub trait ByteRequester: Send + Sync {
    /// Request `length` bytes at `offset`; `None` continues from the byte
    /// after the last served request
    fn request(&self, offset: Option<u64>, length: u32) -> ReadOutcome;
}

/// Asynchronous parsing/demuxing engine
///
/// Opaque to the bridge: the engine detects the container, decodes it, and
/// produces per-stream events. It pulls bytes through the `ByteRequester`
/// handed to `open`.
pub trait ParsingEngine: Send + Sync {
    /// Open the container; issues read requests through `reads`
    ///
    /// # Errors
    /// Returns a message describing the probe/open failure.
    fn open(&self, total_length: u64, reads: Arc<dyn ByteRequester>) -> std::result::Result<(), String>;

    /// Number of elementary streams discovered at open
    fn stream_count(&self) -> u32;

    /// Handle of the stream at `index`
    fn stream_handle(&self, index: u32) -> StreamId;

    /// Duration of the stream in reference ticks
    fn stream_duration(&self, stream: StreamId) -> ReferenceTime;

    /// The engine's preferred format for the stream
    fn preferred_format(&self, stream: StreamId) -> ElementaryFormat;

    /// Enable the stream, converting its output to `format`
    fn enable_stream(&self, stream: StreamId, format: &ElementaryFormat);

    /// Disable the stream; its event queue stops filling
    fn disable_stream(&self, stream: StreamId);

    /// Fetch the next event for the stream
    ///
    /// With `blocking` set the call waits for an event and returns `None`
    /// only when a flush interrupts it; otherwise it returns `None` when no
    /// event is ready.
    fn next_event(&self, stream: StreamId, blocking: bool) -> Option<EngineEvent>;

    /// Seek the stream; returns false if the engine rejects the seek
    #[allow(clippy::too_many_arguments)]
    fn seek(
        &self,
        stream: StreamId,
        rate: f64,
        current: ReferenceTime,
        stop: ReferenceTime,
        current_mode: Positioning,
        stop_mode: Positioning,
    ) -> bool;

    /// Begin a flush: unblock in-flight read and event calls
    fn begin_flush(&self);

    /// End the flush; blocking calls resume
    fn end_flush(&self);

    /// Forward a translated quality-of-service notification
    fn notify_qos(
        &self,
        stream: StreamId,
        is_underrun: bool,
        rate_multiplier: f64,
        diff: i64,
        timestamp: u64,
    );

    /// Release the container; no further events or reads follow
    fn close(&self);
}

/// A delivery unit obtained from a sink's buffer pool
///
/// `data` arrives sized to the pool's negotiated buffer size; the bridge
/// truncates it to the bytes actually delivered.
#[derive(Debug)]
pub struct DeliveryBuffer {
    /// Sample bytes; length is the pool buffer size on fetch
    pub data: Vec<u8>,
}

/// Presentation and media timestamps attached to a delivered sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleTimes {
    /// Presentation start, adjusted by seek origin and rate
    pub start: Option<ReferenceTime>,
    /// Presentation stop; absent when unknown or negative
    pub stop: Option<ReferenceTime>,
    /// Unadjusted stream time of the first byte
    pub media_start: Option<ReferenceTime>,
    /// Unadjusted stream time past the last byte
    pub media_stop: Option<ReferenceTime>,
}

/// Per-sample flags copied from the engine buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleFlags {
    /// First sample after a gap
    pub discontinuity: bool,
    /// Preroll sample (from a live source)
    pub preroll: bool,
    /// Sample can be decoded without earlier data
    pub sync_point: bool,
}

/// Downstream consumer of one elementary stream
pub trait StreamSink: Send + Sync {
    /// Whether the sink accepts the proposed descriptor
    fn query_accept(&self, descriptor: &TypeDescriptor) -> bool;

    /// Commit the delivery buffer pool
    ///
    /// # Errors
    /// Returns an error if the pool cannot be committed.
    fn commit_buffers(&self, count: usize, buffer_size: usize) -> std::result::Result<(), SinkError>;

    /// Decommit the delivery buffer pool
    fn decommit_buffers(&self);

    /// Fetch an empty delivery buffer of at least `min_size` bytes
    ///
    /// # Errors
    /// Returns `SinkError::NotConnected` when no downstream connection
    /// exists; this is a soft error.
    fn delivery_buffer(&self, min_size: usize) -> std::result::Result<DeliveryBuffer, SinkError>;

    /// Deliver one sample
    ///
    /// # Errors
    /// Returns an error if the sink rejects the sample.
    fn deliver(
        &self,
        buffer: DeliveryBuffer,
        times: SampleTimes,
        flags: SampleFlags,
    ) -> std::result::Result<(), SinkError>;

    /// Signal the end of the stream
    fn end_of_stream(&self);

    /// Signal a new time segment
    fn new_segment(&self, start: ReferenceTime, stop: ReferenceTime, rate: f64);

    /// A flush is starting; discard queued samples
    fn begin_flush(&self);

    /// The flush is over
    fn end_flush(&self);

    /// The pin is going away; drop the connection
    fn disconnect(&self);
}
