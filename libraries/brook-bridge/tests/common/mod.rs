//! Shared test doubles for the bridge integration tests

#![allow(dead_code)]

use brook_core::{
    ByteRequester, ByteSource, DeliveryBuffer, ElementaryFormat, EngineEvent, ParsingEngine,
    Positioning, ReadOutcome, ReferenceTime, SampleFlags, SampleTimes, SinkError, StreamId,
    StreamSink, TypeDescriptor,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// In-memory byte source that also checks the read serialization contract:
/// the bridge must never issue overlapping reads.
pub struct MemorySource {
    descriptor: TypeDescriptor,
    data: Vec<u8>,
    reading: AtomicBool,
    pub overlap_detected: AtomicBool,
    pub begin_flush_calls: AtomicUsize,
    pub end_flush_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(descriptor: TypeDescriptor, data: Vec<u8>) -> Self {
        MemorySource {
            descriptor,
            data,
            reading: AtomicBool::new(false),
            overlap_detected: AtomicBool::new(false),
            begin_flush_calls: AtomicUsize::new(0),
            end_flush_calls: AtomicUsize::new(0),
        }
    }
}

impl ByteSource for MemorySource {
    fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    fn length(&self) -> io::Result<u64> {
        Ok(self.data.len() as u64)
    }

    fn read(&self, offset: u64, buffer: &mut [u8]) -> io::Result<()> {
        if self.reading.swap(true, Ordering::SeqCst) {
            self.overlap_detected.store(true, Ordering::SeqCst);
        }
        let start = usize::try_from(offset).unwrap();
        let end = start + buffer.len();
        let result = if end <= self.data.len() {
            buffer.copy_from_slice(&self.data[start..end]);
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "out of range"))
        };
        self.reading.store(false, Ordering::SeqCst);
        result
    }

    fn begin_flush(&self) {
        self.begin_flush_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn end_flush(&self) {
        self.end_flush_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// One scripted elementary stream
pub struct ScriptedStream {
    pub duration: ReferenceTime,
    pub preferred: ElementaryFormat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekCall {
    pub stream: StreamId,
    pub rate: f64,
    pub current: ReferenceTime,
    pub stop: ReferenceTime,
    pub current_mode: Positioning,
    pub stop_mode: Positioning,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QosCall {
    pub stream: StreamId,
    pub is_underrun: bool,
    pub rate_multiplier: f64,
    pub diff: i64,
    pub timestamp: u64,
}

struct EventQueues {
    queues: HashMap<u32, VecDeque<EngineEvent>>,
    flushing: bool,
}

/// Scripted engine: serves preconfigured streams and queued events, and
/// records every control call the bridge makes.
pub struct ScriptedEngine {
    streams: Vec<ScriptedStream>,
    probe_length: u32,
    fail_open: bool,
    events: Mutex<EventQueues>,
    events_ready: Condvar,
    reject_seek: AtomicBool,
    pub seeks: Mutex<Vec<SeekCall>>,
    pub qos: Mutex<Vec<QosCall>>,
    pub enabled: Mutex<Vec<(StreamId, ElementaryFormat)>>,
    pub disabled: Mutex<Vec<StreamId>>,
    pub begin_flush_calls: AtomicUsize,
    pub end_flush_calls: AtomicUsize,
    pub closed: AtomicBool,
}

impl ScriptedEngine {
    pub fn new(streams: Vec<ScriptedStream>) -> Self {
        ScriptedEngine {
            streams,
            probe_length: 16,
            fail_open: false,
            events: Mutex::new(EventQueues {
                queues: HashMap::new(),
                flushing: true,
            }),
            events_ready: Condvar::new(),
            reject_seek: AtomicBool::new(false),
            seeks: Mutex::new(Vec::new()),
            qos: Mutex::new(Vec::new()),
            enabled: Mutex::new(Vec::new()),
            disabled: Mutex::new(Vec::new()),
            begin_flush_calls: AtomicUsize::new(0),
            end_flush_calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn rejecting_seeks(self) -> Self {
        self.reject_seek.store(true, Ordering::SeqCst);
        self
    }

    /// Queue an event for the streaming task of `stream` to pick up
    pub fn push_event(&self, stream: StreamId, event: EngineEvent) {
        let mut events = self.events.lock().unwrap();
        events.queues.entry(stream.0).or_default().push_back(event);
        drop(events);
        self.events_ready.notify_all();
    }

    pub fn seek_count(&self) -> usize {
        self.seeks.lock().unwrap().len()
    }
}

impl ParsingEngine for ScriptedEngine {
    fn open(&self, total_length: u64, reads: Arc<dyn ByteRequester>) -> Result<(), String> {
        if self.fail_open {
            return Err("unrecognized container".to_string());
        }
        // Probe the head of the file the way a real engine would.
        let length = u32::try_from(total_length.min(u64::from(self.probe_length))).unwrap();
        match reads.request(Some(0), length) {
            ReadOutcome::Data(data) if data.len() == length as usize => Ok(()),
            other => Err(format!("probe read failed: {other:?}")),
        }
    }

    fn stream_count(&self) -> u32 {
        u32::try_from(self.streams.len()).unwrap()
    }

    fn stream_handle(&self, index: u32) -> StreamId {
        StreamId(index)
    }

    fn stream_duration(&self, stream: StreamId) -> ReferenceTime {
        self.streams[stream.0 as usize].duration
    }

    fn preferred_format(&self, stream: StreamId) -> ElementaryFormat {
        self.streams[stream.0 as usize].preferred
    }

    fn enable_stream(&self, stream: StreamId, format: &ElementaryFormat) {
        self.enabled.lock().unwrap().push((stream, *format));
    }

    fn disable_stream(&self, stream: StreamId) {
        self.disabled.lock().unwrap().push(stream);
    }

    fn next_event(&self, stream: StreamId, blocking: bool) -> Option<EngineEvent> {
        let mut events = self.events.lock().unwrap();
        loop {
            if events.flushing {
                return None;
            }
            if let Some(event) = events
                .queues
                .get_mut(&stream.0)
                .and_then(VecDeque::pop_front)
            {
                return Some(event);
            }
            if !blocking {
                return None;
            }
            events = self.events_ready.wait(events).unwrap();
        }
    }

    fn seek(
        &self,
        stream: StreamId,
        rate: f64,
        current: ReferenceTime,
        stop: ReferenceTime,
        current_mode: Positioning,
        stop_mode: Positioning,
    ) -> bool {
        self.seeks.lock().unwrap().push(SeekCall {
            stream,
            rate,
            current,
            stop,
            current_mode,
            stop_mode,
        });
        !self.reject_seek.load(Ordering::SeqCst)
    }

    fn begin_flush(&self) {
        self.begin_flush_calls.fetch_add(1, Ordering::SeqCst);
        let mut events = self.events.lock().unwrap();
        events.flushing = true;
        drop(events);
        self.events_ready.notify_all();
    }

    fn end_flush(&self) {
        self.end_flush_calls.fetch_add(1, Ordering::SeqCst);
        let mut events = self.events.lock().unwrap();
        events.flushing = false;
        drop(events);
        self.events_ready.notify_all();
    }

    fn notify_qos(
        &self,
        stream: StreamId,
        is_underrun: bool,
        rate_multiplier: f64,
        diff: i64,
        timestamp: u64,
    ) {
        self.qos.lock().unwrap().push(QosCall {
            stream,
            is_underrun,
            rate_multiplier,
            diff,
            timestamp,
        });
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.begin_flush();
    }
}

#[derive(Debug)]
pub struct Delivered {
    pub data: Vec<u8>,
    pub times: SampleTimes,
    pub flags: SampleFlags,
}

#[derive(Debug, Clone, Copy)]
pub enum SinkEvent {
    Sample,
    EndOfStream,
    Segment(ReferenceTime, ReferenceTime, f64),
}

/// Recording sink with a configurable acceptance predicate
pub struct RecordingSink {
    accept: Box<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>,
    pub fail_commit: AtomicBool,
    pub committed: Mutex<Option<(usize, usize)>>,
    pub delivered: Mutex<Vec<Delivered>>,
    pub begin_flush_calls: AtomicUsize,
    pub end_flush_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    notify: Sender<SinkEvent>,
}

impl RecordingSink {
    /// Sink that accepts every offered type
    pub fn accepting() -> (Arc<Self>, Receiver<SinkEvent>) {
        Self::with_predicate(|_| true)
    }

    /// Sink that rejects every offered type
    pub fn rejecting() -> (Arc<Self>, Receiver<SinkEvent>) {
        Self::with_predicate(|_| false)
    }

    pub fn with_predicate<F>(accept: F) -> (Arc<Self>, Receiver<SinkEvent>)
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        let (notify, events) = unbounded();
        let sink = Arc::new(RecordingSink {
            accept: Box::new(accept),
            fail_commit: AtomicBool::new(false),
            committed: Mutex::new(None),
            delivered: Mutex::new(Vec::new()),
            begin_flush_calls: AtomicUsize::new(0),
            end_flush_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            notify,
        });
        (sink, events)
    }

    fn pool_buffer_size(&self) -> Option<usize> {
        self.committed.lock().unwrap().map(|(_, size)| size)
    }
}

impl StreamSink for RecordingSink {
    fn query_accept(&self, descriptor: &TypeDescriptor) -> bool {
        (self.accept)(descriptor)
    }

    fn commit_buffers(&self, count: usize, buffer_size: usize) -> Result<(), SinkError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(SinkError::Failed("pool rejected".to_string()));
        }
        *self.committed.lock().unwrap() = Some((count, buffer_size));
        Ok(())
    }

    fn decommit_buffers(&self) {
        *self.committed.lock().unwrap() = None;
    }

    fn delivery_buffer(&self, min_size: usize) -> Result<DeliveryBuffer, SinkError> {
        let Some(pool_size) = self.pool_buffer_size() else {
            return Err(SinkError::NotConnected);
        };
        Ok(DeliveryBuffer {
            data: vec![0; pool_size.max(min_size)],
        })
    }

    fn deliver(
        &self,
        buffer: DeliveryBuffer,
        times: SampleTimes,
        flags: SampleFlags,
    ) -> Result<(), SinkError> {
        self.delivered.lock().unwrap().push(Delivered {
            data: buffer.data,
            times,
            flags,
        });
        let _ = self.notify.send(SinkEvent::Sample);
        Ok(())
    }

    fn end_of_stream(&self) {
        let _ = self.notify.send(SinkEvent::EndOfStream);
    }

    fn new_segment(&self, start: ReferenceTime, stop: ReferenceTime, rate: f64) {
        let _ = self.notify.send(SinkEvent::Segment(start, stop, rate));
    }

    fn begin_flush(&self) {
        self.begin_flush_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn end_flush(&self) {
        self.end_flush_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn disconnect(&self) {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// A stereo 16-bit 44.1 kHz audio stream, the workhorse fixture
pub fn pcm_stream(duration: ReferenceTime) -> ScriptedStream {
    use brook_core::{AudioEncoding, AudioFormat};
    ScriptedStream {
        duration,
        preferred: ElementaryFormat::Audio(AudioFormat {
            encoding: AudioEncoding::S16Le,
            channels: 2,
            rate: 44100,
        }),
    }
}
