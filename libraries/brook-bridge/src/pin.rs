//! Output pins and their streaming tasks
//!
//! One pin per elementary stream. Each pin owns its seek state, a flush
//! exclusion lock, and (while the bridge streams) a dedicated task that
//! drains the engine's event queue and forwards samples downstream.
//!
//! The flush lock is the seek/delivery arbiter: the streaming task holds it
//! for the duration of one event, and a seek acquires every pin's lock
//! before touching engine state, so a seek never interleaves with a
//! partially delivered event.

use crate::qos;
use brook_core::{
    DeliveryBuffer, EngineBuffer, EngineEvent, MinorType, ParsingEngine, Positioning,
    QualityReport, ReferenceTime, SampleFlags, SampleTimes, SinkError, StreamId, StreamSink,
    TypeDescriptor, TICKS_PER_SECOND,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Stored seek state for one pin, in reference ticks
#[derive(Debug, Clone, Copy)]
pub struct SeekState {
    /// Current position
    pub current: ReferenceTime,
    /// Stop position
    pub stop: ReferenceTime,
    /// Stream duration
    pub duration: ReferenceTime,
    /// Playback rate
    pub rate: f64,
}

impl SeekState {
    fn new(duration: ReferenceTime) -> Self {
        SeekState {
            current: 0,
            stop: duration,
            duration,
            rate: 1.0,
        }
    }

    /// Apply a positioning argument to the current position
    pub(crate) fn apply_current(&mut self, value: ReferenceTime, mode: Positioning) {
        match mode {
            Positioning::NoChange => {}
            Positioning::Absolute => self.current = value,
            Positioning::Relative => self.current += value,
        }
    }

    /// Apply a positioning argument to the stop position
    pub(crate) fn apply_stop(&mut self, value: ReferenceTime, mode: Positioning) {
        match mode {
            Positioning::NoChange => {}
            Positioning::Absolute => self.stop = value,
            Positioning::Relative => self.stop += value,
        }
    }
}

/// A pin's negotiated downstream connection
#[derive(Clone)]
pub(crate) struct SinkConnection {
    pub sink: Arc<dyn StreamSink>,
    pub descriptor: TypeDescriptor,
    pub buffer_size: usize,
}

/// Per-elementary-stream delivery endpoint
pub struct OutputPin {
    name: String,
    stream: StreamId,
    seek: Mutex<SeekState>,
    flush_lock: Mutex<()>,
    sink: Mutex<Option<SinkConnection>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl OutputPin {
    pub(crate) fn new(name: String, stream: StreamId, duration: ReferenceTime) -> Self {
        OutputPin {
            name,
            stream,
            seek: Mutex::new(SeekState::new(duration)),
            flush_lock: Mutex::new(()),
            sink: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Downstream-visible pin name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Engine stream handle this pin drains
    pub(crate) fn stream(&self) -> StreamId {
        self.stream
    }

    /// Snapshot of the stored seek state
    pub fn seek_state(&self) -> SeekState {
        *self.seek.lock().unwrap()
    }

    pub(crate) fn seek_state_mut(&self) -> MutexGuard<'_, SeekState> {
        self.seek.lock().unwrap()
    }

    /// Acquire the flush exclusion lock
    pub(crate) fn lock_flushing(&self) -> MutexGuard<'_, ()> {
        self.flush_lock.lock().unwrap()
    }

    pub(crate) fn set_sink(&self, connection: SinkConnection) {
        *self.sink.lock().unwrap() = Some(connection);
    }

    pub(crate) fn take_sink(&self) -> Option<SinkConnection> {
        self.sink.lock().unwrap().take()
    }

    /// Clone of the current sink connection, if any
    pub(crate) fn sink_connection(&self) -> Option<SinkConnection> {
        self.sink.lock().unwrap().clone()
    }

    pub(crate) fn store_task(&self, handle: JoinHandle<()>) {
        *self.task.lock().unwrap() = Some(handle);
    }

    pub(crate) fn join_task(&self) {
        if let Some(handle) = self.task.lock().unwrap().take() {
            if handle.join().is_err() {
                error!(pin = %self.name, "streaming task panicked");
            }
        }
    }

    /// Translate and forward a downstream quality report to the engine
    pub(crate) fn quality_report(&self, engine: &dyn ParsingEngine, report: &QualityReport) {
        if let Some(notification) = qos::translate(report) {
            engine.notify_qos(
                self.stream,
                notification.is_underrun,
                notification.rate_multiplier,
                notification.diff,
                notification.timestamp,
            );
        }
    }

    /// Deliver one engine buffer downstream, splitting it into delivery
    /// units when the negotiated type has a known byte rate.
    fn send_buffer(&self, buffer: &EngineBuffer) {
        let Some(connection) = self.sink_connection() else {
            // Not connected downstream; soft error, skip the event.
            return;
        };

        if let Some(byte_rate) = splittable_byte_rate(&connection.descriptor) {
            let mut offset = 0;
            while offset < buffer.data.len() {
                let delivery = match connection.sink.delivery_buffer(0) {
                    Ok(delivery) => delivery,
                    Err(SinkError::NotConnected) => break,
                    Err(err) => {
                        error!(pin = %self.name, "could not get a delivery buffer: {err}");
                        break;
                    }
                };
                if delivery.data.is_empty() {
                    warn!(pin = %self.name, "sink handed out an empty delivery buffer");
                    break;
                }

                let advance = delivery.data.len().min(buffer.data.len() - offset);
                if self
                    .send_sample(&connection, delivery, buffer, offset, advance, byte_rate)
                    .is_err()
                {
                    break;
                }
                offset += advance;
            }
        } else {
            match connection.sink.delivery_buffer(buffer.data.len()) {
                Ok(delivery) => {
                    let len = buffer.data.len();
                    let _ = self.send_sample(&connection, delivery, buffer, 0, len, 0);
                }
                Err(SinkError::NotConnected) => {}
                Err(err) => {
                    error!(pin = %self.name, "could not get a delivery buffer: {err}");
                }
            }
        }
    }

    /// Fill and deliver a single sample covering `buffer[offset..offset+size]`.
    fn send_sample(
        &self,
        connection: &SinkConnection,
        mut delivery: DeliveryBuffer,
        buffer: &EngineBuffer,
        offset: usize,
        size: usize,
        byte_rate: u32,
    ) -> Result<(), SinkError> {
        delivery.data.truncate(size);
        delivery.data.resize(size, 0);
        delivery.data.copy_from_slice(&buffer.data[offset..offset + size]);

        let seek = self.seek_state();
        let mut times = SampleTimes::default();

        if let Some(pts) = buffer.pts {
            let pts_start = if offset > 0 {
                pts + scale_ticks(offset, byte_rate)
            } else {
                pts
            };
            let rt_start = presentation_time(pts_start, &seek);

            if let Some(duration) = buffer.duration {
                let pts_stop = if offset + size < buffer.data.len() {
                    pts + scale_ticks(offset + size, byte_rate)
                } else {
                    pts + duration
                };
                let rt_stop = presentation_time(pts_stop, &seek);

                times.start = Some(rt_start);
                times.stop = (rt_stop >= 0).then_some(rt_stop);
                times.media_start = Some(pts_start);
                times.media_stop = Some(pts_stop);
            } else if rt_start >= 0 {
                times.start = Some(rt_start);
            }
        }

        let flags = SampleFlags {
            discontinuity: offset == 0 && buffer.discontinuity,
            preroll: buffer.live,
            sync_point: !buffer.delta_unit,
        };

        let result = connection.sink.deliver(delivery, times, flags);
        if let Err(ref err) = result {
            if *err != SinkError::NotConnected {
                warn!(pin = %self.name, "sample delivery failed: {err}");
            }
        }
        result
    }
}

/// Apply the pin's seek origin and playback rate to a stream time
fn presentation_time(stream_time: ReferenceTime, seek: &SeekState) -> ReferenceTime {
    (((stream_time - seek.current) as f64) * seek.rate) as ReferenceTime
}

/// Interpolate a byte offset into reference ticks at the given byte rate
fn scale_ticks(bytes: usize, byte_rate: u32) -> ReferenceTime {
    if byte_rate == 0 {
        return 0;
    }
    ((bytes as u128 * TICKS_PER_SECOND as u128) / u128::from(byte_rate)) as ReferenceTime
}

/// Byte rate for delivery-unit splitting; only plain PCM and float wave
/// types split
fn splittable_byte_rate(descriptor: &TypeDescriptor) -> Option<u32> {
    if !matches!(descriptor.minor, MinorType::Pcm | MinorType::IeeeFloat) {
        return None;
    }
    descriptor.byte_rate().filter(|rate| *rate > 0)
}

/// Spawn the streaming task for a pin.
///
/// The loop waits for engine events with the flush lock released, then
/// takes the lock for exactly one event's delivery. A seek that holds
/// every pin's lock therefore only ever waits for in-progress deliveries,
/// never for the next event to arrive.
pub(crate) fn spawn_streaming_task(
    pin: Arc<OutputPin>,
    engine: Arc<dyn ParsingEngine>,
    streaming: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let thread_name = format!("pin-{}", pin.name());
    thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            debug!(pin = %pin.name(), "streaming task started");
            while streaming.load(Ordering::Acquire) {
                let Some(event) = engine.next_event(pin.stream(), true) else {
                    // Flushed. Back off instead of spinning on the flush.
                    thread::sleep(Duration::from_millis(1));
                    continue;
                };

                let guard = pin.lock_flushing();
                match event {
                    EngineEvent::Buffer(buffer) => pin.send_buffer(&buffer),
                    EngineEvent::EndOfStream => {
                        if let Some(connection) = pin.sink_connection() {
                            connection.sink.end_of_stream();
                        }
                    }
                    EngineEvent::Segment { start, stop, rate } => {
                        if let Some(connection) = pin.sink_connection() {
                            connection.sink.new_segment(start, stop, rate);
                        }
                    }
                }
                drop(guard);
            }
            debug!(pin = %pin.name(), "streaming stopped; exiting");
        })
        .expect("Failed to spawn streaming thread")
}
