//! The bridge controller
//!
//! Owns the lifecycle of a source-to-engine connection:
//!
//! ```text
//!   Disconnected --connect--> Connected --start--> Streaming
//!        ^                        |  ^                  |
//!        +-------disconnect-------+  +------stop--------+
//! ```
//!
//! `connect` probes the source, opens the engine and enumerates output
//! pins. `start` commits downstream buffer pools and spawns one streaming
//! task per pin; `stop` flushes the engine and joins them. Seeks are
//! serialized against delivery through the per-pin flush locks.

use crate::container::ContainerKind;
use crate::format::{delivery_buffer_size, elementary_from_descriptor};
use crate::handshake::ReadHandshake;
use crate::pin::{spawn_streaming_task, OutputPin, SinkConnection};
use crate::reader::spawn_reader;
use brook_core::{
    BridgeError, ByteSource, ParsingEngine, Positioning, QualityReport, ReferenceTime, Result,
    StreamSink, TypeDescriptor,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Connection state of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No source attached
    Disconnected,
    /// Source attached and container opened; pins enumerated, tasks idle
    Connected,
    /// Streaming tasks running
    Streaming,
}

/// Demultiplexing bridge between a pull-based byte source and a push-based
/// parsing engine
pub struct Bridge {
    kind: ContainerKind,
    engine: Arc<dyn ParsingEngine>,
    handshake: Arc<ReadHandshake>,
    streaming: Arc<AtomicBool>,
    sink_connected: Arc<AtomicBool>,
    source: Option<Arc<dyn ByteSource>>,
    file_size: u64,
    pins: Vec<Arc<OutputPin>>,
    reader: Option<JoinHandle<()>>,
    state: BridgeState,
}

impl Bridge {
    /// Create a bridge of the given container kind around an engine
    pub fn new(kind: ContainerKind, engine: Arc<dyn ParsingEngine>) -> Self {
        Bridge {
            kind,
            engine,
            handshake: Arc::new(ReadHandshake::new()),
            streaming: Arc::new(AtomicBool::new(false)),
            sink_connected: Arc::new(AtomicBool::new(false)),
            source: None,
            file_size: 0,
            pins: Vec::new(),
            reader: None,
            state: BridgeState::Disconnected,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Attach a byte source and open the container.
    ///
    /// On success the bridge is `Connected` with one output pin per
    /// elementary stream (a single pin for parsed single-stream kinds).
    ///
    /// # Errors
    /// `InvalidFormat` when the source's descriptor does not match the
    /// container kind, `EngineOpenFailure` when the engine rejects the
    /// content. A failed open leaves the bridge `Disconnected`.
    pub fn connect(&mut self, source: Arc<dyn ByteSource>) -> Result<()> {
        if self.state != BridgeState::Disconnected {
            return Err(BridgeError::InvalidState(
                "already connected to a source".to_string(),
            ));
        }

        let descriptor = source.descriptor();
        if !self.kind.accepts_source(&descriptor) {
            return Err(BridgeError::InvalidFormat(format!(
                "source type {:?}/{:?} does not match this container",
                descriptor.major, descriptor.minor
            )));
        }

        let file_size = source
            .length()
            .map_err(|err| BridgeError::IoFailure(err.to_string()))?;

        // The reader must be running before the engine opens: probing pulls
        // bytes through the handshake.
        self.handshake = Arc::new(ReadHandshake::new());
        self.sink_connected.store(true, Ordering::Release);
        let reader = spawn_reader(
            Arc::clone(&source),
            Arc::clone(&self.handshake),
            Arc::clone(&self.sink_connected),
            file_size,
        );

        let handshake: Arc<ReadHandshake> = Arc::clone(&self.handshake);
        if let Err(message) = self.engine.open(file_size, handshake) {
            self.sink_connected.store(false, Ordering::Release);
            self.handshake.shutdown();
            if reader.join().is_err() {
                error!("reader task panicked during failed open");
            }
            return Err(BridgeError::EngineOpenFailure(message));
        }

        let pin_count = if self.kind.single_stream() {
            1
        } else {
            self.engine.stream_count()
        };
        let mut pins = Vec::with_capacity(pin_count as usize);
        for index in 0..pin_count {
            let stream = self.engine.stream_handle(index);
            let duration = self.engine.stream_duration(stream);
            pins.push(Arc::new(OutputPin::new(
                self.kind.pin_name(index),
                stream,
                duration,
            )));
        }

        info!(size = file_size, pins = pins.len(), "container opened");
        self.source = Some(source);
        self.file_size = file_size;
        self.pins = pins;
        self.reader = Some(reader);
        self.state = BridgeState::Connected;
        Ok(())
    }

    /// Detach the source and tear everything down.
    ///
    /// # Errors
    /// `InvalidState` while streaming (call [`Bridge::stop`] first); `Ok`
    /// and a no-op when already disconnected.
    pub fn disconnect(&mut self) -> Result<()> {
        match self.state {
            BridgeState::Disconnected => return Ok(()),
            BridgeState::Streaming => {
                return Err(BridgeError::InvalidState(
                    "cannot disconnect while streaming".to_string(),
                ))
            }
            BridgeState::Connected => {}
        }

        // Close the engine first so no new read requests arrive, then
        // unblock and join the reader.
        self.engine.close();
        self.sink_connected.store(false, Ordering::Release);
        self.handshake.shutdown();
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                error!("reader task panicked");
            }
        }

        for pin in self.pins.drain(..) {
            if let Some(connection) = pin.take_sink() {
                connection.sink.decommit_buffers();
                connection.sink.disconnect();
                self.engine.disable_stream(pin.stream());
            }
        }

        self.source = None;
        self.file_size = 0;
        self.state = BridgeState::Disconnected;
        debug!("source detached");
        Ok(())
    }

    /// Start streaming: commit downstream buffer pools, re-issue the stored
    /// seek on every pin and spawn the streaming tasks.
    ///
    /// A pin whose sink refuses its buffer pool is logged and left without
    /// a working pool; the other pins stream normally.
    ///
    /// # Errors
    /// `NotConnected` when no source is attached.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            BridgeState::Disconnected => return Err(BridgeError::NotConnected),
            BridgeState::Streaming => return Ok(()),
            BridgeState::Connected => {}
        }

        self.streaming.store(true, Ordering::Release);
        self.engine.end_flush();

        for pin in &self.pins {
            let seek = pin.seek_state();
            // Only push a stop downstream when one was explicitly set; the
            // duration default means "play to the end".
            let stop_mode = if seek.stop != 0 && seek.stop != seek.duration {
                Positioning::Absolute
            } else {
                Positioning::NoChange
            };
            if !self.engine.seek(
                pin.stream(),
                seek.rate,
                seek.current,
                seek.stop,
                Positioning::Absolute,
                stop_mode,
            ) {
                warn!(pin = %pin.name(), "engine rejected the startup seek");
            }
        }

        for pin in &self.pins {
            if let Some(connection) = pin.sink_connection() {
                // A failed pool commit disables delivery on this pin but
                // must not strand the others mid-startup; the task still
                // runs and its delivery attempts fail softly.
                if let Err(err) = connection.sink.commit_buffers(1, connection.buffer_size) {
                    error!(pin = %pin.name(), "could not commit the delivery pool: {err}");
                }
                pin.store_task(spawn_streaming_task(
                    Arc::clone(pin),
                    Arc::clone(&self.engine),
                    Arc::clone(&self.streaming),
                ));
            }
        }

        self.state = BridgeState::Streaming;
        info!("streaming started");
        Ok(())
    }

    /// Stop streaming: flush the engine to unblock event waits, join the
    /// per-pin tasks and decommit the downstream pools.
    ///
    /// # Errors
    /// `NotConnected` when no source is attached; `Ok` and a no-op when
    /// already stopped.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            BridgeState::Disconnected => return Err(BridgeError::NotConnected),
            BridgeState::Connected => return Ok(()),
            BridgeState::Streaming => {}
        }

        self.streaming.store(false, Ordering::Release);
        // The flush pops every task out of its blocking event wait so the
        // stop flag is observed.
        self.engine.begin_flush();

        for pin in &self.pins {
            if let Some(connection) = pin.sink_connection() {
                connection.sink.decommit_buffers();
            }
            pin.join_task();
        }

        self.state = BridgeState::Connected;
        info!("streaming stopped");
        Ok(())
    }

    /// Negotiate a downstream connection for the pin at `pin_index`.
    ///
    /// Candidate types are offered in preference order; the first one the
    /// sink accepts is enabled on the engine and stored.
    ///
    /// # Errors
    /// `NoSuchPin` for an out-of-range index, `InvalidFormat` when the sink
    /// accepts none of the offered types.
    pub fn connect_sink(&self, pin_index: usize, sink: Arc<dyn StreamSink>) -> Result<()> {
        let pin = self
            .pins
            .get(pin_index)
            .ok_or(BridgeError::NoSuchPin(pin_index))?;

        let preferred = self.engine.preferred_format(pin.stream());
        let mut candidate_index = 0;
        while let Some(descriptor) = self.kind.media_type(&preferred, candidate_index) {
            candidate_index += 1;
            if !sink.query_accept(&descriptor) {
                continue;
            }
            let Some(format) = elementary_from_descriptor(&descriptor) else {
                continue;
            };

            let buffer_size = delivery_buffer_size(&descriptor);
            self.engine.enable_stream(pin.stream(), &format);
            pin.set_sink(SinkConnection {
                sink,
                descriptor,
                buffer_size,
            });
            debug!(pin = %pin.name(), "sink connected");
            return Ok(());
        }

        Err(BridgeError::InvalidFormat(format!(
            "sink accepted none of the types offered for pin {pin_index}"
        )))
    }

    /// Whether the pin at `pin_index` would accept `candidate` as its
    /// downstream type.
    ///
    /// Parsed container kinds accept only the exact preferred type; the
    /// generic kind accepts anything the engine can be asked to produce.
    ///
    /// # Errors
    /// `NoSuchPin` for an out-of-range index.
    pub fn accepts_type(&self, pin_index: usize, candidate: &TypeDescriptor) -> Result<bool> {
        let pin = self
            .pins
            .get(pin_index)
            .ok_or(BridgeError::NoSuchPin(pin_index))?;
        let preferred = self.engine.preferred_format(pin.stream());
        Ok(self.kind.accepts_type(&preferred, candidate))
    }

    /// Drop the downstream connection of the pin at `pin_index`.
    ///
    /// # Errors
    /// `NoSuchPin` for an out-of-range index.
    pub fn disconnect_sink(&self, pin_index: usize) -> Result<()> {
        let pin = self
            .pins
            .get(pin_index)
            .ok_or(BridgeError::NoSuchPin(pin_index))?;
        if let Some(connection) = pin.take_sink() {
            connection.sink.decommit_buffers();
            connection.sink.disconnect();
            self.engine.disable_stream(pin.stream());
        }
        Ok(())
    }

    /// Reposition the stream driving the pin at `pin_index`.
    ///
    /// While stopped the positions are only stored and take effect on the
    /// next [`Bridge::start`]. While streaming, delivery on every pin is
    /// suspended, the engine, all sinks, and the source are flushed, and
    /// the seek is issued with the flush still in effect. `no_flush`
    /// skips the entire flush bracket, keeping in-flight data alive; the
    /// delivery exclusion still applies.
    ///
    /// # Errors
    /// `NoSuchPin` for an out-of-range index, `NotConnected` when no source
    /// is attached, `SeekFailure` when the engine rejects the seek (the
    /// stored positions keep the requested values).
    pub fn set_positions(
        &self,
        pin_index: usize,
        current: Option<(ReferenceTime, Positioning)>,
        stop: Option<(ReferenceTime, Positioning)>,
        no_flush: bool,
    ) -> Result<()> {
        if self.state == BridgeState::Disconnected {
            return Err(BridgeError::NotConnected);
        }
        let pin = self
            .pins
            .get(pin_index)
            .ok_or(BridgeError::NoSuchPin(pin_index))?;

        if self.state != BridgeState::Streaming {
            let mut seek = pin.seek_state_mut();
            if let Some((value, mode)) = current {
                seek.apply_current(value, mode);
            }
            if let Some((value, mode)) = stop {
                seek.apply_stop(value, mode);
            }
            return Ok(());
        }

        // Flush bracket: unblock the engine, tell the sinks, and pause the
        // source before suspending delivery. A no-flush seek skips the
        // whole bracket so in-flight data survives the reposition.
        if !no_flush {
            self.engine.begin_flush();
            for other in &self.pins {
                if let Some(connection) = other.sink_connection() {
                    connection.sink.begin_flush();
                }
            }
            if let Some(ref source) = self.source {
                source.begin_flush();
            }
        }

        // Take every pin's flush lock, in pin order, so no streaming task is
        // mid-delivery while the engine repositions.
        let mut guards = Vec::with_capacity(self.pins.len());
        for other in &self.pins {
            guards.push(other.lock_flushing());
        }

        let accepted = {
            let mut seek = pin.seek_state_mut();
            if let Some((value, mode)) = current {
                seek.apply_current(value, mode);
            }
            if let Some((value, mode)) = stop {
                seek.apply_stop(value, mode);
            }
            self.engine.seek(
                pin.stream(),
                seek.rate,
                seek.current,
                seek.stop,
                current.map_or(Positioning::NoChange, |(_, mode)| mode),
                stop.map_or(Positioning::NoChange, |(_, mode)| mode),
            )
        };
        if !accepted {
            warn!(pin = %pin.name(), "engine rejected the seek");
        }

        if !no_flush {
            self.engine.end_flush();
            for other in &self.pins {
                if let Some(connection) = other.sink_connection() {
                    connection.sink.end_flush();
                }
            }
            if let Some(ref source) = self.source {
                source.end_flush();
            }
        }

        // Release in reverse acquisition order.
        while guards.pop().is_some() {}

        if accepted {
            Ok(())
        } else {
            Err(BridgeError::SeekFailure)
        }
    }

    /// Change the playback rate of the pin at `pin_index`.
    ///
    /// While streaming the new rate takes effect through a zero-motion seek
    /// that leaves both positions untouched.
    ///
    /// # Errors
    /// `NoSuchPin` for an out-of-range index, `NotConnected` when no source
    /// is attached.
    pub fn set_rate(&self, pin_index: usize, rate: f64) -> Result<()> {
        if self.state == BridgeState::Disconnected {
            return Err(BridgeError::NotConnected);
        }
        let pin = self
            .pins
            .get(pin_index)
            .ok_or(BridgeError::NoSuchPin(pin_index))?;

        pin.seek_state_mut().rate = rate;
        if self.state == BridgeState::Streaming {
            self.set_positions(pin_index, None, None, true)?;
        }
        Ok(())
    }

    /// Forward a downstream quality report for the pin at `pin_index`.
    ///
    /// # Errors
    /// `NoSuchPin` for an out-of-range index.
    pub fn quality_notify(&self, pin_index: usize, report: &QualityReport) -> Result<()> {
        let pin = self
            .pins
            .get(pin_index)
            .ok_or(BridgeError::NoSuchPin(pin_index))?;
        pin.quality_report(self.engine.as_ref(), report);
        Ok(())
    }

    /// Number of output pins (0 while disconnected)
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Name of the pin at `pin_index`
    pub fn pin_name(&self, pin_index: usize) -> Option<&str> {
        self.pins.get(pin_index).map(|pin| pin.name())
    }

    /// Stored current and stop positions of the pin at `pin_index`
    pub fn positions(&self, pin_index: usize) -> Option<(ReferenceTime, ReferenceTime)> {
        self.pins.get(pin_index).map(|pin| {
            let seek = pin.seek_state();
            (seek.current, seek.stop)
        })
    }

    /// Duration of the stream behind the pin at `pin_index`
    pub fn duration(&self, pin_index: usize) -> Option<ReferenceTime> {
        self.pins
            .get(pin_index)
            .map(|pin| pin.seek_state().duration)
    }

    /// Playback rate of the pin at `pin_index`
    pub fn rate(&self, pin_index: usize) -> Option<f64> {
        self.pins.get(pin_index).map(|pin| pin.seek_state().rate)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if self.state == BridgeState::Streaming {
            let _ = self.stop();
        }
        if self.state == BridgeState::Connected {
            let _ = self.disconnect();
        }
    }
}
