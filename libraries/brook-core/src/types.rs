//! Stream and engine-facing value types
//!
//! All time values use a fixed-resolution integer clock of 100 ns ticks,
//! the same resolution the downstream graph runs on.

/// A point in stream time, in 100 ns ticks
pub type ReferenceTime = i64;

/// Ticks per second of the reference clock (100 ns resolution)
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Opaque handle identifying one elementary stream inside the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub u32);

/// Audio sample encodings the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// Unsigned 8-bit PCM
    U8,
    /// Signed 16-bit little-endian PCM
    S16Le,
    /// Signed 24-bit little-endian PCM
    S24Le,
    /// Signed 32-bit little-endian PCM
    S32Le,
    /// 32-bit little-endian float PCM
    F32Le,
    /// 64-bit little-endian float PCM
    F64Le,
    /// MPEG-1 audio, layer 1
    Mpeg1Layer1,
    /// MPEG-1 audio, layer 2
    Mpeg1Layer2,
    /// MPEG-1 audio, layer 3
    Mpeg1Layer3,
}

impl AudioEncoding {
    /// Bit depth of a raw PCM encoding; `None` for compressed layouts
    pub fn depth(self) -> Option<u16> {
        match self {
            AudioEncoding::U8 => Some(8),
            AudioEncoding::S16Le => Some(16),
            AudioEncoding::S24Le => Some(24),
            AudioEncoding::S32Le | AudioEncoding::F32Le => Some(32),
            AudioEncoding::F64Le => Some(64),
            _ => None,
        }
    }

    /// Whether this is a floating-point PCM encoding
    pub fn is_float(self) -> bool {
        matches!(self, AudioEncoding::F32Le | AudioEncoding::F64Le)
    }
}

/// Video pixel layouts the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoding {
    /// 32-bit BGRA
    Bgra,
    /// 32-bit BGRx (alpha ignored)
    Bgrx,
    /// 24-bit BGR
    Bgr,
    /// 15-bit RGB (555)
    Rgb15,
    /// 16-bit RGB (565)
    Rgb16,
    /// Packed 4:4:4 YUV with alpha
    Ayuv,
    /// Planar 4:2:0 YUV
    I420,
    /// Semi-planar 4:2:0 YUV
    Nv12,
    /// Packed 4:2:2 YUV, UYVY order
    Uyvy,
    /// Packed 4:2:2 YUV, YUYV order
    Yuy2,
    /// Planar 4:2:0 YUV, V plane first
    Yv12,
    /// Packed 4:2:2 YUV, YVYU order
    Yvyu,
    /// Cinepak-compressed video
    Cinepak,
}

/// Engine-native description of an audio stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample encoding
    pub encoding: AudioEncoding,
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub rate: u32,
}

/// Engine-native description of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    /// Pixel layout
    pub encoding: VideoEncoding,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame rate numerator
    pub fps_n: u32,
    /// Frame rate denominator
    pub fps_d: u32,
}

/// Abstract, engine-native description of one stream's encoding
///
/// Stateless value type; copied freely between the engine and the
/// format translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementaryFormat {
    /// An audio stream
    Audio(AudioFormat),
    /// A video stream
    Video(VideoFormat),
    /// A stream the engine could not classify
    Unknown,
}

/// One decoded buffer produced by the engine for a stream
#[derive(Debug, Clone)]
pub struct EngineBuffer {
    /// Raw sample bytes
    pub data: Vec<u8>,
    /// Presentation timestamp in reference ticks, if the engine knows it
    pub pts: Option<ReferenceTime>,
    /// Buffer duration in reference ticks, if the engine knows it
    pub duration: Option<ReferenceTime>,
    /// The buffer follows a gap in the stream
    pub discontinuity: bool,
    /// The buffer comes from a live source (delivered as preroll)
    pub live: bool,
    /// The buffer depends on earlier data (not a sync point)
    pub delta_unit: bool,
}

/// One event drained from the engine's per-stream queue
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A decoded buffer ready for delivery
    Buffer(EngineBuffer),
    /// The stream has ended
    EndOfStream,
    /// A new time segment begins
    Segment {
        /// Segment start in reference ticks
        start: ReferenceTime,
        /// Segment stop in reference ticks
        stop: ReferenceTime,
        /// Playback rate for the segment
        rate: f64,
    },
}

/// How a seek position argument is to be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positioning {
    /// Leave the stored position unchanged
    NoChange,
    /// The argument is an absolute position
    Absolute,
    /// The argument is relative to the stored position
    Relative,
}

/// Outcome of one serviced read request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The read succeeded; the buffer holds the (possibly truncated) data
    Data(Vec<u8>),
    /// The requested offset is at or past the end of the stream
    EndOfStream,
    /// The byte source reported an I/O failure
    Failed,
}

/// Kind of a downstream quality report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityKind {
    /// The renderer is starved; buffers arrive too late
    Starvation,
    /// The renderer is flooded; buffers arrive too fast
    Overflow,
}

/// Quality report received from a downstream consumer
#[derive(Debug, Clone, Copy)]
pub struct QualityReport {
    /// Report kind
    pub kind: QualityKind,
    /// Fraction of buffers the upstream should keep, in parts per thousand
    pub proportion: i32,
    /// How late the reported buffer was, in reference ticks
    pub lateness: i64,
    /// Timestamp of the reported buffer, in reference ticks
    pub timestamp: i64,
}
