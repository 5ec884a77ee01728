//! Downstream type descriptors
//!
//! The consumer-facing counterpart of `ElementaryFormat`: a major/minor type
//! tag pair plus a format-specific payload. Descriptors are allocated per
//! negotiation attempt and ownership transfers to the caller that requested
//! them.

/// Major type tag of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorType {
    /// An undecoded byte stream (container data)
    Stream,
    /// Decoded audio samples
    Audio,
    /// Decoded video frames
    Video,
}

/// Minor type tag of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinorType {
    // Stream subtypes (byte source content)
    /// RIFF WAVE container
    Wave,
    /// AVI container
    Avi,
    /// MPEG-1 audio container
    Mpeg1Audio,
    /// Container type not declared by the source
    UnspecifiedStream,

    // Audio subtypes
    /// Integer PCM
    Pcm,
    /// Floating-point PCM
    IeeeFloat,
    /// MPEG-1 audio payload (layers 1 and 2)
    Mpeg1Payload,
    /// MPEG layer-3 audio
    Mp3,

    // Video subtypes
    /// 32-bit ARGB
    Argb32,
    /// 32-bit RGB
    Rgb32,
    /// 24-bit RGB
    Rgb24,
    /// 15-bit RGB (555)
    Rgb555,
    /// 16-bit RGB (565)
    Rgb565,
    /// Packed AYUV
    Ayuv,
    /// Planar I420
    I420,
    /// Semi-planar NV12
    Nv12,
    /// Packed UYVY
    Uyvy,
    /// Packed YUY2
    Yuy2,
    /// Planar YV12
    Yv12,
    /// Packed YVYU
    Yvyu,
    /// Cinepak
    Cinepak,
}

/// Bitmap compression tag carried by a video payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Uncompressed RGB
    Rgb,
    /// Uncompressed RGB with explicit bit masks
    Bitfields,
    /// FOURCC-tagged layout
    FourCc([u8; 4]),
}

/// Plain wave format payload (integer PCM, two channels or fewer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub samples_per_sec: u32,
    /// Average byte rate
    pub avg_bytes_per_sec: u32,
    /// Bytes per sample frame
    pub block_align: u16,
    /// Bits per sample
    pub bits_per_sample: u16,
}

/// Extensible wave format payload (float formats or more than 2 channels)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormatExtensible {
    /// Base wave fields
    pub format: WaveFormat,
    /// Valid bits per sample
    pub valid_bits_per_sample: u16,
    /// Speaker position mask; 0 when the channel count has no fixed mapping
    pub channel_mask: u32,
    /// Whether the samples are floating point
    pub is_float: bool,
}

/// MPEG-1 audio payload (layers 1 and 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpeg1AudioFormat {
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub samples_per_sec: u32,
    /// Head layer: 1 or 2
    pub layer: u16,
}

/// MPEG layer-3 audio payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpegLayer3Format {
    /// Channel count
    pub channels: u16,
    /// Sample rate in Hz
    pub samples_per_sec: u32,
    /// Payload id; the engine cannot supply this, so it is fixed to MPEG (1)
    pub id: u16,
    /// Flag bits; padding-on is assumed
    pub flags: u32,
    /// MPEG frames per downstream block
    pub frames_per_block: u16,
    /// Decoder delay in samples
    pub codec_delay: u16,
}

/// Video payload: dimensions, bitmap layout, and frame timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfoFormat {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Bits per pixel
    pub bit_count: u16,
    /// Bitmap compression tag
    pub compression: Compression,
    /// Image buffer size in bytes, including row/plane alignment
    pub image_size: u32,
    /// Average frame duration in reference ticks; 0 when unknown
    pub avg_time_per_frame: i64,
    /// RGB bit masks (red, green, blue) for bitfield layouts
    pub bit_masks: Option<[u32; 3]>,
}

/// Format-specific payload of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPayload {
    /// No payload (stream-typed descriptors)
    None,
    /// Plain wave payload
    Wave(WaveFormat),
    /// Extensible wave payload
    WaveExtensible(WaveFormatExtensible),
    /// MPEG-1 audio payload
    Mpeg1Audio(Mpeg1AudioFormat),
    /// MPEG layer-3 payload
    MpegLayer3(MpegLayer3Format),
    /// Video payload
    Video(VideoInfoFormat),
}

/// Consumer-facing type descriptor negotiated at connect time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Major type tag
    pub major: MajorType,
    /// Minor type tag
    pub minor: MinorType,
    /// Samples have a fixed size
    pub fixed_size_samples: bool,
    /// Samples use temporal compression (not all are sync points)
    pub temporal_compression: bool,
    /// Nominal sample size in bytes; 0 when variable
    pub sample_size: u32,
    /// Format-specific payload
    pub payload: FormatPayload,
}

impl TypeDescriptor {
    /// Descriptor for an undecoded byte stream with the given container tag
    pub fn stream(minor: MinorType) -> Self {
        TypeDescriptor {
            major: MajorType::Stream,
            minor,
            fixed_size_samples: false,
            temporal_compression: false,
            sample_size: 0,
            payload: FormatPayload::None,
        }
    }

    /// Average byte rate of the payload, when the format defines one
    ///
    /// Only PCM and float wave payloads carry a usable byte rate; compressed
    /// and video payloads yield `None`.
    pub fn byte_rate(&self) -> Option<u32> {
        match self.payload {
            FormatPayload::Wave(ref wave) => Some(wave.avg_bytes_per_sec),
            FormatPayload::WaveExtensible(ref ext) => Some(ext.format.avg_bytes_per_sec),
            _ => None,
        }
    }
}
