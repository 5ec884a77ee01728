//! Format translator
//!
//! Bidirectional mapping between the engine's [`ElementaryFormat`] and the
//! consumer-facing [`TypeDescriptor`], for audio and video. Round trips are
//! not bit-for-bit (compressed-audio parameter fields the engine cannot
//! supply are fixed constants), but major/minor type and the core numeric
//! fields round-trip exactly for every supported format.

use brook_core::{
    AudioEncoding, AudioFormat, Compression, ElementaryFormat, FormatPayload, MajorType, MinorType,
    Mpeg1AudioFormat, MpegLayer3Format, TypeDescriptor, VideoEncoding, VideoFormat, VideoInfoFormat,
    WaveFormat, WaveFormatExtensible, TICKS_PER_SECOND,
};

// Speaker position bits (front left/right, front center, LFE, back
// left/right, front left/right of center, back center).
const SPEAKER_FRONT_LEFT: u32 = 0x1;
const SPEAKER_FRONT_RIGHT: u32 = 0x2;
const SPEAKER_FRONT_CENTER: u32 = 0x4;
const SPEAKER_LOW_FREQUENCY: u32 = 0x8;
const SPEAKER_BACK_LEFT: u32 = 0x10;
const SPEAKER_BACK_RIGHT: u32 = 0x20;
const SPEAKER_FRONT_LEFT_OF_CENTER: u32 = 0x40;
const SPEAKER_FRONT_RIGHT_OF_CENTER: u32 = 0x80;
const SPEAKER_BACK_CENTER: u32 = 0x100;

const MASK_STEREO: u32 = SPEAKER_FRONT_LEFT | SPEAKER_FRONT_RIGHT;
// Three fronts and a back center, not the quad corners.
const MASK_SURROUND: u32 = MASK_STEREO | SPEAKER_FRONT_CENTER | SPEAKER_BACK_CENTER;
const MASK_5POINT1: u32 = MASK_STEREO
    | SPEAKER_FRONT_CENTER
    | SPEAKER_LOW_FREQUENCY
    | SPEAKER_BACK_LEFT
    | SPEAKER_BACK_RIGHT;
const MASK_7POINT1: u32 =
    MASK_5POINT1 | SPEAKER_FRONT_LEFT_OF_CENTER | SPEAKER_FRONT_RIGHT_OF_CENTER;

/// MPEG layer-3 payload id the engine cannot supply
const MPEG_LAYER3_ID_MPEG: u16 = 1;
/// Padding-on flag for the layer-3 payload
const MPEG_LAYER3_FLAG_PADDING_ON: u32 = 0x1;
/// Layer-3 decoder delay in samples
const MPEG_LAYER3_CODEC_DELAY: u16 = 1393;

/// Video candidates offered when no exact match is requested.
///
/// YUV-family layouts come before RGB: most decoders output YUV, and
/// YUV-to-YUV conversion is much cheaper downstream.
pub(crate) const VIDEO_CANDIDATES: [VideoEncoding; 12] = [
    VideoEncoding::Ayuv,
    VideoEncoding::I420,
    VideoEncoding::Yv12,
    VideoEncoding::Yuy2,
    VideoEncoding::Uyvy,
    VideoEncoding::Yvyu,
    VideoEncoding::Nv12,
    VideoEncoding::Bgra,
    VideoEncoding::Bgrx,
    VideoEncoding::Bgr,
    VideoEncoding::Rgb16,
    VideoEncoding::Rgb15,
];

/// Speaker mask for a channel count; unmapped counts yield 0
pub(crate) fn channel_mask_from_count(count: u16) -> u32 {
    match count {
        1 => SPEAKER_FRONT_CENTER,
        2 => MASK_STEREO,
        4 => MASK_SURROUND,
        5 => MASK_5POINT1 & !SPEAKER_LOW_FREQUENCY,
        6 => MASK_5POINT1,
        8 => MASK_7POINT1,
        _ => 0,
    }
}

fn align(n: u32, alignment: u32) -> u32 {
    (n + alignment - 1) & !(alignment - 1)
}

/// Image buffer size for a video format, including row/plane alignment
///
/// Packed and planar 8-bit layouts align rows to 4 bytes; 32-bit packed
/// layouts need no extra alignment.
pub(crate) fn image_size(format: &VideoFormat) -> u32 {
    let (width, height) = (format.width, format.height);
    match format.encoding {
        VideoEncoding::Bgra | VideoEncoding::Bgrx | VideoEncoding::Ayuv => width * height * 4,

        VideoEncoding::Bgr => align(width * 3, 4) * height,

        VideoEncoding::Rgb15
        | VideoEncoding::Rgb16
        | VideoEncoding::Uyvy
        | VideoEncoding::Yuy2
        | VideoEncoding::Yvyu => align(width * 2, 4) * height,

        VideoEncoding::I420 | VideoEncoding::Yv12 => {
            // Y plane, then aligned U and V planes at half resolution.
            align(width, 4) * align(height, 2)
                + 2 * align(width.div_ceil(2), 4) * height.div_ceil(2)
        }

        VideoEncoding::Nv12 => {
            align(width, 4) * align(height, 2) + align(width, 4) * height.div_ceil(2)
        }

        // Cinepak encoders in the wild report 24 bpp; anything at least
        // this large fits the downstream pool.
        VideoEncoding::Cinepak => width * height * 3,
    }
}

fn audio_descriptor(format: &AudioFormat) -> Option<TypeDescriptor> {
    let mut descriptor = TypeDescriptor {
        major: MajorType::Audio,
        minor: MinorType::Pcm,
        fixed_size_samples: false,
        temporal_compression: false,
        sample_size: 0,
        payload: FormatPayload::None,
    };

    match format.encoding {
        AudioEncoding::Mpeg1Layer1 | AudioEncoding::Mpeg1Layer2 => {
            descriptor.minor = MinorType::Mpeg1Payload;
            descriptor.payload = FormatPayload::Mpeg1Audio(Mpeg1AudioFormat {
                channels: format.channels,
                samples_per_sec: format.rate,
                layer: if format.encoding == AudioEncoding::Mpeg1Layer1 {
                    1
                } else {
                    2
                },
            });
        }

        AudioEncoding::Mpeg1Layer3 => {
            descriptor.minor = MinorType::Mp3;
            // The engine cannot supply most of the layer-3 parameters;
            // they are fixed constants.
            descriptor.payload = FormatPayload::MpegLayer3(MpegLayer3Format {
                channels: format.channels,
                samples_per_sec: format.rate,
                id: MPEG_LAYER3_ID_MPEG,
                flags: MPEG_LAYER3_FLAG_PADDING_ON,
                frames_per_block: 1,
                codec_delay: MPEG_LAYER3_CODEC_DELAY,
            });
        }

        _ => {
            let depth = format.encoding.depth()?;
            let is_float = format.encoding.is_float();
            let block_align = format.channels * depth / 8;
            let wave = WaveFormat {
                channels: format.channels,
                samples_per_sec: format.rate,
                avg_bytes_per_sec: format.rate * u32::from(block_align),
                block_align,
                bits_per_sample: depth,
            };

            descriptor.minor = if is_float {
                MinorType::IeeeFloat
            } else {
                MinorType::Pcm
            };
            descriptor.fixed_size_samples = true;
            descriptor.sample_size = u32::from(block_align);

            // Float formats and more than two channels always use the
            // extensible variant.
            descriptor.payload = if is_float || format.channels > 2 {
                FormatPayload::WaveExtensible(WaveFormatExtensible {
                    format: wave,
                    valid_bits_per_sample: depth,
                    channel_mask: channel_mask_from_count(format.channels),
                    is_float,
                })
            } else {
                FormatPayload::Wave(wave)
            };
        }
    }

    Some(descriptor)
}

fn video_minor_type(encoding: VideoEncoding) -> (MinorType, Compression, u16) {
    match encoding {
        VideoEncoding::Bgra => (MinorType::Argb32, Compression::Rgb, 32),
        VideoEncoding::Bgrx => (MinorType::Rgb32, Compression::Rgb, 32),
        VideoEncoding::Bgr => (MinorType::Rgb24, Compression::Rgb, 24),
        VideoEncoding::Rgb15 => (MinorType::Rgb555, Compression::Rgb, 16),
        VideoEncoding::Rgb16 => (MinorType::Rgb565, Compression::Bitfields, 16),
        VideoEncoding::Ayuv => (MinorType::Ayuv, Compression::FourCc(*b"AYUV"), 32),
        VideoEncoding::I420 => (MinorType::I420, Compression::FourCc(*b"I420"), 12),
        VideoEncoding::Nv12 => (MinorType::Nv12, Compression::FourCc(*b"NV12"), 12),
        VideoEncoding::Uyvy => (MinorType::Uyvy, Compression::FourCc(*b"UYVY"), 16),
        VideoEncoding::Yuy2 => (MinorType::Yuy2, Compression::FourCc(*b"YUY2"), 16),
        VideoEncoding::Yv12 => (MinorType::Yv12, Compression::FourCc(*b"YV12"), 12),
        VideoEncoding::Yvyu => (MinorType::Yvyu, Compression::FourCc(*b"YVYU"), 16),
        VideoEncoding::Cinepak => (MinorType::Cinepak, Compression::FourCc(*b"CVID"), 24),
    }
}

fn video_descriptor(format: &VideoFormat) -> Option<TypeDescriptor> {
    let (minor, compression, bit_count) = video_minor_type(format.encoding);

    let avg_time_per_frame = if format.fps_n == 0 {
        0
    } else {
        TICKS_PER_SECOND * i64::from(format.fps_d) / i64::from(format.fps_n)
    };

    let bit_masks = if format.encoding == VideoEncoding::Rgb16 {
        Some([0xf800, 0x07e0, 0x001f])
    } else {
        None
    };

    Some(TypeDescriptor {
        major: MajorType::Video,
        minor,
        fixed_size_samples: false,
        temporal_compression: true,
        sample_size: 1,
        payload: FormatPayload::Video(VideoInfoFormat {
            width: format.width,
            height: format.height,
            bit_count,
            compression,
            image_size: image_size(format),
            avg_time_per_frame,
            bit_masks,
        }),
    })
}

/// Build a downstream descriptor for an elementary format
///
/// Returns `None` for formats the bridge cannot express downstream.
pub fn descriptor_from_elementary(format: &ElementaryFormat) -> Option<TypeDescriptor> {
    match format {
        ElementaryFormat::Audio(audio) => audio_descriptor(audio),
        ElementaryFormat::Video(video) => video_descriptor(video),
        ElementaryFormat::Unknown => None,
    }
}

fn elementary_from_audio(descriptor: &TypeDescriptor) -> Option<ElementaryFormat> {
    const PCM_MAP: [(MinorType, u16, AudioEncoding); 6] = [
        (MinorType::Pcm, 8, AudioEncoding::U8),
        (MinorType::Pcm, 16, AudioEncoding::S16Le),
        (MinorType::Pcm, 24, AudioEncoding::S24Le),
        (MinorType::Pcm, 32, AudioEncoding::S32Le),
        (MinorType::IeeeFloat, 32, AudioEncoding::F32Le),
        (MinorType::IeeeFloat, 64, AudioEncoding::F64Le),
    ];

    match descriptor.payload {
        FormatPayload::Mpeg1Audio(ref mpeg) => {
            let encoding = match mpeg.layer {
                1 => AudioEncoding::Mpeg1Layer1,
                2 => AudioEncoding::Mpeg1Layer2,
                3 => AudioEncoding::Mpeg1Layer3,
                _ => return None,
            };
            Some(ElementaryFormat::Audio(AudioFormat {
                encoding,
                channels: mpeg.channels,
                rate: mpeg.samples_per_sec,
            }))
        }

        FormatPayload::MpegLayer3(ref mp3) => Some(ElementaryFormat::Audio(AudioFormat {
            encoding: AudioEncoding::Mpeg1Layer3,
            channels: mp3.channels,
            rate: mp3.samples_per_sec,
        })),

        FormatPayload::Wave(ref wave) => pcm_encoding(&PCM_MAP, descriptor.minor, wave.bits_per_sample)
            .map(|encoding| {
                ElementaryFormat::Audio(AudioFormat {
                    encoding,
                    channels: wave.channels,
                    rate: wave.samples_per_sec,
                })
            }),

        FormatPayload::WaveExtensible(ref ext) => {
            pcm_encoding(&PCM_MAP, descriptor.minor, ext.format.bits_per_sample).map(|encoding| {
                ElementaryFormat::Audio(AudioFormat {
                    encoding,
                    channels: ext.format.channels,
                    rate: ext.format.samples_per_sec,
                })
            })
        }

        _ => None,
    }
}

fn pcm_encoding(
    map: &[(MinorType, u16, AudioEncoding)],
    minor: MinorType,
    depth: u16,
) -> Option<AudioEncoding> {
    map.iter()
        .find(|(m, d, _)| *m == minor && *d == depth)
        .map(|(_, _, encoding)| *encoding)
}

fn elementary_from_video(descriptor: &TypeDescriptor) -> Option<ElementaryFormat> {
    const VIDEO_MAP: [(MinorType, VideoEncoding); 13] = [
        (MinorType::Argb32, VideoEncoding::Bgra),
        (MinorType::Rgb32, VideoEncoding::Bgrx),
        (MinorType::Rgb24, VideoEncoding::Bgr),
        (MinorType::Rgb555, VideoEncoding::Rgb15),
        (MinorType::Rgb565, VideoEncoding::Rgb16),
        (MinorType::Ayuv, VideoEncoding::Ayuv),
        (MinorType::I420, VideoEncoding::I420),
        (MinorType::Nv12, VideoEncoding::Nv12),
        (MinorType::Uyvy, VideoEncoding::Uyvy),
        (MinorType::Yuy2, VideoEncoding::Yuy2),
        (MinorType::Yv12, VideoEncoding::Yv12),
        (MinorType::Yvyu, VideoEncoding::Yvyu),
        (MinorType::Cinepak, VideoEncoding::Cinepak),
    ];

    let FormatPayload::Video(ref video) = descriptor.payload else {
        return None;
    };

    let encoding = VIDEO_MAP
        .iter()
        .find(|(minor, _)| *minor == descriptor.minor)
        .map(|(_, encoding)| *encoding)?;

    // The frame rate is carried as a tick count per frame; express it as
    // ticks-per-second over ticks-per-frame so the tick count survives a
    // round trip exactly.
    Some(ElementaryFormat::Video(VideoFormat {
        encoding,
        width: video.width,
        height: video.height,
        fps_n: u32::try_from(TICKS_PER_SECOND).unwrap_or(u32::MAX),
        fps_d: u32::try_from(video.avg_time_per_frame).unwrap_or(0),
    }))
}

/// Recover an elementary format from a downstream descriptor
///
/// Returns `None` for descriptors the engine cannot be asked to produce.
pub fn elementary_from_descriptor(descriptor: &TypeDescriptor) -> Option<ElementaryFormat> {
    match descriptor.major {
        MajorType::Audio => elementary_from_audio(descriptor),
        MajorType::Video => elementary_from_video(descriptor),
        MajorType::Stream => None,
    }
}

/// Delivery buffer size for a negotiated descriptor
///
/// Video uses the image size, PCM/float audio one second of data, and
/// everything else a fixed fallback.
pub(crate) fn delivery_buffer_size(descriptor: &TypeDescriptor) -> usize {
    match descriptor.payload {
        FormatPayload::Video(ref video) => video.image_size as usize,
        FormatPayload::Wave(ref wave) => wave.avg_bytes_per_sec as usize,
        FormatPayload::WaveExtensible(ref ext) => ext.format.avg_bytes_per_sec as usize,
        _ => 16384,
    }
}
