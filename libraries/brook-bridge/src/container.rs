//! Container kinds
//!
//! One bridge instance serves one container flavor, fixed at construction.
//! The kind decides which byte sources are acceptable, how output pins are
//! enumerated and named, and which downstream types a pin offers during
//! negotiation.

use crate::format::{descriptor_from_elementary, elementary_from_descriptor, VIDEO_CANDIDATES};
use brook_core::{
    AudioEncoding, AudioFormat, ElementaryFormat, MajorType, MinorType, TypeDescriptor, VideoFormat,
};

/// Container flavor served by a bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Generic demuxer-plus-decoder; accepts any stream source and
    /// negotiates freely
    DecodeBin,
    /// RIFF WAVE parser; single output pin, exact-type negotiation
    Wave,
    /// AVI splitter; one pin per stream, exact-type negotiation
    Avi,
    /// MPEG-1 audio splitter; single output pin, exact-type negotiation
    MpegAudio,
}

impl ContainerKind {
    /// Whether the byte source's declared content is acceptable
    pub(crate) fn accepts_source(self, descriptor: &TypeDescriptor) -> bool {
        if descriptor.major != MajorType::Stream {
            return false;
        }
        match self {
            ContainerKind::DecodeBin => true,
            ContainerKind::Wave => descriptor.minor == MinorType::Wave,
            ContainerKind::Avi => descriptor.minor == MinorType::Avi,
            ContainerKind::MpegAudio => descriptor.minor == MinorType::Mpeg1Audio,
        }
    }

    /// Whether the kind exposes a single pin regardless of stream count
    pub(crate) fn single_stream(self) -> bool {
        matches!(self, ContainerKind::Wave | ContainerKind::MpegAudio)
    }

    /// Downstream-visible name of the pin at `index`
    pub(crate) fn pin_name(self, index: u32) -> String {
        match self {
            ContainerKind::DecodeBin | ContainerKind::Avi => format!("Stream {index:02}"),
            ContainerKind::Wave => "output".to_string(),
            ContainerKind::MpegAudio => "Audio".to_string(),
        }
    }

    /// Whether a candidate descriptor is acceptable for a pin whose engine
    /// preference is `preferred`
    pub(crate) fn accepts_type(
        self,
        preferred: &ElementaryFormat,
        candidate: &TypeDescriptor,
    ) -> bool {
        match self {
            // At least make sure the engine can be asked to produce it.
            ContainerKind::DecodeBin => elementary_from_descriptor(candidate).is_some(),
            // Parsed containers pass data through; only the exact
            // preferred type is acceptable.
            _ => descriptor_from_elementary(preferred).as_ref() == Some(candidate),
        }
    }

    /// Enumerate the candidate descriptors a pin offers, best first
    ///
    /// The preferred format, when expressible, is index 0. DecodeBin then
    /// offers conversion targets: the fixed video candidate list, or a
    /// single S16LE fallback for audio. The parsed kinds offer nothing
    /// beyond the preferred type.
    pub(crate) fn media_type(
        self,
        preferred: &ElementaryFormat,
        index: usize,
    ) -> Option<TypeDescriptor> {
        let mut index = index;
        if let Some(descriptor) = descriptor_from_elementary(preferred) {
            if index == 0 {
                return Some(descriptor);
            }
            index -= 1;
        }

        if self != ContainerKind::DecodeBin {
            return None;
        }

        match preferred {
            ElementaryFormat::Video(video) => {
                let encoding = VIDEO_CANDIDATES.get(index)?;
                descriptor_from_elementary(&ElementaryFormat::Video(VideoFormat {
                    encoding: *encoding,
                    ..*video
                }))
            }
            ElementaryFormat::Audio(audio) if index == 0 => {
                descriptor_from_elementary(&ElementaryFormat::Audio(AudioFormat {
                    encoding: AudioEncoding::S16Le,
                    ..*audio
                }))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brook_core::VideoEncoding;

    fn video_preference() -> ElementaryFormat {
        ElementaryFormat::Video(VideoFormat {
            encoding: VideoEncoding::Nv12,
            width: 640,
            height: 480,
            fps_n: 25,
            fps_d: 1,
        })
    }

    #[test]
    fn source_acceptance_by_kind() {
        let wave = TypeDescriptor::stream(MinorType::Wave);
        let avi = TypeDescriptor::stream(MinorType::Avi);
        let unspecified = TypeDescriptor::stream(MinorType::UnspecifiedStream);

        assert!(ContainerKind::DecodeBin.accepts_source(&wave));
        assert!(ContainerKind::DecodeBin.accepts_source(&unspecified));
        assert!(ContainerKind::Wave.accepts_source(&wave));
        assert!(!ContainerKind::Wave.accepts_source(&avi));
        assert!(ContainerKind::Avi.accepts_source(&avi));
        assert!(!ContainerKind::Avi.accepts_source(&unspecified));
    }

    #[test]
    fn non_stream_source_is_rejected() {
        let mut descriptor = TypeDescriptor::stream(MinorType::Wave);
        descriptor.major = MajorType::Audio;
        assert!(!ContainerKind::DecodeBin.accepts_source(&descriptor));
    }

    #[test]
    fn decodebin_offers_preferred_then_candidates() {
        let preferred = video_preference();

        let first = ContainerKind::DecodeBin.media_type(&preferred, 0).unwrap();
        assert_eq!(first.minor, MinorType::Nv12);

        // Candidate list follows, YUV first.
        let second = ContainerKind::DecodeBin.media_type(&preferred, 1).unwrap();
        assert_eq!(second.minor, MinorType::Ayuv);

        // 1 preferred + 12 candidates, then exhausted.
        assert!(ContainerKind::DecodeBin.media_type(&preferred, 13).is_none());
    }

    #[test]
    fn parsed_kinds_offer_only_the_preferred_type() {
        let preferred = ElementaryFormat::Audio(AudioFormat {
            encoding: AudioEncoding::S16Le,
            channels: 2,
            rate: 44100,
        });

        assert!(ContainerKind::Wave.media_type(&preferred, 0).is_some());
        assert!(ContainerKind::Wave.media_type(&preferred, 1).is_none());
    }

    #[test]
    fn decodebin_audio_offers_s16le_fallback() {
        let preferred = ElementaryFormat::Audio(AudioFormat {
            encoding: AudioEncoding::F32Le,
            channels: 2,
            rate: 48000,
        });

        let fallback = ContainerKind::DecodeBin.media_type(&preferred, 1).unwrap();
        assert_eq!(fallback.minor, MinorType::Pcm);
        assert!(ContainerKind::DecodeBin.media_type(&preferred, 2).is_none());
    }

    #[test]
    fn exact_negotiation_rejects_other_types() {
        let preferred = ElementaryFormat::Audio(AudioFormat {
            encoding: AudioEncoding::S16Le,
            channels: 2,
            rate: 44100,
        });
        let exact = descriptor_from_elementary(&preferred).unwrap();
        let other = descriptor_from_elementary(&ElementaryFormat::Audio(AudioFormat {
            encoding: AudioEncoding::S16Le,
            channels: 2,
            rate: 48000,
        }))
        .unwrap();

        assert!(ContainerKind::Wave.accepts_type(&preferred, &exact));
        assert!(!ContainerKind::Wave.accepts_type(&preferred, &other));
        assert!(ContainerKind::DecodeBin.accepts_type(&preferred, &other));
    }
}
