//! Brook Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for
//! the Brook demultiplexing bridge.
//!
//! The core crate defines:
//! - **Stream Types**: `ElementaryFormat`, `TypeDescriptor`, `EngineEvent`
//! - **Collaborator Traits**: `ByteSource`, `ParsingEngine`, `StreamSink`,
//!   `ByteRequester`
//! - **Error Handling**: Unified `BridgeError` and `Result` types
//!
//! The bridge itself lives in `brook-bridge`; this crate only describes the
//! seams it plugs into.

#![forbid(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{BridgeError, Result, SinkError};
pub use traits::{
    ByteRequester, ByteSource, DeliveryBuffer, ParsingEngine, SampleFlags, SampleTimes, StreamSink,
};

pub use descriptor::{
    Compression, FormatPayload, MajorType, MinorType, Mpeg1AudioFormat, MpegLayer3Format,
    TypeDescriptor, VideoInfoFormat, WaveFormat, WaveFormatExtensible,
};
pub use types::{
    AudioEncoding, AudioFormat, ElementaryFormat, EngineBuffer, EngineEvent, Positioning,
    QualityKind, QualityReport, ReadOutcome, ReferenceTime, StreamId, VideoEncoding, VideoFormat,
    TICKS_PER_SECOND,
};
