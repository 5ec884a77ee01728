//! Demultiplexing bridge between pull-based byte sources and a push-based
//! parsing engine
//!
//! A [`Bridge`] sits between two worlds with opposite data-flow models:
//! upstream, a synchronous [`brook_core::ByteSource`] that hands out bytes
//! on demand; downstream, an asynchronous [`brook_core::ParsingEngine`]
//! that pulls those bytes on its own schedule and pushes decoded samples
//! back. The bridge inverts the flow twice:
//!
//! ```text
//!   ByteSource  <--pull--  reader task  <--handshake--  engine
//!   StreamSink  <--push--  streaming task (per pin)  <--events--  engine
//! ```
//!
//! Reads cross threads through a single-slot rendezvous
//! handshake; decoded output crosses back through per-pin
//! streaming tasks that fetch engine events and deliver samples with
//! seek-adjusted timestamps. [`ContainerKind`] selects the probing and
//! negotiation behavior for the container family being played.

#![forbid(unsafe_code)]

mod bridge;
mod container;
pub mod format;
mod handshake;
mod pin;
pub mod qos;
mod reader;

pub use bridge::{Bridge, BridgeState};
pub use container::ContainerKind;
pub use format::{descriptor_from_elementary, elementary_from_descriptor};
