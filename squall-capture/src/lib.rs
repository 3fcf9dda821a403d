#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! The capture provider seam: the [`PacketCapture`] trait abstracts the
//! OS-level interception driver (receive, send, shutdown, checksums), and
//! [`MemoryCapture`] is an in-process loopback implementation used by tests,
//! benches and demos.

use thiserror::Error;

mod checksum;
mod log;
mod memory;
mod metadata;

pub use checksum::calculate_checksums;
pub use log::{LogCode, LogLevel, NullLogger, PacketLogEntry, PacketLogger, RingLogger, TracingLogger};
pub use memory::MemoryCapture;
pub use metadata::{PacketMetadata, DIRECTION_INBOUND, DIRECTION_OUTBOUND};

/// Maximum accepted length for a capture filter expression.
pub const MAX_FILTER_LEN: usize = 1024;

/// Failure modes of a capture provider. Closed set: providers must map their
/// native error codes onto these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("invalid filter expression")]
    InvalidFilter,
    #[error("capture handle is invalid or closed")]
    InvalidHandle,
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("operation aborted by shutdown")]
    OperationAborted,
    #[error("element not found")]
    ElementNotFound,
    #[error("buffer too small for packet")]
    BufferTooSmall,
    #[error("unknown capture error")]
    Unknown,
}

/// Result alias for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Outcome of a successful batch receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    /// Total bytes written into the batch buffer.
    pub total_bytes: usize,
    /// Number of packets in the batch.
    pub packets: usize,
}

/// A raw packet I/O provider.
///
/// All methods take `&self`: real interception drivers hand out handles that
/// are safe to use concurrently, and [`PacketCapture::shutdown`] must be
/// callable from another thread to unblock a pending receive.
pub trait PacketCapture: Send + Sync {
    /// Opens the capture with the given filter expression.
    fn open(&self, filter: &str) -> CaptureResult<()>;

    /// Receives a single packet into `buffer`, blocking until one arrives or
    /// the handle is shut down. Returns the packet length and fills
    /// `metadata`.
    fn receive(&self, buffer: &mut [u8], metadata: &mut PacketMetadata) -> CaptureResult<usize>;

    /// Receives a batch of tightly-packed packets into `buffer`, one
    /// metadata slot per packet (`batch_length` carries each packet's byte
    /// length). Blocks until at least one packet arrives or the handle is
    /// shut down. At most `metadata.len()` packets are returned.
    fn receive_batch(
        &self,
        buffer: &mut [u8],
        metadata: &mut [PacketMetadata],
    ) -> CaptureResult<BatchInfo>;

    /// Sends one packet.
    fn send(&self, packet: &[u8], metadata: &mut PacketMetadata) -> CaptureResult<()>;

    /// Unblocks pending receives and marks the handle closed for I/O.
    fn shutdown(&self);

    /// Recomputes IPv4/TCP/UDP checksums in place and updates the metadata
    /// checksum-validity flags.
    fn calculate_checksums(&self, packet: &mut [u8], metadata: &mut PacketMetadata);
}

/// Shared handles are providers too, so a test or composition root can keep
/// a reference to the capture it hands to the engine.
impl<T: PacketCapture + ?Sized> PacketCapture for std::sync::Arc<T> {
    fn open(&self, filter: &str) -> CaptureResult<()> {
        (**self).open(filter)
    }

    fn receive(&self, buffer: &mut [u8], metadata: &mut PacketMetadata) -> CaptureResult<usize> {
        (**self).receive(buffer, metadata)
    }

    fn receive_batch(
        &self,
        buffer: &mut [u8],
        metadata: &mut [PacketMetadata],
    ) -> CaptureResult<BatchInfo> {
        (**self).receive_batch(buffer, metadata)
    }

    fn send(&self, packet: &[u8], metadata: &mut PacketMetadata) -> CaptureResult<()> {
        (**self).send(packet, metadata)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }

    fn calculate_checksums(&self, packet: &mut [u8], metadata: &mut PacketMetadata) {
        (**self).calculate_checksums(packet, metadata)
    }
}
