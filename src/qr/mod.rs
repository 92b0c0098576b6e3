//! QR Airgap Codec
//!
//! Byte payloads cross the air gap as a sequence of QR frames:
//! - outbound data is split with [`fragment`]
//! - inbound frames are joined with [`reassemble`] or, one scan at a time,
//!   with a [`FrameDecoder`]
//!
//! # Usage
//! ```rust,ignore
//! use airgap_signer::qr::{fragment, FrameDecoder, ScanResult};
//!
//! let frames = fragment(&signature, 1024)?;
//!
//! let mut decoder = FrameDecoder::new(Duration::from_secs(120));
//! for scanned in camera_frames {
//!     if let ScanResult::Complete { payload } = decoder.receive_bytes(&scanned)? {
//!         break;
//!     }
//! }
//! ```

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::{reassemble, FrameDecoder};
pub use encoder::{fragment, fragment_bytes};
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("incomplete sequence: received {received}/{total} frames")]
    IncompleteSequence { received: usize, total: usize },

    #[error("frame count mismatch: expected {expected}, found {found}")]
    FrameMismatch { expected: u16, found: u16 },

    #[error("frame {index} scanned twice with different content")]
    ConflictingFrame { index: u16 },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("scan expired before all frames arrived")]
    Expired,

    #[error("frame size {0} too small")]
    InvalidFrameSize(usize),

    #[error("payload of {0} bytes needs more than 65535 frames")]
    PayloadTooLarge(usize),
}

pub type CodecResult<T> = Result<T, CodecError>;
