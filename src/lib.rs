//! Air-gapped Signer Core
//!
//! Offline core of a hardware signer that only talks to the outside world
//! through QR codes.
//!
//! # Architecture
//!
//! This crate provides:
//! - **qr**: Multi-frame QR fragmentation and reassembly
//! - **metadata**: Versioned chain type registries
//! - **decoder**: Registry-driven SCALE decoding of calls and extensions
//! - **cards**: Ordered display cards for user review
//! - **vault**: Encrypted seed storage, derivation and signing
//! - **signing**: Request lifecycle and signed extrinsic assembly
//! - **pipeline**: The single-request scan → review → approve flow
//! - **ffi**: C-ABI exports for the platform UI shells
//!
//! # FFI Usage
//!
//! All public FFI functions are in the `ffi` module and follow this pattern:
//! - Input: JSON string (null-terminated C string)
//! - Output: JSON string (must be freed with `signer_free_string`)
//!
//! # Security
//!
//! This crate uses `zeroize` to securely clear sensitive data from memory.
//! Seed phrases, derived secrets and key-encryption keys are zeroed when
//! dropped; the signature always covers the scanned bytes, never the cards.
//!
//! # Example
//!
//! ```rust,ignore
//! use airgap_signer::pipeline::{ScanOutcome, Signer};
//!
//! let signer = Signer::new(registry, vault, settings);
//! let handle = signer.unlock(&proof)?;
//! if let ScanOutcome::Transaction { request_id: Some(id), cards } = signer.scan_frame(&frame)? {
//!     // show cards, wait for the user
//!     let approval = signer.approve(id, &handle)?;
//! }
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod ffi;
pub mod utils;
pub mod serde_bytes;
pub mod fixtures;

// Components
pub mod address;
pub mod cards;
pub mod crypto;
pub mod decoder;
pub mod metadata;
pub mod pipeline;
pub mod qr;
pub mod signing;
pub mod vault;

// Re-export key types for convenience
pub use error::{ErrorCode, SignerError, SignerResult};
pub use types::*;

pub use pipeline::{Approval, ScanOutcome, Signer};

// Re-export FFI functions at crate root
pub use ffi::{
    signer_add_seed,
    signer_approve,
    signer_cancel,
    signer_derive,
    signer_export_vault,
    signer_free_string,
    signer_import_metadata,
    signer_init,
    signer_release,
    signer_reset_scan,
    signer_scan_frame,
    signer_shutdown,
    signer_unlock,
};
