//! Secure Memory Utilities
//!
//! Buffers for secret material:
//! - zeroization on drop
//! - constant-time comparison
//! - redacted `Debug` output

use std::fmt;
use std::ops::Deref;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A buffer that zeroizes its contents when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecureBuffer {
    data: Vec<u8>,
}

impl SecureBuffer {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }

    /// Take ownership of a Vec without copying it
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Constant-time equality
    pub fn ct_eq(&self, other: &[u8]) -> bool {
        secure_compare(&self.data, other)
    }
}

impl Deref for SecureBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl Clone for SecureBuffer {
    fn clone(&self) -> Self {
        Self::from_bytes(&self.data)
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}

/// A UTF-8 string that zeroizes its contents when dropped
#[derive(Clone)]
pub struct SecureString {
    inner: SecureBuffer,
}

impl SecureString {
    pub fn new(s: &str) -> Self {
        Self {
            inner: SecureBuffer::from_bytes(s.as_bytes()),
        }
    }

    pub fn from_string(s: String) -> Self {
        Self {
            inner: SecureBuffer::from_vec(s.into_bytes()),
        }
    }

    pub fn as_str(&self) -> &str {
        // Only ever built from &str or String
        std::str::from_utf8(&self.inner).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("len", &self.inner.len())
            .finish()
    }
}

/// Constant-time comparison; unequal lengths are unequal
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Redact bytes for logging
pub fn redact_bytes(data: &[u8]) -> String {
    if data.len() <= 8 {
        return "****".to_string();
    }
    format!(
        "{}...{}",
        hex::encode(&data[..4]),
        hex::encode(&data[data.len() - 4..])
    )
}
