//! Unlock handles
//!
//! An unlocked vault hands out opaque handles. Each live handle owns a copy of
//! the key-encryption key (wrapped in `secrecy`) and the optional secondary
//! secret from the unlock proof. Idle expiry is evaluated lazily whenever a
//! handle is used: an expired handle is removed and reports `VaultLocked`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretBox, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::cipher::KEY_LEN;
use super::secure_memory::SecureString;
use super::VaultError;

/// Opaque reference to an unlocked vault session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultHandle {
    pub id: u64,
}

struct HandleEntry {
    kek: SecretBox<[u8; KEY_LEN]>,
    secondary: Option<SecretString>,
    last_activity: Instant,
}

/// Secrets exposed to one vault call; wiped when dropped
pub(crate) struct Unlocked {
    pub kek: Zeroizing<[u8; KEY_LEN]>,
    pub secondary: Option<SecureString>,
}

pub(crate) struct HandleTable {
    entries: Mutex<HashMap<u64, HandleEntry>>,
    idle_timeout: Duration,
}

impl HandleTable {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, HandleEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn open(&self, kek: &[u8; KEY_LEN], secondary: Option<&str>) -> VaultHandle {
        let mut entries = self.entries();
        let mut id = OsRng.next_u64();
        while entries.contains_key(&id) {
            id = OsRng.next_u64();
        }
        entries.insert(
            id,
            HandleEntry {
                kek: SecretBox::new(Box::new(*kek)),
                secondary: secondary.map(|s| SecretString::from(s.to_string())),
                last_activity: Instant::now(),
            },
        );
        VaultHandle { id }
    }

    /// Validate a handle, refresh its activity time and expose its secrets
    pub fn touch(&self, handle: &VaultHandle) -> Result<Unlocked, VaultError> {
        let mut entries = self.entries();
        let expired = match entries.get(&handle.id) {
            None => return Err(VaultError::VaultLocked),
            Some(entry) => entry.last_activity.elapsed() > self.idle_timeout,
        };
        if expired {
            entries.remove(&handle.id);
            return Err(VaultError::VaultLocked);
        }

        let entry = entries
            .get_mut(&handle.id)
            .ok_or(VaultError::VaultLocked)?;
        entry.last_activity = Instant::now();
        Ok(Unlocked {
            kek: Zeroizing::new(*entry.kek.expose_secret()),
            secondary: entry
                .secondary
                .as_ref()
                .map(|s| SecureString::new(s.expose_secret())),
        })
    }

    pub fn is_active(&self, handle: &VaultHandle) -> bool {
        let mut entries = self.entries();
        let active = entries
            .get(&handle.id)
            .map(|entry| entry.last_activity.elapsed() <= self.idle_timeout)
            .unwrap_or(false);
        if !active {
            entries.remove(&handle.id);
        }
        active
    }

    pub fn release(&self, handle: &VaultHandle) -> bool {
        self.entries().remove(&handle.id).is_some()
    }

    pub fn release_all(&self) {
        self.entries().clear();
    }

    #[cfg(test)]
    fn active_count(&self) -> usize {
        let mut entries = self.entries();
        entries.retain(|_, entry| entry.last_activity.elapsed() <= self.idle_timeout);
        entries.len()
    }
}
