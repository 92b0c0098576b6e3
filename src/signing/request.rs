//! Signing requests and their lifecycle
//!
//! `Pending -> Signing -> Signed`, or `Pending -> Cancelled`. A failed
//! signing attempt returns the request to `Pending`.

use serde::Serialize;

use super::envelope::Envelope;
use super::SignError;
use crate::serde_bytes::hex_vec;
use crate::types::{ChainId, Encryption};
use crate::vault::DerivedKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Signing,
    Signed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningRequest {
    pub id: u64,
    pub chain_id: ChainId,
    pub spec_version: u32,
    /// `call ++ extensions`
    #[serde(with = "hex_vec")]
    pub raw_payload: Vec<u8>,
    #[serde(skip)]
    call_len: usize,
    pub seed_name: String,
    pub derivation_path: String,
    #[serde(with = "hex_vec")]
    pub author: Vec<u8>,
    pub encryption: Encryption,
    pub has_pwd: bool,
    pub state: RequestState,
}

impl SigningRequest {
    /// Request for an envelope whose author is `key` under `seed_name`
    pub fn new(
        id: u64,
        envelope: &Envelope,
        spec_version: u32,
        seed_name: &str,
        key: &DerivedKey,
    ) -> Self {
        Self {
            id,
            chain_id: envelope.genesis,
            spec_version,
            raw_payload: envelope.raw_payload(),
            call_len: envelope.call.len(),
            seed_name: seed_name.to_string(),
            derivation_path: key.derivation_path.clone(),
            author: envelope.author.clone(),
            encryption: envelope.encryption,
            has_pwd: key.has_pwd,
            state: RequestState::Pending,
        }
    }

    pub fn call(&self) -> &[u8] {
        &self.raw_payload[..self.call_len]
    }

    pub fn extensions(&self) -> &[u8] {
        &self.raw_payload[self.call_len..]
    }

    /// The key the vault must re-derive to sign this request
    pub fn signing_key(&self) -> DerivedKey {
        DerivedKey {
            derivation_path: self.derivation_path.clone(),
            public_key: self.author.clone(),
            encryption: self.encryption,
            has_pwd: self.has_pwd,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    /// Signed or cancelled: no further decision possible
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, RequestState::Signed | RequestState::Cancelled)
    }

    /// Move to `Signing`; fails unless pending
    pub fn start_signing(&mut self) -> Result<(), SignError> {
        match self.state {
            RequestState::Pending => {
                self.state = RequestState::Signing;
                Ok(())
            }
            RequestState::Signing => Err(SignError::SigningInProgress),
            RequestState::Signed => Err(SignError::AlreadySigned),
            RequestState::Cancelled => Err(SignError::Cancelled),
        }
    }

    pub fn finish_signing(&mut self, succeeded: bool) {
        if self.state == RequestState::Signing {
            self.state = if succeeded {
                RequestState::Signed
            } else {
                RequestState::Pending
            };
        }
    }

    /// Honoured until signing starts. Cancelling twice is a no-op.
    pub fn cancel(&mut self) -> Result<(), SignError> {
        match self.state {
            RequestState::Pending | RequestState::Cancelled => {
                self.state = RequestState::Cancelled;
                Ok(())
            }
            RequestState::Signing => Err(SignError::SigningInProgress),
            RequestState::Signed => Err(SignError::AlreadySigned),
        }
    }
}
