//! Signing engine
//!
//! Signs exactly what the request carries: the payload is rebuilt from the
//! request's raw bytes, never from anything shown to the user.

use std::sync::Arc;

use serde::Serialize;

use super::payload::{signed_extrinsic, signing_payload};
use super::request::SigningRequest;
use super::SignError;
use crate::decoder::Extensions;
use crate::serde_bytes::hex_vec;
use crate::vault::{Vault, VaultError, VaultHandle};
use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOutput {
    pub request_id: u64,
    /// SCALE `MultiSignature`
    #[serde(with = "hex_vec")]
    pub signature: Vec<u8>,
    #[serde(with = "hex_vec")]
    pub signed_extrinsic: Vec<u8>,
}

pub struct SigningEngine {
    vault: Arc<Vault>,
    hash_threshold: usize,
}

impl SigningEngine {
    pub fn new(vault: Arc<Vault>, hash_threshold: usize) -> Self {
        Self {
            vault,
            hash_threshold,
        }
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    pub fn approve(
        &self,
        request: &mut SigningRequest,
        handle: &VaultHandle,
    ) -> Result<SignedOutput, SignError> {
        request.start_signing()?;
        let result = self.sign(request, handle);
        request.finish_signing(result.is_ok());

        match &result {
            Ok(_) => log_info!(
                "signing",
                "Request signed",
                request = request.id,
                author = hex::encode(&request.author)
            ),
            Err(e) => log_warn!("signing", "Signing failed", request = request.id, error = e),
        }
        result
    }

    fn sign(
        &self,
        request: &SigningRequest,
        handle: &VaultHandle,
    ) -> Result<SignedOutput, SignError> {
        if !self.vault.is_unlocked(handle) {
            return Err(SignError::VaultLocked);
        }

        let extensions = Extensions::decode(request.extensions()).map_err(SignError::Payload)?;
        let payload = signing_payload(&request.raw_payload, self.hash_threshold);

        let signature = self
            .vault
            .sign(handle, &request.signing_key(), &payload)
            .map_err(|e| match e {
                VaultError::KeyMismatch => SignError::DerivationMismatch,
                VaultError::VaultLocked => SignError::VaultLocked,
                other => SignError::Vault(other),
            })?;

        Ok(SignedOutput {
            request_id: request.id,
            signature: signature.to_multi_signature(),
            signed_extrinsic: signed_extrinsic(
                &request.author,
                &signature,
                &extensions,
                request.call(),
            ),
        })
    }
}
