//! Signing pipeline
//!
//! One registry, one vault, one reassembly buffer and at most one pending
//! [`SigningRequest`]. Scans arrive frame by frame; a completed payload is
//! either a metadata update or a signing request, which is decoded and
//! turned into cards for review. Approval signs the request's raw bytes and
//! hands back the outbound QR frames.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::Serialize;

use crate::cards::{self, AuthorInfo, CardContext, CardKind, TransactionCard};
use crate::decoder::decode_transaction;
use crate::error::{SignerError, SignerResult};
use crate::metadata::{InsertOutcome, MetadataRecord, MetadataRegistry};
use crate::qr::{fragment_bytes, FrameDecoder, ScanResult};
use crate::signing::{parse_envelope, SignedOutput, SigningEngine, SigningRequest};
use crate::types::{ChainId, Encryption};
use crate::utils::settings::SignerSettings;
use crate::vault::{AuthProof, DerivedKey, Vault, VaultHandle};
use crate::{log_debug, log_info, log_warn};

/// Scanned payload carrying a SCALE metadata blob
pub const METADATA_UPDATE_PREFIX: [u8; 3] = [0x53, 0xff, 0x80];

/// What a scanned frame produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ScanOutcome {
    /// More frames needed
    Partial {
        received: usize,
        total: usize,
        progress: f32,
    },
    /// Cards for review; `request_id` is set when the payload can be signed
    #[serde(rename_all = "camelCase")]
    Transaction {
        request_id: Option<u64>,
        cards: Vec<TransactionCard>,
    },
    #[serde(rename_all = "camelCase")]
    MetadataImported {
        chain_id: ChainId,
        spec_version: u32,
        already_present: bool,
    },
}

/// Signed output plus the wire frames of the outbound `MultiSignature`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    #[serde(flatten)]
    pub output: SignedOutput,
    /// Hex wire bytes, frame 0 first
    pub frames: Vec<String>,
}

pub struct Signer {
    settings: SignerSettings,
    registry: RwLock<MetadataRegistry>,
    engine: SigningEngine,
    scanner: Mutex<FrameDecoder>,
    active: Mutex<Option<SigningRequest>>,
    next_request_id: AtomicU64,
}

impl Signer {
    pub fn new(registry: MetadataRegistry, vault: Vault, settings: SignerSettings) -> Self {
        let engine = SigningEngine::new(Arc::new(vault), settings.signing_hash_threshold);
        Self {
            scanner: Mutex::new(FrameDecoder::new(settings.reassembly_timeout)),
            registry: RwLock::new(registry),
            engine,
            active: Mutex::new(None),
            next_request_id: AtomicU64::new(1),
            settings,
        }
    }

    pub fn settings(&self) -> &SignerSettings {
        &self.settings
    }

    pub fn vault(&self) -> &Arc<Vault> {
        self.engine.vault()
    }

    fn active(&self) -> MutexGuard<'_, Option<SigningRequest>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scanner(&self) -> MutexGuard<'_, FrameDecoder> {
        self.scanner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_idle(&self) -> SignerResult<()> {
        match self.active().as_ref() {
            Some(request) if !request.is_resolved() => {
                Err(SignerError::busy("a signing request is awaiting a decision")
                    .with_details(format!("request {}", request.id)))
            }
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Feed one scanned frame. Rejected with `Busy` while a request is
    /// pending; codec errors discard the partial scan.
    pub fn scan_frame(&self, bytes: &[u8]) -> SignerResult<ScanOutcome> {
        self.ensure_idle()?;

        let result = self.scanner().receive_bytes(bytes)?;
        match result {
            ScanResult::Partial {
                received,
                total,
                progress,
            } => Ok(ScanOutcome::Partial {
                received,
                total,
                progress,
            }),
            ScanResult::Complete { payload } => self.process_payload(&payload),
        }
    }

    /// Drop any partially scanned sequence
    pub fn reset_scan(&self) {
        self.scanner().reset();
    }

    /// Handle a fully reassembled payload
    pub fn process_payload(&self, payload: &[u8]) -> SignerResult<ScanOutcome> {
        if let Some(blob) = payload.strip_prefix(&METADATA_UPDATE_PREFIX[..]) {
            return self.import_metadata_blob(blob);
        }
        self.ensure_idle()?;

        let (cards, request) = self.review(payload);
        let request_id = match request {
            Some(request) => {
                let id = request.id;
                let mut active = self.active();
                if active.as_ref().is_some_and(|current| !current.is_resolved()) {
                    return Err(SignerError::busy("a signing request is awaiting a decision"));
                }
                log_info!(
                    "pipeline",
                    "Signing request ready",
                    request = id,
                    chain = request.chain_id,
                    spec_version = request.spec_version,
                    author = hex::encode(&request.author)
                );
                *active = Some(request);
                Some(id)
            }
            None => None,
        };

        Ok(ScanOutcome::Transaction { request_id, cards })
    }

    /// Decode and build cards. Terminal errors become a single `Error` card
    /// and no request.
    fn review(&self, payload: &[u8]) -> (Vec<TransactionCard>, Option<SigningRequest>) {
        let envelope = match parse_envelope(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                log_warn!("pipeline", "Unreadable payload", error = e);
                return (cards::error_cards(&e), None);
            }
        };

        let registry = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let decoded = decode_transaction(
            &registry,
            &envelope.genesis,
            &envelope.call,
            &envelope.extensions,
            self.settings.max_decode_depth,
        );
        let tx = match decoded {
            Ok(tx) => tx,
            Err(e) => {
                log_warn!("pipeline", "Payload rejected", chain = envelope.genesis, error = e);
                return (cards::error_cards(&e), None);
            }
        };
        let record = match registry.lookup(&envelope.genesis, tx.extensions.spec_version) {
            Ok(record) => record,
            Err(e) => return (cards::error_cards(&e), None),
        };

        let author = self
            .vault()
            .find_key(&envelope.author)
            .map(|(seed_name, key)| AuthorInfo { seed_name, key });
        let ctx = CardContext {
            chain_id: envelope.genesis,
            specs: record.specs.clone(),
            newest_version: registry.newest_version(&envelope.genesis),
            author: author.clone(),
            encryption: envelope.encryption,
            call_type_name: call_type_name(&record),
        };
        drop(registry);

        let cards = cards::build(&tx, &ctx);
        let signable = cards.iter().all(|c| c.kind() != CardKind::Error);

        let request = match author {
            Some(author) if signable && author.key.encryption == envelope.encryption => {
                Some(SigningRequest::new(
                    self.next_request_id.fetch_add(1, Ordering::SeqCst),
                    &envelope,
                    tx.extensions.spec_version,
                    &author.seed_name,
                    &author.key,
                ))
            }
            _ => None,
        };
        log_debug!(
            "pipeline",
            "Cards built",
            cards = cards.len(),
            signable = request.is_some()
        );
        (cards, request)
    }

    /// The request awaiting a decision, if any
    pub fn active_request(&self) -> Option<SigningRequest> {
        self.active().clone()
    }

    // =========================================================================
    // Decision
    // =========================================================================

    /// Sign the active request. The lock is held for the whole attempt, so
    /// a concurrent `cancel` sees the outcome.
    pub fn approve(&self, request_id: u64, handle: &VaultHandle) -> SignerResult<Approval> {
        let mut active = self.active();
        let request = active
            .as_mut()
            .filter(|r| r.id == request_id)
            .ok_or_else(|| {
                SignerError::no_active_request(format!("no request with id {}", request_id))
            })?;

        let output = self.engine.approve(request, handle)?;
        let frames = fragment_bytes(&output.signature, self.settings.max_frame_size)?
            .iter()
            .map(hex::encode)
            .collect();
        Ok(Approval { output, frames })
    }

    /// Cancel the active request; refused once signing has started
    pub fn cancel(&self, request_id: u64) -> SignerResult<()> {
        let mut active = self.active();
        let request = active
            .as_mut()
            .filter(|r| r.id == request_id)
            .ok_or_else(|| {
                SignerError::no_active_request(format!("no request with id {}", request_id))
            })?;
        request.cancel()?;
        log_info!("pipeline", "Request cancelled", request = request_id);
        Ok(())
    }

    // =========================================================================
    // Vault
    // =========================================================================

    pub fn unlock(&self, proof: &AuthProof) -> SignerResult<VaultHandle> {
        Ok(self.vault().unlock(proof)?)
    }

    pub fn release(&self, handle: &VaultHandle) {
        self.vault().release(handle);
    }

    pub fn add_seed(
        &self,
        handle: &VaultHandle,
        seed_name: &str,
        phrase: &str,
    ) -> SignerResult<DerivedKey> {
        Ok(self.vault().add_seed(handle, seed_name, phrase)?)
    }

    pub fn derive(
        &self,
        handle: &VaultHandle,
        seed_name: &str,
        path: &str,
        encryption: Encryption,
    ) -> SignerResult<DerivedKey> {
        Ok(self.vault().derive_for(handle, seed_name, path, encryption)?)
    }

    pub fn export_vault(&self) -> SignerResult<String> {
        Ok(self.vault().export_json()?)
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub fn import_metadata(&self, record: MetadataRecord) -> SignerResult<InsertOutcome> {
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(registry.insert(record)?)
    }

    fn import_metadata_blob(&self, blob: &[u8]) -> SignerResult<ScanOutcome> {
        let record = MetadataRecord::from_blob(blob)?;
        let (chain_id, spec_version) = (record.chain_id, record.spec_version);
        let outcome = self.import_metadata(record)?;
        Ok(ScanOutcome::MetadataImported {
            chain_id,
            spec_version,
            already_present: outcome == InsertOutcome::AlreadyPresent,
        })
    }

    /// Stored versions of a chain, ascending
    pub fn metadata_versions(&self, chain_id: &ChainId) -> Vec<u32> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .versions(chain_id)
    }

    /// Registry in the bundled JSON layout
    pub fn export_metadata(&self) -> SignerResult<String> {
        Ok(self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_bundled_json()?)
    }
}

fn call_type_name(record: &MetadataRecord) -> Option<String> {
    record
        .resolve(record.call_type)
        .ok()
        .and_then(|entry| entry.name.clone())
}

/// Wire form of a metadata update QR payload
pub fn metadata_update_payload(record: &MetadataRecord) -> Vec<u8> {
    let mut out = METADATA_UPDATE_PREFIX.to_vec();
    out.extend(record.to_blob());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Card;
    use crate::crypto;
    use crate::error::ErrorCode;
    use crate::fixtures::{self, test_settings, TEST_PHRASE, TEST_PROOF};
    use crate::qr::fragment;

    const DEST: [u8; 32] = [0x8e; 32];

    struct Setup {
        signer: Signer,
        handle: VaultHandle,
        key: DerivedKey,
    }

    fn setup(versions: &[u32]) -> Setup {
        let settings = test_settings();
        let vault = Vault::create(&AuthProof::new(TEST_PROOF), &settings).unwrap();
        let signer = Signer::new(fixtures::westend_registry(versions), vault, settings);
        let handle = signer.unlock(&AuthProof::new(TEST_PROOF)).unwrap();
        signer.add_seed(&handle, "main", TEST_PHRASE).unwrap();
        let key = signer
            .derive(&handle, "main", "//westend", Encryption::Sr25519)
            .unwrap();
        Setup {
            signer,
            handle,
            key,
        }
    }

    fn transfer_payload(key: &DerivedKey, version: u32) -> Vec<u8> {
        let chain = fixtures::westend_chain();
        fixtures::signing_envelope(
            key.encryption,
            &key.public_key,
            &fixtures::transfer_call(DEST, 1_000_000_000_000),
            &fixtures::extensions(version, &chain),
        )
    }

    fn request_id(outcome: &ScanOutcome) -> Option<u64> {
        match outcome {
            ScanOutcome::Transaction { request_id, .. } => *request_id,
            _ => None,
        }
    }

    #[test]
    fn test_scan_approve_flow() {
        let s = setup(&[9430]);
        let payload = transfer_payload(&s.key, 9430);

        let outcome = s.signer.scan_frame(&payload).unwrap();
        let id = request_id(&outcome).unwrap();
        match &outcome {
            ScanOutcome::Transaction { cards, .. } => {
                assert_eq!(cards[0].kind(), CardKind::Author);
                assert!(cards.iter().any(|c| c.kind() == CardKind::Amount));
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let approval = s.signer.approve(id, &s.handle).unwrap();
        assert_eq!(approval.output.request_id, id);
        assert_eq!(approval.output.signature.len(), 65);
        assert!(!approval.frames.is_empty());

        let envelope = parse_envelope(&payload).unwrap();
        assert!(crypto::verify(
            Encryption::Sr25519,
            &s.key.public_key,
            &envelope.raw_payload(),
            &approval.output.signature[1..]
        )
        .unwrap());
    }

    #[test]
    fn test_same_path_under_each_scheme_is_signable() {
        let s = setup(&[9430]);
        let ed = s
            .signer
            .derive(&s.handle, "main", "//westend", Encryption::Ed25519)
            .unwrap();

        for key in [&s.key, &ed] {
            let payload = transfer_payload(key, 9430);
            let id = request_id(&s.signer.scan_frame(&payload).unwrap()).unwrap();
            let approval = s.signer.approve(id, &s.handle).unwrap();
            assert_eq!(approval.output.signature[0], key.encryption.to_byte());
            assert!(crypto::verify(
                key.encryption,
                &key.public_key,
                &parse_envelope(&payload).unwrap().raw_payload(),
                &approval.output.signature[1..]
            )
            .unwrap());
        }
    }

    #[test]
    fn test_ecdsa_flow() {
        let s = setup(&[9430]);
        let key = s
            .signer
            .derive(&s.handle, "main", "//westend", Encryption::Ecdsa)
            .unwrap();
        let payload = transfer_payload(&key, 9430);

        let outcome = s.signer.scan_frame(&payload).unwrap();
        match &outcome {
            ScanOutcome::Transaction { cards, .. } => match &cards[0].card {
                Card::Author {
                    encryption,
                    ethereum_address,
                    ..
                } => {
                    assert_eq!(*encryption, Encryption::Ecdsa);
                    assert!(ethereum_address.is_some());
                }
                other => panic!("expected author card, got {:?}", other),
            },
            other => panic!("unexpected outcome {:?}", other),
        }

        let id = request_id(&outcome).unwrap();
        let approval = s.signer.approve(id, &s.handle).unwrap();
        assert_eq!(approval.output.signature.len(), 66);
        assert!(crypto::verify(
            Encryption::Ecdsa,
            &key.public_key,
            &parse_envelope(&payload).unwrap().raw_payload(),
            &approval.output.signature[1..]
        )
        .unwrap());
    }

    #[test]
    fn test_second_approve_is_already_signed() {
        let s = setup(&[9430]);
        let id = request_id(&s.signer.scan_frame(&transfer_payload(&s.key, 9430)).unwrap()).unwrap();
        s.signer.approve(id, &s.handle).unwrap();

        let err = s.signer.approve(id, &s.handle).unwrap_err();
        assert_eq!(err.code, ErrorCode::AlreadySigned);
        assert_eq!(s.signer.vault().signatures_issued(), 1);
    }

    #[test]
    fn test_busy_while_pending() {
        let s = setup(&[9430]);
        let payload = transfer_payload(&s.key, 9430);
        let id = request_id(&s.signer.scan_frame(&payload).unwrap()).unwrap();

        let err = s.signer.scan_frame(&payload).unwrap_err();
        assert_eq!(err.code, ErrorCode::Busy);

        s.signer.cancel(id).unwrap();
        let next = s.signer.scan_frame(&payload).unwrap();
        assert!(request_id(&next).unwrap() > id);
    }

    #[test]
    fn test_cancel_then_approve() {
        let s = setup(&[9430]);
        let id = request_id(&s.signer.scan_frame(&transfer_payload(&s.key, 9430)).unwrap()).unwrap();
        s.signer.cancel(id).unwrap();

        let err = s.signer.approve(id, &s.handle).unwrap_err();
        assert_eq!(err.code, ErrorCode::Cancelled);
    }

    #[test]
    fn test_unknown_request_id() {
        let s = setup(&[9430]);
        let err = s.signer.cancel(99).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoActiveRequest);
    }

    #[test]
    fn test_missing_metadata_is_error_card() {
        let s = setup(&[9430]);
        let outcome = s.signer.scan_frame(&transfer_payload(&s.key, 9500)).unwrap();
        match outcome {
            ScanOutcome::Transaction { request_id, cards } => {
                assert_eq!(request_id, None);
                assert_eq!(cards.len(), 1);
                assert!(matches!(cards[0].card, Card::Error { .. }));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(s.signer.active_request().is_none());
    }

    #[test]
    fn test_unknown_author_not_signable() {
        let s = setup(&[9430]);
        let stranger = DerivedKey {
            public_key: vec![0x77; 32],
            ..s.key.clone()
        };
        let outcome = s.signer.scan_frame(&transfer_payload(&stranger, 9430)).unwrap();
        assert_eq!(request_id(&outcome), None);
    }

    #[test]
    fn test_stale_metadata_warning() {
        let s = setup(&[9420, 9430]);
        let outcome = s.signer.scan_frame(&transfer_payload(&s.key, 9420)).unwrap();
        match outcome {
            ScanOutcome::Transaction { request_id, cards } => {
                assert!(request_id.is_some());
                assert_eq!(cards[1].kind(), CardKind::Warning);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_multi_frame_scan() {
        let s = setup(&[9430]);
        let frames = fragment(&transfer_payload(&s.key, 9430), 40).unwrap();
        assert!(frames.len() > 2);

        let mut last = None;
        for frame in frames.iter().rev() {
            last = Some(s.signer.scan_frame(&frame.to_bytes()).unwrap());
        }
        assert!(request_id(&last.unwrap()).is_some());
    }

    #[test]
    fn test_scan_frame_mismatch_clears_buffer() {
        let s = setup(&[9430]);
        s.signer
            .scan_frame(&crate::qr::QrFrame::new(3, 0, vec![1]).to_bytes())
            .unwrap();
        let err = s
            .signer
            .scan_frame(&crate::qr::QrFrame::new(4, 1, vec![2]).to_bytes())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::FrameMismatch);
    }

    #[test]
    fn test_invalid_frame_discards_partial_scan() {
        let s = setup(&[9430]);
        s.signer
            .scan_frame(&crate::qr::QrFrame::new(3, 0, vec![1]).to_bytes())
            .unwrap();
        assert!(s.signer.scan_frame(&[0x00, 0x01]).is_err());

        // The next frame starts a new sequence
        let outcome = s
            .signer
            .scan_frame(&crate::qr::QrFrame::new(3, 1, vec![2]).to_bytes())
            .unwrap();
        assert!(matches!(
            outcome,
            ScanOutcome::Partial {
                received: 1,
                total: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_metadata_update_scan() {
        let s = setup(&[9430]);
        let payload = metadata_update_payload(&fixtures::westend_record(9440));

        let outcome = s.signer.scan_frame(&payload).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::MetadataImported {
                chain_id: fixtures::westend_chain(),
                spec_version: 9440,
                already_present: false
            }
        );
        assert_eq!(
            s.signer.metadata_versions(&fixtures::westend_chain()),
            vec![9430, 9440]
        );
    }

    #[test]
    fn test_approve_with_released_handle() {
        let s = setup(&[9430]);
        let id = request_id(&s.signer.scan_frame(&transfer_payload(&s.key, 9430)).unwrap()).unwrap();
        s.signer.release(&s.handle);

        let err = s.signer.approve(id, &s.handle).unwrap_err();
        assert_eq!(err.code, ErrorCode::VaultLocked);

        // Still pending: a fresh unlock can sign it
        let handle = s.signer.unlock(&AuthProof::new(TEST_PROOF)).unwrap();
        assert!(s.signer.approve(id, &handle).is_ok());
    }
}
