//! FFI layer for the signer core
//!
//! All C-ABI exports are defined here. This is the ONLY file that should
//! contain `extern "C"` functions. All functions follow a consistent pattern:
//! - Input: JSON string (null-terminated C string)
//! - Output: JSON string (must be freed with `signer_free_string`)
//!
//! Error handling: All functions return JSON with `success` field.
//! On error, `success: false` and `error` object is populated.
//!
//! State: one process-wide [`Signer`], created by `signer_init` and dropped
//! by `signer_shutdown`.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{SignerError, SignerResult};
use crate::metadata::{InsertOutcome, MetadataRegistry};
use crate::pipeline::Signer;
use crate::types::{ApiResponse, Encryption};
use crate::utils::crypto::unhex;
use crate::utils::settings::{SecurityLevel, SignerSettings};
use crate::vault::{AuthProof, Vault, VaultHandle, VaultState};
use crate::{log_info, log_warn};

static SIGNER: RwLock<Option<Arc<Signer>>> = RwLock::new(None);

// =============================================================================
// Memory Management
// =============================================================================

/// Free a string returned by any signer_* function
///
/// # Safety
/// The pointer must have been returned by a signer_* function
#[unsafe(no_mangle)]
pub extern "C" fn signer_free_string(s: *mut c_char) {
    if s.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(s);
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Convert C string to Rust string, returning error JSON if invalid
fn parse_input(input: *const c_char) -> Result<String, *mut c_char> {
    if input.is_null() {
        return Err(error_response(SignerError::invalid_input("Null input pointer")));
    }

    let c_str = unsafe { CStr::from_ptr(input) };
    match c_str.to_str() {
        Ok(s) => Ok(s.to_string()),
        Err(_) => Err(error_response(SignerError::invalid_input("Invalid UTF-8 string"))),
    }
}

/// Parse the JSON request body
fn parse_request<T: DeserializeOwned>(input: *const c_char) -> Result<T, *mut c_char> {
    let json_str = parse_input(input)?;
    serde_json::from_str(&json_str)
        .map_err(|e| error_response(SignerError::parse_error(format!("Invalid JSON: {}", e))))
}

/// Create a success response JSON string
fn success_response<T: Serialize>(data: T) -> *mut c_char {
    let response = ApiResponse::ok(data);
    string_to_ptr(response.to_json())
}

/// Create an error response JSON string
fn error_response(error: SignerError) -> *mut c_char {
    let response: ApiResponse<()> = ApiResponse::err(error);
    string_to_ptr(response.to_json())
}

fn respond<T: Serialize>(result: SignerResult<T>) -> *mut c_char {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_response(e),
    }
}

/// Convert Rust string to C string pointer
fn string_to_ptr(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_str) => c_str.into_raw(),
        Err(_) => {
            // Interior NUL: fall back to a fixed error body
            let fallback: &[u8] =
                b"{\"success\":false,\"error\":{\"code\":\"internal\",\"message\":\"String conversion failed\"}}\0";
            match CStr::from_bytes_with_nul(fallback) {
                Ok(c) => c.to_owned().into_raw(),
                Err(_) => std::ptr::null_mut(),
            }
        }
    }
}

/// Run `f` against the initialised signer
fn with_signer<T: Serialize>(f: impl FnOnce(&Signer) -> SignerResult<T>) -> *mut c_char {
    let signer = SIGNER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match signer {
        Some(signer) => respond(f(&signer)),
        None => error_response(SignerError::invalid_input(
            "Signer not initialised; call signer_init first",
        )),
    }
}

#[derive(Serialize)]
struct Empty {}

// =============================================================================
// Lifecycle
// =============================================================================

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct InitRequest {
    #[zeroize(skip)]
    #[serde(default)]
    level: Option<SecurityLevel>,
    #[zeroize(skip)]
    #[serde(default)]
    settings: Option<SignerSettings>,
    /// Required when no vault state is given
    #[serde(default)]
    proof: Option<String>,
    #[zeroize(skip)]
    #[serde(default)]
    vault_state: Option<VaultState>,
    /// Bundled metadata store (JSON array of records)
    #[zeroize(skip)]
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InitResponse {
    seeds: Vec<String>,
    metadata_records: usize,
    warnings: Vec<String>,
}

/// Create the process-wide signer, replacing any previous one
///
/// # Input
/// ```json
/// {
///   "level": "standard",
///   "proof": "platform passcode token",
///   "vaultState": { ... },
///   "metadata": [ ... ]
/// }
/// ```
///
/// `settings` (full settings object) overrides `level`. With `vaultState`
/// the vault is restored; otherwise a new one is created under `proof`.
#[unsafe(no_mangle)]
pub extern "C" fn signer_init(input: *const c_char) -> *mut c_char {
    let request: InitRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    respond(init(&request))
}

fn init(request: &InitRequest) -> SignerResult<InitResponse> {
    let settings = match &request.settings {
        Some(settings) => {
            settings.check()?;
            settings.clone()
        }
        None => SignerSettings::for_level(request.level.unwrap_or(SecurityLevel::Standard)),
    };

    let registry = match &request.metadata {
        Some(value) => MetadataRegistry::load_bundled(&value.to_string())?,
        None => MetadataRegistry::new(),
    };

    let vault = match (&request.vault_state, &request.proof) {
        (Some(state), _) => Vault::from_state(state.clone(), &settings)?,
        (None, Some(proof)) => Vault::create(&AuthProof::new(proof.as_bytes()), &settings)?,
        (None, None) => {
            return Err(SignerError::invalid_input(
                "either vaultState or proof is required",
            ))
        }
    };

    let response = InitResponse {
        seeds: vault.seed_names(),
        metadata_records: registry.len(),
        warnings: settings.validate(),
    };
    for warning in &response.warnings {
        log_warn!("ffi", "Weak settings", warning = warning);
    }

    let signer = Signer::new(registry, vault, settings);
    *SIGNER.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(signer));
    log_info!("ffi", "Signer initialised", seeds = response.seeds.len());
    Ok(response)
}

/// Lock every handle and drop the signer
#[unsafe(no_mangle)]
pub extern "C" fn signer_shutdown() -> *mut c_char {
    let previous = SIGNER.write().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(signer) = previous {
        signer.vault().release_all();
        log_info!("ffi", "Signer shut down");
    }
    success_response(Empty {})
}

// =============================================================================
// Metadata
// =============================================================================

#[derive(Deserialize)]
struct ImportMetadataRequest {
    /// Hex SCALE metadata blob
    blob: String,
}

#[derive(Serialize)]
struct ImportMetadataResponse {
    inserted: bool,
}

/// Import a SCALE metadata blob
///
/// # Input
/// ```json
/// { "blob": "0x..." }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn signer_import_metadata(input: *const c_char) -> *mut c_char {
    let request: ImportMetadataRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| {
        let blob = unhex(&request.blob)?;
        let record = crate::metadata::MetadataRecord::from_blob(&blob)?;
        let outcome = signer.import_metadata(record)?;
        Ok(ImportMetadataResponse {
            inserted: outcome == InsertOutcome::Inserted,
        })
    })
}

// =============================================================================
// Vault
// =============================================================================

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
struct UnlockRequest {
    proof: String,
    /// Password for password-protected paths
    #[serde(default)]
    secondary: Option<String>,
}

/// Unlock the vault
///
/// # Input
/// ```json
/// { "proof": "...", "secondary": "optional path password" }
/// ```
///
/// # Output
/// `{ "success": true, "data": { "id": 1 } }`
#[unsafe(no_mangle)]
pub extern "C" fn signer_unlock(input: *const c_char) -> *mut c_char {
    let request: UnlockRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| {
        let mut proof = AuthProof::new(request.proof.as_bytes());
        if let Some(secondary) = &request.secondary {
            proof = proof.with_secondary(secondary);
        }
        signer.unlock(&proof)
    })
}

#[derive(Deserialize)]
struct HandleRequest {
    handle: VaultHandle,
}

#[unsafe(no_mangle)]
pub extern "C" fn signer_release(input: *const c_char) -> *mut c_char {
    let request: HandleRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| {
        signer.release(&request.handle);
        Ok(Empty {})
    })
}

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct AddSeedRequest {
    #[zeroize(skip)]
    handle: VaultHandle,
    seed_name: String,
    phrase: String,
}

/// Store a BIP-39 seed; returns its root sr25519 key
///
/// # Input
/// ```json
/// { "handle": { "id": 1 }, "seedName": "main", "phrase": "word1 word2 ..." }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn signer_add_seed(input: *const c_char) -> *mut c_char {
    let request: AddSeedRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| signer.add_seed(&request.handle, &request.seed_name, &request.phrase))
}

#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
struct DeriveRequest {
    #[zeroize(skip)]
    handle: VaultHandle,
    #[zeroize(skip)]
    seed_name: String,
    /// May carry a `///password` suffix
    path: String,
    #[zeroize(skip)]
    #[serde(default = "default_encryption")]
    encryption: Encryption,
}

fn default_encryption() -> Encryption {
    Encryption::Sr25519
}

/// Derive and record a key
///
/// # Input
/// ```json
/// { "handle": { "id": 1 }, "seedName": "main", "path": "//westend", "encryption": "sr25519" }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn signer_derive(input: *const c_char) -> *mut c_char {
    let request: DeriveRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| {
        signer.derive(
            &request.handle,
            &request.seed_name,
            &request.path,
            request.encryption,
        )
    })
}

/// Persistable vault state (sealed seeds and public derivation info)
#[unsafe(no_mangle)]
pub extern "C" fn signer_export_vault() -> *mut c_char {
    with_signer(|signer| Ok(signer.vault().export_state()))
}

// =============================================================================
// Scanning and Signing
// =============================================================================

#[derive(Deserialize)]
struct ScanRequest {
    /// Hex bytes of one scanned QR frame
    frame: String,
}

/// Feed one scanned frame
///
/// # Output
/// ```json
/// { "success": true, "data": { "status": "partial", "received": 1, "total": 3, "progress": 0.33 } }
/// { "success": true, "data": { "status": "transaction", "requestId": 1, "cards": [ ... ] } }
/// { "success": true, "data": { "status": "metadataImported", "chainId": "0x...", ... } }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn signer_scan_frame(input: *const c_char) -> *mut c_char {
    let request: ScanRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| {
        let frame = unhex(&request.frame)?;
        signer.scan_frame(&frame)
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    request_id: u64,
    handle: VaultHandle,
}

/// Sign the active request
///
/// # Output
/// ```json
/// { "success": true, "data": { "requestId": 1, "signature": "0x01...", "signedExtrinsic": "0x...", "frames": ["00..."] } }
/// ```
#[unsafe(no_mangle)]
pub extern "C" fn signer_approve(input: *const c_char) -> *mut c_char {
    let request: ApproveRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| signer.approve(request.request_id, &request.handle))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelRequest {
    request_id: u64,
}

#[unsafe(no_mangle)]
pub extern "C" fn signer_cancel(input: *const c_char) -> *mut c_char {
    let request: CancelRequest = match parse_request(input) {
        Ok(r) => r,
        Err(ptr) => return ptr,
    };
    with_signer(|signer| {
        signer.cancel(request.request_id)?;
        Ok(Empty {})
    })
}

/// Discard a partially scanned sequence
#[unsafe(no_mangle)]
pub extern "C" fn signer_reset_scan() -> *mut c_char {
    with_signer(|signer| {
        signer.reset_scan();
        Ok(Empty {})
    })
}
