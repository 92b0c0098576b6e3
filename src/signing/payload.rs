//! Signing payload and signed extrinsic assembly

use crate::crypto::account_id;
use crate::decoder::compact::push_compact_len;
use crate::decoder::Extensions;
use crate::utils::crypto::blake2_256;
use crate::vault::Signature;

/// Signed extrinsic format version 4 with the signed bit set
pub const EXTRINSIC_V4_SIGNED: u8 = 0x84;
/// `MultiAddress::Id`
const ADDRESS_ID: u8 = 0x00;

/// Bytes handed to the signature scheme: the raw payload, or its blake2b-256
/// hash when longer than `hash_threshold`
pub fn signing_payload(raw_payload: &[u8], hash_threshold: usize) -> Vec<u8> {
    if raw_payload.len() > hash_threshold {
        blake2_256(raw_payload).to_vec()
    } else {
        raw_payload.to_vec()
    }
}

/// `Compact(len) ++ 0x84 ++ MultiAddress::Id(account) ++ MultiSignature ++ era ++ nonce ++ tip ++ call`
///
/// `author` is the public key; the address carries its account id.
pub fn signed_extrinsic(
    author: &[u8],
    signature: &Signature,
    extensions: &Extensions,
    call: &[u8],
) -> Vec<u8> {
    let mut body = vec![EXTRINSIC_V4_SIGNED, ADDRESS_ID];
    body.extend(account_id(signature.encryption, author));
    body.extend(signature.to_multi_signature());
    body.extend(extensions.signed_extra());
    body.extend_from_slice(call);

    let mut out = Vec::with_capacity(body.len() + 5);
    push_compact_len(&mut out, body.len());
    out.extend(body);
    out
}
