//! Signing request envelope
//!
//! ```text
//! 0x53 | encryption | 0x00 or 0x02 | author | Compact(len) ++ call | extensions | genesis [u8; 32]
//! ```
//!
//! The author is 32 bytes for ed25519 and sr25519, 33 for ecdsa.
//! The trailing genesis hash names the chain; the extensions carry the
//! metadata version.

use serde::Serialize;

use crate::decoder::compact::{push_compact_len, read_compact_len};
use crate::decoder::{Cursor, DecodeError};
use crate::serde_bytes::hex_vec;
use crate::types::{ChainId, Encryption};

pub const SUBSTRATE_PREFIX: u8 = 0x53;
pub const TX_MORTAL: u8 = 0x00;
pub const TX_SIGN: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub encryption: Encryption,
    pub tx_type: u8,
    #[serde(with = "hex_vec")]
    pub author: Vec<u8>,
    #[serde(with = "hex_vec")]
    pub call: Vec<u8>,
    #[serde(with = "hex_vec")]
    pub extensions: Vec<u8>,
    pub genesis: ChainId,
}

impl Envelope {
    /// `call ++ extensions`, the bytes the author signs
    pub fn raw_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.call.len() + self.extensions.len());
        out.extend_from_slice(&self.call);
        out.extend_from_slice(&self.extensions);
        out
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![SUBSTRATE_PREFIX, self.encryption.to_byte(), self.tx_type];
        out.extend_from_slice(&self.author);
        push_compact_len(&mut out, self.call.len());
        out.extend_from_slice(&self.call);
        out.extend_from_slice(&self.extensions);
        out.extend_from_slice(self.genesis.as_bytes());
        out
    }
}

pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let mut cursor = Cursor::new(bytes);

    let prefix = cursor.read_byte()?;
    if prefix != SUBSTRATE_PREFIX {
        return Err(DecodeError::MalformedPayload(format!(
            "unknown payload prefix {:#04x}",
            prefix
        )));
    }

    let enc_byte = cursor.read_byte()?;
    let encryption = Encryption::from_byte(enc_byte).ok_or_else(|| {
        DecodeError::MalformedPayload(format!("unknown encryption {:#04x}", enc_byte))
    })?;

    let tx_type = cursor.read_byte()?;
    if tx_type != TX_MORTAL && tx_type != TX_SIGN {
        return Err(DecodeError::MalformedPayload(format!(
            "unsupported payload type {:#04x}",
            tx_type
        )));
    }

    let author = cursor.read_bytes(encryption.public_len())?.to_vec();
    let call_len = read_compact_len(&mut cursor)?;
    let call = cursor.read_bytes(call_len)?.to_vec();

    let rest = cursor.rest();
    if rest.len() < 32 {
        return Err(DecodeError::Truncated {
            needed: 32,
            remaining: rest.len(),
        });
    }
    let (extensions, genesis) = rest.split_at(rest.len() - 32);
    let genesis = ChainId::from_slice(genesis).ok_or_else(|| {
        DecodeError::MalformedPayload("genesis hash must be 32 bytes".to_string())
    })?;

    Ok(Envelope {
        encryption,
        tx_type,
        author,
        call,
        extensions: extensions.to_vec(),
        genesis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn sample() -> Vec<u8> {
        let chain = fixtures::westend_chain();
        let ext = fixtures::extensions(9430, &chain);
        fixtures::signing_envelope(
            Encryption::Sr25519,
            &[0x11; 32],
            &fixtures::transfer_call([0x22; 32], 1_000),
            &ext,
        )
    }

    #[test]
    fn test_parse_envelope() {
        let bytes = sample();
        let env = parse_envelope(&bytes).unwrap();
        assert_eq!(env.encryption, Encryption::Sr25519);
        assert_eq!(env.author, vec![0x11; 32]);
        assert_eq!(env.call, fixtures::transfer_call([0x22; 32], 1_000));
        assert_eq!(env.genesis, fixtures::westend_chain());
        assert_eq!(env.to_bytes(), bytes);
    }

    #[test]
    fn test_raw_payload_is_call_then_extensions() {
        let env = parse_envelope(&sample()).unwrap();
        let raw = env.raw_payload();
        assert!(raw.starts_with(&env.call));
        assert!(raw.ends_with(&env.extensions));
    }

    #[test]
    fn test_rejects_foreign_prefix() {
        let mut bytes = sample();
        bytes[0] = 0x50;
        assert!(matches!(
            parse_envelope(&bytes),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_ecdsa_author_is_compressed_key() {
        let chain = fixtures::westend_chain();
        let ext = fixtures::extensions(9430, &chain);
        let call = fixtures::remark_call(b"hi");
        let bytes = fixtures::signing_envelope(Encryption::Ecdsa, &[0x02; 33], &call, &ext);

        let env = parse_envelope(&bytes).unwrap();
        assert_eq!(env.encryption, Encryption::Ecdsa);
        assert_eq!(env.author, vec![0x02; 33]);
        assert_eq!(env.call, call);
        assert_eq!(env.to_bytes(), bytes);
    }

    #[test]
    fn test_rejects_unknown_encryption() {
        let mut bytes = sample();
        bytes[1] = 0x07;
        assert!(matches!(
            parse_envelope(&bytes),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_truncated_envelope() {
        let bytes = sample();
        for len in 0..40 {
            assert!(
                matches!(parse_envelope(&bytes[..len]), Err(DecodeError::Truncated { .. })),
                "prefix of {} bytes",
                len
            );
        }
    }
}
