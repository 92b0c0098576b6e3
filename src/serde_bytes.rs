//! Serde helpers for byte fields
//!
//! Keys, hashes and payloads are written as `0x`-prefixed hex strings.
//! Deserialization accepts the prefix or its absence.

use serde::{Deserialize, Deserializer, Serializer};

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    crate::utils::crypto::unhex(&s).map_err(serde::de::Error::custom)
}

/// `[u8; 32]` as hex
pub mod hex32 {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        from_hex(deserializer)?
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

/// `Vec<u8>` as hex
pub mod hex_vec {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        from_hex(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "super::hex32")]
        key: [u8; 32],
        #[serde(with = "super::hex_vec")]
        data: Vec<u8>,
    }

    #[test]
    fn test_hex_fields_roundtrip() {
        let sample = Sample {
            key: [0xab; 32],
            data: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"data\":\"0x010203\""));
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_prefix_optional_and_length_checked() {
        let json = format!(r#"{{"key":"{}","data":"0a"}}"#, "cd".repeat(32));
        let parsed: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.key, [0xcd; 32]);
        assert_eq!(parsed.data, vec![0x0a]);

        let short = r#"{"key":"0x1234","data":""}"#;
        assert!(serde_json::from_str::<Sample>(short).is_err());
    }
}
