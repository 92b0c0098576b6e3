//! Card types

use serde::Serialize;

use crate::types::Encryption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Author,
    Warning,
    Error,
    Pallet,
    Method,
    Amount,
    Id,
    Field,
    Variant,
    Text,
    Number,
    Bytes,
    Era,
    Nonce,
    Tip,
    NameVersion,
    TxVersion,
    BlockHash,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Card {
    #[serde(rename_all = "camelCase")]
    Author {
        seed_name: String,
        derivation_path: String,
        address: String,
        public_key: String,
        encryption: Encryption,
        has_pwd: bool,
        /// EIP-55 address, ecdsa keys only
        #[serde(skip_serializing_if = "Option::is_none")]
        ethereum_address: Option<String>,
    },
    Warning {
        message: String,
    },
    Error {
        message: String,
    },
    Pallet {
        name: String,
        index: u8,
    },
    Method {
        pallet: String,
        name: String,
        index: u8,
    },
    Amount {
        amount: String,
        units: String,
    },
    #[serde(rename_all = "camelCase")]
    Id {
        address: String,
        public_key: String,
    },
    #[serde(rename_all = "camelCase")]
    Field {
        name: String,
        type_name: Option<String>,
    },
    Variant {
        name: String,
        index: u8,
    },
    Text {
        text: String,
    },
    Number {
        number: String,
    },
    Bytes {
        hex: String,
        /// Set when the bytes are printable UTF-8
        text: Option<String>,
    },
    Era {
        mortal: bool,
        period: Option<u64>,
        phase: Option<u64>,
    },
    Nonce {
        nonce: u64,
    },
    Tip {
        amount: String,
        units: String,
    },
    NameVersion {
        name: String,
        version: u32,
    },
    TxVersion {
        version: u32,
    },
    BlockHash {
        hash: String,
    },
    #[serde(rename_all = "camelCase")]
    Network {
        name: String,
        genesis_hash: String,
    },
}

impl Card {
    pub fn kind(&self) -> CardKind {
        match self {
            Card::Author { .. } => CardKind::Author,
            Card::Warning { .. } => CardKind::Warning,
            Card::Error { .. } => CardKind::Error,
            Card::Pallet { .. } => CardKind::Pallet,
            Card::Method { .. } => CardKind::Method,
            Card::Amount { .. } => CardKind::Amount,
            Card::Id { .. } => CardKind::Id,
            Card::Field { .. } => CardKind::Field,
            Card::Variant { .. } => CardKind::Variant,
            Card::Text { .. } => CardKind::Text,
            Card::Number { .. } => CardKind::Number,
            Card::Bytes { .. } => CardKind::Bytes,
            Card::Era { .. } => CardKind::Era,
            Card::Nonce { .. } => CardKind::Nonce,
            Card::Tip { .. } => CardKind::Tip,
            Card::NameVersion { .. } => CardKind::NameVersion,
            Card::TxVersion { .. } => CardKind::TxVersion,
            Card::BlockHash { .. } => CardKind::BlockHash,
            Card::Network { .. } => CardKind::Network,
        }
    }
}

/// One display row; serialises as `{"indent", "kind", "payload"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionCard {
    pub indent: u32,
    #[serde(flatten)]
    pub card: Card,
}

impl TransactionCard {
    pub fn new(indent: u32, card: Card) -> Self {
        Self { indent, card }
    }

    pub fn kind(&self) -> CardKind {
        self.card.kind()
    }
}
