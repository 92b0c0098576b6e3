//! Card construction from a decoded transaction
//!
//! Output order: `Author`, warnings, call cards (pallet, method, arguments
//! depth-first), then extension cards in payload byte order. When a required
//! piece is missing the whole sequence collapses to one `Error` card.

use std::fmt;

use super::format::{format_balance, hex_string, printable_text};
use super::types::{Card, TransactionCard};
use crate::address::to_ss58;
use crate::crypto::ethereum_address;
use crate::decoder::{DecodedField, DecodedTransaction, DecodedValue, Era};
use crate::log_warn;
use crate::metadata::ChainSpecs;
use crate::types::{ChainId, Encryption};
use crate::vault::DerivedKey;

/// Author recognised in the vault
#[derive(Debug, Clone)]
pub struct AuthorInfo {
    pub seed_name: String,
    pub key: DerivedKey,
}

/// Everything besides the decoded tree that the cards depend on
#[derive(Debug, Clone)]
pub struct CardContext {
    /// Chain the request envelope names
    pub chain_id: ChainId,
    pub specs: ChainSpecs,
    /// Newest metadata version registered for the chain
    pub newest_version: Option<u32>,
    pub author: Option<AuthorInfo>,
    /// Scheme the request asks for
    pub encryption: Encryption,
    /// Registry name of the root call type, used to spot nested calls
    pub call_type_name: Option<String>,
}

/// A required part of the transaction could not be shown
#[derive(Debug, Clone, PartialEq, Eq)]
struct MissingField(String);

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type BuildResult<T> = Result<T, MissingField>;

/// Single `Error` card for a terminal failure
pub fn error_cards(err: &dyn fmt::Display) -> Vec<TransactionCard> {
    vec![TransactionCard::new(
        0,
        Card::Error {
            message: err.to_string(),
        },
    )]
}

pub fn build(tx: &DecodedTransaction, ctx: &CardContext) -> Vec<TransactionCard> {
    match try_build(tx, ctx) {
        Ok(cards) => cards,
        Err(missing) => error_cards(&missing),
    }
}

fn try_build(tx: &DecodedTransaction, ctx: &CardContext) -> BuildResult<Vec<TransactionCard>> {
    let ext = &tx.extensions;
    if &ext.genesis_hash != ctx.chain_id.as_bytes() {
        return Err(MissingField(format!(
            "network mismatch: payload is for {}, request names {}",
            hex_string(&ext.genesis_hash),
            ctx.chain_id
        )));
    }

    let author = ctx
        .author
        .as_ref()
        .ok_or_else(|| MissingField("author key is not in the vault".to_string()))?;

    let mut builder = Builder {
        ctx,
        cards: Vec::new(),
    };
    builder.author(author);

    if let Some(newest) = ctx.newest_version {
        if ext.spec_version < newest {
            builder.push(
                0,
                Card::Warning {
                    message: format!(
                        "{} metadata v{} is older than the newest known v{}",
                        ctx.specs.name, ext.spec_version, newest
                    ),
                },
            );
        }
    }
    if author.key.encryption != ctx.encryption {
        builder.push(
            0,
            Card::Warning {
                message: format!(
                    "request asks for {} but the author key is {}",
                    ctx.encryption, author.key.encryption
                ),
            },
        );
    }

    builder.call(&tx.call, 0)?;
    builder.extensions(tx);
    Ok(builder.cards)
}

struct Builder<'a> {
    ctx: &'a CardContext,
    cards: Vec<TransactionCard>,
}

impl<'a> Builder<'a> {
    fn push(&mut self, indent: u32, card: Card) {
        self.cards.push(TransactionCard::new(indent, card));
    }

    /// SS58 under the chain prefix, hex when the prefix cannot encode
    fn address(&self, public_key: &[u8]) -> String {
        let prefix = self.ctx.specs.base58_prefix;
        match to_ss58(public_key, prefix) {
            Ok(address) => address,
            Err(e) => {
                log_warn!(
                    "cards",
                    "SS58 encoding failed, showing hex",
                    prefix = prefix,
                    chain = self.ctx.chain_id,
                    error = e
                );
                hex_string(public_key)
            }
        }
    }

    fn author(&mut self, author: &AuthorInfo) {
        let key = &author.key;
        let eth_address = match key.encryption {
            Encryption::Ecdsa => match ethereum_address(&key.public_key) {
                Ok(address) => Some(address),
                Err(e) => {
                    log_warn!("cards", "No Ethereum address for author", error = e);
                    None
                }
            },
            Encryption::Ed25519 | Encryption::Sr25519 => None,
        };
        self.push(
            0,
            Card::Author {
                seed_name: author.seed_name.clone(),
                derivation_path: key.derivation_path.clone(),
                address: self.address(&key.public_key),
                public_key: hex_string(&key.public_key),
                encryption: key.encryption,
                has_pwd: key.has_pwd,
                ethereum_address: eth_address,
            },
        );
    }

    fn is_call(&self, node: &DecodedField) -> bool {
        match (&self.ctx.call_type_name, &node.type_name) {
            (Some(call), Some(name)) => call == name,
            _ => false,
        }
    }

    /// `RuntimeCall::Pallet(PalletCall::method { args })`
    fn call(&mut self, node: &DecodedField, indent: u32) -> BuildResult<()> {
        let (pallet_index, pallet, inner) = node
            .as_variant()
            .ok_or_else(|| MissingField("call is not a pallet variant".to_string()))?;
        let inner =
            inner.ok_or_else(|| MissingField(format!("pallet {} carries no call", pallet)))?;
        let (method_index, method, args) = inner
            .as_variant()
            .ok_or_else(|| MissingField(format!("pallet {} call is not a method", pallet)))?;

        self.push(
            indent,
            Card::Pallet {
                name: pallet.to_string(),
                index: pallet_index,
            },
        );
        self.push(
            indent + 1,
            Card::Method {
                pallet: pallet.to_string(),
                name: method.to_string(),
                index: method_index,
            },
        );
        if let Some(args) = args {
            self.value(args, indent + 2)?;
        }
        Ok(())
    }

    fn value(&mut self, node: &DecodedField, indent: u32) -> BuildResult<()> {
        if self.is_call(node) {
            return self.call(node, indent);
        }

        if node.type_name_contains("Balance") {
            if let Some(raw) = node.as_uint() {
                self.push(
                    indent,
                    Card::Amount {
                        amount: format_balance(raw, self.ctx.specs.decimals),
                        units: self.ctx.specs.unit.clone(),
                    },
                );
                return Ok(());
            }
        }

        if node.type_name_contains("AccountId") {
            if let Some(public_key) = node.as_bytes().and_then(|b| <[u8; 32]>::try_from(b).ok()) {
                self.push(
                    indent,
                    Card::Id {
                        address: self.address(&public_key),
                        public_key: hex_string(&public_key),
                    },
                );
                return Ok(());
            }
        }

        match &node.value {
            DecodedValue::Bool(b) => self.push(indent, Card::Text { text: b.to_string() }),
            DecodedValue::Char(c) => self.push(indent, Card::Text { text: c.to_string() }),
            DecodedValue::Text(s) => self.push(indent, Card::Text { text: s.clone() }),
            DecodedValue::Uint(n) => self.push(indent, Card::Number { number: n.to_string() }),
            DecodedValue::Int(n) => self.push(indent, Card::Number { number: n.to_string() }),
            DecodedValue::Bytes(bytes) => self.push(
                indent,
                Card::Bytes {
                    hex: hex_string(bytes),
                    text: printable_text(bytes),
                },
            ),
            DecodedValue::Composite(fields) => {
                for field in fields {
                    match &field.name {
                        Some(name) => {
                            self.push(
                                indent,
                                Card::Field {
                                    name: name.clone(),
                                    type_name: field.type_name.clone(),
                                },
                            );
                            self.value(field, indent + 1)?;
                        }
                        None => self.value(field, indent)?,
                    }
                }
            }
            DecodedValue::Sequence(items) => {
                for item in items {
                    self.value(item, indent)?;
                }
            }
            DecodedValue::Variant {
                index,
                name,
                payload,
            } => {
                self.push(
                    indent,
                    Card::Variant {
                        name: name.clone(),
                        index: *index,
                    },
                );
                if let Some(payload) = payload {
                    self.value(payload, indent + 1)?;
                }
            }
        }
        Ok(())
    }

    /// Byte order: era, nonce, tip, spec version, tx version, genesis, block hash
    fn extensions(&mut self, tx: &DecodedTransaction) {
        let ext = &tx.extensions;
        let specs = &self.ctx.specs;

        let era = match ext.era {
            Era::Immortal => Card::Era {
                mortal: false,
                period: None,
                phase: None,
            },
            Era::Mortal { period, phase } => Card::Era {
                mortal: true,
                period: Some(period),
                phase: Some(phase),
            },
        };
        let tip = Card::Tip {
            amount: format_balance(ext.tip, specs.decimals),
            units: specs.unit.clone(),
        };
        let name_version = Card::NameVersion {
            name: specs.name.clone(),
            version: ext.spec_version,
        };
        let network = Card::Network {
            name: specs.name.clone(),
            genesis_hash: hex_string(&ext.genesis_hash),
        };

        self.push(0, era);
        self.push(0, Card::Nonce { nonce: ext.nonce });
        self.push(0, tip);
        self.push(0, name_version);
        self.push(
            0,
            Card::TxVersion {
                version: ext.tx_version,
            },
        );
        self.push(0, network);
        self.push(
            0,
            Card::BlockHash {
                hash: hex_string(&ext.block_hash),
            },
        );
    }
}
