//! Reference network data
//!
//! A small Westend-shaped metadata record (System, Balances and Utility
//! pallets) and builders for the payloads it describes. Used by the CLI
//! `demo-metadata` command and by tests.

use crate::decoder::compact::{encode_compact, push_compact_len};
use crate::decoder::{Era, Extensions};
use crate::metadata::{
    ChainSpecs, Field, MetadataRecord, MetadataRegistry, Primitive, TypeDef, TypeId,
    TypeRegistryBuilder, Variant,
};
use crate::types::{ChainId, Encryption};
use crate::utils::settings::{KdfParams, SignerSettings};

pub const WESTEND_GENESIS: &str =
    "0xe143f23803ac50e8f6f8e62695d1ce9e4e1d68aa36c1cd2cfa15340213f3423e";

/// BIP-39 phrase of the well-known development accounts
pub const TEST_PHRASE: &str =
    "bottom drive obey lake curtain smoke basket hold race lonely fit walk";

pub const TEST_PROOF: &[u8] = b"fixture-passcode-4711";

pub const TX_VERSION: u32 = 22;

pub fn westend_chain() -> ChainId {
    ChainId::from_hex(WESTEND_GENESIS).unwrap_or(ChainId([0; 32]))
}

pub fn westend_specs() -> ChainSpecs {
    ChainSpecs {
        name: "westend".to_string(),
        base58_prefix: 42,
        decimals: 12,
        unit: "WND".to_string(),
    }
}

fn variant(index: u8, name: &str, payload: Option<TypeId>) -> Variant {
    Variant {
        index,
        name: name.to_string(),
        payload,
    }
}

fn args(b: &mut TypeRegistryBuilder, fields: Vec<Field>) -> TypeId {
    b.add(None, TypeDef::Struct(fields))
}

pub fn westend_record(spec_version: u32) -> MetadataRecord {
    let mut b = TypeRegistryBuilder::new();

    // Referenced by utility.batch before it is defined
    let runtime_call = b.reserve();

    let u8_t = b.primitive(Primitive::U8);
    let bool_t = b.primitive(Primitive::Bool);
    let account = b.array(Some("AccountId32"), 32, u8_t);
    let hash = b.array(None, 32, u8_t);
    let address20 = b.array(None, 20, u8_t);
    let bytes = b.sequence(u8_t);
    let account_index = b.compact(Primitive::U32);
    let balance = b.compact(Primitive::U128);

    let multi_address = b.variant(
        "MultiAddress",
        vec![
            variant(0, "Id", Some(account)),
            variant(1, "Index", Some(account_index)),
            variant(2, "Raw", Some(bytes)),
            variant(3, "Address32", Some(hash)),
            variant(4, "Address20", Some(address20)),
        ],
    );

    let remark_args = args(
        &mut b,
        vec![Field::named("remark", bytes).with_type_name("Vec<u8>")],
    );
    let system_call = b.variant(
        "SystemCall",
        vec![
            variant(0, "remark", Some(remark_args)),
            variant(7, "remark_with_event", Some(remark_args)),
        ],
    );

    let transfer_args = args(
        &mut b,
        vec![
            Field::named("dest", multi_address).with_type_name("AccountIdLookupOf<T>"),
            Field::named("value", balance).with_type_name("T::Balance"),
        ],
    );
    let transfer_all_args = args(
        &mut b,
        vec![
            Field::named("dest", multi_address).with_type_name("AccountIdLookupOf<T>"),
            Field::named("keep_alive", bool_t).with_type_name("bool"),
        ],
    );
    let balances_call = b.variant(
        "BalancesCall",
        vec![
            variant(0, "transfer_allow_death", Some(transfer_args)),
            variant(3, "transfer_keep_alive", Some(transfer_args)),
            variant(4, "transfer_all", Some(transfer_all_args)),
        ],
    );

    let calls = b.sequence(runtime_call);
    let batch_args = args(
        &mut b,
        vec![Field::named("calls", calls).with_type_name("Vec<RuntimeCall>")],
    );
    let utility_call = b.variant(
        "UtilityCall",
        vec![
            variant(0, "batch", Some(batch_args)),
            variant(2, "batch_all", Some(batch_args)),
        ],
    );

    b.define(
        runtime_call,
        Some("RuntimeCall"),
        TypeDef::Enum(vec![
            variant(0, "System", Some(system_call)),
            variant(4, "Balances", Some(balances_call)),
            variant(16, "Utility", Some(utility_call)),
        ]),
    );
    b.pallet(0, "System").pallet(4, "Balances").pallet(16, "Utility");

    match b.build(westend_chain(), spec_version, westend_specs(), runtime_call) {
        Ok(record) => record,
        Err(_) => unreachable!("westend fixture defines every reserved slot"),
    }
}

pub fn westend_registry(versions: &[u32]) -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    for version in versions {
        // Repeated versions are idempotent
        let _ = registry.insert(westend_record(*version));
    }
    registry
}

/// `Balances.transfer_keep_alive(MultiAddress::Id(dest), amount)`
pub fn transfer_call(dest: [u8; 32], amount: u128) -> Vec<u8> {
    let mut call = vec![4, 3, 0x00];
    call.extend_from_slice(&dest);
    call.extend(encode_compact(amount));
    call
}

/// `System.remark(data)`
pub fn remark_call(data: &[u8]) -> Vec<u8> {
    let mut call = vec![0, 0];
    push_compact_len(&mut call, data.len());
    call.extend_from_slice(data);
    call
}

/// `Utility.batch(calls)`
pub fn batch_call(calls: &[Vec<u8>]) -> Vec<u8> {
    let mut call = vec![16, 0];
    push_compact_len(&mut call, calls.len());
    for inner in calls {
        call.extend_from_slice(inner);
    }
    call
}

pub fn extensions(spec_version: u32, chain: &ChainId) -> Extensions {
    Extensions {
        era: Era::mortal(64, 4_398_123),
        nonce: 7,
        tip: 0,
        spec_version,
        tx_version: TX_VERSION,
        genesis_hash: *chain.as_bytes(),
        block_hash: [0x42; 32],
    }
}

/// Signing request envelope as produced by an online companion:
/// `0x53 | encryption | 0x02 | author | Compact(len) ++ call | extensions | genesis`
pub fn signing_envelope(
    encryption: Encryption,
    author: &[u8],
    call: &[u8],
    ext: &Extensions,
) -> Vec<u8> {
    let mut out = vec![0x53, encryption.to_byte(), 0x02];
    out.extend_from_slice(author);
    push_compact_len(&mut out, call.len());
    out.extend_from_slice(call);
    out.extend(ext.encode());
    out.extend_from_slice(&ext.genesis_hash);
    out
}

/// Standard settings with a KDF cheap enough for tests
pub fn test_settings() -> SignerSettings {
    SignerSettings {
        kdf: KdfParams {
            memory_cost: 64,
            time_cost: 1,
            parallelism: 1,
        },
        min_proof_len: 4,
        ..SignerSettings::standard()
    }
}
