//! Registry-driven decoding
//!
//! Walks a `MetadataRecord` type arena alongside the input bytes. Every
//! failure aborts the walk; callers only ever see a complete tree or an
//! error.

use super::compact::{read_compact, read_compact_len};
use super::cursor::Cursor;
use super::value::{DecodedField, DecodedValue};
use super::DecodeError;
use crate::metadata::{MetadataRecord, Primitive, TypeDef, TypeId};

/// Upper bound on elements of a type that encodes to no bytes
pub const MAX_EMPTY_ELEMENTS: usize = 1 << 16;

pub struct Decoder<'r> {
    record: &'r MetadataRecord,
    max_depth: usize,
}

impl<'r> Decoder<'r> {
    pub fn new(record: &'r MetadataRecord, max_depth: usize) -> Self {
        Self { record, max_depth }
    }

    /// Decode a complete call; unconsumed input is an error
    pub fn decode_call(&self, bytes: &[u8]) -> Result<DecodedField, DecodeError> {
        self.decode_root(self.record.call_type, bytes)
    }

    pub fn decode_root(&self, ty: TypeId, bytes: &[u8]) -> Result<DecodedField, DecodeError> {
        let mut cursor = Cursor::new(bytes);
        let field = self.decode_type(ty, &mut cursor, 0)?;
        if !cursor.is_empty() {
            return Err(DecodeError::MalformedPayload(format!(
                "{} trailing bytes after call at offset {}",
                cursor.remaining(),
                cursor.position()
            )));
        }
        Ok(field)
    }

    pub fn decode_type(
        &self,
        ty: TypeId,
        cursor: &mut Cursor<'_>,
        depth: usize,
    ) -> Result<DecodedField, DecodeError> {
        if depth > self.max_depth {
            return Err(DecodeError::MalformedPayload(format!(
                "type nesting exceeds {} levels",
                self.max_depth
            )));
        }

        let entry = self.record.resolve(ty)?;
        let value = match &entry.def {
            TypeDef::Primitive(kind) => decode_primitive(*kind, cursor)?,
            TypeDef::Compact(kind) => decode_compact_value(*kind, cursor)?,
            TypeDef::Struct(fields) => {
                let mut members = Vec::with_capacity(fields.len());
                for field in fields {
                    let mut member = self.decode_type(field.ty, cursor, depth + 1)?;
                    member.name = field.name.clone();
                    if field.type_name.is_some() {
                        member.type_name = field.type_name.clone();
                    }
                    members.push(member);
                }
                DecodedValue::Composite(members)
            }
            TypeDef::Tuple(elements) => {
                let mut members = Vec::with_capacity(elements.len());
                for element in elements {
                    members.push(self.decode_type(*element, cursor, depth + 1)?);
                }
                DecodedValue::Composite(members)
            }
            TypeDef::Enum(_) => {
                let index = cursor.read_byte()?;
                let variant = entry.def.variant_by_index(index).ok_or_else(|| {
                    DecodeError::MalformedPayload(format!(
                        "discriminant {} is not a variant of {}",
                        index,
                        entry.name.as_deref().unwrap_or("enum")
                    ))
                })?;
                let payload = match variant.payload {
                    Some(inner) => Some(Box::new(self.decode_type(inner, cursor, depth + 1)?)),
                    None => None,
                };
                DecodedValue::Variant {
                    index,
                    name: variant.name.clone(),
                    payload,
                }
            }
            TypeDef::Sequence(element) => {
                let len = read_compact_len(cursor)?;
                self.check_element_count(*element, len, cursor, depth)?;
                self.decode_elements(*element, len, cursor, depth)?
            }
            TypeDef::Array { len, element } => {
                let len = *len as usize;
                self.check_element_count(*element, len, cursor, depth)?;
                self.decode_elements(*element, len, cursor, depth)?
            }
        };

        Ok(DecodedField::new(entry.def.tag(), value).with_type_name(entry.name.clone()))
    }

    /// Byte elements collapse into `Bytes`; anything else stays a list
    fn decode_elements(
        &self,
        element: TypeId,
        len: usize,
        cursor: &mut Cursor<'_>,
        depth: usize,
    ) -> Result<DecodedValue, DecodeError> {
        if self.is_byte(element)? {
            return Ok(DecodedValue::Bytes(cursor.read_bytes(len)?.to_vec()));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.decode_type(element, cursor, depth + 1)?);
        }
        Ok(DecodedValue::Sequence(items))
    }

    /// Reject counts the input cannot hold before allocating for them.
    /// Elements that encode to no bytes are bounded by `MAX_EMPTY_ELEMENTS`.
    fn check_element_count(
        &self,
        element: TypeId,
        len: usize,
        cursor: &Cursor<'_>,
        depth: usize,
    ) -> Result<(), DecodeError> {
        if !self.encodes_empty(element, depth + 1)? {
            return cursor.ensure(len);
        }
        if len > MAX_EMPTY_ELEMENTS {
            return Err(DecodeError::MalformedPayload(format!(
                "{} elements of an empty type exceeds {}",
                len, MAX_EMPTY_ELEMENTS
            )));
        }
        Ok(())
    }

    /// Whether every value of `ty` encodes to zero bytes
    fn encodes_empty(&self, ty: TypeId, depth: usize) -> Result<bool, DecodeError> {
        if depth > self.max_depth {
            return Ok(false);
        }
        Ok(match &self.record.resolve(ty)?.def {
            TypeDef::Struct(fields) => {
                for field in fields {
                    if !self.encodes_empty(field.ty, depth + 1)? {
                        return Ok(false);
                    }
                }
                true
            }
            TypeDef::Tuple(elements) => {
                for element in elements {
                    if !self.encodes_empty(*element, depth + 1)? {
                        return Ok(false);
                    }
                }
                true
            }
            TypeDef::Array { len, element } => *len == 0 || self.encodes_empty(*element, depth + 1)?,
            TypeDef::Primitive(_) | TypeDef::Compact(_) | TypeDef::Enum(_) | TypeDef::Sequence(_) => {
                false
            }
        })
    }

    fn is_byte(&self, ty: TypeId) -> Result<bool, DecodeError> {
        Ok(matches!(
            self.record.resolve(ty)?.def,
            TypeDef::Primitive(Primitive::U8)
        ))
    }
}

/// Whether a sequence or array of `element` decodes to `Bytes`
pub fn is_byte_container(record: &MetadataRecord, element: TypeId) -> bool {
    matches!(
        record.resolve(element).map(|e| &e.def),
        Ok(TypeDef::Primitive(Primitive::U8))
    )
}

fn decode_primitive(kind: Primitive, cursor: &mut Cursor<'_>) -> Result<DecodedValue, DecodeError> {
    let value = match kind {
        Primitive::Bool => match cursor.read_byte()? {
            0 => DecodedValue::Bool(false),
            1 => DecodedValue::Bool(true),
            other => {
                return Err(DecodeError::MalformedPayload(format!(
                    "invalid bool byte {:#04x}",
                    other
                )))
            }
        },
        Primitive::Char => {
            let raw = cursor.read_u32_le()?;
            let c = char::from_u32(raw).ok_or_else(|| {
                DecodeError::MalformedPayload(format!("{:#x} is not a unicode scalar", raw))
            })?;
            DecodedValue::Char(c)
        }
        Primitive::Str => {
            let len = read_compact_len(cursor)?;
            let raw = cursor.read_bytes(len)?;
            let text = std::str::from_utf8(raw)
                .map_err(|e| DecodeError::MalformedPayload(format!("invalid utf-8: {}", e)))?;
            DecodedValue::Text(text.to_string())
        }
        Primitive::U256 | Primitive::I256 => DecodedValue::Bytes(cursor.read_bytes(32)?.to_vec()),
        unsigned if unsigned.is_unsigned() => {
            let width = fixed_width(unsigned)?;
            let mut buf = [0u8; 16];
            buf[..width].copy_from_slice(cursor.read_bytes(width)?);
            DecodedValue::Uint(u128::from_le_bytes(buf))
        }
        signed => {
            let width = fixed_width(signed)?;
            let raw = cursor.read_bytes(width)?;
            // Sign-extend into 16 bytes
            let fill = if raw[width - 1] & 0x80 != 0 { 0xff } else { 0x00 };
            let mut buf = [fill; 16];
            buf[..width].copy_from_slice(raw);
            DecodedValue::Int(i128::from_le_bytes(buf))
        }
    };
    Ok(value)
}

fn fixed_width(kind: Primitive) -> Result<usize, DecodeError> {
    kind.width()
        .filter(|w| *w <= 16)
        .ok_or_else(|| DecodeError::MalformedPayload(format!("{} has no fixed width", kind.name())))
}

fn decode_compact_value(kind: Primitive, cursor: &mut Cursor<'_>) -> Result<DecodedValue, DecodeError> {
    let max = kind.max_unsigned().ok_or_else(|| {
        DecodeError::MalformedPayload(format!("compact of non-unsigned type {}", kind.name()))
    })?;
    let value = read_compact(cursor)?;
    if value > max {
        return Err(DecodeError::MalformedPayload(format!(
            "compact value {} overflows {}",
            value,
            kind.name()
        )));
    }
    Ok(DecodedValue::Uint(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::metadata::{ChainSpecs, Field, TypeRegistryBuilder, TypeTag, Variant};
    use crate::types::ChainId;

    fn specs() -> ChainSpecs {
        ChainSpecs {
            name: "test".into(),
            base58_prefix: 42,
            decimals: 0,
            unit: "U".into(),
        }
    }

    /// Root type is a struct exercising every primitive shape
    fn mixed_record() -> MetadataRecord {
        let mut b = TypeRegistryBuilder::new();
        let bool_t = b.primitive(Primitive::Bool);
        let i16_t = b.primitive(Primitive::I16);
        let str_t = b.primitive(Primitive::Str);
        let char_t = b.primitive(Primitive::Char);
        let u8_t = b.primitive(Primitive::U8);
        let bytes_t = b.sequence(u8_t);
        let compact_t = b.compact(Primitive::U64);
        let pair_t = b.add(None, TypeDef::Tuple(vec![u8_t, i16_t]));
        let option_t = b.variant(
            "Option",
            vec![
                Variant {
                    index: 0,
                    name: "None".into(),
                    payload: None,
                },
                Variant {
                    index: 1,
                    name: "Some".into(),
                    payload: Some(compact_t),
                },
            ],
        );
        let root = b.composite(
            "Mixed",
            vec![
                Field::named("flag", bool_t),
                Field::named("delta", i16_t),
                Field::named("label", str_t),
                Field::named("letter", char_t),
                Field::named("data", bytes_t),
                Field::named("pair", pair_t),
                Field::named("maybe", option_t).with_type_name("Option<u64>"),
            ],
        );
        b.build(ChainId([7; 32]), 1, specs(), root).unwrap()
    }

    fn mixed_bytes() -> Vec<u8> {
        let mut bytes = vec![0x01]; // flag
        bytes.extend_from_slice(&(-2i16).to_le_bytes()); // delta
        bytes.extend_from_slice(&[0x0c, b'a', b'b', b'c']); // label
        bytes.extend_from_slice(&('Z' as u32).to_le_bytes()); // letter
        bytes.extend_from_slice(&[0x08, 0xde, 0xad]); // data
        bytes.extend_from_slice(&[0x09, 0xff, 0x7f]); // pair
        bytes.extend_from_slice(&[0x01, 0x15, 0x01]); // maybe = Some(69)
        bytes
    }

    #[test]
    fn test_decode_mixed_struct() {
        let record = mixed_record();
        let decoder = Decoder::new(&record, 16);
        let tree = decoder.decode_call(&mixed_bytes()).unwrap();

        assert_eq!(tree.type_name.as_deref(), Some("Mixed"));
        assert_eq!(tree.child("flag").unwrap().value, DecodedValue::Bool(true));
        assert_eq!(tree.child("delta").unwrap().value, DecodedValue::Int(-2));
        assert_eq!(
            tree.child("label").unwrap().value,
            DecodedValue::Text("abc".into())
        );
        assert_eq!(tree.child("letter").unwrap().value, DecodedValue::Char('Z'));
        assert_eq!(tree.child("data").unwrap().as_bytes(), Some(&[0xde, 0xad][..]));

        let pair = tree.child("pair").unwrap();
        assert_eq!(
            pair.value,
            DecodedValue::Composite(vec![
                DecodedField::new(TypeTag::Primitive, DecodedValue::Uint(9)),
                DecodedField::new(TypeTag::Primitive, DecodedValue::Int(0x7fff)),
            ])
        );

        let maybe = tree.child("maybe").unwrap();
        assert_eq!(maybe.type_name.as_deref(), Some("Option<u64>"));
        let (_, name, payload) = maybe.as_variant().unwrap();
        assert_eq!(name, "Some");
        assert_eq!(payload.unwrap().as_uint(), Some(69));
    }

    #[test]
    fn test_every_truncation_is_truncated() {
        let record = mixed_record();
        let decoder = Decoder::new(&record, 16);
        let bytes = mixed_bytes();
        for cut in 0..bytes.len() {
            let result = decoder.decode_call(&bytes[..cut]);
            assert!(
                matches!(result, Err(DecodeError::Truncated { .. })),
                "cut at {} gave {:?}",
                cut,
                result
            );
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let record = mixed_record();
        let mut bytes = mixed_bytes();
        bytes.push(0);
        assert!(matches!(
            Decoder::new(&record, 16).decode_call(&bytes),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_invalid_scalars_rejected() {
        let record = mixed_record();
        let decoder = Decoder::new(&record, 16);

        let mut bad_bool = mixed_bytes();
        bad_bool[0] = 2;
        assert!(matches!(
            decoder.decode_call(&bad_bool),
            Err(DecodeError::MalformedPayload(_))
        ));

        let mut bad_utf8 = mixed_bytes();
        bad_utf8[4] = 0xff;
        assert!(matches!(
            decoder.decode_call(&bad_utf8),
            Err(DecodeError::MalformedPayload(_))
        ));

        let mut bad_char = mixed_bytes();
        bad_char[7..11].copy_from_slice(&0xD800u32.to_le_bytes());
        assert!(matches!(
            decoder.decode_call(&bad_char),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_unknown_discriminant() {
        let record = fixtures::westend_record(9430);
        let decoder = Decoder::new(&record, 16);
        // Pallet index 99 does not exist
        assert!(matches!(
            decoder.decode_call(&[99, 0]),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_dangling_type_id() {
        let mut b = TypeRegistryBuilder::new();
        let root = b.composite("Broken", vec![Field::named("x", 42)]);
        let record = b.build(ChainId([1; 32]), 1, specs(), root).unwrap();
        assert!(matches!(
            Decoder::new(&record, 16).decode_call(&[0]),
            Err(DecodeError::UnknownType(42))
        ));
    }

    #[test]
    fn test_self_referential_type_hits_depth_limit() {
        let mut b = TypeRegistryBuilder::new();
        let node = b.reserve();
        b.define(node, Some("Loop"), TypeDef::Tuple(vec![node]));
        let record = b.build(ChainId([1; 32]), 1, specs(), node).unwrap();
        assert!(matches!(
            Decoder::new(&record, 8).decode_call(&[]),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_sequence_longer_than_input() {
        let mut b = TypeRegistryBuilder::new();
        let u32_t = b.primitive(Primitive::U32);
        let seq = b.sequence(u32_t);
        let record = b.build(ChainId([1; 32]), 1, specs(), seq).unwrap();
        // Claims 63 elements, provides 4 bytes
        let result = Decoder::new(&record, 8).decode_call(&[0xfc, 1, 2, 3, 4]);
        assert!(matches!(result, Err(DecodeError::Truncated { needed: 63, .. })));
    }

    #[test]
    fn test_sequence_of_empty_tuples() {
        let mut b = TypeRegistryBuilder::new();
        let unit = b.add(None, TypeDef::Tuple(vec![]));
        let seq = b.sequence(unit);
        let record = b.build(ChainId([1; 32]), 1, specs(), seq).unwrap();
        let decoder = Decoder::new(&record, 8);

        // Two units: only the length prefix is on the wire
        let tree = decoder.decode_call(&[0x08]).unwrap();
        match &tree.value {
            DecodedValue::Sequence(items) => assert_eq!(items.len(), 2),
            other => panic!("expected a sequence, got {:?}", other),
        }
        assert_eq!(crate::decoder::encode_call(&record, &tree).unwrap(), vec![0x08]);

        let huge = crate::decoder::compact::encode_compact(MAX_EMPTY_ELEMENTS as u128 + 1);
        assert!(matches!(
            decoder.decode_call(&huge),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_array_of_empty_structs() {
        let mut b = TypeRegistryBuilder::new();
        let empty = b.composite("Empty", vec![]);
        let arr = b.array(None, 3, empty);
        let record = b.build(ChainId([1; 32]), 1, specs(), arr).unwrap();
        let tree = Decoder::new(&record, 8).decode_call(&[]).unwrap();
        assert!(matches!(&tree.value, DecodedValue::Sequence(items) if items.len() == 3));
    }

    #[test]
    fn test_compact_overflow_for_kind() {
        let mut b = TypeRegistryBuilder::new();
        let c = b.compact(Primitive::U8);
        let record = b.build(ChainId([1; 32]), 1, specs(), c).unwrap();
        // 256 does not fit u8
        let bytes = crate::decoder::compact::encode_compact(256);
        assert!(matches!(
            Decoder::new(&record, 8).decode_call(&bytes),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_transfer_call() {
        let record = fixtures::westend_record(9430);
        let call = fixtures::transfer_call([0x11; 32], 1_000_000_000_000);
        let tree = Decoder::new(&record, 32).decode_call(&call).unwrap();

        let (pallet_index, pallet, inner) = tree.as_variant().unwrap();
        assert_eq!((pallet_index, pallet), (4, "Balances"));
        let (_, method, args) = inner.unwrap().as_variant().unwrap();
        assert_eq!(method, "transfer_keep_alive");
        let args = args.unwrap();
        assert_eq!(args.child("value").unwrap().as_uint(), Some(1_000_000_000_000));
        assert!(args.child("value").unwrap().type_name_contains("Balance"));
    }
}
