//! Tree-to-bytes encoding, the inverse of `Decoder`
//!
//! The tree must match the registry shape exactly; any mismatch is reported
//! as `MalformedPayload` naming the offending type.

use super::compact::{encode_compact, push_compact_len};
use super::decode::is_byte_container;
use super::value::{DecodedField, DecodedValue};
use super::DecodeError;
use crate::metadata::{MetadataRecord, Primitive, TypeDef, TypeId};

/// Encode a call tree rooted at the record's call type
pub fn encode_call(record: &MetadataRecord, tree: &DecodedField) -> Result<Vec<u8>, DecodeError> {
    encode(record, record.call_type, tree)
}

pub fn encode(
    record: &MetadataRecord,
    ty: TypeId,
    tree: &DecodedField,
) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    Encoder { record }.write(ty, tree, &mut out)?;
    Ok(out)
}

struct Encoder<'r> {
    record: &'r MetadataRecord,
}

impl Encoder<'_> {
    fn write(&self, ty: TypeId, field: &DecodedField, out: &mut Vec<u8>) -> Result<(), DecodeError> {
        let def = &self.record.resolve(ty)?.def;
        match (def, &field.value) {
            (TypeDef::Primitive(kind), value) => write_primitive(*kind, value, out),
            (TypeDef::Compact(kind), DecodedValue::Uint(v)) => {
                let max = kind.max_unsigned().ok_or_else(|| mismatch(ty, "compact kind"))?;
                if *v > max {
                    return Err(mismatch(ty, "compact value out of range"));
                }
                out.extend(encode_compact(*v));
                Ok(())
            }
            (TypeDef::Struct(fields), DecodedValue::Composite(members)) => {
                if fields.len() != members.len() {
                    return Err(mismatch(ty, "struct field count"));
                }
                for (decl, member) in fields.iter().zip(members) {
                    self.write(decl.ty, member, out)?;
                }
                Ok(())
            }
            (TypeDef::Tuple(elements), DecodedValue::Composite(members)) => {
                if elements.len() != members.len() {
                    return Err(mismatch(ty, "tuple arity"));
                }
                for (element, member) in elements.iter().zip(members) {
                    self.write(*element, member, out)?;
                }
                Ok(())
            }
            (
                TypeDef::Enum(_),
                DecodedValue::Variant {
                    index, payload, ..
                },
            ) => {
                let variant = def
                    .variant_by_index(*index)
                    .ok_or_else(|| mismatch(ty, "unknown variant"))?;
                out.push(*index);
                match (variant.payload, payload) {
                    (Some(inner_ty), Some(inner)) => self.write(inner_ty, inner, out),
                    (None, None) => Ok(()),
                    _ => Err(mismatch(ty, "variant payload presence")),
                }
            }
            (TypeDef::Sequence(element), value) => {
                let len = element_count(value).ok_or_else(|| mismatch(ty, "sequence value"))?;
                push_compact_len(out, len);
                self.write_elements(ty, *element, value, out)
            }
            (TypeDef::Array { len, element }, value) => {
                if element_count(value) != Some(*len as usize) {
                    return Err(mismatch(ty, "array length"));
                }
                self.write_elements(ty, *element, value, out)
            }
            _ => Err(mismatch(ty, "value shape")),
        }
    }

    fn write_elements(
        &self,
        ty: TypeId,
        element: TypeId,
        value: &DecodedValue,
        out: &mut Vec<u8>,
    ) -> Result<(), DecodeError> {
        match value {
            DecodedValue::Bytes(bytes) if is_byte_container(self.record, element) => {
                out.extend_from_slice(bytes);
                Ok(())
            }
            DecodedValue::Sequence(items) => {
                for item in items {
                    self.write(element, item, out)?;
                }
                Ok(())
            }
            _ => Err(mismatch(ty, "element representation")),
        }
    }
}

fn element_count(value: &DecodedValue) -> Option<usize> {
    match value {
        DecodedValue::Bytes(b) => Some(b.len()),
        DecodedValue::Sequence(items) => Some(items.len()),
        _ => None,
    }
}

fn write_primitive(kind: Primitive, value: &DecodedValue, out: &mut Vec<u8>) -> Result<(), DecodeError> {
    let bad = || DecodeError::MalformedPayload(format!("value does not fit {}", kind.name()));
    match (kind, value) {
        (Primitive::Bool, DecodedValue::Bool(b)) => out.push(*b as u8),
        (Primitive::Char, DecodedValue::Char(c)) => out.extend_from_slice(&(*c as u32).to_le_bytes()),
        (Primitive::Str, DecodedValue::Text(s)) => {
            push_compact_len(out, s.len());
            out.extend_from_slice(s.as_bytes());
        }
        (Primitive::U256 | Primitive::I256, DecodedValue::Bytes(b)) if b.len() == 32 => {
            out.extend_from_slice(b)
        }
        (kind, DecodedValue::Uint(v)) if kind.is_unsigned() => {
            let max = kind.max_unsigned().ok_or_else(bad)?;
            let width = kind.width().filter(|w| *w <= 16).ok_or_else(bad)?;
            if *v > max {
                return Err(bad());
            }
            out.extend_from_slice(&v.to_le_bytes()[..width]);
        }
        (kind, DecodedValue::Int(v)) if kind.is_signed() => {
            let width = kind.width().filter(|w| *w <= 16).ok_or_else(bad)?;
            let bits = (width * 8) as u32;
            if bits < 128 {
                let min = -(1i128 << (bits - 1));
                let max = (1i128 << (bits - 1)) - 1;
                if *v < min || *v > max {
                    return Err(bad());
                }
            }
            out.extend_from_slice(&v.to_le_bytes()[..width]);
        }
        _ => return Err(bad()),
    }
    Ok(())
}

fn mismatch(ty: TypeId, what: &str) -> DecodeError {
    DecodeError::MalformedPayload(format!("tree does not match type {}: {}", ty, what))
}
