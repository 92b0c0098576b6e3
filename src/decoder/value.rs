//! Decoded value tree

use serde::{Deserialize, Serialize};

use crate::metadata::TypeTag;

/// One decoded node: a value plus where it came from in the type registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedField {
    pub name: Option<String>,
    pub tag: TypeTag,
    /// Declared type name, falling back to the registry path name
    pub type_name: Option<String>,
    pub value: DecodedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DecodedValue {
    Bool(bool),
    Uint(u128),
    Int(i128),
    Char(char),
    Text(String),
    /// Byte vectors and arrays, and 256-bit integers (little endian)
    Bytes(Vec<u8>),
    /// Struct or tuple members in declared order
    Composite(Vec<DecodedField>),
    /// Sequence or array elements
    Sequence(Vec<DecodedField>),
    Variant {
        index: u8,
        name: String,
        payload: Option<Box<DecodedField>>,
    },
}

impl DecodedField {
    pub fn new(tag: TypeTag, value: DecodedValue) -> Self {
        Self {
            name: None,
            tag,
            type_name: None,
            value,
        }
    }

    pub fn named(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_type_name(mut self, type_name: Option<String>) -> Self {
        self.type_name = type_name;
        self
    }

    /// Direct child of a composite by name
    pub fn child(&self, name: &str) -> Option<&DecodedField> {
        match &self.value {
            DecodedValue::Composite(fields) => {
                fields.iter().find(|f| f.name.as_deref() == Some(name))
            }
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self.value {
            DecodedValue::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.value {
            DecodedValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// `(index, name, payload)` when the value is an enum variant
    pub fn as_variant(&self) -> Option<(u8, &str, Option<&DecodedField>)> {
        match &self.value {
            DecodedValue::Variant {
                index,
                name,
                payload,
            } => Some((*index, name.as_str(), payload.as_deref())),
            _ => None,
        }
    }

    pub fn type_name_contains(&self, needle: &str) -> bool {
        self.type_name
            .as_deref()
            .map(|t| t.contains(needle))
            .unwrap_or(false)
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + match &self.value {
            DecodedValue::Composite(children) | DecodedValue::Sequence(children) => {
                children.iter().map(DecodedField::node_count).sum()
            }
            DecodedValue::Variant {
                payload: Some(inner),
                ..
            } => inner.node_count(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let amount = DecodedField::new(TypeTag::Compact, DecodedValue::Uint(5))
            .named(Some("value".into()));
        let args = DecodedField::new(TypeTag::Struct, DecodedValue::Composite(vec![amount]));
        let call = DecodedField::new(
            TypeTag::Enum,
            DecodedValue::Variant {
                index: 3,
                name: "transfer_keep_alive".into(),
                payload: Some(Box::new(args)),
            },
        );

        let (index, name, payload) = call.as_variant().unwrap();
        assert_eq!(index, 3);
        assert_eq!(name, "transfer_keep_alive");
        assert_eq!(payload.unwrap().child("value").unwrap().as_uint(), Some(5));
        assert_eq!(call.node_count(), 3);
    }

    #[test]
    fn test_json_shape() {
        let field = DecodedField::new(TypeTag::Primitive, DecodedValue::Bool(true));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["value"]["kind"], "bool");
        assert_eq!(json["tag"], "primitive");
    }
}
