//! The parse-tree node produced by the signature parser (`parser::signature`)
//! and consumed by the finalize pass (`node::finalize`).
//!
//! Mirrors `apx_dataElement_t` / `apx_dataSignature_t`: a scalar, a fixed or
//! dynamic array of some base element, a record of named fields, or an
//! unresolved reference to another named type — which finalize turns into
//! `TypeRef::Ptr`.

use crate::types::TypeCode;

/// A reference to another data type, in one of three states: as written in
/// source text (`Id`/`Name`), or resolved by the finalize pass (`Ptr`).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Id(u32),
    Name(String),
    Ptr(usize),
}

/// One node of a parsed data signature.
#[derive(Debug, Clone, PartialEq)]
pub enum DataElement {
    Scalar {
        type_code: TypeCode,
        limits: Option<(i64, i64)>,
    },
    Array {
        element: Box<DataElement>,
        len: u32,
        dynamic: bool,
    },
    Record {
        fields: Vec<(String, DataElement)>,
    },
    TypeRef(TypeRef),
}

impl DataElement {
    pub fn scalar(type_code: TypeCode) -> Self {
        DataElement::Scalar { type_code, limits: None }
    }

    /// Whether this element (at any depth) contains a dynamic array.
    pub fn has_dynamic_array(&self) -> bool {
        match self {
            DataElement::Array { element, dynamic, .. } => *dynamic || element.has_dynamic_array(),
            DataElement::Record { fields } => fields.iter().any(|(_, e)| e.has_dynamic_array()),
            DataElement::Scalar { .. } | DataElement::TypeRef(_) => false,
        }
    }

    /// Canonical signature-string form of an *effective* (reference-free)
    /// element, used as the routing key in `PortSignatureMap` (spec.md
    /// §4.9). Round-trips through `signature::parse_signature` for any
    /// element that came from parsed source text.
    pub fn canonical(&self) -> String {
        match self {
            DataElement::Scalar { type_code, limits } => {
                let mut s = String::new();
                s.push(type_code.signature_char());
                if let Some((lo, hi)) = limits {
                    s.push_str(&format!("({lo},{hi})"));
                }
                s
            }
            DataElement::Array { element, len, dynamic } => {
                let mut s = element.canonical();
                if *dynamic {
                    s.push_str(&format!("[{len}*]"));
                } else {
                    s.push_str(&format!("[{len}]"));
                }
                s
            }
            DataElement::Record { fields } => {
                let mut s = String::from("{");
                for (name, field) in fields {
                    s.push('"');
                    s.push_str(name);
                    s.push('"');
                    s.push_str(&field.canonical());
                }
                s.push('}');
                s
            }
            DataElement::TypeRef(reference) => match reference {
                TypeRef::Id(id) => format!("T[{id}]"),
                TypeRef::Name(name) => format!("T[\"{name}\"]"),
                TypeRef::Ptr(idx) => format!("T[{idx}]"),
            },
        }
    }
}

#[cfg(test)]
mod canonical_tests {
    use super::*;
    use crate::parser::signature::parse_signature;
    use crate::types::TypeCode;

    #[test]
    fn canonical_round_trips_through_parser() {
        for sig in ["C", "L(0,100)", "C[8]", "C[8*]", "{\"Id\"S\"Value\"C}"] {
            let element = parse_signature(sig).unwrap();
            let canon = element.canonical();
            let reparsed = parse_signature(&canon).unwrap();
            assert_eq!(reparsed.canonical(), canon);
        }
    }

    #[test]
    fn identical_shapes_produce_identical_signatures() {
        let a = DataElement::scalar(TypeCode::U8);
        let b = parse_signature("C").unwrap();
        assert_eq!(a.canonical(), b.canonical());
    }
}
