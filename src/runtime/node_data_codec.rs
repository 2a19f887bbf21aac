//! Packs a port's *proper* init value (derived by `node::finalize`) into the
//! little-endian byte encoding that backs its slot in a packed provide/
//! require buffer.
//!
//! This is the encoding half of the pack/unpack VM seam (spec.md §6): the
//! real bytecode VM that packs/unpacks arbitrary runtime values against a
//! per-port program is out of scope, but a `NodeInstance` still needs *some*
//! way to seed its packed buffers with each port's init value at
//! construction time, so this module implements exactly that one
//! direction — constant folding of a parsed init value, not general
//! value packing.

use crate::error::{ApxError, Result};
use crate::node::Port;
use crate::packed::{len_bytes, PortLayout};
use crate::parser::attribute::InitValue;
use crate::parser::data_element::DataElement;

fn encode_scalar(type_code: crate::types::TypeCode, value: i64) -> Vec<u8> {
    match type_code.scalar_size() {
        1 => vec![value as u8],
        2 => (value as u16).to_le_bytes().to_vec(),
        4 => (value as u32).to_le_bytes().to_vec(),
        8 => (value as u64).to_le_bytes().to_vec(),
        _ => unreachable!("scalar_size only returns 1/2/4/8"),
    }
}

fn encode_count_prefix(count: u32, max_len: u32) -> Vec<u8> {
    let width = len_bytes(max_len);
    let bytes = count.to_le_bytes();
    bytes[..width].to_vec()
}

fn encode_element(element: &DataElement, value: &InitValue) -> Result<Vec<u8>> {
    match (element, value) {
        (DataElement::Scalar { type_code, .. }, InitValue::Integer(v)) => Ok(encode_scalar(*type_code, *v)),
        (DataElement::Array { element: inner, len, dynamic }, InitValue::Array(values)) => {
            let mut buf = Vec::new();
            if *dynamic {
                buf.extend(encode_count_prefix(values.len() as u32, *len));
            }
            for v in values {
                buf.extend(encode_element(inner, v)?);
            }
            if !dynamic {
                let pad_count = *len as usize - values.len();
                if pad_count > 0 {
                    let zero = encode_element(inner, &zero_value(inner))?;
                    for _ in 0..pad_count {
                        buf.extend(zero.clone());
                    }
                }
            }
            Ok(buf)
        }
        (DataElement::Record { fields }, InitValue::Record(values)) => {
            let mut buf = Vec::new();
            for ((_, field), (_, v)) in fields.iter().zip(values.iter()) {
                buf.extend(encode_element(field, v)?);
            }
            Ok(buf)
        }
        _ => Err(ApxError::ValueType),
    }
}

fn zero_value(element: &DataElement) -> InitValue {
    match element {
        DataElement::Scalar { .. } => InitValue::Integer(0),
        DataElement::Array { element, len, .. } => InitValue::Array(vec![zero_value(element); *len as usize]),
        DataElement::Record { fields } => InitValue::Record(fields.iter().map(|(n, f)| (n.clone(), zero_value(f))).collect()),
        DataElement::TypeRef(_) => InitValue::Integer(0),
    }
}

/// SHA-256 digest of `bytes`, used to checksum a node's `.apx` definition
/// source the way `NodeData::set_checksum` records it (spec.md §3
/// `NodeData`'s "checksum type and bytes").
pub fn sha256(bytes: &[u8]) -> Vec<u8> {
    use sha2::Digest;
    sha2::Sha256::digest(bytes).to_vec()
}

/// Encode every port's proper init value into one packed buffer, in
/// declaration order, matching the offsets `packed::compute_layout`
/// assigned them.
pub fn encode_ports(ports: &[Port], layouts: &[PortLayout], total_size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(total_size);
    for (port, layout) in ports.iter().zip(layouts.iter()) {
        let effective = port.effective_element.as_ref().ok_or(ApxError::MissingBuffer)?;
        let value = port.proper_init_value.as_ref().ok_or(ApxError::MissingBuffer)?;
        let encoded = if let Some(queue_len) = port.attributes.queue_len {
            let mut q = encode_count_prefix(0, queue_len);
            q.resize(layout.size, 0);
            q
        } else {
            encode_element(effective, value)?
        };
        debug_assert_eq!(encoded.len(), layout.size);
        buf.extend(encoded);
    }
    debug_assert_eq!(buf.len(), total_size);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::packed::compute_layout;
    use crate::parser::attribute::PortAttributes;
    use crate::types::{PortType, TypeCode};

    #[test]
    fn encodes_scenario_s1_provide_buffer() {
        let mut node = Node::new("TestNode");
        let mut a1 = PortAttributes::default();
        a1.init_value = Some(InitValue::Integer(65535));
        node.declare_port(PortType::Provide, "U16Signal", DataElement::scalar(TypeCode::U16), a1);
        let mut a2 = PortAttributes::default();
        a2.init_value = Some(InitValue::Integer(7));
        node.declare_port(PortType::Provide, "U8Signal1", DataElement::scalar(TypeCode::U8), a2);
        let mut a3 = PortAttributes::default();
        a3.init_value = Some(InitValue::Integer(15));
        node.declare_port(PortType::Provide, "U8Signal2", DataElement::scalar(TypeCode::U8), a3);
        node.finalize().unwrap();

        let (layouts, total) = compute_layout(&node.provide_ports).unwrap();
        let buf = encode_ports(&node.provide_ports, &layouts, total).unwrap();
        assert_eq!(buf, vec![0xFF, 0xFF, 0x07, 0x0F]);
    }

    #[test]
    fn encodes_scenario_s1_require_buffer() {
        let mut node = Node::new("TestNode");
        let mut a1 = PortAttributes::default();
        a1.init_value = Some(InitValue::Integer(7));
        node.declare_port(PortType::Require, "U8Signal3", DataElement::scalar(TypeCode::U8), a1);
        let mut a2 = PortAttributes::default();
        a2.init_value = Some(InitValue::Integer(0));
        node.declare_port(PortType::Require, "U32Signal", DataElement::scalar(TypeCode::U32), a2);
        node.finalize().unwrap();

        let (layouts, total) = compute_layout(&node.require_ports).unwrap();
        let buf = encode_ports(&node.require_ports, &layouts, total).unwrap();
        assert_eq!(buf, vec![0x07, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn sha256_matches_known_digest_of_empty_input() {
        // https://en.wikipedia.org/wiki/SHA-2 test vector for the empty string.
        let digest = sha256(b"");
        assert_eq!(
            digest,
            hex("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
        );
    }

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
    }

    #[test]
    fn dynamic_array_encodes_zero_length_prefix_when_empty() {
        let mut node = Node::new("X");
        node.declare_port(
            PortType::Provide,
            "Values",
            DataElement::Array { element: Box::new(DataElement::scalar(TypeCode::U8)), len: 8, dynamic: true },
            PortAttributes::default(),
        );
        node.finalize().unwrap();
        let (layouts, total) = compute_layout(&node.provide_ports).unwrap();
        let buf = encode_ports(&node.provide_ports, &layouts, total).unwrap();
        assert_eq!(buf, vec![0u8]);
    }
}
