//! The finalize pass: assigns sequential ids (already done at declaration
//! time by `Node::declare_type`/`declare_port`), resolves every `TypeRef`
//! to the type it names, flattens each port's declared element into a
//! reference-free "effective" element, and derives/validates each port's
//! "proper" init value against that effective shape.

use crate::error::{ApxError, Result};
use crate::node::node::Node;
use crate::parser::attribute::InitValue;
use crate::parser::data_element::{DataElement, TypeRef};

/// Recursion guard: the original rejects a small fixed nesting depth as a
/// cycle rather than walking arbitrarily deep reference chains.
const MAX_REFERENCE_DEPTH: usize = 64;

pub(super) fn finalize_node(node: &mut Node) -> Result<()> {
    let types = node.types.clone();
    for port in node.provide_ports.iter_mut().chain(node.require_ports.iter_mut()) {
        if port.is_queued() && port.element.has_dynamic_array() {
            return Err(ApxError::Unsupported);
        }
        let effective = flatten(&port.element, &types, 0)?;
        let proper = derive_proper_init_value(&effective, port.attributes.init_value.as_ref())?;
        port.effective_element = Some(effective);
        port.proper_init_value = Some(proper);
    }
    Ok(())
}

fn resolve_type_ref<'a>(reference: &TypeRef, types: &'a [crate::node::data_type::DataType]) -> Result<&'a DataElement> {
    match reference {
        TypeRef::Id(id) => types.get(*id as usize).map(|t| &t.element).ok_or(ApxError::InvalidTypeRef),
        TypeRef::Name(name) => types.iter().find(|t| &t.name == name).map(|t| &t.element).ok_or(ApxError::InvalidTypeRef),
        TypeRef::Ptr(idx) => types.get(*idx).map(|t| &t.element).ok_or(ApxError::InvalidTypeRef),
    }
}

fn flatten(element: &DataElement, types: &[crate::node::data_type::DataType], depth: usize) -> Result<DataElement> {
    if depth > MAX_REFERENCE_DEPTH {
        return Err(ApxError::TooManyReferences);
    }
    Ok(match element {
        DataElement::Scalar { .. } => element.clone(),
        DataElement::TypeRef(reference) => {
            let referenced = resolve_type_ref(reference, types)?;
            flatten(referenced, types, depth + 1)?
        }
        DataElement::Array { element: inner, len, dynamic } => {
            let flattened_inner = flatten(inner, types, depth + 1)?;
            if matches!(flattened_inner, DataElement::Array { .. }) {
                return Err(ApxError::Unsupported);
            }
            DataElement::Array { element: Box::new(flattened_inner), len: *len, dynamic: *dynamic }
        }
        DataElement::Record { fields } => {
            let mut flattened = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                flattened.push((name.clone(), flatten(field, types, depth + 1)?));
            }
            DataElement::Record { fields: flattened }
        }
    })
}

fn derive_proper_init_value(effective: &DataElement, given: Option<&InitValue>) -> Result<InitValue> {
    match effective {
        DataElement::Scalar { limits, .. } => {
            let value = match given {
                Some(InitValue::Integer(v)) => *v,
                Some(_) => return Err(ApxError::ValueType),
                None => 0,
            };
            if let Some((lo, hi)) = limits {
                if value < *lo || value > *hi {
                    return Err(ApxError::ValueRange);
                }
            }
            Ok(InitValue::Integer(value))
        }
        DataElement::Array { element: inner, len, dynamic } => match given {
            Some(InitValue::Array(values)) => {
                if *dynamic {
                    if values.len() as u32 > *len {
                        return Err(ApxError::ValueLength);
                    }
                } else if values.len() as u32 != *len {
                    return Err(ApxError::ValueLength);
                }
                let resolved = values
                    .iter()
                    .map(|v| derive_proper_init_value(inner, Some(v)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(InitValue::Array(resolved))
            }
            Some(_) => Err(ApxError::ValueType),
            None => {
                let default = derive_proper_init_value(inner, None)?;
                Ok(InitValue::Array(vec![default; *len as usize]))
            }
        },
        DataElement::Record { fields } => match given {
            Some(InitValue::Array(values)) => {
                if values.len() != fields.len() {
                    return Err(ApxError::ValueLength);
                }
                let resolved = fields
                    .iter()
                    .zip(values.iter())
                    .map(|((name, field), value)| Ok((name.clone(), derive_proper_init_value(field, Some(value))?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(InitValue::Record(resolved))
            }
            Some(_) => Err(ApxError::ValueType),
            None => {
                let resolved = fields
                    .iter()
                    .map(|(name, field)| Ok((name.clone(), derive_proper_init_value(field, None)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(InitValue::Record(resolved))
            }
        },
        DataElement::TypeRef(_) => Err(ApxError::InvalidTypeRef),
    }
}
