//! Packed-buffer layout: per-port byte offsets within a node's provide/require
//! buffer, and the reverse lookup (`BytePortMap`) from a byte offset back to
//! the port that owns it.
//!
//! A port's packed size follows a fixed size table: a scalar is its
//! type code's native size; a fixed array is element-size × length; a
//! dynamic array additionally carries a `len_bytes(max_len)`-byte count
//! prefix; a record is the sum of its fields; a queued port wraps its
//! (non-queued) element size in the same length-prefixed encoding, holding
//! up to `queue_len` queued instances back-to-back.

use crate::error::{ApxError, Result};
use crate::node::Port;
use crate::parser::data_element::DataElement;

/// Number of bytes needed to encode a count up to `max_len` inclusive.
pub fn len_bytes(max_len: u32) -> usize {
    if max_len <= 255 {
        1
    } else if max_len <= 65535 {
        2
    } else {
        4
    }
}

/// Packed size in bytes of a single (non-queued) data element instance.
pub fn element_packed_size(element: &DataElement) -> Result<usize> {
    Ok(match element {
        DataElement::Scalar { type_code, .. } => type_code.scalar_size(),
        DataElement::Array { element, len, dynamic } => {
            let inner = element_packed_size(element)?;
            if *dynamic {
                len_bytes(*len) + inner * (*len as usize)
            } else {
                inner * (*len as usize)
            }
        }
        DataElement::Record { fields } => {
            let mut total = 0;
            for (_, field) in fields {
                total += element_packed_size(field)?;
            }
            total
        }
        DataElement::TypeRef(_) => return Err(ApxError::InvalidTypeRef),
    })
}

/// Packed size in bytes of an entire port, including the queue-count prefix
/// and per-slot repetition when the port is queued.
pub fn port_packed_size(port: &Port) -> Result<usize> {
    let effective = port.effective_element.as_ref().ok_or(ApxError::MissingBuffer)?;
    let element_size = element_packed_size(effective)?;
    Ok(match port.attributes.queue_len {
        Some(queue_len) => len_bytes(queue_len) + element_size * queue_len as usize,
        None => element_size,
    })
}

/// A port's placement within its node's packed provide/require buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortLayout {
    pub port_id: usize,
    pub offset: usize,
    pub size: usize,
}

/// Lay out `ports` back-to-back in declaration order, returning each port's
/// offset and size plus the buffer's total length.
pub fn compute_layout(ports: &[Port]) -> Result<(Vec<PortLayout>, usize)> {
    let mut layouts = Vec::with_capacity(ports.len());
    let mut offset = 0usize;
    for port in ports {
        let size = port_packed_size(port)?;
        layouts.push(PortLayout { port_id: port.id, offset, size });
        offset += size;
    }
    Ok((layouts, offset))
}

/// Maps every byte offset in a packed buffer back to the id of the port
/// that owns it.
#[derive(Debug, Clone)]
pub struct BytePortMap {
    owners: Vec<usize>,
}

impl BytePortMap {
    pub fn build(layouts: &[PortLayout], total_size: usize) -> Self {
        let mut owners = vec![usize::MAX; total_size];
        for layout in layouts {
            for byte in &mut owners[layout.offset..layout.offset + layout.size] {
                *byte = layout.port_id;
            }
        }
        Self { owners }
    }

    /// Port id owning `offset`, or `None` if it falls outside every port's
    /// range (should not happen for an offset within a well-formed buffer).
    pub fn port_at(&self, offset: usize) -> Option<usize> {
        self.owners.get(offset).copied().filter(|&id| id != usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
