//! Mutable runtime state backing one node instance: the `.apx` definition
//! text, the packed provide/require port buffers, and per-port connection
//! counts.
//!
//! Grounded on `apx_nodeData_t` (`node_data.h`): a strong reference owned by
//! its `NodeInstance`, guarded by a single lock so that a network-thread
//! write and an application-thread read never tear a multi-byte value.

use parking_lot::Mutex;

use crate::error::{ApxError, Result};
use crate::types::DigestType;

#[derive(Debug, Default)]
struct Buffers {
    definition_data: Vec<u8>,
    provide_port_data: Vec<u8>,
    require_port_data: Vec<u8>,
    provide_port_connection_count: Vec<u32>,
    require_port_connection_count: Vec<u32>,
    checksum_type: Option<DigestType>,
    checksum_data: Vec<u8>,
}

/// Mutable, lockable runtime state for one node instance (spec.md §3
/// `NodeData`). Definition bytes, packed port buffers, and connection
/// counts are all read/written through this single lock.
#[derive(Debug, Default)]
pub struct NodeData {
    inner: Mutex<Buffers>,
}

impl NodeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a definition buffer of `size` bytes, zero-filled.
    pub fn create_definition_data(&self, size: usize) {
        let mut inner = self.inner.lock();
        inner.definition_data = vec![0u8; size];
    }

    /// Allocate provide/require port buffers seeded from `provide_init` and
    /// `require_init` (the node's computed init values, already packed),
    /// plus one connection-count slot per port.
    pub fn create_port_data(&self, provide_init: &[u8], num_provide_ports: usize, require_init: &[u8], num_require_ports: usize) {
        let mut inner = self.inner.lock();
        inner.provide_port_data = provide_init.to_vec();
        inner.require_port_data = require_init.to_vec();
        inner.provide_port_connection_count = vec![0; num_provide_ports];
        inner.require_port_connection_count = vec![0; num_require_ports];
    }

    pub fn definition_data_size(&self) -> usize {
        self.inner.lock().definition_data.len()
    }

    pub fn provide_port_data_size(&self) -> usize {
        self.inner.lock().provide_port_data.len()
    }

    pub fn require_port_data_size(&self) -> usize {
        self.inner.lock().require_port_data.len()
    }

    pub fn definition_data(&self) -> Vec<u8> {
        self.inner.lock().definition_data.clone()
    }

    pub fn write_definition_data(&self, offset: usize, src: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        write_at(&mut inner.definition_data, offset, src)
    }

    pub fn read_provide_port_data(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        read_at(&inner.provide_port_data, offset, len)
    }

    pub fn write_provide_port_data(&self, offset: usize, src: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        write_at(&mut inner.provide_port_data, offset, src)
    }

    pub fn read_require_port_data(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        read_at(&inner.require_port_data, offset, len)
    }

    pub fn write_require_port_data(&self, offset: usize, src: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        write_at(&mut inner.require_port_data, offset, src)
    }

    pub fn provide_port_data_snapshot(&self) -> Vec<u8> {
        self.inner.lock().provide_port_data.clone()
    }

    pub fn require_port_data_snapshot(&self) -> Vec<u8> {
        self.inner.lock().require_port_data.clone()
    }

    pub fn inc_provide_port_connection_count(&self, port_id: usize) {
        let mut inner = self.inner.lock();
        if let Some(c) = inner.provide_port_connection_count.get_mut(port_id) {
            *c += 1;
        }
    }

    pub fn dec_provide_port_connection_count(&self, port_id: usize) {
        let mut inner = self.inner.lock();
        if let Some(c) = inner.provide_port_connection_count.get_mut(port_id) {
            *c = c.saturating_sub(1);
        }
    }

    pub fn inc_require_port_connection_count(&self, port_id: usize) {
        let mut inner = self.inner.lock();
        if let Some(c) = inner.require_port_connection_count.get_mut(port_id) {
            *c += 1;
        }
    }

    pub fn dec_require_port_connection_count(&self, port_id: usize) {
        let mut inner = self.inner.lock();
        if let Some(c) = inner.require_port_connection_count.get_mut(port_id) {
            *c = c.saturating_sub(1);
        }
    }

    pub fn provide_port_connection_count(&self, port_id: usize) -> u32 {
        self.inner.lock().provide_port_connection_count.get(port_id).copied().unwrap_or(0)
    }

    pub fn require_port_connection_count(&self, port_id: usize) -> u32 {
        self.inner.lock().require_port_connection_count.get(port_id).copied().unwrap_or(0)
    }

    pub fn set_checksum(&self, checksum_type: DigestType, checksum_data: Vec<u8>) {
        let mut inner = self.inner.lock();
        inner.checksum_type = Some(checksum_type);
        inner.checksum_data = checksum_data;
    }

    pub fn checksum(&self) -> Option<(DigestType, Vec<u8>)> {
        let inner = self.inner.lock();
        inner.checksum_type.map(|t| (t, inner.checksum_data.clone()))
    }
}

fn write_at(buf: &mut [u8], offset: usize, src: &[u8]) -> Result<()> {
    let end = offset.checked_add(src.len()).ok_or(ApxError::BufferBoundary)?;
    if end > buf.len() {
        return Err(ApxError::BufferBoundary);
    }
    buf[offset..end].copy_from_slice(src);
    Ok(())
}

fn read_at(buf: &[u8], offset: usize, len: usize) -> Result<Vec<u8>> {
    let end = offset.checked_add(len).ok_or(ApxError::BufferBoundary)?;
    buf.get(offset..end).map(|s| s.to_vec()).ok_or(ApxError::BufferBoundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_provide_port_data_round_trips() {
        let data = NodeData::new();
        data.create_port_data(&[0u8; 4], 1, &[0u8; 0], 0);
        data.write_provide_port_data(0, &[1, 2, 3, 4]).unwrap();
        assert_eq!(data.read_provide_port_data(0, 4).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn write_past_end_is_buffer_boundary_error() {
        let data = NodeData::new();
        data.create_port_data(&[0u8; 4], 1, &[], 0);
        assert_eq!(data.write_provide_port_data(2, &[1, 2, 3]), Err(ApxError::BufferBoundary));
    }

    #[test]
    fn connection_counts_increment_and_decrement_independently() {
        let data = NodeData::new();
        data.create_port_data(&[], 2, &[], 0);
        data.inc_provide_port_connection_count(0);
        data.inc_provide_port_connection_count(0);
        data.inc_provide_port_connection_count(1);
        assert_eq!(data.provide_port_connection_count(0), 2);
        assert_eq!(data.provide_port_connection_count(1), 1);
        data.dec_provide_port_connection_count(0);
        assert_eq!(data.provide_port_connection_count(0), 1);
    }

    #[test]
    fn checksum_round_trips() {
        let data = NodeData::new();
        assert!(data.checksum().is_none());
        data.set_checksum(DigestType::Sha256, vec![1u8; 32]);
        let (t, bytes) = data.checksum().unwrap();
        assert_eq!(t, DigestType::Sha256);
        assert_eq!(bytes.len(), 32);
    }
}
