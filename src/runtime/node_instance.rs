//! The runtime realization of a parsed `Node` on one connection: sized,
//! offset-assigned ports backed by packed buffers, plus the bookkeeping a
//! server needs to route between nodes (`BytePortMap`, per-side
//! `ConnectorChangeTable`, and — server mode only — the live
//! provide→require connector table).
//!
//! Grounded on `apx_nodeInstance_t` (`node_instance.h`): the C struct fuses
//! parse-tree-derived sizing with runtime connection state behind one lock;
//! here the immutable layout (`PortInstance`s, `BytePortMap`) is computed
//! once at construction and the genuinely mutable parts
//! (`ConnectorChangeTable`, `NodeData`) carry their own interior mutability.

use std::sync::Arc;

use crate::error::Result;
use crate::node::Node;
use crate::packed::{compute_layout, BytePortMap};
use crate::runtime::connector_change::ConnectorChangeTable;
use crate::runtime::node_data::NodeData;
use crate::types::{DataState, Mode, PortType};

/// A port's runtime projection: its offset/size within the packed buffer
/// plus the canonical signature string used as its `PortSignatureMap` key.
///
/// `pack_program`/`unpack_program` are left as opaque byte blobs: the
/// bytecode VM that would populate and interpret them (spec.md §6) is a
/// separate subsystem out of scope for this crate, so a `NodeInstance` here
/// carries the slot but leaves it unset.
#[derive(Debug, Clone)]
pub struct PortInstance {
    pub port_id: usize,
    pub port_type: PortType,
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub signature: String,
    pub queue_length: Option<u32>,
    pub pack_program: Option<Vec<u8>>,
    pub unpack_program: Option<Vec<u8>>,
}

/// Identifies one port instance uniquely within a `NodeManager`'s set of
/// live node instances on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node_id: usize,
    pub port_type: PortType,
    pub port_id: usize,
}

/// One node's runtime state on a connection: its finalized parse tree, its
/// sized/offset-assigned ports, packed data, and routing bookkeeping.
pub struct NodeInstance {
    pub id: usize,
    pub mode: Mode,
    pub node: Node,
    pub node_data: Arc<NodeData>,
    pub provide_ports: Vec<PortInstance>,
    pub require_ports: Vec<PortInstance>,
    pub provide_byte_map: BytePortMap,
    pub require_byte_map: BytePortMap,
    pub provide_changes: ConnectorChangeTable,
    pub require_changes: ConnectorChangeTable,
    /// Server-side only: for each provide-port id, the set of require-port
    /// refs currently routed to it (spec.md §3 `connector_table`).
    pub connector_table: Vec<Vec<PortRef>>,
    pub definition_state: DataState,
    pub provide_state: DataState,
    pub require_state: DataState,
    pub definition_address: Option<u32>,
    pub provide_data_address: Option<u32>,
    pub require_data_address: Option<u32>,
}

impl NodeInstance {
    /// Build a `NodeInstance` from a finalized `Node`: lay out every port's
    /// packed offset, derive its canonical signature, and seed its packed
    /// buffer from the node's computed proper init values.
    pub fn from_finalized_node(id: usize, mode: Mode, node: Node) -> Result<Self> {
        let node_data = Arc::new(NodeData::new());
        let (provide_ports, require_ports, provide_byte_map, require_byte_map) = layout_into(&node, &node_data)?;
        let connector_table = vec![Vec::new(); provide_ports.len()];

        Ok(Self {
            id,
            mode,
            node,
            node_data,
            provide_ports,
            require_ports,
            provide_byte_map,
            require_byte_map,
            provide_changes: ConnectorChangeTable::new(),
            require_changes: ConnectorChangeTable::new(),
            connector_table,
            definition_state: DataState::Init,
            provide_state: DataState::Init,
            require_state: DataState::Init,
            definition_address: None,
            provide_data_address: None,
            require_data_address: None,
        })
    }

    /// Build an empty placeholder instance for a node whose name and `.apx`
    /// size are known (from a remote `PUBLISH_FILE`) but whose definition
    /// bytes haven't arrived yet (spec.md §8 S3). The definition buffer is
    /// zero-filled at `definition_size` bytes and the instance carries no
    /// ports until [`NodeInstance::materialize`] replaces the empty `Node`
    /// with a parsed and finalized one.
    pub fn placeholder(id: usize, mode: Mode, name: impl Into<String>, definition_size: usize) -> Self {
        let mut node = Node::new(name);
        node.finalize().expect("an empty node has nothing to fail finalize on");
        let node_data = Arc::new(NodeData::new());
        node_data.create_definition_data(definition_size);
        node_data.create_port_data(&[], 0, &[], 0);
        Self {
            id,
            mode,
            node,
            node_data,
            provide_ports: Vec::new(),
            require_ports: Vec::new(),
            provide_byte_map: BytePortMap::build(&[], 0),
            require_byte_map: BytePortMap::build(&[], 0),
            provide_changes: ConnectorChangeTable::new(),
            require_changes: ConnectorChangeTable::new(),
            connector_table: Vec::new(),
            definition_state: DataState::WaitingForFileData,
            provide_state: DataState::WaitingForFileData,
            require_state: DataState::WaitingForFileData,
            definition_address: None,
            provide_data_address: None,
            require_data_address: None,
        }
    }

    /// Replace a placeholder's empty `Node` with a parsed-and-finalized one
    /// (the `.apx` definition having just finished arriving), re-running the
    /// same port layout/seeding pass [`NodeInstance::from_finalized_node`]
    /// uses. The definition buffer and its checksum are left untouched; only
    /// the port-derived state is recomputed.
    pub fn materialize(&mut self, node: Node) -> Result<()> {
        let (provide_ports, require_ports, provide_byte_map, require_byte_map) = layout_into(&node, &self.node_data)?;
        self.connector_table = vec![Vec::new(); provide_ports.len()];
        self.provide_ports = provide_ports;
        self.require_ports = require_ports;
        self.provide_byte_map = provide_byte_map;
        self.require_byte_map = require_byte_map;
        self.node = node;
        self.definition_state = DataState::Connected;
        self.provide_state = DataState::Connected;
        self.require_state = DataState::Connected;
        Ok(())
    }

    /// Populate the definition buffer with `text` (the node's own `.apx`
    /// source) and its SHA-256 digest, the way a client publishes its own
    /// definition file alongside its port data. Server-side placeholder
    /// instances instead receive these bytes fragment-by-fragment over the
    /// wire and never call this.
    pub fn seed_definition(&self, text: &str) {
        self.node_data.create_definition_data(text.len());
        self.node_data.write_definition_data(0, text.as_bytes()).expect("just-sized buffer fits its own source");
        self.node_data.set_checksum(crate::types::DigestType::Sha256, crate::runtime::node_data_codec::sha256(text.as_bytes()));
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn provide_port_by_name(&self, name: &str) -> Option<&PortInstance> {
        self.provide_ports.iter().find(|p| p.name == name)
    }

    pub fn require_port_by_name(&self, name: &str) -> Option<&PortInstance> {
        self.require_ports.iter().find(|p| p.name == name)
    }

    /// Route `provide_port_id`'s current packed bytes into
    /// `require_port_id` on `peer`'s packed require buffer, used right
    /// after a connect event so the new subscriber sees the latest value
    /// rather than waiting for the next publish (spec.md §4.9).
    pub fn shovel_initial_value(&self, provide_port_id: usize, peer: &NodeInstance, require_port_id: usize) -> Result<()> {
        let provide_port = &self.provide_ports[provide_port_id];
        let require_port = &peer.require_ports[require_port_id];
        debug_assert_eq!(provide_port.size, require_port.size);
        let bytes = self.node_data.read_provide_port_data(provide_port.offset, provide_port.size)?;
        peer.node_data.write_require_port_data(require_port.offset, &bytes)
    }
}

/// Shared by [`NodeInstance::from_finalized_node`] and
/// [`NodeInstance::materialize`]: lay out `node`'s ports, seed `node_data`'s
/// port buffers from their derived init values, and build each side's
/// `PortInstance` list and `BytePortMap`.
fn layout_into(node: &Node, node_data: &NodeData) -> Result<(Vec<PortInstance>, Vec<PortInstance>, BytePortMap, BytePortMap)> {
    debug_assert!(node.is_finalized());
    let (provide_layouts, provide_total) = compute_layout(&node.provide_ports)?;
    let (require_layouts, require_total) = compute_layout(&node.require_ports)?;
    let provide_byte_map = BytePortMap::build(&provide_layouts, provide_total);
    let require_byte_map = BytePortMap::build(&require_layouts, require_total);

    let provide_init = crate::runtime::node_data_codec::encode_ports(&node.provide_ports, &provide_layouts, provide_total)?;
    let require_init = crate::runtime::node_data_codec::encode_ports(&node.require_ports, &require_layouts, require_total)?;
    node_data.create_port_data(&provide_init, node.provide_ports.len(), &require_init, node.require_ports.len());

    let provide_ports = build_port_instances(&node.provide_ports, &provide_layouts);
    let require_ports = build_port_instances(&node.require_ports, &require_layouts);
    Ok((provide_ports, require_ports, provide_byte_map, require_byte_map))
}

fn build_port_instances(ports: &[crate::node::Port], layouts: &[crate::packed::PortLayout]) -> Vec<PortInstance> {
    ports
        .iter()
        .zip(layouts.iter())
        .map(|(port, layout)| PortInstance {
            port_id: port.id,
            port_type: port.port_type,
            name: port.name.clone(),
            offset: layout.offset,
            size: layout.size,
            signature: port.effective_element.as_ref().map(|e| e.canonical()).unwrap_or_default(),
            queue_length: port.attributes.queue_len,
            pack_program: None,
            unpack_program: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::attribute::{InitValue, PortAttributes};
    use crate::parser::data_element::DataElement;
    use crate::types::TypeCode;

    fn simple_node() -> Node {
        let mut node = Node::new("TestNode");
        let mut attrs = PortAttributes::default();
        attrs.init_value = Some(InitValue::Integer(7));
        node.declare_port(PortType::Provide, "Value", DataElement::scalar(TypeCode::U8), attrs);
        node.finalize().unwrap();
        node
    }

    #[test]
    fn from_finalized_node_seeds_packed_buffer_with_init_value() {
        let instance = NodeInstance::from_finalized_node(0, Mode::Client, simple_node()).unwrap();
        assert_eq!(instance.node_data.provide_port_data_snapshot(), vec![7]);
        assert_eq!(instance.provide_ports[0].signature, "C");
    }

    #[test]
    fn shovel_initial_value_copies_provide_bytes_into_peer_require_buffer() {
        let provider = NodeInstance::from_finalized_node(0, Mode::Server, simple_node());
        let provider = provider.unwrap();

        let mut consumer_node = Node::new("Consumer");
        consumer_node.declare_port(PortType::Require, "Value", DataElement::scalar(TypeCode::U8), PortAttributes::default());
        consumer_node.finalize().unwrap();
        let consumer = NodeInstance::from_finalized_node(1, Mode::Server, consumer_node).unwrap();

        provider.node_data.write_provide_port_data(0, &[42]).unwrap();
        provider.shovel_initial_value(0, &consumer, 0).unwrap();
        assert_eq!(consumer.node_data.require_port_data_snapshot(), vec![42]);
    }
}
