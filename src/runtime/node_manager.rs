//! Owns every `NodeInstance` attached to one connection and the
//! cross-node `PortSignatureMap` that routes provide-ports to require-ports
//! sharing a signature.
//!
//! Grounded on `apx_nodeManager_t` (`node_manager.h`, exercised by
//! `testsuite_node_manager_client.c` / `testsuite_node_manager_server.c`):
//! on the client side a node is attached straight from its `.apx` text; on
//! the server side the same text arrives as the payload of a remote
//! definition file once `FileManager` has finished receiving it. Either way
//! attaching a node means finalizing its parse tree, laying out its packed
//! buffers (`NodeInstance::from_finalized_node`), and feeding every one of
//! its ports into the shared `PortSignatureMap` so routing updates as soon
//! as a matching peer shows up.

use crate::error::{ApxError, Result};
use crate::node::{self, Node};
use crate::runtime::node_instance::{NodeInstance, PortRef};
use crate::runtime::port_signature_map::{PortSignatureMap, RoutingEvent};
use crate::types::{Mode, PortType};

/// Packs a `PortRef` into the plain `usize` peer id `ConnectorChangeTable`
/// expects, so one table can track peers that live on other nodes.
fn peer_key(port_ref: PortRef) -> usize {
    (port_ref.node_id << 32) | port_ref.port_id
}

/// Owns every node instance attached to a connection in one direction
/// (`Mode::Client` or `Mode::Server`) plus the routing table shared across
/// them.
pub struct NodeManager {
    mode: Mode,
    instances: Vec<NodeInstance>,
    signature_map: PortSignatureMap,
}

impl NodeManager {
    pub fn new(mode: Mode) -> Self {
        Self { mode, instances: Vec::new(), signature_map: PortSignatureMap::new() }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&NodeInstance> {
        self.instances.iter().find(|n| n.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut NodeInstance> {
        self.instances.iter_mut().find(|n| n.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&NodeInstance> {
        self.instances.iter().find(|n| n.name() == name)
    }

    pub fn last_attached(&self) -> Option<&NodeInstance> {
        self.instances.last()
    }

    /// Parse `text` as a complete `.apx` definition, finalize it, lay out
    /// its packed buffers, and register its ports for routing. Used
    /// directly on the client side once a definition is authored locally,
    /// and on the server side once `FileManager` has assembled the full
    /// bytes of a remote definition file (the wire payload is the same
    /// text).
    pub fn attach_from_text(&mut self, text: &str) -> Result<usize> {
        let mut parsed = node::build_node(text).map_err(|e| e.error)?;
        parsed.finalize()?;
        let id = self.attach_node(parsed)?;
        self.instances[id].seed_definition(text);
        Ok(id)
    }

    fn attach_node(&mut self, node: Node) -> Result<usize> {
        let id = self.instances.len();
        let instance = NodeInstance::from_finalized_node(id, self.mode, node)?;
        self.instances.push(instance);
        self.register_ports(id);
        Ok(id)
    }

    /// Server-side counterpart to `attach_from_text` (spec.md §8 S3): a
    /// remote `PUBLISH_FILE` for `name.apx` arrived with a known size but no
    /// content yet. Registers an empty placeholder instance with no ports so
    /// callers can immediately issue an `OPEN_FILE` for its definition
    /// address; the instance gains ports once `finalize_placeholder`
    /// succeeds.
    pub fn attach_placeholder(&mut self, name: &str, definition_size: usize) -> usize {
        let id = self.instances.len();
        self.instances.push(NodeInstance::placeholder(id, self.mode, name, definition_size));
        id
    }

    /// Write one fragment of a placeholder's `.apx` definition bytes as they
    /// arrive over the wire.
    pub fn write_definition_bytes(&mut self, id: usize, offset: usize, data: &[u8]) -> Result<()> {
        let instance = self.get(id).ok_or(ApxError::InvalidAddress)?;
        instance.node_data.write_definition_data(offset, data)
    }

    /// Parse and finalize a placeholder's now-complete definition buffer,
    /// replacing its empty `Node` with the materialized one and registering
    /// its ports for routing. The definition text must be valid UTF-8 and a
    /// complete `.apx` document; a caller normally invokes this once the
    /// file's declared size has been fully written.
    pub fn finalize_placeholder(&mut self, id: usize) -> Result<()> {
        let bytes = {
            let instance = self.get(id).ok_or(ApxError::InvalidAddress)?;
            instance.node_data.definition_data()
        };
        let text = std::str::from_utf8(&bytes).map_err(|_| ApxError::Parse(0))?;
        let mut parsed = node::build_node(text).map_err(|e| e.error)?;
        parsed.finalize()?;
        {
            let instance = self.get_mut(id).ok_or(ApxError::InvalidAddress)?;
            instance.materialize(parsed)?;
        }
        self.register_ports(id);
        Ok(())
    }

    /// Feed every port of node `id` into the shared signature map, applying
    /// the resulting connect events to both sides' `ConnectorChangeTable`s
    /// and, for provide ports that just gained a subscriber, pushing the
    /// port's current value into the new peer's require buffer (spec.md
    /// §4.9's "push initial value on connect").
    fn register_ports(&mut self, id: usize) {
        let mut events = Vec::new();
        {
            let instance = self.get(id).expect("just inserted");
            for port in &instance.provide_ports {
                let port_ref = PortRef { node_id: id, port_type: PortType::Provide, port_id: port.port_id };
                events.extend(self.signature_map.attach(&port.signature, PortType::Provide, port_ref));
            }
            for port in &instance.require_ports {
                let port_ref = PortRef { node_id: id, port_type: PortType::Require, port_id: port.port_id };
                events.extend(self.signature_map.attach(&port.signature, PortType::Require, port_ref));
            }
        }
        self.apply_routing_events(&events);
    }

    /// Detach every port belonging to node `id` from the signature map and
    /// drop the instance. Returns the disconnect events so a caller can
    /// notify application code (`ConnectionEvents::port_connector_change_notify`).
    pub fn detach_node(&mut self, id: usize) -> Vec<RoutingEvent> {
        let Some(pos) = self.instances.iter().position(|n| n.id == id) else {
            return Vec::new();
        };
        let instance = self.instances.remove(pos);
        let mut events = Vec::new();
        for port in &instance.provide_ports {
            let port_ref = PortRef { node_id: id, port_type: PortType::Provide, port_id: port.port_id };
            events.extend(self.signature_map.detach(&port.signature, PortType::Provide, port_ref));
        }
        for port in &instance.require_ports {
            let port_ref = PortRef { node_id: id, port_type: PortType::Require, port_id: port.port_id };
            events.extend(self.signature_map.detach(&port.signature, PortType::Require, port_ref));
        }
        self.apply_routing_events(&events);
        events
    }

    fn apply_routing_events(&mut self, events: &[RoutingEvent]) {
        for event in events {
            match *event {
                RoutingEvent::Connected { provide, require } => {
                    if let Some(n) = self.get_mut(provide.node_id) {
                        n.provide_changes.connect(provide.port_id, peer_key(require));
                        if n.mode == Mode::Server {
                            n.connector_table[provide.port_id].push(require);
                        }
                    }
                    if let Some(n) = self.get_mut(require.node_id) {
                        n.require_changes.connect(require.port_id, peer_key(provide));
                    }
                    let _ = self.shovel_initial_value(provide, require);
                }
                RoutingEvent::Disconnected { provide, require } => {
                    if let Some(n) = self.get_mut(provide.node_id) {
                        n.provide_changes.disconnect(provide.port_id, peer_key(require));
                        if n.mode == Mode::Server {
                            n.connector_table[provide.port_id].retain(|&r| r != require);
                        }
                    }
                    if let Some(n) = self.get_mut(require.node_id) {
                        n.require_changes.disconnect(require.port_id, peer_key(provide));
                    }
                }
            }
        }
    }

    fn shovel_initial_value(&self, provide: PortRef, require: PortRef) -> Result<()> {
        let provider = self.get(provide.node_id).ok_or(ApxError::InvalidAddress)?;
        let consumer = self.get(require.node_id).ok_or(ApxError::InvalidAddress)?;
        provider.shovel_initial_value(provide.port_id, consumer, require.port_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCER: &str = "APX/1.2\nN\"Producer\"\nP\"Value\"C:=7\n";
    const CONSUMER: &str = "APX/1.2\nN\"Consumer\"\nR\"Value\"C\n";

    #[test]
    fn attaching_matching_nodes_connects_ports_and_pushes_initial_value() {
        let mut manager = NodeManager::new(Mode::Server);
        let producer_id = manager.attach_from_text(PRODUCER).unwrap();
        let consumer_id = manager.attach_from_text(CONSUMER).unwrap();

        let producer = manager.get(producer_id).unwrap();
        assert_eq!(producer.provide_changes.delta(0), 1);
        let consumer = manager.get(consumer_id).unwrap();
        assert_eq!(consumer.require_changes.delta(0), 1);
        assert_eq!(consumer.node_data.require_port_data_snapshot(), vec![7]);
    }

    #[test]
    fn detaching_a_node_disconnects_its_peers() {
        let mut manager = NodeManager::new(Mode::Server);
        let producer_id = manager.attach_from_text(PRODUCER).unwrap();
        let consumer_id = manager.attach_from_text(CONSUMER).unwrap();

        let events = manager.detach_node(producer_id);
        assert_eq!(events.len(), 1);
        assert_eq!(manager.len(), 1);
        let consumer = manager.get(consumer_id).unwrap();
        assert_eq!(consumer.require_changes.delta(0), 0);
        assert_eq!(consumer.require_changes.connected_peers(0), Vec::<usize>::new());
    }

    #[test]
    fn mismatched_signatures_never_connect() {
        let mut manager = NodeManager::new(Mode::Server);
        manager.attach_from_text(PRODUCER).unwrap();
        let consumer_id = manager.attach_from_text("APX/1.2\nN\"Other\"\nR\"Value\"S\n").unwrap();
        let consumer = manager.get(consumer_id).unwrap();
        assert_eq!(consumer.require_changes.delta(0), 0);
    }

    #[test]
    fn attach_from_text_seeds_definition_buffer_and_checksum() {
        let mut manager = NodeManager::new(Mode::Client);
        let id = manager.attach_from_text(PRODUCER).unwrap();
        let instance = manager.get(id).unwrap();
        assert_eq!(instance.node_data.definition_data(), PRODUCER.as_bytes());
        assert!(instance.node_data.checksum().is_some());
    }

    /// spec.md §8 S3: a remote `.apx` arrives as a bare `PUBLISH_FILE` with
    /// a known size and no content; the node instance starts out with an
    /// empty, zero-filled definition buffer and no ports, and only gains
    /// both once its definition bytes are fully written and re-parsed.
    #[test]
    fn server_materializes_placeholder_once_definition_bytes_arrive() {
        let mut manager = NodeManager::new(Mode::Server);
        let text = "APX/1.2\nN\"Node1\"\nP\"Value\"C:=7\n";
        let id = manager.attach_placeholder("Node1", text.len());

        let instance = manager.get(id).unwrap();
        assert_eq!(instance.node_data.definition_data(), vec![0u8; text.len()]);
        assert_eq!(instance.provide_ports.len(), 0);
        assert_eq!(instance.definition_state, crate::types::DataState::WaitingForFileData);

        manager.write_definition_bytes(id, 0, text.as_bytes()).unwrap();
        manager.finalize_placeholder(id).unwrap();

        let instance = manager.get(id).unwrap();
        assert_eq!(instance.name(), "Node1");
        assert_eq!(instance.provide_ports.len(), 1);
        assert_eq!(instance.node_data.provide_port_data_snapshot(), vec![7]);
        assert_eq!(instance.definition_state, crate::types::DataState::Connected);
    }
}
