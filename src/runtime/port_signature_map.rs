//! Groups ports across every node on a connection by their canonical
//! effective-signature string, the routing key that decides which
//! provide-ports feed which require-ports (spec.md §3 `PortSignatureMap`,
//! §4.9).
//!
//! Grounded on `apx_portSignatureMap_t` / `port_signature_map_entry.h`: one
//! entry per distinct signature string, holding the require-side and
//! provide-side port lists. Connect/disconnect walk both lists of the
//! affected entry and record the resulting deltas on each side's
//! `NodeInstance::{provide,require}_changes` table.

use std::collections::HashMap;

use crate::runtime::node_instance::PortRef;
use crate::types::PortType;

#[derive(Debug, Default)]
struct Entry {
    require_side: Vec<PortRef>,
    provide_side: Vec<PortRef>,
}

impl Entry {
    fn is_empty(&self) -> bool {
        self.require_side.is_empty() && self.provide_side.is_empty()
    }
}

/// One connect/disconnect notification to feed into the affected
/// `NodeInstance`'s `ConnectorChangeTable`s and, at the application layer,
/// `ConnectionEvents::port_connector_change_notify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingEvent {
    Connected { provide: PortRef, require: PortRef },
    Disconnected { provide: PortRef, require: PortRef },
}

/// Cross-node grouping of ports by canonical signature string.
#[derive(Debug, Default)]
pub struct PortSignatureMap {
    entries: HashMap<String, Entry>,
}

impl PortSignatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `port_ref` under `signature`, returning every connect event
    /// this creates against ports already on the opposite side.
    pub fn attach(&mut self, signature: &str, port_type: PortType, port_ref: PortRef) -> Vec<RoutingEvent> {
        let entry = self.entries.entry(signature.to_string()).or_default();
        let mut events = Vec::new();
        match port_type {
            PortType::Provide => {
                for &require in &entry.require_side {
                    events.push(RoutingEvent::Connected { provide: port_ref, require });
                }
                entry.provide_side.push(port_ref);
            }
            PortType::Require => {
                for &provide in &entry.provide_side {
                    events.push(RoutingEvent::Connected { provide, require: port_ref });
                }
                entry.require_side.push(port_ref);
            }
        }
        events
    }

    /// Remove `port_ref` from `signature`'s entry, returning the resulting
    /// disconnect events. Drops the entry entirely once both sides are
    /// empty.
    pub fn detach(&mut self, signature: &str, port_type: PortType, port_ref: PortRef) -> Vec<RoutingEvent> {
        let mut events = Vec::new();
        let Some(entry) = self.entries.get_mut(signature) else {
            return events;
        };
        match port_type {
            PortType::Provide => {
                entry.provide_side.retain(|&p| p != port_ref);
                for &require in &entry.require_side {
                    events.push(RoutingEvent::Disconnected { provide: port_ref, require });
                }
            }
            PortType::Require => {
                entry.require_side.retain(|&p| p != port_ref);
                for &provide in &entry.provide_side {
                    events.push(RoutingEvent::Disconnected { provide, require: port_ref });
                }
            }
        }
        if entry.is_empty() {
            self.entries.remove(signature);
        }
        events
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
