//! Per-port connect/disconnect delta tracking.
//!
//! Each port's entry starts absent (no connections, counter 0). A single
//! connect records the peer directly (`Single`) with `delta = 1`; a single
//! disconnect from empty records `delta = -1`. Once more than one peer is
//! simultaneously tracked (`|delta| > 1`), the entry switches to a heap-
//! allocated list of peers — the common case (one-to-one signal routing)
//! never pays for it.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectorState {
    None,
    Single(usize),
    Multiple(Vec<usize>),
}

#[derive(Debug, Clone)]
struct ConnectorEntry {
    delta: i32,
    state: ConnectorState,
}

impl Default for ConnectorEntry {
    fn default() -> Self {
        Self { delta: 0, state: ConnectorState::None }
    }
}

impl ConnectorEntry {
    fn connect(&mut self, peer: usize) {
        self.delta += 1;
        self.state = match std::mem::replace(&mut self.state, ConnectorState::None) {
            ConnectorState::None => ConnectorState::Single(peer),
            ConnectorState::Single(existing) => ConnectorState::Multiple(vec![existing, peer]),
            ConnectorState::Multiple(mut peers) => {
                peers.push(peer);
                ConnectorState::Multiple(peers)
            }
        };
    }

    fn disconnect(&mut self, peer: usize) {
        self.delta -= 1;
        self.state = match std::mem::replace(&mut self.state, ConnectorState::None) {
            ConnectorState::None => ConnectorState::None,
            ConnectorState::Single(existing) if existing == peer => ConnectorState::None,
            ConnectorState::Single(existing) => ConnectorState::Single(existing),
            ConnectorState::Multiple(mut peers) => {
                peers.retain(|&p| p != peer);
                match peers.len() {
                    0 => ConnectorState::None,
                    1 => ConnectorState::Single(peers[0]),
                    _ => ConnectorState::Multiple(peers),
                }
            }
        };
    }

    fn peers(&self) -> Vec<usize> {
        match &self.state {
            ConnectorState::None => Vec::new(),
            ConnectorState::Single(p) => vec![*p],
            ConnectorState::Multiple(peers) => peers.clone(),
        }
    }
}

/// Tracks, per port id, the net change in connected peers since the table
/// was last drained.
#[derive(Debug, Clone, Default)]
pub struct ConnectorChangeTable {
    entries: HashMap<usize, ConnectorEntry>,
}

impl ConnectorChangeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, port_id: usize, peer_port_id: usize) {
        self.entries.entry(port_id).or_default().connect(peer_port_id);
    }

    pub fn disconnect(&mut self, port_id: usize, peer_port_id: usize) {
        self.entries.entry(port_id).or_default().disconnect(peer_port_id);
    }

    pub fn delta(&self, port_id: usize) -> i32 {
        self.entries.get(&port_id).map(|e| e.delta).unwrap_or(0)
    }

    pub fn connected_peers(&self, port_id: usize) -> Vec<usize> {
        self.entries.get(&port_id).map(|e| e.peers()).unwrap_or_default()
    }

    /// Drain every port's accumulated delta, resetting each to 0 while
    /// keeping its current peer set (only the *delta* is ephemeral; the
    /// routing table's membership persists until explicit disconnects).
    pub fn drain_deltas(&mut self) -> Vec<(usize, i32)> {
        let mut changes = Vec::new();
        for (port_id, entry) in self.entries.iter_mut() {
            if entry.delta != 0 {
                changes.push((*port_id, entry.delta));
                entry.delta = 0;
            }
        }
        changes
    }
}
