//! The runtime/routing layer: per-node packed data buffers (`NodeData`),
//! the live node container (`NodeInstance`), cross-fleet signature grouping
//! (`PortSignatureMap`), per-port connect/disconnect bookkeeping
//! (`ConnectorChangeTable`), and node construction (`NodeManager`).

pub mod connector_change;
pub mod node_data;
pub mod node_data_codec;
pub mod node_instance;
pub mod node_manager;
pub mod port_signature_map;

pub use connector_change::ConnectorChangeTable;
pub use node_data::NodeData;
pub use node_instance::NodeInstance;
pub use node_manager::NodeManager;
pub use port_signature_map::PortSignatureMap;
