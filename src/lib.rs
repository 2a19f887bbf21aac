//! # APX
//!
//! A pub/sub middleware core exchanging signal-level data between nodes
//! (producers/consumers of typed provide/require ports) over a bidirectional
//! byte stream via a server/router.
//!
//! In scope: the APX definition-language front end (signature and attribute
//! parsers), the RemoteFile (RMF) protocol engine, the file manager, and the
//! node instance / routing fabric. Socket acceptors, a pack/unpack bytecode
//! VM, and a syslog-style text log sink are treated as external
//! collaborators behind trait seams (`connection::Transport`,
//! `connection::ConnectionEvents`).

pub mod cli;
pub mod config;
pub mod connection;
pub mod error;
pub mod file;
pub mod file_manager;
pub mod node;
pub mod packed;
pub mod parser;
pub mod receiver;
pub mod rmf;
pub mod runtime;
pub mod types;
pub mod worker;

pub use config::Config;
pub use error::{ApxError, Result};
pub use node::Node;
pub use runtime::{NodeData, NodeInstance, NodeManager};

/// The current version of the crate, exposed for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
