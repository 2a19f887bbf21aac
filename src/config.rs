//! Process/connection-wide configuration constants (spec.md §6).
//!
//! Styled after the teacher's `ipc::TransportConfig` / `defaults` module
//! (`ipc/mod.rs`, `lib.rs`): a small `Config` struct with a `Default` impl
//! documenting each field's rationale, rather than bare free-floating consts.

use serde::{Deserialize, Serialize};

/// Numheader length-prefix width used to frame messages on the wire.
///
/// Per spec.md §9(iii), the original source defines a 2-byte numheader
/// alongside the 4-byte default but never exercises the former in its test
/// corpus. This crate implements the 32-bit form only and rejects greetings
/// that advertise 16-bit headers (`ApxError::InvalidHeader`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumHeaderWidth {
    Bits32,
}

impl Default for NumHeaderWidth {
    fn default() -> Self {
        NumHeaderWidth::Bits32
    }
}

/// Process/connection-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of pending commands in a file manager worker's queue.
    ///
    /// Bounds memory use of the outbound command ring buffer; once full,
    /// `prepare_*` calls return `ApxError::BufferFull` rather than blocking
    /// (spec.md §4.8 backpressure contract).
    pub max_num_messages: usize,

    /// Maximum size in bytes of any single file (provide/require/user data).
    pub max_file_size: usize,

    /// Maximum size in bytes of a node's `.apx` definition text.
    pub max_definition_size: usize,

    /// Maximum concurrent connections a server-mode endpoint accepts.
    pub server_max_concurrent_connections: usize,

    /// Numheader length-prefix width for framing messages on the wire.
    pub numheader_format: NumHeaderWidth,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_num_messages: 1024,
            max_file_size: 16 * 1024 * 1024,
            max_definition_size: 8 * 1024 * 1024,
            server_max_concurrent_connections: 4000,
            numheader_format: NumHeaderWidth::Bits32,
        }
    }
}
