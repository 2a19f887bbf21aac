//! Transport and event seams a `FileManager` is driven through.
//!
//! Kept as two separate traits rather than fused into one: `Transport` is
//! the outbound byte-stream collaborator (how bytes leave this process),
//! `ConnectionEvents` is the inbound notification collaborator (what the
//! rest of the node/routing layer learns about). A socket acceptor
//! implementing `Transport` is out of scope for this crate; tests drive
//! both with in-memory fakes.

use crate::error::{ApxError, Result};
use crate::file::FileInfo;

/// How a `FileManager` writes bytes to its peer. Implementations own
/// framing below the RMF numheader/address layer (e.g. a TCP socket with a
/// length-prefixed `FILE_MSG`).
pub trait Transport: Send + Sync {
    /// Largest single write this transport can accept without fragmenting.
    fn max_buffer_size(&self) -> usize;

    /// Bytes currently free in the transport's outbound buffer.
    fn current_bytes_available(&self) -> usize;

    /// Called before a batch of writes that must land together.
    fn transmit_begin(&self) -> Result<()>;

    /// Called after a batch of writes; implementations may flush here.
    fn transmit_end(&self) -> Result<()>;

    /// Write a data-channel message: an address header (with more-bit) and
    /// `data` are already RMF-framed by the caller's numheader, the
    /// transport just appends its own envelope and sends.
    fn transmit_data_message(&self, address: u32, more_bit: bool, data: &[u8]) -> Result<()>;

    /// Write a message with no address prefix (used for the initial
    /// greeting exchange).
    fn transmit_direct_message(&self, data: &[u8]) -> Result<()>;
}

/// Notifications a `FileManager` raises as it processes inbound traffic.
/// Implemented by the node/routing layer that owns the connection.
pub trait ConnectionEvents: Send + Sync {
    /// The peer published a file (sent `FILE_INFO`/`PUBLISH_FILE`).
    fn remote_file_published_notification(&self, info: &FileInfo);

    /// The peer revoked a previously published file.
    fn remote_file_revoked_notification(&self, address: u32);

    /// A write landed inside a file this side has open, at `offset` from
    /// the start of that file.
    fn remote_file_write_notification(&self, address: u32, offset: u32, data: &[u8]);

    /// A new node instance was fully constructed on this connection (client
    /// side: its `.apx` definition was parsed; server side: the peer's
    /// remote `.apx` file was received and parsed).
    fn node_created_notification(&self, node_name: &str);

    /// A provide/require port's connection count changed; `delta` mirrors
    /// `ConnectorChangeTable`'s signed counter semantics.
    fn port_connector_change_notify(&self, node_name: &str, port_name: &str, delta: i32);

    /// This side's own file at `address` was just opened by the peer
    /// (inbound `OPEN_FILE`). Returning bytes here causes them to be pushed
    /// to the peer immediately as that file's current content (spec.md
    /// §4.7's `open_notify`, used for provide-port-data `.out` files);
    /// returning `None` means nothing is pushed, the default for file kinds
    /// with no push-on-open behavior (`.apx`, `.in`).
    fn local_file_open_notify(&self, address: u32) -> Option<Vec<u8>> {
        let _ = address;
        None
    }
}

/// Drives one connection end to end: the RMFP greeting exchange, then
/// dispatch of every inbound numheader-delimited message to a `FileManager`.
///
/// Grounded on `apx_clientConnection_t`/`apx_serverConnection_t`
/// (`connection.h`): both specializations share one base state machine, and
/// differ only in which side speaks the greeting first. A socket acceptor
/// driving bytes into `on_inbound_bytes` is out of scope (spec.md §1); this
/// type is the part above that boundary — greeting exchange, message
/// framing, and dispatch to `FileManager` — so the "event loop" spec.md §5
/// assigns its own thread is realized here as a plain synchronous reactor
/// that whatever owns the socket drives by calling `on_inbound_bytes` as
/// bytes arrive, rather than as a literal thread this crate spawns.
pub struct Connection {
    mode: crate::types::Mode,
    handshake: HandshakeState,
    file_manager: crate::file_manager::FileManager,
    inbound: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    AwaitingGreeting,
    Established,
}

const MAX_GREETING_LEN: usize = 127;
const GREETING_TERMINATOR: &[u8] = b"\n\n";

impl Connection {
    pub fn new(
        mode: crate::types::Mode,
        transport: std::sync::Arc<dyn Transport>,
        events: std::sync::Arc<dyn ConnectionEvents>,
        command_queue_capacity: usize,
    ) -> Result<Self> {
        let file_manager = crate::file_manager::FileManager::new(mode, transport, events, command_queue_capacity)?;
        Ok(Self { mode, handshake: HandshakeState::AwaitingGreeting, file_manager, inbound: Vec::new() })
    }

    pub fn file_manager(&self) -> &crate::file_manager::FileManager {
        &self.file_manager
    }

    pub fn file_manager_mut(&mut self) -> &mut crate::file_manager::FileManager {
        &mut self.file_manager
    }

    pub fn is_established(&self) -> bool {
        self.handshake == HandshakeState::Established
    }

    /// Client role: send our greeting right away. Server role: wait
    /// passively for the client's greeting to arrive through
    /// `on_inbound_bytes`.
    pub fn start(&mut self) -> Result<()> {
        if self.mode == crate::types::Mode::Client {
            self.file_manager.send_greeting()?;
        }
        Ok(())
    }

    /// Feed raw bytes as they arrive off the wire. Before the handshake
    /// completes, bytes are scanned for the peer's `\n\n`-terminated
    /// greeting line; afterward, every complete
    /// `numheader || (address-header || payload)` message buffered so far is
    /// decoded and forwarded to the `FileManager`.
    pub fn on_inbound_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inbound.extend_from_slice(bytes);
        if self.handshake == HandshakeState::AwaitingGreeting && !self.consume_greeting()? {
            return Ok(());
        }
        self.drain_messages()
    }

    fn consume_greeting(&mut self) -> Result<bool> {
        let Some(terminator_pos) = find_subslice(&self.inbound, GREETING_TERMINATOR) else {
            if self.inbound.len() > MAX_GREETING_LEN {
                return Err(ApxError::InvalidHeader);
            }
            return Ok(false);
        };
        let greeting_len = terminator_pos + GREETING_TERMINATOR.len();
        if greeting_len > MAX_GREETING_LEN {
            return Err(ApxError::InvalidHeader);
        }
        let greeting = self.inbound[..terminator_pos].to_vec();
        if !greeting.starts_with(b"RMFP/1.0") && !greeting.starts_with(b"RMFP/1.1") {
            return Err(ApxError::InvalidHeader);
        }
        if find_subslice(&greeting, b"Numheader-Format:16").is_some() {
            return Err(ApxError::InvalidHeader);
        }
        self.inbound.drain(..greeting_len);
        self.handshake = HandshakeState::Established;
        if self.mode == crate::types::Mode::Server {
            self.file_manager.send_greeting()?;
        }
        self.file_manager.start()?;
        Ok(true)
    }

    fn drain_messages(&mut self) -> Result<()> {
        loop {
            if self.inbound.is_empty() {
                break;
            }
            let (len, consumed) = match crate::rmf::decode_numheader(&self.inbound) {
                Ok(v) => v,
                Err(_) => break, // numheader not fully buffered yet
            };
            let total = consumed + len as usize;
            if self.inbound.len() < total {
                break;
            }
            let message = self.inbound[consumed..total].to_vec();
            self.inbound.drain(..total);
            let (address, addr_len) = crate::rmf::decode_address(&message)?;
            let payload = &message[addr_len..];
            self.file_manager.on_inbound_fragment(address.value, address.more_bit, payload)?;
        }
        Ok(())
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
