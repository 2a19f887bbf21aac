//! RemoteFile (RMF) wire protocol: address codec, numheader, and the fixed
//! set of control messages exchanged over a file manager's command channel.
//!
//! Constants below are taken from `apx/include/apx/remotefile.h` verbatim;
//! the encode/decode logic follows the bit layout that header documents in
//! its comments.

pub mod address;
pub mod command;
pub mod numheader;

pub use address::{decode_address, encode_address, needed_address_size, Address};
pub use command::Command;
pub use numheader::{decode_numheader, encode_numheader};

/// Start of the reserved 1 KiB command channel at the top of the 30-bit
/// address space. `RMF_CMD_AREA_START_ADDRESS` in `remotefile.h`.
pub const CMD_AREA_START_ADDRESS: u32 = 0x3FFF_FC00;

/// Size in bytes of the reserved command channel (`RMF_CMD_AREA_START_ADDRESS`
/// through the top of the 30-bit address space).
pub const CMD_AREA_SIZE: u32 = 0x400;

/// Addresses at or above this value must use the 4-byte (high) address form.
pub const LOW_ADDRESS_LIMIT: u32 = 0x4000;

/// Mask of the usable 30-bit address space.
pub const ADDRESS_MASK: u32 = 0x3FFF_FFFF;

/// Fixed size in bytes of a `FileInfo` wire header, excluding the
/// null-terminated name that follows it.
pub const FILE_INFO_HEADER_SIZE: usize = 48;

/// Maximum byte length of a file name in a `FileInfo` message, not counting
/// the terminating nul.
pub const MAX_FILE_NAME_SIZE: usize = 255;
