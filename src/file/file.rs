//! A single file tracked by a `FileMap`: its metadata plus open/closed
//! state. Local files are backed by this connection's own packed buffers;
//! remote files describe what the peer has published.

use crate::file::FileInfo;

/// Which side created a file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOwner {
    Local,
    Remote,
}

/// A tracked file: its metadata, owner, and open/closed state.
///
/// `CLOSE_FILE` is best-effort (spec.md §9(i)): closing only flips `is_open`
/// and emits no flush, since every write lands synchronously in the packed
/// buffer — there is no buffered-but-unsent tail to drain.
#[derive(Debug, Clone)]
pub struct File {
    pub info: FileInfo,
    pub owner: FileOwner,
    is_open: bool,
}

impl File {
    pub fn new(info: FileInfo, owner: FileOwner) -> Self {
        Self { info, owner, is_open: false }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn address(&self) -> u32 {
        self.info.address
    }

    pub fn end_address(&self) -> u32 {
        self.info.address + self.info.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RmfFileType;

    #[test]
    fn open_close_toggle_state_only() {
        let mut file = File::new(FileInfo::new(0x100, 16, "n.out", RmfFileType::Fixed), FileOwner::Local);
        assert!(!file.is_open());
        file.open();
        assert!(file.is_open());
        file.close();
        assert!(!file.is_open());
    }

    #[test]
    fn end_address_is_exclusive() {
        let file = File::new(FileInfo::new(0x100, 16, "n.out", RmfFileType::Fixed), FileOwner::Local);
        assert_eq!(file.end_address(), 0x110);
    }
}
