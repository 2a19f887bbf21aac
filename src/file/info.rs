//! `FileInfo`: the metadata describing a file on the RemoteFile address
//! space, and its wire encoding as used by the `PUBLISH_FILE`/`FILE_INFO`
//! command (spec.md §4.1, §4.4).

use crate::error::{ApxError, Result};
use crate::rmf::{FILE_INFO_HEADER_SIZE, MAX_FILE_NAME_SIZE};
use crate::types::{DigestType, RmfFileType};

/// Metadata describing a file published on the RemoteFile address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub address: u32,
    pub size: u32,
    pub name: String,
    pub file_type: RmfFileType,
    pub digest_type: DigestType,
    pub digest: Vec<u8>,
}

impl FileInfo {
    pub fn new(address: u32, size: u32, name: impl Into<String>, file_type: RmfFileType) -> Self {
        Self {
            address,
            size,
            name: name.into(),
            file_type,
            digest_type: DigestType::None,
            digest: Vec::new(),
        }
    }

    pub fn with_digest(mut self, digest_type: DigestType, digest: Vec<u8>) -> Self {
        debug_assert_eq!(digest.len(), digest_type.digest_len());
        self.digest_type = digest_type;
        self.digest = digest;
        self
    }

    /// Encode as the `PUBLISH_FILE`/`FILE_INFO` payload: a fixed 48-byte
    /// header followed by the nul-terminated file name.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.name.len() > MAX_FILE_NAME_SIZE {
            return Err(ApxError::NameTooLong);
        }
        let mut buf = Vec::with_capacity(FILE_INFO_HEADER_SIZE + self.name.len() + 1);
        buf.extend_from_slice(&self.address.to_le_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&(self.file_type.to_u16() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.digest_type.to_u16() as u32).to_le_bytes());
        let mut digest_field = [0u8; 32];
        let n = self.digest.len().min(32);
        digest_field[..n].copy_from_slice(&self.digest[..n]);
        buf.extend_from_slice(&digest_field);
        debug_assert_eq!(buf.len(), FILE_INFO_HEADER_SIZE);
        buf.extend_from_slice(self.name.as_bytes());
        buf.push(0);
        Ok(buf)
    }

    /// Decode a `PUBLISH_FILE`/`FILE_INFO` payload produced by `encode`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < FILE_INFO_HEADER_SIZE + 1 {
            return Err(ApxError::InvalidMsg);
        }
        let address = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let file_type = RmfFileType::from_u16(u32::from_le_bytes(buf[8..12].try_into().unwrap()) as u16)
            .ok_or(ApxError::InvalidMsg)?;
        let digest_type = DigestType::from_u16(u32::from_le_bytes(buf[12..16].try_into().unwrap()) as u16)
            .ok_or(ApxError::InvalidMsg)?;
        let digest = buf[16..48][..digest_type.digest_len()].to_vec();

        let name_bytes = &buf[FILE_INFO_HEADER_SIZE..];
        let nul_pos = name_bytes.iter().position(|&b| b == 0).ok_or(ApxError::InvalidMsg)?;
        if nul_pos > MAX_FILE_NAME_SIZE {
            return Err(ApxError::NameTooLong);
        }
        let name = std::str::from_utf8(&name_bytes[..nul_pos])
            .map_err(|_| ApxError::InvalidMsg)?
            .to_string();

        Ok(Self { address, size, name, file_type, digest_type, digest })
    }
}
