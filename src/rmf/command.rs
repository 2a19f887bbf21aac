//! The fixed set of control messages sent over a file manager's reserved
//! command address (`CMD_AREA_START_ADDRESS`). Wire shape is
//! `(cmd_type: u32 LE) || payload`, per `remotefile.h`'s `RMF_CMD_*` codes.

use crate::error::{ApxError, Result};
use crate::file::FileInfo;

const CMD_ACK: u32 = 0;
const CMD_NACK: u32 = 1;
const CMD_PUBLISH_FILE: u32 = 3;
const CMD_REVOKE_FILE: u32 = 4;
const CMD_OPEN_FILE: u32 = 10;
const CMD_CLOSE_FILE: u32 = 11;

/// A decoded command-channel message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ack,
    Nack,
    PublishFile(FileInfo),
    RevokeFile { address: u32 },
    OpenFile { address: u32 },
    CloseFile { address: u32 },
}

impl Command {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let (cmd_type, mut payload) = match self {
            Command::Ack => (CMD_ACK, Vec::new()),
            Command::Nack => (CMD_NACK, Vec::new()),
            Command::PublishFile(info) => (CMD_PUBLISH_FILE, info.encode()?),
            Command::RevokeFile { address } => (CMD_REVOKE_FILE, address.to_le_bytes().to_vec()),
            Command::OpenFile { address } => (CMD_OPEN_FILE, address.to_le_bytes().to_vec()),
            Command::CloseFile { address } => (CMD_CLOSE_FILE, address.to_le_bytes().to_vec()),
        };
        let mut buf = cmd_type.to_le_bytes().to_vec();
        buf.append(&mut payload);
        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(ApxError::InvalidMsg);
        }
        let cmd_type = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let payload = &buf[4..];
        Ok(match cmd_type {
            CMD_ACK => Command::Ack,
            CMD_NACK => Command::Nack,
            CMD_PUBLISH_FILE => Command::PublishFile(FileInfo::decode(payload)?),
            CMD_REVOKE_FILE => Command::RevokeFile { address: decode_address_payload(payload)? },
            CMD_OPEN_FILE => Command::OpenFile { address: decode_address_payload(payload)? },
            CMD_CLOSE_FILE => Command::CloseFile { address: decode_address_payload(payload)? },
            _ => return Err(ApxError::InvalidInstruction),
        })
    }
}

fn decode_address_payload(payload: &[u8]) -> Result<u32> {
    if payload.len() < 4 {
        return Err(ApxError::InvalidMsg);
    }
    Ok(u32::from_le_bytes(payload[0..4].try_into().unwrap()))
}
