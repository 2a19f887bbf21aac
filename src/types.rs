//! Shared enums used across the crate: type codes, port types, file types,
//! connection mode, and digest types.
//!
//! Grounded on `apx/include/apx/types.h` (`apx_typeCode_t`, `apx_fileType_t`,
//! `apx_mode_t`, `apx_portType_t`) and `apx/include/apx/remotefile.h`
//! (`rmf_fileType_t`, `rmf_digestType_t`).

use serde::{Deserialize, Serialize};

/// The closed set of packed-binary leaf types a `DataElement` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Char,
    Char8,
    Char16,
    Char32,
    Bool,
    Byte,
    Record,
    RefId,
    RefName,
    RefPtr,
}

impl TypeCode {
    /// Byte size of a single scalar instance of this type code. Panics for
    /// `Record`/`Ref*`, which have no fixed scalar size.
    pub fn scalar_size(self) -> usize {
        match self {
            TypeCode::U8 | TypeCode::I8 | TypeCode::Char | TypeCode::Char8 | TypeCode::Bool | TypeCode::Byte => 1,
            TypeCode::U16 | TypeCode::I16 | TypeCode::Char16 => 2,
            TypeCode::U32 | TypeCode::I32 | TypeCode::Char32 => 4,
            TypeCode::U64 | TypeCode::I64 => 8,
            TypeCode::Record | TypeCode::RefId | TypeCode::RefName | TypeCode::RefPtr => {
                panic!("scalar_size called on non-scalar type code {self:?}")
            }
        }
    }

    /// Whether this type code is signed.
    pub fn is_signed(self) -> bool {
        matches!(self, TypeCode::I8 | TypeCode::I16 | TypeCode::I32 | TypeCode::I64)
    }

    /// Whether this type code may carry scalar numeric limits.
    pub fn accepts_limits(self) -> bool {
        matches!(
            self,
            TypeCode::U8
                | TypeCode::U16
                | TypeCode::U32
                | TypeCode::U64
                | TypeCode::I8
                | TypeCode::I16
                | TypeCode::I32
                | TypeCode::I64
        )
    }

    /// Single-character signature code, as used by `canonical()`.
    pub fn signature_char(self) -> char {
        match self {
            TypeCode::U8 => 'C',
            TypeCode::U16 => 'S',
            TypeCode::U32 => 'L',
            TypeCode::U64 => 'Q',
            TypeCode::I8 => 'c',
            TypeCode::I16 => 's',
            TypeCode::I32 => 'l',
            TypeCode::I64 => 'q',
            TypeCode::Char => 'a',
            TypeCode::Char8 => 'A',
            TypeCode::Char16 => 'u',
            TypeCode::Char32 => 'U',
            TypeCode::Bool => 'b',
            TypeCode::Byte => 'B',
            TypeCode::Record | TypeCode::RefId | TypeCode::RefName | TypeCode::RefPtr => {
                panic!("signature_char called on non-scalar type code {self:?}")
            }
        }
    }
}

/// Whether a port is an output (provide) or input (require) of its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Require,
    Provide,
}

/// Client/server role of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Client,
    Server,
}

/// Well-known APX file kinds, used by `FileMap` to pick an address region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApxFileType {
    Definition,
    ProvidePortData,
    RequirePortData,
    ProvidePortCount,
    RequirePortCount,
    UserDefined,
}

impl ApxFileType {
    /// Conventional file extension for this file kind.
    pub fn extension(self) -> &'static str {
        match self {
            ApxFileType::Definition => ".apx",
            ApxFileType::ProvidePortData => ".out",
            ApxFileType::RequirePortData => ".in",
            ApxFileType::ProvidePortCount => ".cout",
            ApxFileType::RequirePortCount => ".cin",
            ApxFileType::UserDefined => "",
        }
    }
}

/// RemoteFile wire-level file type (`rmf_fileType_t`), distinct from
/// `ApxFileType`: this is what's actually encoded in a `FILE_INFO` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RmfFileType {
    Fixed,
    Dynamic8,
    Dynamic16,
    Dynamic32,
    Device,
    Stream,
}

impl RmfFileType {
    pub fn to_u16(self) -> u16 {
        match self {
            RmfFileType::Fixed => 0,
            RmfFileType::Dynamic8 => 1,
            RmfFileType::Dynamic16 => 2,
            RmfFileType::Dynamic32 => 3,
            RmfFileType::Device => 4,
            RmfFileType::Stream => 5,
        }
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0 => RmfFileType::Fixed,
            1 => RmfFileType::Dynamic8,
            2 => RmfFileType::Dynamic16,
            3 => RmfFileType::Dynamic32,
            4 => RmfFileType::Device,
            5 => RmfFileType::Stream,
            _ => return None,
        })
    }
}

/// Digest algorithm optionally attached to a published file's `FileInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DigestType {
    None,
    Sha1,
    Sha256,
}

impl DigestType {
    pub fn to_u16(self) -> u16 {
        match self {
            DigestType::None => 0,
            DigestType::Sha1 => 1,
            DigestType::Sha256 => 2,
        }
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        Some(match v {
            0 => DigestType::None,
            1 => DigestType::Sha1,
            2 => DigestType::Sha256,
            _ => return None,
        })
    }

    pub fn digest_len(self) -> usize {
        match self {
            DigestType::None => 0,
            DigestType::Sha1 => 20,
            DigestType::Sha256 => 32,
        }
    }
}

/// Per-file-area lifecycle state (`apx_dataState_t`). Tracked for each of a
/// node instance's three file-backed areas (definition / provide / require).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataState {
    Init,
    WaitingFileInfo,
    WaitingForFileOpenRequest,
    WaitingForFileData,
    Connected,
    Disconnected,
}
