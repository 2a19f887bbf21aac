//! Crate-wide error type.
//!
//! Mirrors the tagged union of `apx_error_t` codes from the original C
//! implementation (`apx/include/apx/error.h`), curated down to the kinds
//! spec.md §7 calls out explicitly. Parsers additionally carry a byte offset
//! so callers can report the first failing position in source text.

use thiserror::Error;

/// All error kinds the core produces.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApxError {
    // --- Parsing ---
    #[error("parse error at byte {0}")]
    Parse(usize),
    #[error("invalid data signature at byte {0}")]
    DataSignature(usize),
    #[error("invalid port signature")]
    PortSignature,
    #[error("invalid attribute at byte {0}")]
    InvalidAttribute(usize),
    #[error("unmatched brace at byte {0}")]
    UnmatchedBrace(usize),
    #[error("unmatched bracket at byte {0}")]
    UnmatchedBracket(usize),
    #[error("unmatched string literal at byte {0}")]
    UnmatchedString(usize),
    #[error("expected bracket at byte {0}")]
    ExpectedBracket(usize),
    #[error("stray characters after parse at byte {0}")]
    StrayCharactersAfterParse(usize),
    #[error("record must have at least one field")]
    EmptyRecord,
    #[error("invalid type reference")]
    InvalidTypeRef,

    // --- Resource ---
    #[error("out of memory")]
    Mem,
    #[error("command queue is full")]
    BufferFull,
    #[error("write crosses buffer boundary")]
    BufferBoundary,
    #[error("too many ports declared on node")]
    TooManyPorts,
    #[error("too many nodes on this connection")]
    TooManyNodes,
    #[error("too many type references (possible cycle)")]
    TooManyReferences,
    #[error("name exceeds maximum length")]
    NameTooLong,

    // --- Routing / files ---
    #[error("file already exists")]
    FileAlreadyExists,
    #[error("file not found")]
    FileNotFound,
    #[error("file is not open")]
    FileNotOpen,
    #[error("file exceeds maximum size")]
    FileTooLarge,
    #[error("failed to create file")]
    FileCreate,
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid write")]
    InvalidWrite,
    #[error("missing buffer")]
    MissingBuffer,

    // --- Protocol ---
    #[error("invalid message")]
    InvalidMsg,
    #[error("invalid header")]
    InvalidHeader,
    #[error("invalid instruction")]
    InvalidInstruction,
    #[error("unexpected data")]
    UnexpectedData,
    #[error("unsupported")]
    Unsupported,

    // --- Values ---
    #[error("value type mismatch")]
    ValueType,
    #[error("value out of range")]
    ValueRange,
    #[error("value has wrong length")]
    ValueLength,
    #[error("number too large")]
    NumberTooLarge,
    #[error("invalid init value")]
    InitValue,

    // --- Concurrency ---
    #[error("failed to create thread")]
    ThreadCreate,
    #[error("failed to join thread")]
    ThreadJoin,
    #[error("timed out joining thread")]
    ThreadJoinTimeout,
    #[error("semaphore error")]
    Semaphore,
}

pub type Result<T> = std::result::Result<T, ApxError>;
