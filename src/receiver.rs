//! Reassembles fragmented ("more-bit") writes into complete
//! `(address, bytes)` messages.
//!
//! A single logical write may arrive as several wire fragments, each tagged
//! with the more-bit set except the last. Every fragment after the first
//! must continue exactly where the previous one left off
//! (`next_expected_address = start_address + bytes_so_far`); any other
//! address is a protocol violation.

use crate::error::{ApxError, Result};

#[derive(Debug)]
struct Pending {
    start_address: u32,
    buf: Vec<u8>,
    next_expected_address: u32,
}

/// Per-connection fragment reassembly state.
#[derive(Debug, Default)]
pub struct Receiver {
    pending: Option<Pending>,
}

impl Receiver {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Feed one fragment. Returns `Some((address, bytes))` once a complete
    /// (non-fragmented, or fully reassembled) message is available.
    pub fn on_fragment(&mut self, address: u32, more_bit: bool, data: &[u8]) -> Result<Option<(u32, Vec<u8>)>> {
        match self.pending.take() {
            None => {
                if !more_bit {
                    return Ok(Some((address, data.to_vec())));
                }
                let next_expected_address = address
                    .checked_add(data.len() as u32)
                    .ok_or(ApxError::InvalidAddress)?;
                self.pending = Some(Pending { start_address: address, buf: data.to_vec(), next_expected_address });
                Ok(None)
            }
            Some(mut p) => {
                if address != p.next_expected_address {
                    return Err(ApxError::InvalidAddress);
                }
                p.buf.extend_from_slice(data);
                p.next_expected_address = p
                    .next_expected_address
                    .checked_add(data.len() as u32)
                    .ok_or(ApxError::InvalidAddress)?;
                if more_bit {
                    self.pending = Some(p);
                    Ok(None)
                } else {
                    Ok(Some((p.start_address, p.buf)))
                }
            }
        }
    }

    /// Whether a fragmented write is in progress.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
