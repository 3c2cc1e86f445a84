//! Memory stream abstraction
//!
//! The external serial memory is an opaque request/response service: issue
//! an address, a byte count and a direction, then observe a completion flag
//! and a data payload some steps later. The accelerator never has more than
//! one request outstanding.

use crate::error::Result;
use bytes::Bytes;
use fcnpu_chip::Direction;
use std::fmt::Debug;

/// External memory service consumed by the loader and the result writer
///
/// Implementations model one memory device. They are driven in lock-step
/// with the controller: [`poll`](Self::poll) is called exactly once per
/// scheduling step while a transfer is outstanding.
pub trait MemoryStream: Debug {
    /// Issue one transfer
    ///
    /// # Errors
    ///
    /// Returns error if a transfer is already outstanding or the request
    /// cannot be served (e.g. address outside the device).
    fn request(&mut self, request: TransferRequest) -> Result<()>;

    /// Advance one step
    ///
    /// Returns the completion on the step the outstanding transfer finishes,
    /// `None` otherwise (including when nothing is outstanding).
    fn poll(&mut self) -> Option<Completion>;

    /// True while a transfer is outstanding
    fn is_busy(&self) -> bool;

    /// Drop any outstanding transfer (device reset)
    fn reset(&mut self) {}
}

/// One scalar transfer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// First byte address
    pub address: u32,

    /// Transfer length in bytes
    pub byte_count: u32,

    /// Read or write
    pub direction: Direction,

    /// Payload for writes (empty for reads)
    pub data: Bytes,
}

impl TransferRequest {
    /// Read `byte_count` bytes at `address`
    pub const fn read(address: u32, byte_count: u32) -> Self {
        Self {
            address,
            byte_count,
            direction: Direction::Read,
            data: Bytes::new(),
        }
    }

    /// Write `data` at `address`
    pub fn write(address: u32, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        #[allow(clippy::cast_possible_truncation)]
        let byte_count = data.len() as u32;
        Self {
            address,
            byte_count,
            direction: Direction::Write,
            data,
        }
    }
}

/// Completion of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Address the transfer was issued at
    pub address: u32,

    /// Direction of the completed transfer
    pub direction: Direction,

    /// Data returned by a read (empty for writes)
    pub data: Bytes,
}

impl<M: MemoryStream + ?Sized> MemoryStream for Box<M> {
    fn request(&mut self, request: TransferRequest) -> Result<()> {
        (**self).request(request)
    }

    fn poll(&mut self) -> Option<Completion> {
        (**self).poll()
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}
