// SPDX-License-Identifier: AGPL-3.0-only

//! Simulated serial memory
//!
//! Implements [`MemoryStream`] over an in-process byte image. It models the
//! one property of the real device the controller cares about — a transfer
//! completes a fixed number of steps after it is issued — and nothing of the
//! electrical command protocol.
//!
//! ## Timing model
//!
//! ```text
//! step t      request(read @A)          remaining = latency
//! step t+1    poll() → None             remaining = latency-1
//! ...
//! step t+L    poll() → Some(data @A)    remaining = 0
//! ```
//!
//! A latency of 1 therefore completes on the step right after the request.
//! With [`stalled`](SimulatedMemory::stalled) set, no transfer ever
//! completes; the controller's timeout is the only way out.

use crate::error::{FcError, Result};
use crate::stream::{Completion, MemoryStream, TransferRequest};
use bytes::Bytes;
use fcnpu_chip::{fixed, memmap, Activation, Direction, ELEMENT_BYTES};
use tracing::debug;

/// Transfer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Completed reads
    pub reads: u64,
    /// Completed writes
    pub writes: u64,
    /// Bytes returned by reads
    pub bytes_read: u64,
    /// Bytes stored by writes
    pub bytes_written: u64,
}

/// One completed transfer, in completion order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRecord {
    /// Direction of the transfer
    pub direction: Direction,
    /// First byte address
    pub address: u32,
    /// Length in bytes
    pub byte_count: u32,
}

#[derive(Debug, Clone)]
struct Pending {
    request: TransferRequest,
    remaining: u32,
}

/// In-process serial memory with fixed completion latency
#[derive(Debug, Clone)]
pub struct SimulatedMemory {
    image: Vec<u8>,
    latency: u32,
    stalled: bool,
    pending: Option<Pending>,
    stats: MemoryStats,
    history: Vec<TransferRecord>,
}

impl SimulatedMemory {
    /// Zero-filled memory of `size` bytes with single-step latency
    pub fn new(size: usize) -> Self {
        Self::from_image(vec![0; size])
    }

    /// Memory initialised from a raw byte image
    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            image,
            latency: 1,
            stalled: false,
            pending: None,
            stats: MemoryStats::default(),
            history: Vec::new(),
        }
    }

    /// Steps between a request and its completion (minimum 1)
    #[must_use]
    pub fn with_latency(mut self, latency: u32) -> Self {
        self.latency = latency.max(1);
        self
    }

    /// Start stalled (no transfer ever completes)
    #[must_use]
    pub fn stalled(mut self, stalled: bool) -> Self {
        self.stalled = stalled;
        self
    }

    /// Stall or release the device at runtime
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Completion latency in steps
    pub const fn latency(&self) -> u32 {
        self.latency
    }

    /// Size of the backing image in bytes
    pub fn len(&self) -> usize {
        self.image.len()
    }

    /// True if the backing image is empty
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    /// Raw backing image
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Transfer counters
    pub const fn stats(&self) -> MemoryStats {
        self.stats
    }

    /// Completed transfers in order
    pub fn history(&self) -> &[TransferRecord] {
        &self.history
    }

    /// Forget recorded history and counters
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.stats = MemoryStats::default();
    }

    /// Store `values` as consecutive elements starting at `base`
    ///
    /// Bypasses the request/response timing; this is how a host preloads
    /// parameters before asserting `data_valid`.
    ///
    /// # Errors
    ///
    /// Returns error if the range falls outside the image.
    pub fn write_elements(&mut self, base: u32, values: &[Activation]) -> Result<()> {
        for (i, &value) in values.iter().enumerate() {
            let address = self.element_address(base, i)?;
            let range = self.range(address, ELEMENT_BYTES)?;
            self.image[range].copy_from_slice(&fixed::to_payload(value));
        }
        Ok(())
    }

    /// Read `count` consecutive elements starting at `base`
    ///
    /// # Errors
    ///
    /// Returns error if the range falls outside the image.
    pub fn read_elements(&self, base: u32, count: usize) -> Result<Vec<Activation>> {
        (0..count)
            .map(|i| {
                let address = self.element_address(base, i)?;
                let range = self.range(address, ELEMENT_BYTES)?;
                Ok(fixed::from_payload(&self.image[range]))
            })
            .collect()
    }

    fn element_address(&self, base: u32, index: usize) -> Result<u32> {
        memmap::element_address(base, index).ok_or(FcError::AddressOutOfRange {
            address: base,
            len: index.saturating_add(1).saturating_mul(ELEMENT_BYTES as usize),
            size: self.image.len(),
        })
    }

    fn range(&self, address: u32, byte_count: u32) -> Result<std::ops::Range<usize>> {
        let start = address as usize;
        let len = byte_count as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.image.len() => Ok(start..end),
            _ => Err(FcError::AddressOutOfRange {
                address,
                len,
                size: self.image.len(),
            }),
        }
    }

    fn complete(&mut self, request: &TransferRequest) -> Completion {
        // Bounds were checked when the request was accepted.
        let start = request.address as usize;
        let end = start + request.byte_count as usize;
        let data = match request.direction {
            Direction::Read => {
                self.stats.reads += 1;
                self.stats.bytes_read += u64::from(request.byte_count);
                Bytes::copy_from_slice(&self.image[start..end])
            }
            Direction::Write => {
                self.image[start..end].copy_from_slice(&request.data);
                self.stats.writes += 1;
                self.stats.bytes_written += u64::from(request.byte_count);
                Bytes::new()
            }
        };
        self.history.push(TransferRecord {
            direction: request.direction,
            address: request.address,
            byte_count: request.byte_count,
        });
        Completion {
            address: request.address,
            direction: request.direction,
            data,
        }
    }
}

impl MemoryStream for SimulatedMemory {
    fn request(&mut self, request: TransferRequest) -> Result<()> {
        if self.pending.is_some() {
            return Err(FcError::TransferInFlight {
                address: request.address,
                direction: request.direction,
            });
        }
        self.range(request.address, request.byte_count)?;
        if request.direction == Direction::Write && request.data.len() != request.byte_count as usize {
            return Err(FcError::invalid_configuration(format!(
                "write payload is {} bytes but byte_count is {}",
                request.data.len(),
                request.byte_count
            )));
        }

        self.pending = Some(Pending {
            request,
            remaining: self.latency,
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<Completion> {
        if self.stalled {
            return None;
        }
        let pending = self.pending.as_mut()?;
        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining > 0 {
            return None;
        }
        let pending = self.pending.take()?;
        Some(self.complete(&pending.request))
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    fn reset(&mut self) {
        if let Some(p) = self.pending.take() {
            debug!(
                "SimulatedMemory: dropped pending {} at 0x{:08x}",
                p.request.direction, p.request.address
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_helpers_roundtrip_through_image() {
        let mut mem = SimulatedMemory::new(32);
        mem.write_elements(0x10, &[3, -2, 5]).unwrap();
        assert_eq!(mem.read_elements(0x10, 3).unwrap(), vec![3, -2, 5]);
        assert_eq!(&mem.image()[0x12..0x14], &[0xFE, 0xFF]);
    }

    #[test]
    fn out_of_range_request_is_rejected() {
        let mut mem = SimulatedMemory::new(8);
        let err = mem.request(TransferRequest::read(7, 2)).unwrap_err();
        assert!(matches!(err, FcError::AddressOutOfRange { address: 7, len: 2, size: 8 }));
        assert!(!mem.is_busy());
        assert!(mem.write_elements(6, &[1, 2]).is_err());
    }

    #[test]
    fn write_lands_only_on_completion() {
        let mut mem = SimulatedMemory::new(8).with_latency(2);
        mem.request(TransferRequest::write(2, vec![0xAA, 0xBB])).unwrap();
        assert!(mem.poll().is_none());
        assert_eq!(&mem.image()[2..4], &[0, 0]);
        let done = mem.poll().unwrap();
        assert_eq!(done.direction, Direction::Write);
        assert!(done.data.is_empty());
        assert_eq!(&mem.image()[2..4], &[0xAA, 0xBB]);
        assert_eq!(mem.stats().writes, 1);
        assert_eq!(mem.stats().bytes_written, 2);
    }

    #[test]
    fn zero_latency_is_clamped_to_one() {
        let mut mem = SimulatedMemory::new(4).with_latency(0);
        assert_eq!(mem.latency(), 1);
        mem.request(TransferRequest::read(0, 2)).unwrap();
        assert!(mem.poll().is_some());
    }

    #[test]
    fn stalled_device_never_completes_until_released() {
        let mut mem = SimulatedMemory::new(4).stalled(true);
        mem.request(TransferRequest::read(0, 2)).unwrap();
        for _ in 0..100 {
            assert!(mem.poll().is_none());
        }
        mem.set_stalled(false);
        assert!(mem.poll().is_some());
        assert_eq!(mem.history().len(), 1);
    }

    #[test]
    fn reset_drops_pending_transfer() {
        let mut mem = SimulatedMemory::new(4).with_latency(5);
        mem.request(TransferRequest::read(0, 2)).unwrap();
        assert!(mem.is_busy());
        mem.reset();
        assert!(!mem.is_busy());
        assert!(mem.poll().is_none());
    }

    #[test]
    fn clear_history_forgets_completed_transfers() {
        let mut mem = SimulatedMemory::new(8);
        for addr in [0, 2, 4] {
            mem.request(TransferRequest::read(addr, 2)).unwrap();
            assert!(mem.poll().is_some());
        }
        assert_eq!(mem.history().len(), 3);
        assert_eq!(mem.stats().reads, 3);

        mem.clear_history();
        assert!(mem.history().is_empty());
        assert_eq!(mem.stats(), MemoryStats::default());
    }
}
