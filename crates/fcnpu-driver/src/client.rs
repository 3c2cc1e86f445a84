//! Memory stream client
//!
//! Wraps a [`MemoryStream`] and enforces the accelerator's side of the
//! protocol: at most one transfer in flight, one poll per step, and a bounded
//! wait for each completion.

use crate::error::{FcError, Result};
use crate::stream::{Completion, MemoryStream, TransferRequest};
use fcnpu_chip::{fixed, Activation, Direction, ELEMENT_BYTES};
use tracing::{debug, trace};

/// Transfer currently on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    address: u32,
    direction: Direction,
    waited: u32,
}

/// Transfer counters since construction or the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    /// Read requests issued
    pub reads_issued: u64,
    /// Write requests issued
    pub writes_issued: u64,
    /// Transfers completed
    pub completed: u64,
    /// Steps spent waiting on outstanding transfers
    pub wait_steps: u64,
}

/// Single-outstanding-request client for one memory device
#[derive(Debug)]
pub struct MemoryStreamClient<M> {
    memory: M,
    in_flight: Option<InFlight>,
    timeout_steps: Option<u32>,
    stats: ClientStats,
}

impl<M: MemoryStream> MemoryStreamClient<M> {
    /// Create a client; `timeout_steps` bounds the wait for each completion
    pub fn new(memory: M, timeout_steps: Option<u32>) -> Self {
        Self {
            memory,
            in_flight: None,
            timeout_steps,
            stats: ClientStats::default(),
        }
    }

    /// True if no transfer is outstanding
    pub const fn is_idle(&self) -> bool {
        self.in_flight.is_none()
    }

    /// Transfer counters
    pub const fn stats(&self) -> ClientStats {
        self.stats
    }

    /// Underlying memory device
    pub const fn memory(&self) -> &M {
        &self.memory
    }

    /// Underlying memory device (mutable, e.g. to preload contents)
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Change the completion wait bound
    pub fn set_timeout_steps(&mut self, timeout_steps: Option<u32>) {
        self.timeout_steps = timeout_steps;
    }

    /// Read one element at `address`
    ///
    /// # Errors
    ///
    /// Returns [`FcError::TransferInFlight`] if a transfer is outstanding, or
    /// any error the memory device reports for the request.
    pub fn issue_read(&mut self, address: u32) -> Result<()> {
        self.issue(TransferRequest::read(address, ELEMENT_BYTES))
    }

    /// Write one element to `address`
    ///
    /// # Errors
    ///
    /// Returns [`FcError::TransferInFlight`] if a transfer is outstanding, or
    /// any error the memory device reports for the request.
    pub fn issue_write(&mut self, address: u32, value: Activation) -> Result<()> {
        self.issue(TransferRequest::write(
            address,
            fixed::to_payload(value).to_vec(),
        ))
    }

    fn issue(&mut self, request: TransferRequest) -> Result<()> {
        if self.in_flight.is_some() || self.memory.is_busy() {
            return Err(FcError::TransferInFlight {
                address: request.address,
                direction: request.direction,
            });
        }

        let address = request.address;
        let direction = request.direction;
        trace!("Issue {direction} at 0x{address:08x} ({} bytes)", request.byte_count);
        self.memory.request(request)?;

        match direction {
            Direction::Read => self.stats.reads_issued += 1,
            Direction::Write => self.stats.writes_issued += 1,
        }
        self.in_flight = Some(InFlight {
            address,
            direction,
            waited: 0,
        });
        Ok(())
    }

    /// Poll the outstanding transfer once
    ///
    /// # Errors
    ///
    /// Returns [`FcError::MemoryTimeout`] once the transfer has waited
    /// `timeout_steps` steps without completing.
    pub fn poll(&mut self) -> Result<Option<Completion>> {
        let Some(mut in_flight) = self.in_flight else {
            return Ok(None);
        };

        if let Some(completion) = self.memory.poll() {
            trace!(
                "Complete {} at 0x{:08x} after {} wait steps",
                completion.direction,
                completion.address,
                in_flight.waited
            );
            self.in_flight = None;
            self.stats.completed += 1;
            return Ok(Some(completion));
        }

        in_flight.waited += 1;
        self.stats.wait_steps += 1;
        self.in_flight = Some(in_flight);

        match self.timeout_steps {
            Some(limit) if in_flight.waited >= limit => {
                debug!(
                    "{} at 0x{:08x} timed out after {} steps",
                    in_flight.direction, in_flight.address, in_flight.waited
                );
                Err(FcError::MemoryTimeout {
                    address: in_flight.address,
                    direction: in_flight.direction,
                    waited_steps: in_flight.waited,
                })
            }
            _ => Ok(None),
        }
    }

    /// Forget any outstanding transfer, zero the counters and reset the
    /// device
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.stats = ClientStats::default();
        self.memory.reset();
    }
}
