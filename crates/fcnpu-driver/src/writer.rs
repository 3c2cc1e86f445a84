//! Result write-back
//!
//! Drains the result vector to external memory with the same per-element
//! pattern the loader uses: one write per element, ascending index order,
//! at `output_base_addr + index × ELEMENT_BYTES`. The phase is complete only
//! when the `OUTPUT_SIZE`-th write has completed.

use crate::client::MemoryStreamClient;
use crate::config::LayerConfig;
use crate::error::{FcError, Result};
use crate::store::ParamStore;
use crate::stream::MemoryStream;
use tracing::debug;

/// Sequential result writer with a completed-write counter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultWriter {
    stored: usize,
}

impl ResultWriter {
    /// Writer with nothing stored
    pub const fn new() -> Self {
        Self { stored: 0 }
    }

    /// Results whose write has completed this cycle
    pub const fn stored_count(&self) -> usize {
        self.stored
    }

    /// Zero the counter
    pub fn reset(&mut self) {
        self.stored = 0;
    }

    /// One STORE_RESULT step; `true` once every write has completed
    ///
    /// # Errors
    ///
    /// Returns error if the memory transfer fails or times out.
    pub fn step<M: MemoryStream>(
        &mut self,
        client: &mut MemoryStreamClient<M>,
        store: &ParamStore,
        config: &LayerConfig,
    ) -> Result<bool> {
        if client.poll()?.is_some() {
            self.stored += 1;
        }

        let region = config.output_region();
        if self.stored >= region.elements {
            debug!("Results stored: {} elements", self.stored);
            return Ok(true);
        }

        if client.is_idle() {
            let address = region.address_of(self.stored).ok_or_else(|| {
                FcError::invalid_configuration(format!(
                    "result {} at base 0x{:08x} is not addressable",
                    self.stored, region.base
                ))
            })?;
            let value = store.results().get(self.stored).copied().ok_or_else(|| {
                FcError::invalid_state(format!(
                    "result vector has {} lanes, writer is at {}",
                    store.results().len(),
                    self.stored
                ))
            })?;
            client.issue_write(address, value)?;
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SimulatedMemory;
    use fcnpu_chip::Direction;

    #[test]
    fn writes_every_result_in_order() {
        let config = LayerConfig::contiguous(1, 4, 0).unwrap();
        let mut store = ParamStore::new(1, 4);
        store.commit_results(&[9, 0, 300, 1]);
        let mut client = MemoryStreamClient::new(SimulatedMemory::new(64).with_latency(2), Some(8));
        let mut writer = ResultWriter::new();

        let mut steps = 0;
        while !writer.step(&mut client, &store, &config).unwrap() {
            steps += 1;
            assert!(steps < 100);
        }

        assert_eq!(writer.stored_count(), 4);
        let mem = client.memory();
        assert_eq!(
            mem.read_elements(config.output_base_addr, 4).unwrap(),
            vec![9, 0, 300, 1]
        );
        let writes: Vec<u32> = mem
            .history()
            .iter()
            .filter(|r| r.direction == Direction::Write)
            .map(|r| r.address)
            .collect();
        let base = config.output_base_addr;
        assert_eq!(writes, vec![base, base + 2, base + 4, base + 6]);
    }

    #[test]
    fn not_complete_after_first_write() {
        let config = LayerConfig::contiguous(1, 2, 0).unwrap();
        let mut store = ParamStore::new(1, 2);
        store.commit_results(&[1, 2]);
        let mut client = MemoryStreamClient::new(SimulatedMemory::new(32), Some(8));
        let mut writer = ResultWriter::new();

        assert!(!writer.step(&mut client, &store, &config).unwrap()); // issue #0
        assert!(!writer.step(&mut client, &store, &config).unwrap()); // #0 done, issue #1
        assert_eq!(writer.stored_count(), 1);
        assert!(writer.step(&mut client, &store, &config).unwrap()); // #1 done
    }
}
