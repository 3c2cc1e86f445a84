//! Parameter loading from external memory
//!
//! Fills the staging store one scalar element per transfer: the weight
//! matrix first, in row-major order, then the bias vector. Each call to a
//! `step_*` method is one scheduling step of the corresponding controller
//! state.
//!
//! # Per-step behavior
//!
//! 1. Poll the outstanding read. On completion, latch the low
//!    `ACTIV_BITS` bits of the payload into the next slot and advance the
//!    progress counter.
//! 2. If every element of the phase is present, report the phase complete.
//! 3. Otherwise, if nothing is outstanding, issue the read for the next
//!    element at `base + index × ELEMENT_BYTES`.

use crate::client::MemoryStreamClient;
use crate::config::LayerConfig;
use crate::error::{FcError, Result};
use crate::store::ParamStore;
use crate::stream::MemoryStream;
use fcnpu_chip::{fixed, Activation, Region};
use tracing::debug;

/// Weight and bias streaming with per-element progress counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Loader {
    weight_count: usize,
    bias_count: usize,
}

impl Loader {
    /// Loader with both counters at zero
    pub const fn new() -> Self {
        Self {
            weight_count: 0,
            bias_count: 0,
        }
    }

    /// Weights latched so far this cycle, in `[0, INPUT_SIZE × OUTPUT_SIZE]`
    pub const fn weight_count(&self) -> usize {
        self.weight_count
    }

    /// Biases latched so far this cycle, in `[0, OUTPUT_SIZE]`
    pub const fn bias_count(&self) -> usize {
        self.bias_count
    }

    /// True once both phases have seen every element
    pub const fn is_complete(&self, config: &LayerConfig) -> bool {
        self.weight_count == config.weight_count() && self.bias_count == config.output_size
    }

    /// Zero both counters (start of every LOAD_WEIGHTS phase)
    pub fn reset(&mut self) {
        self.weight_count = 0;
        self.bias_count = 0;
    }

    /// One LOAD_WEIGHTS step; `true` once the whole matrix is staged
    ///
    /// # Errors
    ///
    /// Returns error if the memory transfer fails or times out.
    pub fn step_weights<M: MemoryStream>(
        &mut self,
        client: &mut MemoryStreamClient<M>,
        store: &mut ParamStore,
        config: &LayerConfig,
    ) -> Result<bool> {
        let done = stream_in(
            client,
            &config.weight_region(),
            &mut self.weight_count,
            |index, value| store.set_weight(index, value),
        )?;
        if done {
            debug!("Weights staged: {} elements", self.weight_count);
        }
        Ok(done)
    }

    /// One LOAD_BIASES step; `true` once the whole vector is staged
    ///
    /// # Errors
    ///
    /// Returns error if the memory transfer fails or times out.
    pub fn step_biases<M: MemoryStream>(
        &mut self,
        client: &mut MemoryStreamClient<M>,
        store: &mut ParamStore,
        config: &LayerConfig,
    ) -> Result<bool> {
        let done = stream_in(
            client,
            &config.bias_region(),
            &mut self.bias_count,
            |index, value| store.set_bias(index, value),
        )?;
        if done {
            debug!("Biases staged: {} elements", self.bias_count);
        }
        Ok(done)
    }
}

fn stream_in<M: MemoryStream>(
    client: &mut MemoryStreamClient<M>,
    region: &Region,
    count: &mut usize,
    mut latch: impl FnMut(usize, Activation),
) -> Result<bool> {
    if let Some(completion) = client.poll()? {
        latch(*count, fixed::from_payload(&completion.data));
        *count += 1;
    }

    if *count >= region.elements {
        return Ok(true);
    }

    if client.is_idle() {
        let address = region.address_of(*count).ok_or_else(|| {
            FcError::invalid_configuration(format!(
                "element {} of region 0x{:08x} is not addressable",
                *count, region.base
            ))
        })?;
        client.issue_read(address)?;
    }
    Ok(false)
}
