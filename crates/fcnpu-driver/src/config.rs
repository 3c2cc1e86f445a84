//! Layer configuration
//!
//! One instantiation evaluates exactly one layer shape. The shape and the
//! three base addresses are fixed while a cycle is in flight; the controller
//! only accepts new addresses while IDLE.

use crate::error::{FcError, Result};
use fcnpu_chip::Region;
use tracing::debug;

/// Default limit on how long one transfer may stay outstanding
pub const DEFAULT_TIMEOUT_STEPS: u32 = 4096;

/// Layer shape and memory placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    /// Number of input neurons (activation vector length)
    pub input_size: usize,

    /// Number of output neurons (bias and result vector length)
    pub output_size: usize,

    /// Byte address of `weights[0][0]`
    pub weight_base_addr: u32,

    /// Byte address of `bias[0]`
    pub bias_base_addr: u32,

    /// Byte address where `result[0]` is written
    pub output_base_addr: u32,

    /// Steps a single transfer may stay outstanding before
    /// [`FcError::MemoryTimeout`]. `None` waits forever.
    pub timeout_steps: Option<u32>,
}

impl LayerConfig {
    /// Create a configuration with all regions at address 0
    ///
    /// Set the base addresses before use; [`validate`](Self::validate)
    /// rejects the overlapping layout this starts with.
    pub const fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            output_size,
            weight_base_addr: 0,
            bias_base_addr: 0,
            output_base_addr: 0,
            timeout_steps: Some(DEFAULT_TIMEOUT_STEPS),
        }
    }

    /// Lay weights, biases and results out back to back starting at `base`
    ///
    /// # Errors
    ///
    /// Returns error if the layout does not fit in the 32-bit address space.
    pub fn contiguous(input_size: usize, output_size: usize, base: u32) -> Result<Self> {
        let weights = Region::new(base, input_size.saturating_mul(output_size));
        let bias_base = region_end(&weights)?;
        let biases = Region::new(bias_base, output_size);
        let output_base = region_end(&biases)?;

        let config = Self::new(input_size, output_size)
            .with_weight_base(base)
            .with_bias_base(bias_base)
            .with_output_base(output_base);
        config.validate()?;
        Ok(config)
    }

    /// Set the weight matrix base address
    #[must_use]
    pub const fn with_weight_base(mut self, addr: u32) -> Self {
        self.weight_base_addr = addr;
        self
    }

    /// Set the bias vector base address
    #[must_use]
    pub const fn with_bias_base(mut self, addr: u32) -> Self {
        self.bias_base_addr = addr;
        self
    }

    /// Set the result vector base address
    #[must_use]
    pub const fn with_output_base(mut self, addr: u32) -> Self {
        self.output_base_addr = addr;
        self
    }

    /// Set the per-transfer timeout (`None` disables it)
    #[must_use]
    pub const fn with_timeout_steps(mut self, steps: Option<u32>) -> Self {
        self.timeout_steps = steps;
        self
    }

    /// Number of weight elements (`INPUT_SIZE × OUTPUT_SIZE`)
    ///
    /// Saturates for shapes [`validate`](Self::validate) rejects.
    pub const fn weight_count(&self) -> usize {
        self.input_size.saturating_mul(self.output_size)
    }

    /// Weight matrix region
    pub const fn weight_region(&self) -> Region {
        Region::new(self.weight_base_addr, self.weight_count())
    }

    /// Bias vector region
    pub const fn bias_region(&self) -> Region {
        Region::new(self.bias_base_addr, self.output_size)
    }

    /// Result vector region
    pub const fn output_region(&self) -> Region {
        Region::new(self.output_base_addr, self.output_size)
    }

    /// Check the configuration can drive a full cycle
    ///
    /// # Errors
    ///
    /// Returns [`FcError::InvalidConfiguration`] if:
    /// - `input_size` or `output_size` is zero
    /// - a region runs past the 32-bit address space
    /// - the result region overlaps the weight or bias region
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 || self.output_size == 0 {
            return Err(FcError::invalid_configuration(format!(
                "layer shape {}→{} has a zero dimension",
                self.input_size, self.output_size
            )));
        }
        if self.input_size.checked_mul(self.output_size).is_none() {
            return Err(FcError::invalid_configuration(format!(
                "layer shape {}→{} overflows the weight count",
                self.input_size, self.output_size
            )));
        }
        if self.timeout_steps == Some(0) {
            return Err(FcError::invalid_configuration(
                "timeout_steps must be at least 1",
            ));
        }

        let regions = [
            ("weight", self.weight_region()),
            ("bias", self.bias_region()),
            ("output", self.output_region()),
        ];
        for (name, region) in &regions {
            if !region.fits_address_space() {
                return Err(FcError::invalid_configuration(format!(
                    "{name} region 0x{:08x}+{} bytes exceeds the 32-bit address space",
                    region.base,
                    region.len_bytes()
                )));
            }
        }

        let output = self.output_region();
        for (name, region) in &regions[..2] {
            if output.overlaps(region) {
                return Err(FcError::invalid_configuration(format!(
                    "output region 0x{:08x}..0x{:08x} overlaps {name} region 0x{:08x}..0x{:08x}",
                    output.base,
                    output.end(),
                    region.base,
                    region.end()
                )));
            }
        }

        debug!(
            "Layer {}→{}: weights @0x{:08x}, biases @0x{:08x}, results @0x{:08x}",
            self.input_size,
            self.output_size,
            self.weight_base_addr,
            self.bias_base_addr,
            self.output_base_addr
        );
        Ok(())
    }

    /// Bytes of external memory the three regions need, from address 0
    pub fn memory_footprint(&self) -> u64 {
        [self.weight_region(), self.bias_region(), self.output_region()]
            .iter()
            .map(Region::end)
            .max()
            .unwrap_or(0)
    }
}

fn region_end(region: &Region) -> Result<u32> {
    u32::try_from(region.end()).map_err(|_| {
        FcError::invalid_configuration(format!(
            "region at 0x{:08x} with {} elements exceeds the 32-bit address space",
            region.base, region.elements
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn contiguous_layout_packs_regions() {
        let config = LayerConfig::contiguous(2, 3, 0x100).unwrap();
        assert_eq!(config.weight_base_addr, 0x100);
        assert_eq!(config.bias_base_addr, 0x100 + 12);
        assert_eq!(config.output_base_addr, 0x100 + 12 + 6);
        assert_eq!(config.memory_footprint(), 0x100 + 24);
    }

    #[test]
    fn zero_sizes_are_rejected() {
        for (is, os) in [(0, 1), (1, 0), (0, 0)] {
            let err = LayerConfig::new(is, os)
                .with_bias_base(0x100)
                .with_output_base(0x200)
                .validate()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        }
    }

    #[test]
    fn output_overlapping_parameters_is_rejected() {
        let config = LayerConfig::new(4, 2)
            .with_weight_base(0x000)
            .with_bias_base(0x100)
            .with_output_base(0x00E);
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ErrorKind::InvalidConfiguration
        );
    }

    #[test]
    fn weights_and_biases_may_share_memory() {
        // Only the write-back region must stay clear of the parameters.
        let config = LayerConfig::new(2, 2)
            .with_weight_base(0x000)
            .with_bias_base(0x004)
            .with_output_base(0x100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn region_past_address_space_is_rejected() {
        let config = LayerConfig::new(2, 2)
            .with_weight_base(0)
            .with_bias_base(0x100)
            .with_output_base(u32::MAX - 1);
        assert!(config.validate().is_err());
        assert!(LayerConfig::contiguous(2, 2, u32::MAX - 4).is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn huge_shapes_are_rejected_not_panicking() {
        let config = LayerConfig::new(1 << 32, 1 << 31)
            .with_bias_base(0x100)
            .with_output_base(0x200);
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ErrorKind::InvalidConfiguration
        );

        let config = LayerConfig::new(usize::MAX, 2)
            .with_bias_base(0x100)
            .with_output_base(0x200);
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ErrorKind::InvalidConfiguration
        );

        for (is, os) in [(1, 1 << 63), (1 << 20, 1 << 20), (1, 1 << 31)] {
            let err = LayerConfig::contiguous(is, os, 0).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        }
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = LayerConfig::contiguous(1, 1, 0)
            .unwrap()
            .with_timeout_steps(Some(0));
        assert!(config.validate().is_err());
        assert!(config.with_timeout_steps(None).validate().is_ok());
    }
}
