//! TOML layer description
//!
//! ```toml
//! [layer]
//! input_size = 2
//! output_size = 1
//! weight_base_addr = 0x0000   # all three or none; none = back to back
//! bias_base_addr = 0x0100
//! output_base_addr = 0x0200
//! timeout_steps = 64          # optional
//!
//! [memory]
//! size = 1024
//! latency = 2                 # optional, default 1
//! base = 0x0000               # start of the back-to-back layout
//!
//! [params]
//! weights = [3, -2]           # row-major, OUTPUT_SIZE × INPUT_SIZE
//! biases = [5]
//! inputs = [[4, 1]]           # one activation vector per cycle
//! ```

use anyhow::{bail, Context, Result};
use fcnpu_driver::chip::Activation;
use fcnpu_driver::{LayerConfig, SimulatedMemory};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerFile {
    pub layer: LayerSection,
    pub memory: MemorySection,
    pub params: ParamsSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerSection {
    pub input_size: usize,
    pub output_size: usize,
    pub weight_base_addr: Option<u32>,
    pub bias_base_addr: Option<u32>,
    pub output_base_addr: Option<u32>,
    pub timeout_steps: Option<u32>,
    /// Wait forever on a stalled transfer instead of timing out.
    #[serde(default)]
    pub no_timeout: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemorySection {
    pub size: usize,
    #[serde(default = "default_latency")]
    pub latency: u32,
    #[serde(default)]
    pub base: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamsSection {
    pub weights: Vec<Activation>,
    pub biases: Vec<Activation>,
    #[serde(default)]
    pub inputs: Vec<Vec<Activation>>,
}

const fn default_latency() -> u32 {
    1
}

impl LayerFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading layer file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing layer file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Layer configuration, validated.
    pub fn config(&self) -> Result<LayerConfig> {
        let l = &self.layer;
        let config = match (l.weight_base_addr, l.bias_base_addr, l.output_base_addr) {
            (Some(w), Some(b), Some(o)) => LayerConfig::new(l.input_size, l.output_size)
                .with_weight_base(w)
                .with_bias_base(b)
                .with_output_base(o),
            (None, None, None) => {
                LayerConfig::contiguous(l.input_size, l.output_size, self.memory.base)?
            }
            _ => bail!("set all three base addresses or none of them"),
        };

        let timeout = if l.no_timeout {
            None
        } else {
            Some(l.timeout_steps.unwrap_or(fcnpu_driver::DEFAULT_TIMEOUT_STEPS))
        };
        let config = config.with_timeout_steps(timeout);
        config.validate()?;
        Ok(config)
    }

    /// Simulated memory preloaded with this file's weights and biases.
    pub fn memory(&self, config: &LayerConfig) -> Result<SimulatedMemory> {
        let p = &self.params;
        if p.weights.len() != config.weight_count() {
            bail!(
                "expected {}×{}={} weights, file has {}",
                config.output_size,
                config.input_size,
                config.weight_count(),
                p.weights.len()
            );
        }
        if p.biases.len() != config.output_size {
            bail!(
                "expected {} biases, file has {}",
                config.output_size,
                p.biases.len()
            );
        }
        if config.memory_footprint() > self.memory.size as u64 {
            bail!(
                "layer needs {} bytes of memory, [memory] size is {}",
                config.memory_footprint(),
                self.memory.size
            );
        }

        let mut mem = SimulatedMemory::new(self.memory.size).with_latency(self.memory.latency);
        mem.write_elements(config.weight_base_addr, &p.weights)?;
        mem.write_elements(config.bias_base_addr, &p.biases)?;
        Ok(mem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r"
        [layer]
        input_size = 2
        output_size = 1
        weight_base_addr = 0x0000
        bias_base_addr = 0x0100
        output_base_addr = 0x0200

        [memory]
        size = 1024
        latency = 2

        [params]
        weights = [3, -2]
        biases = [5]
        inputs = [[4, 1]]
    ";

    #[test]
    fn explicit_addresses() {
        let file = LayerFile::parse(SCENARIO).unwrap();
        let config = file.config().unwrap();
        assert_eq!(config.bias_base_addr, 0x100);
        assert_eq!(config.output_base_addr, 0x200);
        assert_eq!(config.timeout_steps, Some(fcnpu_driver::DEFAULT_TIMEOUT_STEPS));

        let mem = file.memory(&config).unwrap();
        assert_eq!(mem.latency(), 2);
        assert_eq!(mem.read_elements(0, 2).unwrap(), vec![3, -2]);
        assert_eq!(mem.read_elements(0x100, 1).unwrap(), vec![5]);
    }

    #[test]
    fn contiguous_when_addresses_omitted() {
        let file = LayerFile::parse(
            r"
            [layer]
            input_size = 1
            output_size = 2
            no_timeout = true
            [memory]
            size = 64
            base = 0x10
            [params]
            weights = [1, 2]
            biases = [3, 4]
            ",
        )
        .unwrap();
        let config = file.config().unwrap();
        assert_eq!(config.weight_base_addr, 0x10);
        assert_eq!(config.bias_base_addr, 0x14);
        assert_eq!(config.output_base_addr, 0x18);
        assert_eq!(config.timeout_steps, None);
        assert!(file.params.inputs.is_empty());
    }

    #[test]
    fn partial_addresses_rejected() {
        let text = SCENARIO.replace("bias_base_addr = 0x0100", "");
        let file = LayerFile::parse(&text).unwrap();
        assert!(file.config().is_err());
    }

    #[test]
    fn parameter_count_mismatch_rejected() {
        let text = SCENARIO.replace("weights = [3, -2]", "weights = [3]");
        let file = LayerFile::parse(&text).unwrap();
        let config = file.config().unwrap();
        assert!(file.memory(&config).is_err());
    }

    #[test]
    fn memory_too_small_rejected() {
        let text = SCENARIO.replace("size = 1024", "size = 16");
        let file = LayerFile::parse(&text).unwrap();
        let config = file.config().unwrap();
        assert!(file.memory(&config).is_err());
    }
}
