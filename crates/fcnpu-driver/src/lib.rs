//! Driver for a fully-connected layer accelerator backed by external serial
//! memory.
//!
//! One instantiation evaluates one layer shape:
//! `result = ReLU(W · activation + bias)` in 16-bit fixed point. Weights and
//! biases are not kept on-chip between cycles; every cycle streams them in
//! from external memory one element per transfer, computes all outputs in a
//! single step, and writes the results back the same way.
//!
//! # Cycle
//!
//! ```text
//! IDLE ─data_valid─▶ LOAD_WEIGHTS ─▶ LOAD_BIASES ─▶ FC ─▶ STORE_RESULT ─▶ DONE ─▶ IDLE
//!                     IN×OUT reads    OUT reads     1 step  OUT writes      done pulse
//! ```
//!
//! Exactly one memory transfer is outstanding at any time, and no two phases
//! overlap.
//!
//! # Quick start
//!
//! ```
//! use fcnpu_driver::{Accelerator, LayerConfig, SimulatedMemory};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LayerConfig::contiguous(2, 1, 0x0000)?;
//! let mut memory = SimulatedMemory::new(1024).with_latency(2);
//! memory.write_elements(config.weight_base_addr, &[3, -2])?;
//! memory.write_elements(config.bias_base_addr, &[5])?;
//!
//! let mut npu = Accelerator::new(config, memory)?;
//! let report = npu.run(&[4, 1])?;
//! assert_eq!(report.results, vec![15]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod client;
mod config;
mod controller;
mod cycle;
mod error;
pub mod kernel;
mod loading;
mod store;
mod stream;
mod writer;

pub use backends::{MemoryStats, SimulatedMemory, TransferRecord};
pub use client::{ClientStats, MemoryStreamClient};
pub use config::{LayerConfig, DEFAULT_TIMEOUT_STEPS};
pub use controller::{Accelerator, Status, StepOutput};
pub use cycle::CycleReport;
pub use error::{ErrorKind, FcError, Result};
pub use loading::Loader;
pub use store::ParamStore;
pub use stream::{Completion, MemoryStream, TransferRequest};
pub use writer::ResultWriter;

/// Hardware constants (re-exported from fcnpu-chip).
pub mod chip {
    pub use fcnpu_chip::{
        element_address, fixed, memmap, port, Activation, Direction, Region, State,
        ACTIV_BITS, ELEMENT_BYTES,
    };
}

/// Commonly used types.
pub mod prelude {
    pub use crate::chip::{Activation, State};
    pub use crate::{
        Accelerator, CycleReport, ErrorKind, FcError, LayerConfig, MemoryStream, Result,
        SimulatedMemory, Status, StepOutput,
    };
}
