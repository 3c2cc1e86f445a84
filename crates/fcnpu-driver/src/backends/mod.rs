//! Memory device implementations
//!
//! - **Simulated**: byte-addressable image with configurable completion
//!   latency and a stall switch (CI, CLI, cross-checking the kernel)
//!
//! Real serial memory controllers plug in by implementing
//! [`MemoryStream`](crate::MemoryStream).

pub mod simulated;

pub use simulated::{MemoryStats, SimulatedMemory, TransferRecord};
