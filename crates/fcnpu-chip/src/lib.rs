//! Hardware model of the FC-layer accelerator.
//!
//! This crate has **no dependencies** and **no I/O** — it is a pure model of
//! the silicon: the fixed-point format, how elements map onto the external
//! serial memory, the controller state encoding, and the output port layout.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`fixed`] | `ACTIV_BITS`, the 16-bit activation type, payload truncation, ReLU |
//! | [`memmap`] | Element addressing (`base + index × 2`), regions, transfer direction |
//! | [`state`] | Controller state encoding (IDLE … DONE) |
//! | [`port`] | Output port packing for the full configured `OUTPUT_SIZE` |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fixed;
pub mod memmap;
pub mod port;
pub mod state;

pub use fixed::{Activation, ACTIV_BITS, ELEMENT_BYTES};
pub use memmap::{element_address, Direction, Region};
pub use state::State;
