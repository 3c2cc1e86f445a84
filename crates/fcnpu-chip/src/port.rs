//! Output port layout.
//!
//! The result vector leaves the accelerator as one `OUTPUT_SIZE × ACTIV_BITS`
//! wide word, element 0 in the least significant bits:
//!
//! ```text
//! bit  OUT×16-1 ............................................. 0
//!      [ result[OUT-1] | ... | result[1] | result[0] ]
//! ```
//!
//! As bytes this is the little-endian encoding of each element, in index
//! order. The port is as wide as the configured `OUTPUT_SIZE`; nothing
//! about it is fixed at eight lanes.

use crate::fixed::{from_payload, to_payload, Activation, ACTIV_BITS, ELEMENT_BYTES};

/// Port width in bits for `output_size` lanes.
#[must_use]
pub const fn width_bits(output_size: usize) -> usize {
    output_size * ACTIV_BITS as usize
}

/// Pack a result vector into port bytes.
#[must_use]
pub fn pack(results: &[Activation]) -> Vec<u8> {
    results.iter().flat_map(|&v| to_payload(v)).collect()
}

/// Unpack port bytes back into lanes. A trailing partial lane is ignored.
#[must_use]
pub fn unpack(port: &[u8]) -> Vec<Activation> {
    port.chunks_exact(ELEMENT_BYTES as usize)
        .map(from_payload)
        .collect()
}

/// Read lane `index` straight out of packed port bytes.
#[must_use]
pub fn lane(port: &[u8], index: usize) -> Option<Activation> {
    let start = index.checked_mul(ELEMENT_BYTES as usize)?;
    port.get(start..start + ELEMENT_BYTES as usize).map(from_payload)
}
