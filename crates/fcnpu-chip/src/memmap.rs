//! External memory layout.
//!
//! The accelerator sees one flat byte-addressable serial memory. Three
//! regions live in it, each a dense array of `ELEMENT_BYTES`-wide elements:
//!
//! ```text
//! Region   Base               Elements                 Direction
//! ──────── ────────────────── ──────────────────────── ─────────
//! weights  weight_base_addr   OUTPUT_SIZE × INPUT_SIZE Read   (row-major)
//! biases   bias_base_addr     OUTPUT_SIZE              Read
//! results  output_base_addr   OUTPUT_SIZE              Write
//! ```
//!
//! Element `i` of a region lives at `base + i × ELEMENT_BYTES`. Addresses are
//! 32 bits wide; a region that would run past `u32::MAX` is invalid.

use crate::fixed::ELEMENT_BYTES;

/// Direction of one memory transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Memory → accelerator (weights, biases).
    Read,
    /// Accelerator → memory (results).
    Write,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// Address of element `index` in a region starting at `base`.
///
/// Returns `None` if the address does not fit in 32 bits.
#[must_use]
pub fn element_address(base: u32, index: usize) -> Option<u32> {
    let index = u32::try_from(index).ok()?;
    index
        .checked_mul(ELEMENT_BYTES)
        .and_then(|offset| base.checked_add(offset))
}

/// A dense array of elements in external memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Byte address of element 0.
    pub base: u32,
    /// Number of elements.
    pub elements: usize,
}

impl Region {
    /// Create a region descriptor.
    #[must_use]
    pub const fn new(base: u32, elements: usize) -> Self {
        Self { base, elements }
    }

    /// Size in bytes, saturating at `u64::MAX`.
    #[must_use]
    pub const fn len_bytes(&self) -> u64 {
        (self.elements as u64).saturating_mul(ELEMENT_BYTES as u64)
    }

    /// One past the last byte (may exceed the 32-bit address space).
    ///
    /// Saturates, so a region too large to describe never fits.
    #[must_use]
    pub const fn end(&self) -> u64 {
        (self.base as u64).saturating_add(self.len_bytes())
    }

    /// True if every byte of the region is addressable with 32 bits.
    #[must_use]
    pub const fn fits_address_space(&self) -> bool {
        self.end() <= u32::MAX as u64 + 1
    }

    /// True if the two regions share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        if self.elements == 0 || other.elements == 0 {
            return false;
        }
        (self.base as u64) < other.end() && (other.base as u64) < self.end()
    }

    /// Address of element `index`, if it is inside the region.
    #[must_use]
    pub fn address_of(&self, index: usize) -> Option<u32> {
        if index >= self.elements {
            return None;
        }
        element_address(self.base, index)
    }
}
