//! Fixed-point activation format.
//!
//! Activations, weights, biases and results all share one format: a
//! `ACTIV_BITS`-wide signed two's-complement integer with no fractional
//! scaling applied by the hardware. Arithmetic wraps at that width; there is
//! no saturation anywhere except the ReLU clamp at the output.
//!
//! ## Memory encoding
//!
//! ```text
//! byte 0 : bits  7..0   (LSB)
//! byte 1 : bits 15..8   (sign bit = bit 15)
//! ```

/// Width of every fixed-point value, in bits.
pub const ACTIV_BITS: u32 = 16;

/// One fixed-point value.
pub type Activation = i16;

/// Bytes occupied by one element in external memory.
pub const ELEMENT_BYTES: u32 = ACTIV_BITS / 8;

/// Sign bit position within a value.
pub const SIGN_BIT: u32 = ACTIV_BITS - 1;

/// Keep the low `ACTIV_BITS` bits of a little-endian memory payload.
///
/// Payloads longer than one element are truncated, shorter ones are
/// zero-extended. This is what the loader latches into the staging store.
#[must_use]
pub fn from_payload(payload: &[u8]) -> Activation {
    let lo = payload.first().copied().unwrap_or(0);
    let hi = payload.get(1).copied().unwrap_or(0);
    Activation::from_le_bytes([lo, hi])
}

/// Encode a value the way the result writer puts it on the bus.
#[must_use]
pub const fn to_payload(value: Activation) -> [u8; ELEMENT_BYTES as usize] {
    value.to_le_bytes()
}

/// True if the sign bit of `value` is set.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn sign_bit(value: Activation) -> bool {
    (value as u16) >> SIGN_BIT == 1
}

/// ReLU as the hardware does it: look at the sign bit, clamp to zero if set.
#[must_use]
pub const fn relu(value: Activation) -> Activation {
    if sign_bit(value) {
        0
    } else {
        value
    }
}

/// One multiply-accumulate step at the accumulator's natural width.
#[must_use]
pub const fn mac(acc: Activation, weight: Activation, activation: Activation) -> Activation {
    acc.wrapping_add(weight.wrapping_mul(activation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_keeps_low_bits() {
        assert_eq!(from_payload(&[0x34, 0x12]), 0x1234);
        assert_eq!(from_payload(&[0xFF, 0xFF, 0xAB, 0xCD]), -1);
        assert_eq!(from_payload(&[0x05]), 5);
        assert_eq!(from_payload(&[]), 0);
    }

    #[test]
    fn payload_encoding_is_little_endian() {
        assert_eq!(to_payload(-2), [0xFE, 0xFF]);
        assert_eq!(from_payload(&to_payload(-12345)), -12345);
    }

    #[test]
    fn relu_clamps_on_sign_bit() {
        assert_eq!(relu(15), 15);
        assert_eq!(relu(0), 0);
        assert_eq!(relu(-8), 0);
        assert_eq!(relu(i16::MIN), 0);
        assert_eq!(relu(i16::MAX), i16::MAX);
    }

    #[test]
    fn mac_wraps_at_activation_width() {
        assert_eq!(mac(5, 3, 4), 17);
        // 200 * 200 = 40000 wraps to -25536
        assert_eq!(mac(0, 200, 200), -25536);
        assert_eq!(mac(i16::MAX, 1, 1), i16::MIN);
    }
}
