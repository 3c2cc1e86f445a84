//! Compute kernel: affine transform followed by ReLU.
//!
//! For every output lane `i`:
//!
//! ```text
//! acc       = bias[i] + Σ_j weight[i][j] × activation[j]     (wraps at 16 bits)
//! result[i] = acc if sign_bit(acc) == 0 else 0
//! ```
//!
//! Lanes are independent; the hardware evaluates all of them in the single
//! FC step. Here each lane is one fold over its weight row, and the whole
//! result vector is committed to the store at once so no partial result is
//! ever visible.

use crate::store::ParamStore;
use fcnpu_chip::{fixed, Activation};

/// Accumulate and activate one output lane
pub fn lane(row: &[Activation], bias: Activation, activations: &[Activation]) -> Activation {
    let acc = row
        .iter()
        .zip(activations)
        .fold(bias, |acc, (&w, &x)| fixed::mac(acc, w, x));
    fixed::relu(acc)
}

/// Evaluate every lane against the staged parameters
///
/// `activations` must hold `INPUT_SIZE` values; the controller checks this
/// when it accepts the input.
pub fn evaluate(store: &ParamStore, activations: &[Activation]) -> Vec<Activation> {
    store
        .rows()
        .zip(store.biases())
        .map(|(row, &bias)| lane(row, bias, activations))
        .collect()
}

/// Evaluate and commit the result vector into the store
pub fn run(store: &mut ParamStore, activations: &[Activation]) {
    let results = evaluate(store, activations);
    store.commit_results(&results);
}
