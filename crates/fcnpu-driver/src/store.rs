//! Staging store for one cycle's parameters and results.
//!
//! Holds the weight matrix (row-major, `OUTPUT_SIZE × INPUT_SIZE`), the bias
//! vector and the result vector. It is repopulated from external memory every
//! cycle and has no behavior of its own.

use fcnpu_chip::Activation;

/// Weight, bias and result storage for one layer shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamStore {
    input_size: usize,
    weights: Vec<Activation>, // [output_size × input_size]
    biases: Vec<Activation>,  // [output_size]
    results: Vec<Activation>, // [output_size]
}

impl ParamStore {
    /// Zero-filled store for a `input_size → output_size` layer
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            input_size,
            weights: vec![0; input_size * output_size],
            biases: vec![0; output_size],
            results: vec![0; output_size],
        }
    }

    /// Store weight element `index` in row-major order, i.e.
    /// `weights[index / INPUT_SIZE][index % INPUT_SIZE]`
    ///
    /// # Panics
    ///
    /// Panics if `index >= INPUT_SIZE × OUTPUT_SIZE`.
    pub fn set_weight(&mut self, index: usize, value: Activation) {
        self.weights[index] = value;
    }

    /// Store bias element `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= OUTPUT_SIZE`.
    pub fn set_bias(&mut self, index: usize, value: Activation) {
        self.biases[index] = value;
    }

    /// Iterate over weight rows, one per output
    pub fn rows(&self) -> std::slice::ChunksExact<'_, Activation> {
        self.weights.chunks_exact(self.input_size)
    }

    /// Bias vector
    pub fn biases(&self) -> &[Activation] {
        &self.biases
    }

    /// Result vector from the most recent compute step
    pub fn results(&self) -> &[Activation] {
        &self.results
    }

    /// Replace the whole result vector at once
    ///
    /// # Panics
    ///
    /// Panics if `results.len() != OUTPUT_SIZE`.
    pub fn commit_results(&mut self, results: &[Activation]) {
        self.results.copy_from_slice(results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_indexing() {
        let mut store = ParamStore::new(3, 2);
        for i in 0..6 {
            store.set_weight(i, i as Activation * 10);
        }
        let rows: Vec<&[Activation]> = store.rows().collect();
        assert_eq!(rows, vec![&[0, 10, 20][..], &[30, 40, 50][..]]);
    }

    #[test]
    fn results_replace_atomically() {
        let mut store = ParamStore::new(1, 3);
        store.commit_results(&[1, 2, 3]);
        assert_eq!(store.results(), &[1, 2, 3]);
        store.commit_results(&[0, 0, 7]);
        assert_eq!(store.results(), &[0, 0, 7]);
    }
}
