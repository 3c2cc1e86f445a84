//! Per-cycle results and metrics

use bytes::Bytes;
use fcnpu_chip::{port, Activation};
use std::time::Duration;

/// Outcome of one full IDLE → DONE cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Result vector, one lane per output
    pub results: Vec<Activation>,

    /// Packed output port (Bytes enables zero-copy sharing of results)
    pub output: Bytes,

    /// Scheduling steps from accepting the input to the `done` pulse
    pub steps: u64,

    /// Read transfers issued (weights + biases)
    pub reads: u64,

    /// Write transfers issued (results)
    pub writes: u64,

    /// Steps spent waiting on outstanding transfers
    pub wait_steps: u64,

    /// Wall-clock duration of the cycle
    pub duration: Duration,
}

impl CycleReport {
    pub(crate) fn new(results: Vec<Activation>) -> Self {
        let output = Bytes::from(port::pack(&results));
        Self {
            results,
            output,
            steps: 0,
            reads: 0,
            writes: 0,
            wait_steps: 0,
            duration: Duration::ZERO,
        }
    }

    /// Total memory transfers issued
    pub const fn transfers(&self) -> u64 {
        self.reads + self.writes
    }

    /// Simulated steps per second of wall-clock time
    pub fn steps_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() == 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let steps = self.steps as f64;
        steps / self.duration.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_port_matches_results() {
        let report = CycleReport::new(vec![15, 0, -1]);
        assert_eq!(port::unpack(&report.output), vec![15, 0, -1]);
        assert_eq!(report.transfers(), 0);
        assert!(report.steps_per_second().abs() < f64::EPSILON);
    }
}
