//! Accelerator controller
//!
//! Owns the staging store and the memory client and sequences
//! LOAD_WEIGHTS → LOAD_BIASES → FC → STORE_RESULT → DONE exactly once per
//! accepted input. One call to [`Accelerator::step`] is one scheduling step:
//! the outputs reflect the state the step started in (so `done` shows up
//! the step *after* the last write completes), then the next state is
//! computed.
//!
//! # Faults
//!
//! A memory timeout or protocol violation latches a fault. The status output
//! reports it and every further step returns the same error until
//! [`Accelerator::reset`]. There is no automatic retry.

use crate::client::{ClientStats, MemoryStreamClient};
use crate::config::LayerConfig;
use crate::cycle::CycleReport;
use crate::error::{ErrorKind, FcError, Result};
use crate::kernel;
use crate::loading::Loader;
use crate::store::ParamStore;
use crate::stream::MemoryStream;
use crate::writer::ResultWriter;
use fcnpu_chip::{port, Activation, State};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Signals observed during one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutput {
    /// State the step executed in
    pub state: State,
    /// Cycle-complete strobe
    pub done: bool,
    /// Result-vector-valid strobe
    pub data_out_valid: bool,
}

/// Status output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// IDLE, ready to accept an input
    Ready,
    /// A cycle is in progress
    Busy,
    /// A fault is latched; call [`Accelerator::reset`]
    Fault(ErrorKind),
}

/// Fully-connected layer accelerator bound to one memory device
#[derive(Debug)]
pub struct Accelerator<M> {
    config: LayerConfig,
    state: State,
    store: ParamStore,
    activations: Vec<Activation>,
    client: MemoryStreamClient<M>,
    loader: Loader,
    writer: ResultWriter,
    fault: Option<FcError>,
    steps: u64,
    cycles: u64,
}

impl<M: MemoryStream> Accelerator<M> {
    /// Bind a validated layer configuration to a memory device
    ///
    /// # Errors
    ///
    /// Returns [`FcError::InvalidConfiguration`] if the configuration is
    /// rejected by [`LayerConfig::validate`].
    pub fn new(config: LayerConfig, memory: M) -> Result<Self> {
        config.validate()?;
        info!(
            "Accelerator: layer {}→{}, {} transfers per cycle",
            config.input_size,
            config.output_size,
            config.weight_count() + 2 * config.output_size
        );
        Ok(Self {
            store: ParamStore::new(config.input_size, config.output_size),
            activations: vec![0; config.input_size],
            client: MemoryStreamClient::new(memory, config.timeout_steps),
            loader: Loader::new(),
            writer: ResultWriter::new(),
            state: State::Idle,
            fault: None,
            steps: 0,
            cycles: 0,
            config,
        })
    }

    /// Current controller state
    pub const fn state(&self) -> State {
        self.state
    }

    /// Status output
    pub fn status(&self) -> Status {
        match (&self.fault, self.state) {
            (Some(e), _) => Status::Fault(e.kind()),
            (None, State::Idle) => Status::Ready,
            (None, _) => Status::Busy,
        }
    }

    /// Latched fault, if any
    pub const fn fault(&self) -> Option<&FcError> {
        self.fault.as_ref()
    }

    /// Layer configuration
    pub const fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Weight progress counter
    pub const fn weight_count(&self) -> usize {
        self.loader.weight_count()
    }

    /// Bias progress counter
    pub const fn bias_count(&self) -> usize {
        self.loader.bias_count()
    }

    /// Results written back so far this cycle
    pub const fn stored_count(&self) -> usize {
        self.writer.stored_count()
    }

    /// Staged parameters and last result vector
    pub const fn params(&self) -> &ParamStore {
        &self.store
    }

    /// Result vector from the most recent FC step
    pub fn result(&self) -> &[Activation] {
        self.store.results()
    }

    /// Output port: the result vector packed across all `OUTPUT_SIZE` lanes
    pub fn output_port(&self) -> Vec<u8> {
        port::pack(self.store.results())
    }

    /// Steps executed since construction or the last reset
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Cycles completed since construction or the last reset
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Transfer counters of the memory client
    pub const fn transfer_stats(&self) -> ClientStats {
        self.client.stats()
    }

    /// Memory device
    pub const fn memory(&self) -> &M {
        self.client.memory()
    }

    /// Memory device (mutable, e.g. to preload parameters while IDLE)
    pub fn memory_mut(&mut self) -> &mut M {
        self.client.memory_mut()
    }

    /// Move the three regions; only allowed while IDLE
    ///
    /// # Errors
    ///
    /// Returns [`FcError::InvalidState`] outside IDLE, or
    /// [`FcError::InvalidConfiguration`] if the new layout is rejected.
    pub fn set_base_addresses(&mut self, weight: u32, bias: u32, output: u32) -> Result<()> {
        if self.state != State::Idle {
            return Err(FcError::invalid_state(format!(
                "base addresses can only change in IDLE (now {})",
                self.state
            )));
        }
        let config = self
            .config
            .clone()
            .with_weight_base(weight)
            .with_bias_base(bias)
            .with_output_base(output);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Hardware reset: back to IDLE, counters zeroed, fault cleared
    pub fn reset(&mut self) {
        if let Some(e) = self.fault.take() {
            info!("Accelerator: clearing fault ({e})");
        }
        self.client.reset();
        self.client.set_timeout_steps(self.config.timeout_steps);
        self.loader.reset();
        self.writer.reset();
        self.state = State::Idle;
        self.steps = 0;
        self.cycles = 0;
    }

    /// Execute one scheduling step
    ///
    /// `input` is the `data_valid` strobe together with the activation
    /// vector. It is only sampled in IDLE; inputs presented in any other
    /// state are ignored.
    ///
    /// # Errors
    ///
    /// - [`FcError::InvalidConfiguration`] if an input is presented in IDLE
    ///   with a length other than `INPUT_SIZE` (the input is not accepted;
    ///   no fault is latched)
    /// - the latched fault, if one is present
    /// - [`FcError::MemoryTimeout`] or another memory error, which is then
    ///   latched
    pub fn step(&mut self, input: Option<&[Activation]>) -> Result<StepOutput> {
        if let Some(e) = &self.fault {
            return Err(e.clone());
        }

        let current = self.state;
        let output = StepOutput {
            state: current,
            done: current.asserts_done(),
            data_out_valid: current.asserts_done(),
        };

        let next = match self.next_state(current, input) {
            Ok(next) => next,
            Err(e) if e.kind() == ErrorKind::InvalidConfiguration && current == State::Idle => {
                return Err(e);
            }
            Err(e) => {
                warn!("Accelerator: fault in {current}: {e}");
                self.fault = Some(e.clone());
                return Err(e);
            }
        };

        if next != current {
            debug!(
                "{current} → {next} (weights {}/{}, biases {}/{}, stored {}/{})",
                self.loader.weight_count(),
                self.config.weight_count(),
                self.loader.bias_count(),
                self.config.output_size,
                self.writer.stored_count(),
                self.config.output_size
            );
        }
        self.state = next;
        self.steps += 1;
        Ok(output)
    }

    fn next_state(&mut self, current: State, input: Option<&[Activation]>) -> Result<State> {
        if current != State::Idle && input.is_some() {
            debug!("Accelerator: input ignored in {current}");
        }
        if !current.uses_memory() && !self.client.is_idle() {
            return Err(FcError::invalid_state(format!(
                "memory transfer outstanding in {current}"
            )));
        }

        match current {
            State::Idle => match input {
                Some(activations) => {
                    self.accept(activations)?;
                    Ok(State::LoadWeights)
                }
                None => Ok(State::Idle),
            },
            State::LoadWeights => {
                let done = self
                    .loader
                    .step_weights(&mut self.client, &mut self.store, &self.config)?;
                Ok(if done { State::LoadBiases } else { State::LoadWeights })
            }
            State::LoadBiases => {
                let done = self
                    .loader
                    .step_biases(&mut self.client, &mut self.store, &self.config)?;
                Ok(if done { State::Fc } else { State::LoadBiases })
            }
            State::Fc => {
                if !self.loader.is_complete(&self.config) {
                    return Err(FcError::invalid_state(format!(
                        "FC entered with {}/{} weights and {}/{} biases",
                        self.loader.weight_count(),
                        self.config.weight_count(),
                        self.loader.bias_count(),
                        self.config.output_size
                    )));
                }
                kernel::run(&mut self.store, &self.activations);
                Ok(State::StoreResult)
            }
            State::StoreResult => {
                let done = self
                    .writer
                    .step(&mut self.client, &self.store, &self.config)?;
                Ok(if done { State::Done } else { State::StoreResult })
            }
            State::Done => {
                self.cycles += 1;
                Ok(State::Idle)
            }
        }
    }

    fn accept(&mut self, activations: &[Activation]) -> Result<()> {
        if activations.len() != self.config.input_size {
            return Err(FcError::invalid_configuration(format!(
                "activation vector has {} elements, layer expects {}",
                activations.len(),
                self.config.input_size
            )));
        }
        self.activations.copy_from_slice(activations);
        self.loader.reset();
        self.writer.reset();
        debug!("Accelerator: accepted input {:?}", self.activations);
        Ok(())
    }

    /// Run one complete cycle: assert `data_valid` once, then step until
    /// `done`
    ///
    /// This is the blocking form of the step interface. With
    /// `timeout_steps = None` and a memory device that never completes it
    /// does not return.
    ///
    /// # Errors
    ///
    /// Returns [`FcError::InvalidState`] if the controller is not IDLE, or
    /// any error [`step`](Self::step) reports.
    pub fn run(&mut self, activations: &[Activation]) -> Result<CycleReport> {
        if let Some(e) = &self.fault {
            return Err(e.clone());
        }
        if self.state != State::Idle {
            return Err(FcError::invalid_state(format!(
                "run() requires IDLE (now {})",
                self.state
            )));
        }

        let start = Instant::now();
        let before = self.client.stats();
        let mut input = Some(activations);
        let mut steps = 0u64;

        loop {
            let out = self.step(input.take())?;
            steps += 1;
            if out.done {
                break;
            }
        }

        let after = self.client.stats();
        let mut report = CycleReport::new(self.store.results().to_vec());
        report.steps = steps;
        report.reads = after.reads_issued - before.reads_issued;
        report.writes = after.writes_issued - before.writes_issued;
        report.wait_steps = after.wait_steps - before.wait_steps;
        report.duration = start.elapsed();

        info!(
            "Cycle {} complete in {} steps ({} reads, {} writes): {:?}",
            self.cycles,
            report.steps,
            report.reads,
            report.writes,
            report.results
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SimulatedMemory;

    fn accelerator(
        input: usize,
        weights: &[Activation],
        biases: &[Activation],
        latency: u32,
    ) -> Accelerator<SimulatedMemory> {
        let config = LayerConfig::contiguous(input, biases.len(), 0).unwrap();
        let mut mem = SimulatedMemory::new(0x400).with_latency(latency);
        mem.write_elements(config.weight_base_addr, weights).unwrap();
        mem.write_elements(config.bias_base_addr, biases).unwrap();
        Accelerator::new(config, mem).unwrap()
    }

    #[test]
    fn starts_idle_and_ready() {
        let acc = accelerator(2, &[3, -2], &[5], 1);
        assert_eq!(acc.state(), State::Idle);
        assert_eq!(acc.status(), Status::Ready);
    }

    #[test]
    fn idle_without_input_stays_idle() {
        let mut acc = accelerator(2, &[3, -2], &[5], 1);
        for _ in 0..5 {
            let out = acc.step(None).unwrap();
            assert_eq!(out.state, State::Idle);
            assert!(!out.done);
        }
        assert_eq!(acc.transfer_stats().reads_issued, 0);
    }

    #[test]
    fn wrong_input_length_is_rejected_without_fault() {
        let mut acc = accelerator(2, &[3, -2], &[5], 1);
        let err = acc.step(Some(&[1, 2, 3][..])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(acc.status(), Status::Ready);
        assert!(acc.run(&[4, 1]).is_ok());
    }

    #[test]
    fn state_sequence_for_single_output() {
        let mut acc = accelerator(2, &[3, -2], &[5], 1);
        let mut seen = Vec::new();
        let mut input = Some(&[4, 1][..]);
        loop {
            let out = acc.step(input.take()).unwrap();
            if seen.last() != Some(&out.state) {
                seen.push(out.state);
            }
            if out.done {
                break;
            }
        }
        assert_eq!(
            seen,
            vec![
                State::Idle,
                State::LoadWeights,
                State::LoadBiases,
                State::Fc,
                State::StoreResult,
                State::Done
            ]
        );
        assert_eq!(acc.result(), &[15]);
        acc.step(None).unwrap();
        assert_eq!(acc.state(), State::Idle);
        assert_eq!(acc.cycles(), 1);
    }

    #[test]
    fn base_addresses_locked_outside_idle() {
        let mut acc = accelerator(2, &[3, -2], &[5], 4);
        acc.step(Some(&[4, 1][..])).unwrap();
        assert_eq!(acc.status(), Status::Busy);
        let err = acc.set_base_addresses(0x100, 0x200, 0x300).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(acc.run(&[4, 1]).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn transfer_outside_memory_states_is_a_fault() {
        let mut acc = accelerator(2, &[3, -2], &[5], 4);
        acc.client.issue_read(0).unwrap();
        let err = acc.step(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(acc.status(), Status::Fault(ErrorKind::InvalidState));

        acc.reset();
        assert!(acc.client.is_idle());
        assert_eq!(acc.transfer_stats(), ClientStats::default());
        assert_eq!(acc.run(&[4, 1]).unwrap().results, vec![15]);
    }
}
