//! Controller state encoding.
//!
//! Six states, encoded in three bits. The machine is cyclic — there is no
//! terminal state:
//!
//! ```text
//!   IDLE ──data_valid──▶ LOAD_WEIGHTS ──weights==IN×OUT──▶ LOAD_BIASES
//!    ▲                                                          │
//!    │                                                  biases==OUT
//!    │                                                          ▼
//!   DONE ◀──last write completes── STORE_RESULT ◀──────────── FC
//! ```

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum State {
    /// Waiting for `data_valid`.
    #[default]
    Idle = 0,
    /// Streaming the weight matrix into the staging store.
    LoadWeights = 1,
    /// Streaming the bias vector into the staging store.
    LoadBiases = 2,
    /// Dot-product, bias add and ReLU across all outputs in one step.
    Fc = 3,
    /// Writing the result vector back to external memory.
    StoreResult = 4,
    /// One-step completion pulse (`done`, `data_out_valid`).
    Done = 5,
}

impl State {
    /// Three-bit encoding, as driven on the state output.
    #[must_use]
    pub const fn encoding(self) -> u8 {
        self as u8
    }

    /// True while the controller may have a memory transfer outstanding.
    #[must_use]
    pub const fn uses_memory(self) -> bool {
        matches!(self, Self::LoadWeights | Self::LoadBiases | Self::StoreResult)
    }

    /// True in the state where `done` and `data_out_valid` are asserted.
    #[must_use]
    pub const fn asserts_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::LoadWeights => "LOAD_WEIGHTS",
            Self::LoadBiases => "LOAD_BIASES",
            Self::Fc => "FC",
            Self::StoreResult => "STORE_RESULT",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}
