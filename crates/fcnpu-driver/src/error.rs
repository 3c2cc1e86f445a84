//! Error types for accelerator operations

use fcnpu_chip::Direction;
use thiserror::Error;

/// Result type alias for accelerator operations
pub type Result<T> = std::result::Result<T, FcError>;

/// Errors that can occur while configuring or stepping the accelerator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FcError {
    /// Layer shape, addresses or input vector do not describe a valid cycle
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for rejection
        reason: String,
    },

    /// A memory transfer stayed outstanding past the configured limit
    #[error("Memory {direction} at 0x{address:08x} not complete after {waited_steps} steps")]
    MemoryTimeout {
        /// Address of the stalled transfer
        address: u32,
        /// Direction of the stalled transfer
        direction: Direction,
        /// Steps spent waiting
        waited_steps: u32,
    },

    /// A transfer was issued while another was still outstanding
    #[error("Memory {direction} at 0x{address:08x} issued while a transfer is in flight")]
    TransferInFlight {
        /// Address of the rejected request
        address: u32,
        /// Direction of the rejected request
        direction: Direction,
    },

    /// Memory access outside the backing store
    #[error("Address range 0x{address:08x}+{len} outside {size}-byte memory")]
    AddressOutOfRange {
        /// First byte of the access
        address: u32,
        /// Access length in bytes
        len: usize,
        /// Size of the backing store
        size: usize,
    },

    /// Operation not allowed in the current controller state
    #[error("Controller in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },
}

/// Flat classification of [`FcError`], reported through the status output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`FcError::InvalidConfiguration`]
    InvalidConfiguration,
    /// See [`FcError::MemoryTimeout`]
    MemoryTimeout,
    /// See [`FcError::TransferInFlight`]
    TransferInFlight,
    /// See [`FcError::AddressOutOfRange`]
    AddressOutOfRange,
    /// See [`FcError::InvalidState`]
    InvalidState,
}

impl FcError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Classify this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidConfiguration { .. } => ErrorKind::InvalidConfiguration,
            Self::MemoryTimeout { .. } => ErrorKind::MemoryTimeout,
            Self::TransferInFlight { .. } => ErrorKind::TransferInFlight,
            Self::AddressOutOfRange { .. } => ErrorKind::AddressOutOfRange,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfiguration => write!(f, "InvalidConfiguration"),
            Self::MemoryTimeout => write!(f, "MemoryTimeout"),
            Self::TransferInFlight => write!(f, "TransferInFlight"),
            Self::AddressOutOfRange => write!(f, "AddressOutOfRange"),
            Self::InvalidState => write!(f, "InvalidState"),
        }
    }
}
