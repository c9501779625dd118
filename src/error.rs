//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (frame construction, filter
//! capacity, registry capacity, bus operations).
use crate::protocol::transport::filter::IdWidth;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur while building a frame or a filter.
pub enum FrameError {
    /// The identifier does not fit in 11 (standard) or 29 (extended) bits.
    #[error("Identifier {id:#x} out of range")]
    IdentifierOutOfRange { id: u32 },
    /// Classic CAN frames carry at most eight bytes.
    #[error("Payload too long: {len} bytes")]
    PayloadTooLong { len: usize },
    /// Range filters require `low <= high`.
    #[error("Invalid filter range {low:#x}..={high:#x}")]
    InvalidRange { low: u32, high: u32 },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Hardware filter slots are a bounded resource.
pub enum FilterBankError {
    /// Every slot of the pool serving this identifier width is in use.
    #[error("No free {width:?} filter slot")]
    Exhausted { width: IdWidth },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Failures of the interface registry.
pub enum RegistryError {
    /// All interface entries are taken by other buses.
    #[error("Interface registry is full")]
    TableFull,
}

#[derive(Error, Debug)]
/// Errors returned by the bus facade.
pub enum CanError<E: core::fmt::Debug> {
    /// The operation needs `CanBus::init` to have succeeded first.
    #[error("Bus is not initialized")]
    NotInitialized,

    /// Remote transmission requests are never sent by this layer.
    #[error("Remote frames cannot be transmitted")]
    RemoteFrame,

    /// Payload length exceeds eight bytes.
    #[error("Invalid payload length: {len}")]
    InvalidLength { len: u8 },

    /// Identifier or filter does not fit its declared width.
    #[error(transparent)]
    InvalidFrame(#[from] FrameError),

    /// The controller cannot express this filter kind.
    #[error("Filter kind not supported by this controller")]
    UnsupportedFilter,

    /// No free hardware filter slot.
    #[error(transparent)]
    FilterBank(#[from] FilterBankError),

    /// The callback list of the FIFO has no room left.
    #[error("Callback list is full")]
    CallbackListFull,

    /// The token does not belong to a registered callback.
    #[error("Unknown callback token")]
    UnknownCallback,

    /// No transmit mailbox became free before the deadline.
    #[error("No free transmit mailbox within {timeout_ms} ms")]
    TransmitTimeout { timeout_ms: u32 },

    /// The interface registry refused the bus.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Error reported by the underlying peripheral driver.
    #[error("Peripheral error: {0:?}")]
    Peripheral(E),
}
