//! CAN transport layer: frame representations, the fleet's 29-bit identifier
//! convention, hardware filter descriptors, and the driver abstraction traits.
//!
//! ## Timing and identifier constants
//!
//! These constants are shared by every controller variant so that consumers
//! see one identifier contract whatever the peripheral underneath.

pub mod can_frame;
pub mod can_id;
pub mod filter;
pub mod traits;

/// Mask of an 11-bit standard identifier.
pub const STD_ID_MASK: u32 = 0x7FF;

/// Mask of a 29-bit extended identifier.
pub const EXT_ID_MASK: u32 = 0x1FFF_FFFF;

/// Maximum payload of a classic CAN frame (bytes).
pub const MAX_PAYLOAD_LEN: usize = 8;

/// Default bound on the wait for a free transmit slot on FDCAN (ms).
///
/// The FDCAN TX FIFO is drained by the controller at bus speed; waiting longer
/// than this means the bus is saturated, disconnected or in error passive state.
///
/// # Implementation notes
///
/// bxCAN and the SPI controller have no default bound: `CanBus::transmit` spins
/// until a mailbox frees up unless
/// [`BusConfigBuilder::tx_timeout_ms`](crate::config::BusConfigBuilder::tx_timeout_ms)
/// sets one explicitly.
pub const FDCAN_TX_TIMEOUT_MS: u32 = 20;

/// Maximum number of frames pulled from one hardware FIFO in a single drain.
///
/// A FIFO holds at most a handful of frames (3 on bxCAN and FDCAN); the bound
/// keeps a peripheral that never reports an empty FIFO from wedging the caller.
pub const DRAIN_LIMIT: usize = 64;
