//! Protocol-facing components: the canonical CAN transport model, the driver
//! contracts, and the device protocols layered on top of raw frames.
pub mod devices;
pub mod transport;
