//! Abstraction traits used by the transport layer (peripheral driver, tick
//! source, and frame transmission).
pub mod frame_transmit;
pub mod peripheral;
pub mod tick_source;
