//! Contract between the bus facade and a vendor CAN driver. Allows the library
//! to plug into bxCAN, FDCAN or an SPI controller without knowing its registers.
//!
//! The driver is split in two: the [`Peripheral`] itself, owned by one
//! [`CanBus`](crate::bus::CanBus) and used from normal context only, and a
//! cheap copyable [`InterfaceHandle`] that identifies the hardware instance and
//! can read receive FIFOs from interrupt context.
use crate::protocol::transport::{
    can_frame::{RawRxFrame, TxHeader},
    filter::{Fifo, Filter, FilterSlot},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Transmit mailbox (bxCAN, SPI controller) or TX buffer index (FDCAN) that
/// accepted a frame.
pub struct Mailbox(pub u8);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Settings applied by [`Peripheral::init`].
pub struct InitSettings {
    /// Retransmit frames that lost arbitration or were not acknowledged.
    pub auto_retransmit: bool,
    /// Number of standard filter elements in use (highest index + 1).
    pub standard_filters: u8,
    /// Number of extended filter elements in use (highest index + 1).
    pub extended_filters: u8,
}

/// Identity of a hardware instance, usable from interrupt context.
///
/// Equality must mean "same peripheral": the interface registry matches
/// interrupts to buses by comparing handles.
pub trait InterfaceHandle: Copy + PartialEq {
    type Error: core::fmt::Debug;

    /// Frames currently waiting in `fifo`.
    fn fifo_fill_level(&self, fifo: Fifo) -> usize;

    /// Pop the oldest frame of `fifo`.
    fn pop_frame(&self, fifo: Fifo) -> Result<RawRxFrame, Self::Error>;
}

/// Vendor driver operations needed by the bus facade.
pub trait Peripheral {
    type Handle: InterfaceHandle;
    type Error: core::fmt::Debug;

    /// Handle identifying this hardware instance.
    fn handle(&self) -> Self::Handle;

    /// Configure the controller. Called while stopped.
    fn init(&mut self, settings: &InitSettings) -> Result<(), Self::Error>;
    fn start(&mut self) -> Result<(), Self::Error>;
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// Program `filter` into `slot`, routing matches to `fifo`.
    fn configure_filter(
        &mut self,
        slot: FilterSlot,
        filter: &Filter,
        fifo: Fifo,
    ) -> Result<(), Self::Error>;
    /// Deactivate `slot` so it no longer accepts frames.
    fn disable_filter(&mut self, slot: FilterSlot) -> Result<(), Self::Error>;

    /// Free transmit mailboxes (or TX FIFO elements).
    fn transmit_slots_free(&self) -> usize;
    /// Queue one frame for transmission. `data` is always eight bytes; only
    /// `header.dlc` of them are meaningful.
    fn submit_frame(&mut self, header: &TxHeader, data: &[u8; 8]) -> Result<Mailbox, Self::Error>;

    /// Enable the "frame pending" interrupt of `fifo`.
    fn enable_notification(&mut self, fifo: Fifo) -> Result<(), Self::Error>;
    fn disable_notification(&mut self, fifo: Fifo) -> Result<(), Self::Error>;
}
