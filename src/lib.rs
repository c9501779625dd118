//! `psr-can` library: one canonical CAN bus interface over bxCAN, FDCAN and
//! discrete SPI controllers, in a `no_std` environment. The crate exposes the
//! frame/identifier model, the filter-bank and dispatch infrastructure, the
//! bus facade, and the device protocols built on top of it.
#![no_std]
//==================================================================================
/// Bus facade composing filters, callbacks and the interface registry.
pub mod bus;
/// Controller selection and per-bus configuration.
pub mod config;
/// Domain and low-level errors (frame construction, filter capacity,
/// registry capacity, peripheral failures).
pub mod error;
/// Filter-bank bookkeeping, callback dispatch and the interrupt-side registry.
pub mod infra;
/// Frame model, identifier conventions, driver contracts and device protocols.
pub mod protocol;
//==================================================================================
