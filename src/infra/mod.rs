//! Infrastructure shared by every bus: hardware filter-slot bookkeeping,
//! per-FIFO callback lists, and the registry consulted from interrupt context.
pub mod dispatch;
pub mod filter_bank;
pub mod registry;
