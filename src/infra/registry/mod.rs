//! Interface registry: maps an opaque hardware handle back to the bus that
//! owns it, so an interrupt handler that only knows "which peripheral fired"
//! can reach the right receive queue.
//!
//! The table is owned by the application (usually a `static`) and guarded by a
//! critical-section mutex. The interrupt path never allocates and never
//! blocks: it copies the target entry out of the lock, drains the hardware FIFO
//! into the bus' bounded [`RxQueue`] with `try_send`, and counts what did not
//! fit. Callbacks then run in normal context from
//! [`CanBus::process_queued`](crate::bus::CanBus::process_queued).
//!
//! ```ignore
//! static REGISTRY: InterfaceRegistry<'static, MyHandle> = InterfaceRegistry::new();
//!
//! #[interrupt]
//! fn FDCAN1_IT0() {
//!     REGISTRY.on_frame_pending(MyHandle::FDCAN1, Fifo::Fifo0);
//! }
//! ```
use crate::{
    error::RegistryError,
    infra::dispatch::drain_fifo,
    protocol::transport::{can_frame::Frame, filter::Fifo, traits::peripheral::InterfaceHandle},
};
use core::cell::RefCell;
use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    channel::Channel,
};

/// Interfaces a registry can track at once.
pub const MAX_INTERFACES: usize = 4;

/// Events buffered between the interrupt and normal context, per bus.
pub const RX_QUEUE_DEPTH: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Identity of one bus instance within a registry.
pub struct BusId(pub(crate) u8);

impl BusId {
    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// What the interrupt path hands over to normal context.
pub enum RxEvent {
    Frame {
        fifo: Fifo,
        frame: Frame,
        /// Callback generation of the bus when the frame was queued.
        generation: u32,
    },
    /// The driver failed to read a pending frame.
    ReadError { fifo: Fifo },
}

/// Bounded queue between the interrupt path and one bus.
pub type RxQueue = Channel<CriticalSectionRawMutex, RxEvent, RX_QUEUE_DEPTH>;

#[derive(Clone, Copy)]
struct RegistryEntry<'a, H> {
    bus: BusId,
    handle: H,
    queue: &'a RxQueue,
    generation: u32,
    /// Events lost to a full queue since the last `take_dropped`.
    dropped: u32,
}

struct RegistryTable<'a, H> {
    entries: [Option<RegistryEntry<'a, H>>; MAX_INTERFACES],
    next_id: u8,
}

/// Table of live `(bus, handle, queue)` associations.
pub struct InterfaceRegistry<'a, H> {
    table: Mutex<CriticalSectionRawMutex, RefCell<RegistryTable<'a, H>>>,
}

impl<'a, H: InterfaceHandle> Default for InterfaceRegistry<'a, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H: InterfaceHandle> InterfaceRegistry<'a, H> {
    pub const fn new() -> Self {
        Self {
            table: Mutex::new(RefCell::new(RegistryTable {
                entries: [None; MAX_INTERFACES],
                next_id: 0,
            })),
        }
    }

    /// Fresh bus identity, distinct from every registered one.
    pub fn allocate_bus_id(&self) -> BusId {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();
            loop {
                let id = BusId(table.next_id);
                table.next_id = table.next_id.wrapping_add(1);
                if !table.entries.iter().flatten().any(|e| e.bus == id) {
                    return id;
                }
            }
        })
    }

    /// Associate `bus` with `handle` and `queue`.
    ///
    /// Registering the same bus again updates its entry in place. Registering
    /// a different bus over a handle already in the table replaces the old
    /// association, so a handle never resolves to two buses.
    pub fn register(&self, bus: BusId, handle: H, queue: &'a RxQueue) -> Result<(), RegistryError> {
        self.table.lock(|table| {
            let mut table = table.borrow_mut();

            for entry in table.entries.iter_mut() {
                if matches!(entry, Some(e) if e.handle == handle && e.bus != bus) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("interface handle re-registered by another bus");
                    *entry = None;
                }
            }

            if let Some(existing) = table.entries.iter_mut().flatten().find(|e| e.bus == bus) {
                existing.handle = handle;
                existing.queue = queue;
                return Ok(());
            }

            let free = table
                .entries
                .iter_mut()
                .find(|entry| entry.is_none())
                .ok_or(RegistryError::TableFull)?;
            *free = Some(RegistryEntry {
                bus,
                handle,
                queue,
                generation: 0,
                dropped: 0,
            });
            #[cfg(feature = "defmt")]
            defmt::debug!("bus {} registered", bus);
            Ok(())
        })
    }

    /// Forget every entry of `bus`. Returns how many were removed.
    pub fn deregister(&self, bus: BusId) -> usize {
        self.table.lock(|table| {
            let mut removed = 0;
            for entry in table.borrow_mut().entries.iter_mut() {
                if matches!(entry, Some(e) if e.bus == bus) {
                    *entry = None;
                    removed += 1;
                }
            }
            removed
        })
    }

    /// Record the callback generation of `bus`; frames queued from now on
    /// carry it.
    pub fn set_generation(&self, bus: BusId, generation: u32) {
        self.table.lock(|table| {
            if let Some(entry) = table
                .borrow_mut()
                .entries
                .iter_mut()
                .flatten()
                .find(|e| e.bus == bus)
            {
                entry.generation = generation;
            }
        })
    }

    /// Bus owning `handle`, if any.
    pub fn lookup(&self, handle: H) -> Option<BusId> {
        self.table.lock(|table| {
            table
                .borrow()
                .entries
                .iter()
                .flatten()
                .find(|e| e.handle == handle)
                .map(|e| e.bus)
        })
    }

    pub fn len(&self) -> usize {
        self.table
            .lock(|table| table.borrow().entries.iter().flatten().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events dropped for `bus` since the last call; resets the counter.
    pub fn take_dropped(&self, bus: BusId) -> u32 {
        self.table.lock(|table| {
            table
                .borrow_mut()
                .entries
                .iter_mut()
                .flatten()
                .find(|e| e.bus == bus)
                .map(|e| core::mem::take(&mut e.dropped))
                .unwrap_or(0)
        })
    }

    /// Interrupt entry point: `fifo` of the peripheral behind `handle` holds
    /// at least one frame.
    ///
    /// Unknown handles are ignored. Returns the number of events queued.
    pub fn on_frame_pending(&self, handle: H, fifo: Fifo) -> usize {
        let target = self.table.lock(|table| {
            table
                .borrow()
                .entries
                .iter()
                .flatten()
                .find(|e| e.handle == handle)
                .map(|e| (e.bus, e.queue, e.generation))
        });
        let Some((bus, queue, generation)) = target else {
            return 0;
        };

        let mut queued = 0;
        let mut dropped = 0u32;
        drain_fifo(&handle, fifo, |result| {
            let event = match result {
                Ok(frame) => RxEvent::Frame {
                    fifo,
                    frame,
                    generation,
                },
                Err(_) => RxEvent::ReadError { fifo },
            };
            match queue.try_send(event) {
                Ok(()) => queued += 1,
                Err(_) => dropped += 1,
            }
        });

        if dropped > 0 {
            self.table.lock(|table| {
                if let Some(entry) = table
                    .borrow_mut()
                    .entries
                    .iter_mut()
                    .flatten()
                    .find(|e| e.bus == bus)
                {
                    entry.dropped = entry.dropped.saturating_add(dropped);
                }
            });
        }
        queued
    }
}
