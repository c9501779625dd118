//! Test doubles simulating a CAN controller, a tick source and an observer
//! during integration tests.
#![allow(dead_code)]
use psr_can::{
    bus::{BusObserver, CanBus},
    config::BusConfig,
    infra::registry::{BusId, InterfaceRegistry, RxQueue},
    protocol::transport::{
        can_frame::{RawRxFrame, TxHeader},
        filter::{Fifo, Filter, FilterSlot, IdWidth},
        traits::{
            peripheral::{InitSettings, InterfaceHandle, Mailbox, Peripheral},
            tick_source::TickSource,
        },
    },
};
use std::{cell::RefCell, collections::VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Driver calls recorded by the simulated controller.
pub enum Op {
    Init(InitSettings),
    Start,
    Stop,
    Configure(FilterSlot, Fifo),
    Disable(FilterSlot),
    Enable(Fifo),
    Mute(Fifo),
    Submit(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

#[derive(Default)]
pub struct SimState {
    pub fifos: [VecDeque<RawRxFrame>; 2],
    pub filters: Vec<(FilterSlot, Filter, Fifo)>,
    pub ops: Vec<Op>,
    pub notifications: [bool; 2],
    pub submitted: Vec<(TxHeader, [u8; 8])>,
    pub free_mailboxes: usize,
    /// Number of upcoming pops that fail (the frame is lost).
    pub fail_reads: usize,
    /// Filter programming is refused (after being recorded).
    pub fail_configure: bool,
    /// Notification disabling is refused (after being recorded).
    pub fail_mute: bool,
    pub running: bool,
}

/// In-memory controller with two receive FIFOs and a filter table.
pub struct SimHardware {
    pub state: RefCell<SimState>,
}

impl SimHardware {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(SimState {
                free_mailboxes: 3,
                ..SimState::default()
            }),
        }
    }

    /// Push a raw frame straight into `fifo`.
    pub fn inject(&self, fifo: Fifo, raw: RawRxFrame) {
        self.state.borrow_mut().fifos[fifo.index()].push_back(raw);
    }

    /// Run an incoming frame through the configured filters like the hardware
    /// would; the first matching slot wins. Unmatched frames are discarded.
    pub fn deliver(&self, id: u32, is_extended: bool, data: &[u8]) -> Option<FilterSlot> {
        let mut state = self.state.borrow_mut();
        let mut candidates = state.filters.clone();
        candidates.sort_by_key(|(slot, _, _)| (slot.width == IdWidth::Extended, slot.index));
        let (slot, _, fifo) = candidates
            .into_iter()
            .find(|(_, filter, _)| filter.matches(id, is_extended))?;

        let mut bytes = [0u8; 8];
        bytes[..data.len()].copy_from_slice(data);
        state.fifos[fifo.index()].push_back(RawRxFrame {
            id,
            is_extended,
            is_rtr: false,
            dlc: data.len() as u8,
            data: bytes,
            filter_index: Some(slot.index),
        });
        Some(slot)
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    pub fn submitted(&self) -> Vec<(TxHeader, [u8; 8])> {
        self.state.borrow().submitted.clone()
    }

    pub fn handle(&self) -> SimHandle<'_> {
        SimHandle(self)
    }
}

#[derive(Clone, Copy)]
/// Identity of a [`SimHardware`]: equal when pointing at the same instance.
pub struct SimHandle<'h>(pub &'h SimHardware);

impl PartialEq for SimHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl InterfaceHandle for SimHandle<'_> {
    type Error = SimError;

    fn fifo_fill_level(&self, fifo: Fifo) -> usize {
        self.0.state.borrow().fifos[fifo.index()].len()
    }

    fn pop_frame(&self, fifo: Fifo) -> Result<RawRxFrame, SimError> {
        let mut state = self.0.state.borrow_mut();
        let raw = state.fifos[fifo.index()].pop_front().ok_or(SimError)?;
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(SimError);
        }
        Ok(raw)
    }
}

/// Driver side of [`SimHardware`].
pub struct SimPeripheral<'h> {
    pub hw: &'h SimHardware,
}

impl<'h> SimPeripheral<'h> {
    pub fn new(hw: &'h SimHardware) -> Self {
        Self { hw }
    }

    fn log(&self, op: Op) {
        self.hw.state.borrow_mut().ops.push(op);
    }
}

impl<'h> Peripheral for SimPeripheral<'h> {
    type Handle = SimHandle<'h>;
    type Error = SimError;

    fn handle(&self) -> SimHandle<'h> {
        SimHandle(self.hw)
    }

    fn init(&mut self, settings: &InitSettings) -> Result<(), SimError> {
        self.log(Op::Init(*settings));
        let mut state = self.hw.state.borrow_mut();
        state.filters.clear();
        state.notifications = [false; 2];
        Ok(())
    }

    fn start(&mut self) -> Result<(), SimError> {
        self.log(Op::Start);
        self.hw.state.borrow_mut().running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SimError> {
        self.log(Op::Stop);
        self.hw.state.borrow_mut().running = false;
        Ok(())
    }

    fn configure_filter(&mut self, slot: FilterSlot, filter: &Filter, fifo: Fifo) -> Result<(), SimError> {
        self.log(Op::Configure(slot, fifo));
        let mut state = self.hw.state.borrow_mut();
        if state.fail_configure {
            return Err(SimError);
        }
        state.filters.retain(|(existing, _, _)| *existing != slot);
        state.filters.push((slot, *filter, fifo));
        Ok(())
    }

    fn disable_filter(&mut self, slot: FilterSlot) -> Result<(), SimError> {
        self.log(Op::Disable(slot));
        self.hw
            .state
            .borrow_mut()
            .filters
            .retain(|(existing, _, _)| *existing != slot);
        Ok(())
    }

    fn transmit_slots_free(&self) -> usize {
        self.hw.state.borrow().free_mailboxes
    }

    fn submit_frame(&mut self, header: &TxHeader, data: &[u8; 8]) -> Result<Mailbox, SimError> {
        self.log(Op::Submit(header.id));
        let mut state = self.hw.state.borrow_mut();
        if state.free_mailboxes == 0 {
            return Err(SimError);
        }
        state.submitted.push((*header, *data));
        Ok(Mailbox(0))
    }

    fn enable_notification(&mut self, fifo: Fifo) -> Result<(), SimError> {
        self.log(Op::Enable(fifo));
        self.hw.state.borrow_mut().notifications[fifo.index()] = true;
        Ok(())
    }

    fn disable_notification(&mut self, fifo: Fifo) -> Result<(), SimError> {
        self.log(Op::Mute(fifo));
        let mut state = self.hw.state.borrow_mut();
        if state.fail_mute {
            return Err(SimError);
        }
        state.notifications[fifo.index()] = false;
        Ok(())
    }
}

/// Tick source advancing by `step` ms on every read.
pub struct StepTicks {
    pub now: u32,
    pub step: u32,
}

impl StepTicks {
    pub fn new(step: u32) -> Self {
        Self { now: 0, step }
    }
}

impl TickSource for StepTicks {
    fn now_ms(&mut self) -> u32 {
        self.now = self.now.wrapping_add(self.step);
        self.now
    }
}

#[derive(Default)]
/// Observer collecting hook names in call order.
pub struct RecordingObserver {
    pub events: RefCell<Vec<&'static str>>,
}

impl RecordingObserver {
    pub fn take(&self) -> Vec<&'static str> {
        core::mem::take(&mut *self.events.borrow_mut())
    }
}

impl BusObserver for RecordingObserver {
    fn tx_start(&self, _bus: BusId) {
        self.events.borrow_mut().push("tx_start");
    }
    fn tx_end(&self, _bus: BusId) {
        self.events.borrow_mut().push("tx_end");
    }
    fn tx_error(&self, _bus: BusId) {
        self.events.borrow_mut().push("tx_error");
    }
    fn rx_start(&self, _bus: BusId) {
        self.events.borrow_mut().push("rx_start");
    }
    fn rx_end(&self, _bus: BusId) {
        self.events.borrow_mut().push("rx_end");
    }
    fn rx_error(&self, _bus: BusId) {
        self.events.borrow_mut().push("rx_error");
    }
}

/// Bus over the simulated controller.
pub type SimBus<'a> = CanBus<'a, SimPeripheral<'a>, StepTicks>;

/// Bus over `hw` with a step-one tick source.
pub fn sim_bus<'a>(
    hw: &'a SimHardware,
    registry: &'a InterfaceRegistry<'a, SimHandle<'a>>,
    queue: &'a RxQueue,
    config: BusConfig,
) -> SimBus<'a> {
    CanBus::new(SimPeripheral::new(hw), StepTicks::new(1), config, registry, queue).unwrap()
}
