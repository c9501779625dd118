//! # Quickstart Example
//!
//! Minimal tour of psr-can on the host:
//! - Wire a bus over a loopback controller
//! - Register filtered callbacks
//! - Move frames through the interrupt path and dispatch them
//! - Drive a VESC motor controller through the bus
//!
//! The loopback controller stands in for a vendor driver: every transmitted
//! frame is fed back through its filter table.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use psr_can::{
    bus::CanBus,
    config::{BusConfig, ControllerKind},
    infra::registry::{InterfaceRegistry, RxQueue},
    protocol::{
        devices::vesc::{VescCan, VescPacket},
        transport::{
            can_frame::{Frame, RawRxFrame, TxHeader},
            can_id::{device_type, generic_message, priority, CanId},
            filter::{Fifo, Filter, FilterSlot},
            traits::peripheral::{InitSettings, InterfaceHandle, Mailbox, Peripheral},
        },
    },
};
use std::{cell::RefCell, collections::VecDeque};

//==================================================================================LOOPBACK
#[derive(Default)]
struct Loopback {
    filters: RefCell<Vec<(FilterSlot, Filter, Fifo)>>,
    fifos: RefCell<[VecDeque<RawRxFrame>; 2]>,
}

#[derive(Clone, Copy)]
struct LoopbackHandle<'h>(&'h Loopback);

impl PartialEq for LoopbackHandle<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0, other.0)
    }
}

impl InterfaceHandle for LoopbackHandle<'_> {
    type Error = ();

    fn fifo_fill_level(&self, fifo: Fifo) -> usize {
        self.0.fifos.borrow()[fifo.index()].len()
    }

    fn pop_frame(&self, fifo: Fifo) -> Result<RawRxFrame, ()> {
        self.0.fifos.borrow_mut()[fifo.index()].pop_front().ok_or(())
    }
}

struct LoopbackDriver<'h>(&'h Loopback);

impl<'h> Peripheral for LoopbackDriver<'h> {
    type Handle = LoopbackHandle<'h>;
    type Error = ();

    fn handle(&self) -> LoopbackHandle<'h> {
        LoopbackHandle(self.0)
    }

    fn init(&mut self, settings: &InitSettings) -> Result<(), ()> {
        println!("   [driver] init {:?}", settings);
        self.0.filters.borrow_mut().clear();
        Ok(())
    }

    fn start(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn configure_filter(&mut self, slot: FilterSlot, filter: &Filter, fifo: Fifo) -> Result<(), ()> {
        println!("   [driver] filter {:?} -> {:?}", slot, fifo);
        let mut filters = self.0.filters.borrow_mut();
        filters.retain(|(existing, _, _)| *existing != slot);
        filters.push((slot, *filter, fifo));
        Ok(())
    }

    fn disable_filter(&mut self, slot: FilterSlot) -> Result<(), ()> {
        self.0.filters.borrow_mut().retain(|(existing, _, _)| *existing != slot);
        Ok(())
    }

    fn transmit_slots_free(&self) -> usize {
        3
    }

    fn submit_frame(&mut self, header: &TxHeader, data: &[u8; 8]) -> Result<Mailbox, ()> {
        let accepted = self
            .0
            .filters
            .borrow()
            .iter()
            .find(|(_, filter, _)| filter.matches(header.id, header.is_extended))
            .map(|(slot, _, fifo)| (*slot, *fifo));
        if let Some((slot, fifo)) = accepted {
            self.0.fifos.borrow_mut()[fifo.index()].push_back(RawRxFrame {
                id: header.id,
                is_extended: header.is_extended,
                is_rtr: header.is_rtr,
                dlc: header.dlc,
                data: *data,
                filter_index: Some(slot.index),
            });
        }
        Ok(Mailbox(0))
    }

    fn enable_notification(&mut self, _fifo: Fifo) -> Result<(), ()> {
        Ok(())
    }

    fn disable_notification(&mut self, _fifo: Fifo) -> Result<(), ()> {
        Ok(())
    }
}

type Bus<'a> = CanBus<'a, LoopbackDriver<'a>, fn() -> u32>;

fn no_clock() -> u32 {
    0
}

fn main() {
    println!("=== psr-can Quickstart ===\n");

    let hw = Loopback::default();
    let queue = RxQueue::new();
    let registry = InterfaceRegistry::new();

    // ======================================================================
    // 1. Callbacks
    // ======================================================================
    let me = 0x12;
    let on_heartbeat = |_bus: &mut Bus<'_>, frame: &Frame| {
        let id = CanId::from_value(frame.id);
        println!(
            "   heartbeat from 0x{:02X} (type {}, prio {})",
            id.src(),
            id.device_type(),
            id.priority()
        );
    };
    let vesc = VescCan::new(0x2A);
    let on_vesc = |_bus: &mut Bus<'_>, frame: &Frame| {
        if let Some(Some(packet)) = vesc.classify(frame) {
            println!("   VESC 0x{:02X} saw {:?}: {:02X?}", vesc.controller_id(), packet, frame.payload());
        }
    };

    // ======================================================================
    // 2. Bus wiring
    // ======================================================================
    println!("1. Building a bxCAN bus");
    let mut bus: Bus<'_> = CanBus::new(
        LoopbackDriver(&hw),
        no_clock as fn() -> u32,
        BusConfig::new(ControllerKind::BxCan),
        &registry,
        &queue,
    )
    .expect("registry full");

    let heartbeat = Filter::can_id(
        CanId::new(CanId::MULTICAST_DESTINATION, 0, generic_message::HEARTBEAT, 0, 0),
        CanId::dst_mask() | CanId::message_mask(),
    );
    bus.add_callback(heartbeat, Fifo::Fifo0, &on_heartbeat)
        .expect("heartbeat filter");
    bus.add_callback(Filter::extended_mask(0x2A, 0xFF).expect("vesc filter"), Fifo::Fifo1, &on_vesc)
        .expect("vesc callback");
    bus.init().expect("init");
    println!("   bus {:?} ready\n", bus.id());

    // ======================================================================
    // 3. Transmit, interrupt path, dispatch
    // ======================================================================
    println!("2. Heartbeat through the interrupt path");
    let beat = CanId::new(
        CanId::MULTICAST_DESTINATION,
        me,
        generic_message::HEARTBEAT,
        device_type::STEERING,
        priority::LOW,
    );
    bus.transmit(&Frame::from_can_id(beat, &[1]).expect("frame"))
        .expect("transmit");
    let queued = registry.on_frame_pending(bus.handle(), Fifo::Fifo0);
    println!("   {} event(s) queued", queued);
    bus.process_queued();

    // ======================================================================
    // 4. Device protocol
    // ======================================================================
    println!("\n3. Commanding a VESC");
    vesc.set_current(&mut bus, 12.5).expect("set current");
    vesc.set_current_limits(&mut bus, -20.0, 60.0).expect("limits");
    println!("   command ids: 0x{:X}, 0x{:X}", vesc.id(VescPacket::SetCurrent), vesc.id(VescPacket::ConfCurrentLimits));
    bus.dispatch(Fifo::Fifo1);

    println!("\n=== Quickstart complete ===");
}
