//! Bus facade: one canonical CAN interface over a vendor peripheral.
//!
//! A [`CanBus`] owns the peripheral driver, its filter bank and its callback
//! lists, and is registered in an [`InterfaceRegistry`] so that interrupt
//! handlers can find its receive queue from the bare hardware handle.
//!
//! ```ignore
//! let queue = RxQueue::new();
//! let registry = InterfaceRegistry::new();
//! let on_status = |bus: &mut MyBus<'_>, frame: &Frame| { /* ... */ };
//!
//! let mut bus = CanBus::new(driver, ticks, BusConfig::new(ControllerKind::BxCan), &registry, &queue)?;
//! bus.add_callback(Filter::standard_mask(0x100, 0x7FF)?, Fifo::Fifo0, &on_status)?;
//! bus.init()?;
//!
//! loop {
//!     bus.process_queued();
//! }
//! ```
use crate::{
    config::{BusConfig, FilterUpdateMode},
    error::CanError,
    infra::{
        dispatch::{
            drain_fifo, is_newer, CallbackRegistry, CallbackToken, RxCallback, RxCallbackStore,
            MAX_CALLBACKS_PER_FIFO,
        },
        filter_bank::FilterBank,
        registry::{BusId, InterfaceRegistry, RxEvent, RxQueue, RX_QUEUE_DEPTH},
    },
    protocol::transport::{
        can_frame::Frame,
        filter::{Fifo, Filter, IdWidth},
        traits::{
            frame_transmit::FrameTransmit,
            peripheral::{InitSettings, InterfaceHandle, Peripheral},
            tick_source::TickSource,
        },
        MAX_PAYLOAD_LEN,
    },
};
use heapless::Vec;

//==================================================================================STATE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Lifecycle of a bus.
pub enum BusState {
    /// Constructed; callbacks may be added but nothing is on the wire.
    Uninitialized,
    /// Controller configured and started.
    Initialized,
}

//==================================================================================OBSERVER
/// Optional instrumentation hooks.
///
/// Each hook fires once per API call, never per frame, and the start/end pair
/// fires even when no frame was moved.
pub trait BusObserver {
    fn tx_start(&self, _bus: BusId) {}
    fn tx_end(&self, _bus: BusId) {}
    fn tx_error(&self, _bus: BusId) {}
    fn rx_start(&self, _bus: BusId) {}
    fn rx_end(&self, _bus: BusId) {}
    /// At least one read error or dropped event occurred during the call.
    fn rx_error(&self, _bus: BusId) {}
}

//==================================================================================CAN_BUS
/// One CAN interface.
pub struct CanBus<'a, P: Peripheral, T: TickSource> {
    id: BusId,
    peripheral: P,
    ticks: T,
    config: BusConfig,
    state: BusState,
    filters: FilterBank,
    /// Bumped on every `add_callback`; frames only reach callbacks that
    /// existed when they were queued.
    generation: u32,
    callbacks: CallbackRegistry<'a, CanBus<'a, P, T>>,
    registry: &'a InterfaceRegistry<'a, P::Handle>,
    queue: &'a RxQueue,
    observer: Option<&'a dyn BusObserver>,
}

impl<'a, P: Peripheral, T: TickSource> CanBus<'a, P, T> {
    /// Wrap `peripheral` and register its handle in `registry`.
    ///
    /// `queue` receives the frames the interrupt path drains for this bus.
    pub fn new(
        peripheral: P,
        ticks: T,
        config: BusConfig,
        registry: &'a InterfaceRegistry<'a, P::Handle>,
        queue: &'a RxQueue,
    ) -> Result<Self, CanError<P::Error>> {
        // Leftovers of a previous owner of `queue` belong to nobody here.
        discard_queued(queue);
        let id = registry.allocate_bus_id();
        registry.register(id, peripheral.handle(), queue)?;

        Ok(Self {
            id,
            peripheral,
            ticks,
            filters: FilterBank::new(config.filter_layout),
            generation: 0,
            config,
            state: BusState::Uninitialized,
            callbacks: CallbackRegistry::new(),
            registry,
            queue,
            observer: None,
        })
    }

    /// Configure and start the controller.
    ///
    /// Filters added beforehand are programmed at their allocated index and
    /// notifications are enabled only for FIFOs that have callbacks.
    pub fn init(&mut self) -> Result<(), CanError<P::Error>> {
        self.registry
            .register(self.id, self.peripheral.handle(), self.queue)?;
        self.registry.set_generation(self.id, self.generation);
        self.state = BusState::Uninitialized;
        self.restart()?;
        self.state = BusState::Initialized;

        #[cfg(feature = "defmt")]
        defmt::info!("bus {} initialized ({})", self.id, self.config.controller);
        Ok(())
    }

    /// Stop, re-init with the current filter counts, re-program every active
    /// filter, re-enable notifications, start.
    fn restart(&mut self) -> Result<(), CanError<P::Error>> {
        self.peripheral.stop().map_err(CanError::Peripheral)?;

        let settings = InitSettings {
            auto_retransmit: self.config.auto_retransmit,
            standard_filters: self.filters.configured_count(IdWidth::Standard),
            extended_filters: self.filters.configured_count(IdWidth::Extended),
        };
        self.peripheral.init(&settings).map_err(CanError::Peripheral)?;

        for store in self.callbacks.iter() {
            self.peripheral
                .configure_filter(store.slot, &store.filter, store.fifo)
                .map_err(CanError::Peripheral)?;
        }
        for fifo in Fifo::ALL {
            if !self.callbacks.is_empty(fifo) {
                self.peripheral
                    .enable_notification(fifo)
                    .map_err(CanError::Peripheral)?;
            }
        }

        self.peripheral.start().map_err(CanError::Peripheral)
    }

    //==============================================================================TRANSMIT
    /// Queue `frame` for transmission.
    ///
    /// Remote frames and oversize payloads are refused before the driver is
    /// touched. Otherwise waits for a free transmit slot, bounded by the
    /// configured timeout.
    pub fn transmit(&mut self, frame: &Frame) -> Result<(), CanError<P::Error>> {
        if frame.is_rtr {
            return Err(CanError::RemoteFrame);
        }
        if frame.len as usize > MAX_PAYLOAD_LEN {
            return Err(CanError::InvalidLength { len: frame.len });
        }
        if self.state != BusState::Initialized {
            return Err(CanError::NotInitialized);
        }

        self.notify(|o, id| o.tx_start(id));
        let result = self.submit(frame);
        if result.is_err() {
            self.notify(|o, id| o.tx_error(id));
        }
        self.notify(|o, id| o.tx_end(id));
        result
    }

    fn submit(&mut self, frame: &Frame) -> Result<(), CanError<P::Error>> {
        if let Some(timeout_ms) = self.config.tx_timeout_ms {
            let start = self.ticks.now_ms();
            while self.peripheral.transmit_slots_free() == 0 {
                if self.ticks.now_ms().wrapping_sub(start) >= timeout_ms {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("bus {}: no free mailbox after {} ms", self.id, timeout_ms);
                    return Err(CanError::TransmitTimeout { timeout_ms });
                }
                core::hint::spin_loop();
            }
        } else {
            while self.peripheral.transmit_slots_free() == 0 {
                core::hint::spin_loop();
            }
        }

        self.peripheral
            .submit_frame(&frame.tx_header(), frame.data.bytes())
            .map(|_mailbox| ())
            .map_err(CanError::Peripheral)
    }

    //==============================================================================RECEIVE
    /// Poll FIFO0 then FIFO1 and return the first frame found.
    ///
    /// `Ok(None)` means both FIFOs were empty. A failed read is reported
    /// through `rx_error` and polling moves on.
    pub fn receive(&mut self) -> Result<Option<Frame>, CanError<P::Error>> {
        if self.state != BusState::Initialized {
            return Err(CanError::NotInitialized);
        }

        self.notify(|o, id| o.rx_start(id));
        let handle = self.peripheral.handle();
        let mut received = None;
        let mut failed = false;
        for fifo in Fifo::ALL {
            if handle.fifo_fill_level(fifo) == 0 {
                continue;
            }
            match handle.pop_frame(fifo) {
                Ok(raw) => {
                    received = Some(Frame::from_raw(&raw));
                    break;
                }
                Err(_) => failed = true,
            }
        }
        if failed {
            self.notify(|o, id| o.rx_error(id));
        }
        self.notify(|o, id| o.rx_end(id));
        Ok(received)
    }

    //==============================================================================CALLBACKS
    /// Allocate a filter slot for `filter`, route its matches to `fifo` and
    /// invoke `callback` for each of them.
    ///
    /// On an initialized bus the slot is programmed immediately. Controllers
    /// using [`FilterUpdateMode::Reinitialize`] are stopped and restarted to
    /// do so, which must happen from normal context. Existing slots keep their
    /// index either way.
    pub fn add_callback(
        &mut self,
        filter: Filter,
        fifo: Fifo,
        callback: RxCallback<'a, Self>,
    ) -> Result<CallbackToken, CanError<P::Error>> {
        filter.validate()?;
        if !self.config.controller.supports(&filter.kind) {
            return Err(CanError::UnsupportedFilter);
        }
        if self.callbacks.is_full(fifo) {
            return Err(CanError::CallbackListFull);
        }

        let slot = self.filters.allocate(filter.width)?;
        let token = self.callbacks.next_token();
        let store = RxCallbackStore {
            token,
            slot,
            filter,
            fifo,
            generation: self.generation.wrapping_add(1),
            callback,
        };
        if self.callbacks.push(store).is_err() {
            self.filters.release(slot);
            return Err(CanError::CallbackListFull);
        }
        // Frames queued before this point were accepted by whatever owned
        // `slot` earlier.
        self.generation = store.generation;
        self.registry.set_generation(self.id, self.generation);

        if self.state == BusState::Initialized {
            if let Err(error) = self.program_new_filter(&store) {
                self.callbacks.remove(token);
                self.filters.release(slot);
                match self.config.filter_update {
                    FilterUpdateMode::InPlace => {
                        if self.peripheral.disable_filter(slot).is_err() {
                            #[cfg(feature = "defmt")]
                            defmt::warn!("bus {}: slot {} left enabled after failed add", self.id, slot);
                        }
                    }
                    // The controller may have been left stopped mid-restart.
                    FilterUpdateMode::Reinitialize => self.state = BusState::Uninitialized,
                }
                return Err(error);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("bus {}: callback {} on slot {}", self.id, token, slot);
        Ok(token)
    }

    fn program_new_filter(&mut self, store: &RxCallbackStore<'a, Self>) -> Result<(), CanError<P::Error>> {
        match self.config.filter_update {
            FilterUpdateMode::InPlace => {
                self.peripheral
                    .configure_filter(store.slot, &store.filter, store.fifo)
                    .map_err(CanError::Peripheral)?;
                if self.callbacks.len(store.fifo) == 1 {
                    self.peripheral
                        .enable_notification(store.fifo)
                        .map_err(CanError::Peripheral)?;
                }
                Ok(())
            }
            FilterUpdateMode::Reinitialize => self.restart(),
        }
    }

    /// Unregister the callback behind `token` and free its filter slot.
    ///
    /// The hardware filter is disabled before the slot can be handed out
    /// again, and the FIFO notification goes off with its last callback.
    ///
    /// Once the callback is gone the call succeeds: a failure to mute the
    /// FIFO afterwards is only logged.
    pub fn remove_callback(&mut self, token: CallbackToken) -> Result<(), CanError<P::Error>> {
        let (fifo, position) = self.callbacks.find(token).ok_or(CanError::UnknownCallback)?;
        let store = self
            .callbacks
            .get(fifo, position)
            .ok_or(CanError::UnknownCallback)?;

        let initialized = self.state == BusState::Initialized;
        if initialized {
            self.peripheral
                .disable_filter(store.slot)
                .map_err(CanError::Peripheral)?;
        }
        self.filters.release(store.slot);
        self.callbacks.remove(token);

        if initialized
            && self.callbacks.is_empty(fifo)
            && self.peripheral.disable_notification(fifo).is_err()
        {
            #[cfg(feature = "defmt")]
            defmt::warn!("bus {}: {} notification left on", self.id, fifo);
        }
        Ok(())
    }

    //==============================================================================DISPATCH
    /// Drain `fifo` directly from the hardware and run matching callbacks.
    ///
    /// For polled setups without the interrupt path. Returns the number of
    /// frames delivered.
    pub fn dispatch(&mut self, fifo: Fifo) -> usize {
        self.notify(|o, id| o.rx_start(id));
        let handle = self.peripheral.handle();
        let generation = self.generation;
        let mut frames = 0;
        let mut failed = false;
        drain_fifo(&handle, fifo, |result| match result {
            Ok(frame) => {
                frames += 1;
                self.deliver(fifo, &frame, generation);
            }
            Err(_) => failed = true,
        });
        if failed {
            self.notify(|o, id| o.rx_error(id));
        }
        self.notify(|o, id| o.rx_end(id));
        frames
    }

    /// Run callbacks for the events the interrupt path queued.
    ///
    /// Handles at most one queue's worth of events per call. Returns the
    /// number of frames delivered.
    pub fn process_queued(&mut self) -> usize {
        self.notify(|o, id| o.rx_start(id));
        let mut frames = 0;
        let mut failed = false;
        for _ in 0..RX_QUEUE_DEPTH {
            let Ok(event) = self.queue.try_receive() else {
                break;
            };
            if self.handle_event(event) {
                frames += 1;
            } else {
                failed = true;
            }
        }
        self.finish_rx(failed);
        frames
    }

    /// Wait for the next queued event and handle it.
    pub async fn dispatch_next(&mut self) -> RxEvent {
        let event = self.queue.receive().await;
        self.notify(|o, id| o.rx_start(id));
        let delivered = self.handle_event(event);
        self.finish_rx(!delivered);
        event
    }

    fn handle_event(&mut self, event: RxEvent) -> bool {
        match event {
            RxEvent::Frame {
                fifo,
                frame,
                generation,
            } => {
                self.deliver(fifo, &frame, generation);
                true
            }
            RxEvent::ReadError { .. } => false,
        }
    }

    fn finish_rx(&mut self, mut failed: bool) {
        let dropped = self.registry.take_dropped(self.id);
        if dropped > 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("bus {}: {} rx events dropped", self.id, dropped);
            failed = true;
        }
        if failed {
            self.notify(|o, id| o.rx_error(id));
        }
        self.notify(|o, id| o.rx_end(id));
    }

    /// Invoke, in registration order, every callback of `fifo` whose slot
    /// accepted `frame` and that is not newer than `generation`.
    ///
    /// Targets are fixed before the first call: callbacks removed by an
    /// earlier callback are skipped, callbacks added meanwhile never run.
    fn deliver(&mut self, fifo: Fifo, frame: &Frame, generation: u32) {
        let layout = self.filters.layout();
        let mut targets: Vec<CallbackToken, MAX_CALLBACKS_PER_FIFO> = Vec::new();
        let mut position = 0;
        while let Some(store) = self.callbacks.get(fifo, position) {
            if layout.slot_matches(store.slot, frame) && !is_newer(store.generation, generation) {
                // Same capacity as the list itself.
                let _ = targets.push(store.token);
            }
            position += 1;
        }

        for token in targets {
            let Some((_, position)) = self.callbacks.find(token) else {
                continue;
            };
            if let Some(callback) = self.callbacks.get(fifo, position).map(|store| store.callback) {
                callback(&mut *self, frame);
            }
        }
    }

    fn notify(&self, hook: impl FnOnce(&dyn BusObserver, BusId)) {
        if let Some(observer) = self.observer {
            hook(observer, self.id);
        }
    }

    //==============================================================================ACCESSORS
    pub fn set_observer(&mut self, observer: Option<&'a dyn BusObserver>) {
        self.observer = observer;
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    pub fn handle(&self) -> P::Handle {
        self.peripheral.handle()
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    pub fn filter_bank(&self) -> &FilterBank {
        &self.filters
    }

    pub fn callback_count(&self, fifo: Fifo) -> usize {
        self.callbacks.len(fifo)
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }
}

impl<'a, P: Peripheral, T: TickSource> Drop for CanBus<'a, P, T> {
    fn drop(&mut self) {
        // Another bus may have taken over the handle; its FIFOs stay on.
        let owned = self.registry.deregister(self.id) > 0;
        if owned && self.state == BusState::Initialized {
            for fifo in Fifo::ALL {
                if self.peripheral.disable_notification(fifo).is_err() {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("bus {}: {} notification left on", self.id, fifo);
                }
            }
        }
        discard_queued(self.queue);
    }
}

/// Empty `queue` without delivering anything.
fn discard_queued(queue: &RxQueue) {
    for _ in 0..RX_QUEUE_DEPTH {
        if queue.try_receive().is_err() {
            break;
        }
    }
}

impl<'a, P: Peripheral, T: TickSource> FrameTransmit for CanBus<'a, P, T> {
    type Error = CanError<P::Error>;

    fn transmit(&mut self, frame: &Frame) -> Result<(), Self::Error> {
        CanBus::transmit(self, frame)
    }
}
