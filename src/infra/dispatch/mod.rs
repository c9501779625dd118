//! Receive-callback bookkeeping and hardware FIFO draining.
//!
//! Each bus keeps one ordered list per receive FIFO. Registration order is
//! invocation order. Callbacks are identified by an opaque [`CallbackToken`]
//! instead of comparing function addresses, so two registrations of the same
//! closure stay distinguishable.
use crate::protocol::transport::{
    can_frame::Frame,
    filter::{Fifo, Filter, FilterSlot},
    traits::peripheral::InterfaceHandle,
    DRAIN_LIMIT,
};
use heapless::Vec;

/// Callbacks each FIFO list can hold. Larger than any filter pool.
pub const MAX_CALLBACKS_PER_FIFO: usize = 36;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Handle returned by `add_callback`, consumed by `remove_callback`.
pub struct CallbackToken(pub(crate) u16);

impl CallbackToken {
    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Consumer callback. Receives the owning bus so it may transmit a reply.
pub type RxCallback<'a, B> = &'a dyn Fn(&mut B, &Frame);

/// One registered callback and the filter slot that feeds it.
pub struct RxCallbackStore<'a, B> {
    pub token: CallbackToken,
    pub slot: FilterSlot,
    pub filter: Filter,
    pub fifo: Fifo,
    /// Generation of the bus when the callback was added.
    pub generation: u32,
    pub callback: RxCallback<'a, B>,
}

impl<B> Clone for RxCallbackStore<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for RxCallbackStore<'_, B> {}

impl<B> core::fmt::Debug for RxCallbackStore<'_, B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RxCallbackStore")
            .field("token", &self.token)
            .field("slot", &self.slot)
            .field("filter", &self.filter)
            .field("fifo", &self.fifo)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

/// True when `generation` was issued after `reference`, across wrap-around.
pub fn is_newer(generation: u32, reference: u32) -> bool {
    (generation.wrapping_sub(reference) as i32) > 0
}

//==================================================================================REGISTRY
/// Per-FIFO ordered callback lists of one bus.
pub struct CallbackRegistry<'a, B> {
    lists: [Vec<RxCallbackStore<'a, B>, MAX_CALLBACKS_PER_FIFO>; 2],
    next_token: u16,
}

impl<'a, B> Default for CallbackRegistry<'a, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, B> CallbackRegistry<'a, B> {
    pub const fn new() -> Self {
        Self {
            lists: [Vec::new(), Vec::new()],
            next_token: 0,
        }
    }

    /// Token not currently used by any stored callback.
    pub fn next_token(&mut self) -> CallbackToken {
        loop {
            let token = CallbackToken(self.next_token);
            self.next_token = self.next_token.wrapping_add(1);
            if self.find(token).is_none() {
                return token;
            }
        }
    }

    pub fn is_full(&self, fifo: Fifo) -> bool {
        self.lists[fifo.index()].is_full()
    }

    /// Append `store` to the list of its FIFO. Hands the store back when full.
    pub fn push(&mut self, store: RxCallbackStore<'a, B>) -> Result<(), RxCallbackStore<'a, B>> {
        self.lists[store.fifo.index()].push(store)
    }

    /// Remove the callback identified by `token`, preserving the order of the
    /// remaining ones.
    pub fn remove(&mut self, token: CallbackToken) -> Option<RxCallbackStore<'a, B>> {
        let (fifo, position) = self.find(token)?;
        Some(self.lists[fifo.index()].remove(position))
    }

    /// Location of `token` as `(fifo, position)`.
    pub fn find(&self, token: CallbackToken) -> Option<(Fifo, usize)> {
        Fifo::ALL.into_iter().find_map(|fifo| {
            self.lists[fifo.index()]
                .iter()
                .position(|store| store.token == token)
                .map(|position| (fifo, position))
        })
    }

    pub fn get(&self, fifo: Fifo, position: usize) -> Option<RxCallbackStore<'a, B>> {
        self.lists[fifo.index()].get(position).copied()
    }

    pub fn len(&self, fifo: Fifo) -> usize {
        self.lists[fifo.index()].len()
    }

    pub fn is_empty(&self, fifo: Fifo) -> bool {
        self.lists[fifo.index()].is_empty()
    }

    /// Every stored callback, FIFO0 first.
    pub fn iter(&self) -> impl Iterator<Item = &RxCallbackStore<'a, B>> {
        self.lists[0].iter().chain(self.lists[1].iter())
    }
}

//==================================================================================DRAIN
/// Pop frames from `fifo` until the hardware reports it empty, handing each
/// translated frame (or read error) to `sink`. Bounded by [`DRAIN_LIMIT`].
///
/// Returns the number of pops attempted.
pub fn drain_fifo<H, F>(handle: &H, fifo: Fifo, mut sink: F) -> usize
where
    H: InterfaceHandle,
    F: FnMut(Result<Frame, H::Error>),
{
    let mut pops = 0;
    while pops < DRAIN_LIMIT && handle.fifo_fill_level(fifo) > 0 {
        pops += 1;
        sink(handle.pop_frame(fifo).map(|raw| Frame::from_raw(&raw)));
    }
    pops
}
