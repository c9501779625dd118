//! Allocation of hardware filter slots.
//!
//! Every bus owns one [`FilterBank`]. Slots are handed out lowest index first
//! and never move once allocated, so the index a frame reports as its matching
//! filter stays valid for the lifetime of the callback that owns it.
use crate::{
    config::FilterBankLayout,
    error::FilterBankError,
    protocol::transport::filter::{FilterSlot, IdWidth},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Occupancy of the filter pools of one controller.
pub struct FilterBank {
    layout: FilterBankLayout,
    /// Bit `i` set = slot `i` of the standard (or shared) pool is taken.
    standard: u32,
    /// Only used by split layouts.
    extended: u32,
}

impl FilterBank {
    pub const fn new(layout: FilterBankLayout) -> Self {
        Self {
            layout,
            standard: 0,
            extended: 0,
        }
    }

    pub const fn layout(&self) -> FilterBankLayout {
        self.layout
    }

    /// Reserve the lowest free slot able to hold a filter of `width`.
    pub fn allocate(&mut self, width: IdWidth) -> Result<FilterSlot, FilterBankError> {
        let capacity = self.layout.capacity(width);
        let bits = self.pool_mut(width);
        for index in 0..capacity {
            if *bits & (1 << index) == 0 {
                *bits |= 1 << index;
                #[cfg(feature = "defmt")]
                defmt::debug!("filter slot {} allocated ({})", index, width);
                return Ok(FilterSlot { index, width });
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("filter bank exhausted ({})", width);
        Err(FilterBankError::Exhausted { width })
    }

    /// Return `slot` to its pool. Releasing a free slot is a no-op.
    pub fn release(&mut self, slot: FilterSlot) {
        if slot.index < self.layout.capacity(slot.width) {
            *self.pool_mut(slot.width) &= !(1 << slot.index);
        }
    }

    pub fn is_allocated(&self, slot: FilterSlot) -> bool {
        slot.index < self.layout.capacity(slot.width) && self.pool(slot.width) & (1 << slot.index) != 0
    }

    /// Elements the controller must be told about for `width`: highest
    /// allocated index + 1, or 0 when the pool is empty.
    pub fn configured_count(&self, width: IdWidth) -> u8 {
        (u32::BITS - self.pool(width).leading_zeros()) as u8
    }

    pub fn free_slots(&self, width: IdWidth) -> u8 {
        self.layout.capacity(width) - self.pool(width).count_ones() as u8
    }

    pub fn allocated_slots(&self, width: IdWidth) -> u8 {
        self.pool(width).count_ones() as u8
    }

    fn pool(&self, width: IdWidth) -> u32 {
        match (self.layout, width) {
            (FilterBankLayout::Split { .. }, IdWidth::Extended) => self.extended,
            _ => self.standard,
        }
    }

    fn pool_mut(&mut self, width: IdWidth) -> &mut u32 {
        match (self.layout, width) {
            (FilterBankLayout::Split { .. }, IdWidth::Extended) => &mut self.extended,
            _ => &mut self.standard,
        }
    }
}
