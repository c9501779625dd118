//! Hardware acceptance-filter descriptors and receive FIFO selection.
//!
//! Two encodings coexist because the supported controllers differ: the simple
//! controllers only understand `{id, mask}` pairs, while FDCAN additionally
//! offers exact dual-ID and inclusive range filters. Standard and extended
//! filters live in disjoint hardware pools on FDCAN, so every filter carries
//! its identifier width.
use crate::{
    error::FrameError,
    protocol::transport::{can_id::CanId, EXT_ID_MASK, STD_ID_MASK},
};

//==================================================================================ID_WIDTH
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Identifier width of a frame or filter.
pub enum IdWidth {
    /// 11-bit identifier.
    Standard,
    /// 29-bit identifier.
    Extended,
}

impl IdWidth {
    /// Width matching the `is_extended` flag of a frame.
    pub const fn from_extended(is_extended: bool) -> Self {
        if is_extended {
            IdWidth::Extended
        } else {
            IdWidth::Standard
        }
    }

    pub const fn is_extended(&self) -> bool {
        matches!(self, IdWidth::Extended)
    }

    /// Mask covering every identifier bit of this width.
    pub const fn id_mask(&self) -> u32 {
        match self {
            IdWidth::Standard => STD_ID_MASK,
            IdWidth::Extended => EXT_ID_MASK,
        }
    }

    /// True when `id` fits in this width.
    pub const fn fits(&self, id: u32) -> bool {
        id & !self.id_mask() == 0
    }
}

//==================================================================================FIFO
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// One of the two hardware receive queues.
pub enum Fifo {
    Fifo0,
    Fifo1,
}

impl Fifo {
    /// Polling order used by `CanBus::receive`.
    pub const ALL: [Fifo; 2] = [Fifo::Fifo0, Fifo::Fifo1];

    pub const fn index(&self) -> usize {
        match self {
            Fifo::Fifo0 => 0,
            Fifo::Fifo1 => 1,
        }
    }
}

//==================================================================================FILTER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Matching rule programmed into one filter slot.
pub enum FilterKind {
    /// Accept identifiers where `received & mask == id & mask`.
    IdMask { id: u32, mask: u32 },
    /// Accept exactly two identifiers.
    Dual { first: u32, second: u32 },
    /// Accept every identifier in `low..=high`.
    Range { low: u32, high: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Hardware match descriptor.
pub struct Filter {
    pub kind: FilterKind,
    pub width: IdWidth,
}

impl Filter {
    /// Mask filter on 11-bit identifiers.
    pub fn standard_mask(id: u32, mask: u32) -> Result<Self, FrameError> {
        Self::new(FilterKind::IdMask { id, mask }, IdWidth::Standard)
    }

    /// Mask filter on 29-bit identifiers.
    pub fn extended_mask(id: u32, mask: u32) -> Result<Self, FrameError> {
        Self::new(FilterKind::IdMask { id, mask }, IdWidth::Extended)
    }

    /// Mask filter over the fleet identifier convention, e.g.
    /// `Filter::can_id(CanId::new(me, 0, 0, 0, 0), CanId::dst_mask())`.
    pub fn can_id(id: CanId, mask: CanId) -> Self {
        Self {
            kind: FilterKind::IdMask {
                id: id.value() & EXT_ID_MASK,
                mask: mask.value() & EXT_ID_MASK,
            },
            width: IdWidth::Extended,
        }
    }

    /// Exact match on two identifiers.
    pub fn dual(first: u32, second: u32, width: IdWidth) -> Result<Self, FrameError> {
        Self::new(FilterKind::Dual { first, second }, width)
    }

    /// Inclusive identifier range.
    pub fn range(low: u32, high: u32, width: IdWidth) -> Result<Self, FrameError> {
        if low > high {
            return Err(FrameError::InvalidRange { low, high });
        }
        Self::new(FilterKind::Range { low, high }, width)
    }

    /// Validates that every identifier of `kind` fits `width`.
    pub fn new(kind: FilterKind, width: IdWidth) -> Result<Self, FrameError> {
        let filter = Self { kind, width };
        filter.validate()?;
        Ok(filter)
    }

    /// Checks identifier widths and range ordering.
    pub fn validate(&self) -> Result<(), FrameError> {
        let (a, b) = match self.kind {
            FilterKind::IdMask { id, mask } => (id, mask),
            FilterKind::Dual { first, second } => (first, second),
            FilterKind::Range { low, high } => {
                if low > high {
                    return Err(FrameError::InvalidRange { low, high });
                }
                (low, high)
            }
        };
        for id in [a, b] {
            if !self.width.fits(id) {
                return Err(FrameError::IdentifierOutOfRange { id });
            }
        }
        Ok(())
    }

    /// Software evaluation of the filter, as the hardware would perform it.
    pub fn matches(&self, id: u32, is_extended: bool) -> bool {
        if self.width.is_extended() != is_extended {
            return false;
        }
        let id = id & self.width.id_mask();
        match self.kind {
            FilterKind::IdMask { id: expected, mask } => id & mask == expected & mask,
            FilterKind::Dual { first, second } => id == first || id == second,
            FilterKind::Range { low, high } => (low..=high).contains(&id),
        }
    }
}

//==================================================================================FILTER_SLOT
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Index of a hardware filter slot within the pool serving `width`.
pub struct FilterSlot {
    pub index: u8,
    pub width: IdWidth,
}
