//! Per-bus configuration: which controller family sits underneath, how its
//! filter bank is laid out on this board, and the transmit policy.
//!
//! ```
//! use psr_can::config::{BusConfig, ControllerKind, FilterBankLayout};
//!
//! let config = BusConfig::builder(ControllerKind::BxCan)
//!     .filter_layout(FilterBankLayout::Shared { slots: 14 })
//!     .tx_timeout_ms(5)
//!     .build();
//! assert_eq!(config.filter_layout.capacity(psr_can::protocol::transport::filter::IdWidth::Standard), 14);
//! ```
use crate::protocol::transport::{
    can_frame::Frame,
    filter::{FilterKind, FilterSlot, IdWidth},
    FDCAN_TX_TIMEOUT_MS,
};

/// Upper bound of any filter pool; allocation bitmaps are 32 bits wide.
pub const MAX_FILTER_SLOTS: u8 = 32;

//==================================================================================CONTROLLER
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Controller family of a bus. Selects default layout and policies.
pub enum ControllerKind {
    /// Classic CAN controller with a shared filter bank.
    BxCan,
    /// CAN-FD controller with separate standard and extended filter pools.
    FdCan,
    /// Discrete SPI controller (MCP2515 class).
    Mcp2515,
}

impl ControllerKind {
    pub const fn default_filter_layout(&self) -> FilterBankLayout {
        match self {
            ControllerKind::BxCan => FilterBankLayout::Shared { slots: 8 },
            ControllerKind::FdCan => FilterBankLayout::Split {
                standard: 28,
                extended: 8,
            },
            ControllerKind::Mcp2515 => FilterBankLayout::Shared { slots: 6 },
        }
    }

    pub const fn default_filter_update(&self) -> FilterUpdateMode {
        match self {
            ControllerKind::FdCan => FilterUpdateMode::Reinitialize,
            _ => FilterUpdateMode::InPlace,
        }
    }

    pub const fn default_tx_timeout_ms(&self) -> Option<u32> {
        match self {
            ControllerKind::FdCan => Some(FDCAN_TX_TIMEOUT_MS),
            _ => None,
        }
    }

    /// Only FDCAN implements dual-ID and range filter elements.
    pub const fn supports(&self, kind: &FilterKind) -> bool {
        match self {
            ControllerKind::FdCan => true,
            _ => matches!(kind, FilterKind::IdMask { .. }),
        }
    }
}

//==================================================================================LAYOUT
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Shape of the hardware filter bank.
pub enum FilterBankLayout {
    /// One pool indexed `0..slots`, shared by both identifier widths.
    Shared { slots: u8 },
    /// Independent pools; a standard and an extended filter may share an index.
    Split { standard: u8, extended: u8 },
}

impl FilterBankLayout {
    /// Slots available to `width`, clamped to [`MAX_FILTER_SLOTS`].
    pub const fn capacity(&self, width: IdWidth) -> u8 {
        let raw = match (self, width) {
            (FilterBankLayout::Shared { slots }, _) => *slots,
            (FilterBankLayout::Split { standard, .. }, IdWidth::Standard) => *standard,
            (FilterBankLayout::Split { extended, .. }, IdWidth::Extended) => *extended,
        };
        if raw > MAX_FILTER_SLOTS {
            MAX_FILTER_SLOTS
        } else {
            raw
        }
    }

    pub const fn is_split(&self) -> bool {
        matches!(self, FilterBankLayout::Split { .. })
    }

    /// Whether a received `frame` was accepted by `slot`.
    ///
    /// Split pools reuse indices across widths, so the width must match too.
    pub fn slot_matches(&self, slot: FilterSlot, frame: &Frame) -> bool {
        match frame.filter_index {
            Some(index) if index == slot.index => {
                !self.is_split() || slot.width == frame.width()
            }
            _ => false,
        }
    }
}

//==================================================================================UPDATE_MODE
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// How a new filter reaches an already running controller.
pub enum FilterUpdateMode {
    /// The slot is programmed while the controller keeps running.
    InPlace,
    /// Filter counts are init parameters: stop, re-init, re-program, restart.
    Reinitialize,
}

//==================================================================================BUS_CONFIG
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Configuration consumed by [`CanBus::new`](crate::bus::CanBus::new).
pub struct BusConfig {
    pub controller: ControllerKind,
    pub filter_layout: FilterBankLayout,
    pub filter_update: FilterUpdateMode,
    /// Bound on the wait for a free transmit slot; `None` spins indefinitely.
    pub tx_timeout_ms: Option<u32>,
    pub auto_retransmit: bool,
}

impl BusConfig {
    /// Builder pre-filled with the defaults of `controller`.
    pub const fn builder(controller: ControllerKind) -> BusConfigBuilder {
        BusConfigBuilder::new(controller)
    }

    pub const fn new(controller: ControllerKind) -> Self {
        Self::builder(controller).build()
    }
}

/// Fluent builder used to override board-specific settings.
#[derive(Clone, Copy, Debug)]
pub struct BusConfigBuilder {
    config: BusConfig,
}

impl BusConfigBuilder {
    pub const fn new(controller: ControllerKind) -> Self {
        Self {
            config: BusConfig {
                controller,
                filter_layout: controller.default_filter_layout(),
                filter_update: controller.default_filter_update(),
                tx_timeout_ms: controller.default_tx_timeout_ms(),
                auto_retransmit: true,
            },
        }
    }

    /// Filter bank size of this particular chip.
    #[inline]
    pub const fn filter_layout(mut self, layout: FilterBankLayout) -> Self {
        self.config.filter_layout = layout;
        self
    }

    #[inline]
    pub const fn filter_update(mut self, mode: FilterUpdateMode) -> Self {
        self.config.filter_update = mode;
        self
    }

    /// Bound the transmit wait to `timeout_ms` milliseconds.
    #[inline]
    pub const fn tx_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.config.tx_timeout_ms = Some(timeout_ms);
        self
    }

    /// Spin until a transmit slot frees up, however long it takes.
    #[inline]
    pub const fn no_tx_timeout(mut self) -> Self {
        self.config.tx_timeout_ms = None;
        self
    }

    #[inline]
    pub const fn auto_retransmit(mut self, enabled: bool) -> Self {
        self.config.auto_retransmit = enabled;
        self
    }

    #[inline]
    pub const fn build(self) -> BusConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_defaults() {
        let bx = BusConfig::new(ControllerKind::BxCan);
        assert_eq!(bx.filter_layout, FilterBankLayout::Shared { slots: 8 });
        assert_eq!(bx.filter_update, FilterUpdateMode::InPlace);
        assert_eq!(bx.tx_timeout_ms, None);

        let fd = BusConfig::new(ControllerKind::FdCan);
        assert_eq!(
            fd.filter_layout,
            FilterBankLayout::Split {
                standard: 28,
                extended: 8
            }
        );
        assert_eq!(fd.filter_update, FilterUpdateMode::Reinitialize);
        assert_eq!(fd.tx_timeout_ms, Some(20));
    }

    #[test]
    fn test_builder_overrides() {
        let config = BusConfig::builder(ControllerKind::FdCan)
            .filter_layout(FilterBankLayout::Split {
                standard: 4,
                extended: 2,
            })
            .no_tx_timeout()
            .auto_retransmit(false)
            .build();
        assert_eq!(config.filter_layout.capacity(IdWidth::Extended), 2);
        assert_eq!(config.tx_timeout_ms, None);
        assert!(!config.auto_retransmit);
    }

    #[test]
    fn test_capacity_clamped() {
        let layout = FilterBankLayout::Shared { slots: 200 };
        assert_eq!(layout.capacity(IdWidth::Standard), MAX_FILTER_SLOTS);
    }

    #[test]
    fn test_filter_support() {
        let range = FilterKind::Range { low: 1, high: 2 };
        assert!(ControllerKind::FdCan.supports(&range));
        assert!(!ControllerKind::BxCan.supports(&range));
        assert!(ControllerKind::Mcp2515.supports(&FilterKind::IdMask { id: 0, mask: 0 }));
    }

    #[test]
    fn test_slot_matching_by_layout() {
        let mut frame = Frame::new_extended(0x10, &[]).unwrap();
        frame.filter_index = Some(2);
        let std_slot = FilterSlot {
            index: 2,
            width: IdWidth::Standard,
        };

        assert!(FilterBankLayout::Shared { slots: 8 }.slot_matches(std_slot, &frame));
        assert!(!FilterBankLayout::Split {
            standard: 8,
            extended: 8
        }
        .slot_matches(std_slot, &frame));

        frame.filter_index = None;
        assert!(!FilterBankLayout::Shared { slots: 8 }.slot_matches(std_slot, &frame));
    }
}
