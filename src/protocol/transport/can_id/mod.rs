//! Bit-packed view of the 29-bit extended identifiers used by the fleet's
//! message convention (destination, source, message, device type, priority).
use core::ops::{BitAnd, BitOr};

//==================================================================================CAN_ID
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Encapsulates a packed extended identifier and exposes masked accessors
/// for every field.
///
/// | bits    | field       |
/// |---------|-------------|
/// | `0..8`  | destination |
/// | `8..16` | source      |
/// | `16..22`| message     |
/// | `22..27`| device type |
/// | `27..29`| priority    |
pub struct CanId(pub u32);

impl CanId {
    pub const DST_OFFSET: u8 = 0;
    pub const SRC_OFFSET: u8 = 8;
    pub const MESSAGE_OFFSET: u8 = 16;
    pub const TYPE_OFFSET: u8 = 22;
    pub const PRIORITY_OFFSET: u8 = 27;

    pub const DST_BITS: u8 = 8;
    pub const SRC_BITS: u8 = 8;
    pub const MESSAGE_BITS: u8 = 6;
    pub const TYPE_BITS: u8 = 5;
    pub const PRIORITY_BITS: u8 = 2;

    /// Destination value addressing every node.
    pub const MULTICAST_DESTINATION: u8 = 0xFF;

    /// Packs every field; values wider than their field are truncated to it.
    pub const fn new(dst: u8, src: u8, message: u8, device_type: u8, priority: u8) -> Self {
        Self(
            Self::field(dst as u32, Self::DST_OFFSET, Self::DST_BITS)
                | Self::field(src as u32, Self::SRC_OFFSET, Self::SRC_BITS)
                | Self::field(message as u32, Self::MESSAGE_OFFSET, Self::MESSAGE_BITS)
                | Self::field(device_type as u32, Self::TYPE_OFFSET, Self::TYPE_BITS)
                | Self::field(priority as u32, Self::PRIORITY_OFFSET, Self::PRIORITY_BITS),
        )
    }

    /// Reinterprets a raw value. Bits above bit 28 are dropped.
    pub const fn from_value(value: u32) -> Self {
        Self(value & crate::protocol::transport::EXT_ID_MASK)
    }

    /// Raw packed value.
    pub const fn value(&self) -> u32 {
        self.0
    }

    //==================================================================================Masks
    pub const fn dst_mask() -> Self {
        Self(Self::mask(Self::DST_OFFSET, Self::DST_BITS))
    }

    pub const fn src_mask() -> Self {
        Self(Self::mask(Self::SRC_OFFSET, Self::SRC_BITS))
    }

    pub const fn message_mask() -> Self {
        Self(Self::mask(Self::MESSAGE_OFFSET, Self::MESSAGE_BITS))
    }

    pub const fn type_mask() -> Self {
        Self(Self::mask(Self::TYPE_OFFSET, Self::TYPE_BITS))
    }

    pub const fn priority_mask() -> Self {
        Self(Self::mask(Self::PRIORITY_OFFSET, Self::PRIORITY_BITS))
    }

    //==================================================================================Getters
    /// Destination node (8 bits).
    pub const fn dst(&self) -> u8 {
        self.extract(Self::DST_OFFSET, Self::DST_BITS) as u8
    }

    /// Source node (8 bits).
    pub const fn src(&self) -> u8 {
        self.extract(Self::SRC_OFFSET, Self::SRC_BITS) as u8
    }

    /// Message selector (6 bits).
    pub const fn message(&self) -> u8 {
        self.extract(Self::MESSAGE_OFFSET, Self::MESSAGE_BITS) as u8
    }

    /// Device-type class (5 bits).
    pub const fn device_type(&self) -> u8 {
        self.extract(Self::TYPE_OFFSET, Self::TYPE_BITS) as u8
    }

    /// Priority (2 bits, 0 is the most urgent).
    pub const fn priority(&self) -> u8 {
        self.extract(Self::PRIORITY_OFFSET, Self::PRIORITY_BITS) as u8
    }

    /// True when the destination is the multicast address.
    pub const fn is_multicast(&self) -> bool {
        self.dst() == Self::MULTICAST_DESTINATION
    }

    //==================================================================================Setters
    pub const fn with_dst(self, dst: u8) -> Self {
        self.insert(dst as u32, Self::DST_OFFSET, Self::DST_BITS)
    }

    pub const fn with_src(self, src: u8) -> Self {
        self.insert(src as u32, Self::SRC_OFFSET, Self::SRC_BITS)
    }

    pub const fn with_message(self, message: u8) -> Self {
        self.insert(message as u32, Self::MESSAGE_OFFSET, Self::MESSAGE_BITS)
    }

    pub const fn with_device_type(self, device_type: u8) -> Self {
        self.insert(device_type as u32, Self::TYPE_OFFSET, Self::TYPE_BITS)
    }

    pub const fn with_priority(self, priority: u8) -> Self {
        self.insert(priority as u32, Self::PRIORITY_OFFSET, Self::PRIORITY_BITS)
    }

    //==================================================================================Helpers
    const fn mask(offset: u8, bits: u8) -> u32 {
        ((1u32 << bits) - 1) << offset
    }

    const fn field(value: u32, offset: u8, bits: u8) -> u32 {
        (value << offset) & Self::mask(offset, bits)
    }

    const fn extract(&self, offset: u8, bits: u8) -> u32 {
        (self.0 & Self::mask(offset, bits)) >> offset
    }

    const fn insert(self, value: u32, offset: u8, bits: u8) -> Self {
        Self((self.0 & !Self::mask(offset, bits)) | Self::field(value, offset, bits))
    }
}

impl BitAnd for CanId {
    type Output = CanId;

    fn bitand(self, rhs: Self) -> Self::Output {
        CanId(self.0 & rhs.0)
    }
}

impl BitOr for CanId {
    type Output = CanId;

    fn bitor(self, rhs: Self) -> Self::Output {
        CanId(self.0 | rhs.0)
    }
}

impl From<CanId> for u32 {
    fn from(id: CanId) -> Self {
        id.0
    }
}

impl From<CanId> for embedded_can::ExtendedId {
    fn from(id: CanId) -> Self {
        // `CanId` never carries bits above 28 once masked.
        embedded_can::ExtendedId::new(id.0 & crate::protocol::transport::EXT_ID_MASK)
            .unwrap_or(embedded_can::ExtendedId::ZERO)
    }
}

impl From<CanId> for embedded_can::Id {
    fn from(id: CanId) -> Self {
        embedded_can::Id::Extended(id.into())
    }
}

//==================================================================================CONSTANTS
/// Priority values (2 bits, lower is more urgent).
pub mod priority {
    pub const HIGHEST: u8 = 0;
    pub const HIGH: u8 = 1;
    pub const NORMAL: u8 = 2;
    pub const LOW: u8 = 3;
}

/// Device-type classes (5 bits).
pub mod device_type {
    pub const MPPT: u8 = 0x0;
    pub const BMS: u8 = 0x1;
    pub const MOTOR_CONTROLLER: u8 = 0x2;
    pub const DISPLAY: u8 = 0x3;
    pub const DISTRIBUTION: u8 = 0x4;
    pub const PERIPHERALS: u8 = 0x5;
    pub const STEERING: u8 = 0x6;
    pub const GENERIC: u8 = 0x1F;
}

/// Message selectors shared by every device type.
pub mod generic_message {
    /// Broadcast period of generic messages (ms).
    pub const GENERIC_RATE_MS: u32 = 2000;

    pub const HEARTBEAT: u8 = 0x00;
    pub const VOLTAGE_CURRENT_0: u8 = 0x01;
    pub const VOLTAGE_CURRENT_1: u8 = 0x02;
    pub const VOLTAGE_CURRENT_2: u8 = 0x03;
    pub const VOLTAGE_CURRENT_3: u8 = 0x04;

    pub const ERRORS_0: u8 = 0x20;
    pub const ERRORS_1: u8 = 0x21;
    pub const ERRORS_2: u8 = 0x22;
    pub const ERRORS_3: u8 = 0x23;

    pub const RESET: u8 = 0x3F;
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
