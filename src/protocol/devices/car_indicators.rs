//! Car indicator board: lights, wipers, blinkers and the selected drive
//! direction, broadcast as a two-byte frame.
use crate::protocol::{
    devices::device_id_of,
    transport::{
        can_frame::{Frame, Payload},
        traits::frame_transmit::FrameTransmit,
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Indicator bit field.
pub struct IndicatorFlags(pub u8);

impl IndicatorFlags {
    pub const LIGHTS: Self = Self(0b0001);
    pub const WIPERS: Self = Self(0b0010);
    pub const LEFT_BLINKER: Self = Self(0b0100);
    pub const RIGHT_BLINKER: Self = Self(0b1000);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl core::ops::BitOr for IndicatorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    Neutral = 0,
    Forward = 1,
    Reverse = 2,
    Invalid = 3,
}

impl Direction {
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Direction::Neutral,
            1 => Direction::Forward,
            2 => Direction::Reverse,
            _ => Direction::Invalid,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndicatorStatus {
    pub flags: IndicatorFlags,
    pub direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CarIndicators {
    device_id: u8,
}

impl CarIndicators {
    pub const fn new(device_id: u8) -> Self {
        Self { device_id }
    }

    pub fn status_frame(&self, status: IndicatorStatus) -> Frame {
        Frame {
            id: self.device_id as u32,
            is_extended: true,
            is_rtr: false,
            len: 2,
            data: Payload::from_slice(&[status.flags.0, status.direction as u8]),
            filter_index: None,
        }
    }

    pub fn transmit_status<B: FrameTransmit>(
        &self,
        bus: &mut B,
        flags: IndicatorFlags,
        direction: Direction,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.status_frame(IndicatorStatus { flags, direction }))
    }

    pub fn is_indicator_frame(&self, frame: &Frame) -> bool {
        device_id_of(frame.id) == self.device_id
    }

    pub fn decode_status(frame: &Frame) -> IndicatorStatus {
        let bytes = frame.data.bytes();
        IndicatorStatus {
            flags: IndicatorFlags(bytes[0]),
            direction: Direction::from_raw(bytes[1]),
        }
    }
}
