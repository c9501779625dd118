//! Battery management system broadcasts.
//!
//! The BMS only talks; this side classifies its frames and decodes them.
//! Multi-byte fields are big-endian.
use crate::protocol::{
    devices::{device_id_of, packet_of},
    transport::can_frame::Frame,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BmsPacket {
    TemperatureAndState,
    CurrentAndVoltage,
    Unknown(u32),
}

impl BmsPacket {
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => BmsPacket::TemperatureAndState,
            1 => BmsPacket::CurrentAndVoltage,
            other => BmsPacket::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Temperatures in °C, state of charge in percent.
pub struct TemperatureAndState {
    pub internal_temperature: f32,
    pub highest_cell_temperature: f32,
    pub lowest_cell_temperature: f32,
    pub relay_state: u8,
    pub state_of_charge: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Currents in A, voltages in V.
pub struct CurrentAndVoltage {
    pub pack_current: f32,
    pub pack_voltage: f32,
    pub highest_cell_voltage: f32,
    pub lowest_cell_voltage: f32,
}

const STATE_OF_CHARGE_DIVISOR: f32 = 2.0;
const CURRENT_DIVISOR: f32 = 10.0;
const PACK_VOLTAGE_DIVISOR: f32 = 100.0;
const CELL_VOLTAGE_DIVISOR: f32 = 10_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// One BMS on the bus.
pub struct BmsCan {
    device_id: u8,
}

impl BmsCan {
    pub const fn new(device_id: u8) -> Self {
        Self { device_id }
    }

    pub const fn device_id(&self) -> u8 {
        self.device_id
    }

    /// Packet type of `frame` when it comes from this BMS.
    pub fn classify(&self, frame: &Frame) -> Option<BmsPacket> {
        (frame.is_extended && device_id_of(frame.id) == self.device_id)
            .then(|| BmsPacket::from_raw(packet_of(frame.id)))
    }

    pub fn decode_temperature_and_state(frame: &Frame) -> TemperatureAndState {
        let bytes = frame.data.bytes();
        TemperatureAndState {
            internal_temperature: bytes[0] as f32,
            highest_cell_temperature: bytes[1] as f32,
            lowest_cell_temperature: bytes[2] as f32,
            relay_state: bytes[6],
            state_of_charge: bytes[7] as f32 / STATE_OF_CHARGE_DIVISOR,
        }
    }

    pub fn decode_current_and_voltage(frame: &Frame) -> CurrentAndVoltage {
        let data = &frame.data;
        CurrentAndVoltage {
            pack_current: data.half_word_be(0) as i16 as f32 / CURRENT_DIVISOR,
            pack_voltage: data.half_word_be(1) as f32 / PACK_VOLTAGE_DIVISOR,
            highest_cell_voltage: data.half_word_be(2) as f32 / CELL_VOLTAGE_DIVISOR,
            lowest_cell_voltage: data.half_word_be(3) as f32 / CELL_VOLTAGE_DIVISOR,
        }
    }
}
