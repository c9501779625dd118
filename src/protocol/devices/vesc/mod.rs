//! VESC motor controller commands and status broadcasts.
//!
//! Identifiers are `controller_id | packet << 8` on the extended format.
//! Every value is a big-endian signed integer scaled by a fixed factor.
use crate::protocol::{
    devices::{device_id_of, packet_of},
    transport::{
        can_frame::{Frame, Payload},
        traits::frame_transmit::FrameTransmit,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
/// Packet types of the VESC CAN protocol.
pub enum VescPacket {
    SetDuty = 0,
    SetCurrent = 1,
    SetCurrentBrake = 2,
    SetRpm = 3,
    SetPos = 4,
    FillRxBuffer = 5,
    FillRxBufferLong = 6,
    ProcessRxBuffer = 7,
    ProcessShortBuffer = 8,
    Status = 9,
    SetCurrentRel = 10,
    SetCurrentBrakeRel = 11,
    SetCurrentHandbrake = 12,
    SetCurrentHandbrakeRel = 13,
    Status2 = 14,
    Status3 = 15,
    Status4 = 16,
    Ping = 17,
    Pong = 18,
    DetectApplyAllFoc = 19,
    DetectApplyAllFocRes = 20,
    ConfCurrentLimits = 21,
    ConfStoreCurrentLimits = 22,
    ConfCurrentLimitsIn = 23,
    ConfStoreCurrentLimitsIn = 24,
    ConfFocErpms = 25,
    ConfStoreFocErpms = 26,
    Status5 = 27,
    PollTs5700n8501Status = 28,
    ConfBatteryCut = 29,
    ConfStoreBatteryCut = 30,
    Shutdown = 31,
    IoBoardAdc1To4 = 32,
    IoBoardAdc5To8 = 33,
    IoBoardAdc9To12 = 34,
    IoBoardDigitalIn = 35,
    IoBoardSetOutputDigital = 36,
    IoBoardSetOutputPwm = 37,
    BmsVTot = 38,
    BmsI = 39,
    BmsAhWh = 40,
    BmsVCell = 41,
    BmsBal = 42,
    BmsTemps = 43,
    BmsHum = 44,
    BmsSocSohTempStat = 45,
    PswStat = 46,
    PswSwitch = 47,
    BmsHwData1 = 48,
    BmsHwData2 = 49,
    BmsHwData3 = 50,
    BmsHwData4 = 51,
    BmsHwData5 = 52,
    BmsAhWhChgTotal = 53,
    BmsAhWhDisTotal = 54,
    UpdatePidPosOffset = 55,
    PollRotorPos = 56,
    NotifyBoot = 57,
    Status6 = 58,
}

impl VescPacket {
    const ALL: [VescPacket; 59] = {
        use VescPacket::*;
        [
            SetDuty, SetCurrent, SetCurrentBrake, SetRpm, SetPos, FillRxBuffer,
            FillRxBufferLong, ProcessRxBuffer, ProcessShortBuffer, Status, SetCurrentRel,
            SetCurrentBrakeRel, SetCurrentHandbrake, SetCurrentHandbrakeRel, Status2, Status3,
            Status4, Ping, Pong, DetectApplyAllFoc, DetectApplyAllFocRes, ConfCurrentLimits,
            ConfStoreCurrentLimits, ConfCurrentLimitsIn, ConfStoreCurrentLimitsIn, ConfFocErpms,
            ConfStoreFocErpms, Status5, PollTs5700n8501Status, ConfBatteryCut,
            ConfStoreBatteryCut, Shutdown, IoBoardAdc1To4, IoBoardAdc5To8, IoBoardAdc9To12,
            IoBoardDigitalIn, IoBoardSetOutputDigital, IoBoardSetOutputPwm, BmsVTot, BmsI,
            BmsAhWh, BmsVCell, BmsBal, BmsTemps, BmsHum, BmsSocSohTempStat, PswStat, PswSwitch,
            BmsHwData1, BmsHwData2, BmsHwData3, BmsHwData4, BmsHwData5, BmsAhWhChgTotal,
            BmsAhWhDisTotal, UpdatePidPosOffset, PollRotorPos, NotifyBoot, Status6,
        ]
    };

    /// Packet for a raw packet field, `None` when unknown.
    pub fn from_raw(raw: u32) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }

    pub const fn value(self) -> u32 {
        self as u32
    }
}

//==================================================================================SCALES
const DUTY_SCALE: f32 = 100_000.0;
const CURRENT_SCALE: f32 = 1_000.0;
const RPM_SCALE: f32 = 1.0;
const POSITION_SCALE: f32 = 10_000_000.0;

//==================================================================================STATUS
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status1 {
    pub rpm: i32,
    /// A
    pub total_current: f32,
    /// -1..=1
    pub duty_cycle: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status2 {
    pub amp_hours_consumed: f32,
    pub amp_hours_regenerated: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status3 {
    pub watt_hours_consumed: f32,
    pub watt_hours_regenerated: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status4 {
    /// °C
    pub mosfet_temperature: f32,
    /// °C
    pub motor_temperature: f32,
    /// A
    pub total_input_current: f32,
    /// Raw PID position, degrees * 50.
    pub pid_position: i16,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status5 {
    pub tachometer: i32,
    /// V
    pub input_voltage: f32,
}

fn i32_at(frame: &Frame, word: usize) -> i32 {
    frame.data.word_be(word) as i32
}

fn i16_at(frame: &Frame, half_word: usize) -> i16 {
    frame.data.half_word_be(half_word) as i16
}

//==================================================================================VESC
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// One VESC controller on the bus.
pub struct VescCan {
    controller_id: u8,
}

impl VescCan {
    pub const fn new(controller_id: u8) -> Self {
        Self { controller_id }
    }

    pub const fn controller_id(&self) -> u8 {
        self.controller_id
    }

    pub const fn id(&self, packet: VescPacket) -> u32 {
        self.controller_id as u32 | packet.value() << 8
    }

    fn command(&self, packet: VescPacket, values: &[f32], scale: f32) -> Frame {
        let mut data = Payload::new();
        for (word, value) in values.iter().take(2).enumerate() {
            data.set_word_be(word, (value * scale) as i32 as u32);
        }
        Frame {
            id: self.id(packet),
            is_extended: true,
            is_rtr: false,
            len: (values.len().min(2) * 4) as u8,
            data,
            filter_index: None,
        }
    }

    /// Duty cycle in -1..=1.
    pub fn set_duty_cycle<B: FrameTransmit>(&self, bus: &mut B, duty: f32) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetDuty, &[duty], DUTY_SCALE))
    }

    /// Motor current in A.
    pub fn set_current<B: FrameTransmit>(&self, bus: &mut B, current: f32) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetCurrent, &[current], CURRENT_SCALE))
    }

    /// Braking current in A.
    pub fn set_brake_current<B: FrameTransmit>(
        &self,
        bus: &mut B,
        current: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetCurrentBrake, &[current], CURRENT_SCALE))
    }

    pub fn set_rpm<B: FrameTransmit>(&self, bus: &mut B, rpm: f32) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetRpm, &[rpm], RPM_SCALE))
    }

    /// Position in degrees.
    pub fn set_position<B: FrameTransmit>(&self, bus: &mut B, position: f32) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetPos, &[position], POSITION_SCALE))
    }

    /// Current relative to the configured limits, -1..=1.
    pub fn set_relative_current<B: FrameTransmit>(
        &self,
        bus: &mut B,
        current: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetCurrentRel, &[current], CURRENT_SCALE))
    }

    /// Brake current relative to the configured limits, -1..=1.
    pub fn set_relative_brake_current<B: FrameTransmit>(
        &self,
        bus: &mut B,
        current: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::SetCurrentBrakeRel, &[current], CURRENT_SCALE))
    }

    /// Motor current limits in A.
    pub fn set_current_limits<B: FrameTransmit>(
        &self,
        bus: &mut B,
        lower: f32,
        upper: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(VescPacket::ConfCurrentLimits, &[lower, upper], CURRENT_SCALE))
    }

    /// Same as [`set_current_limits`](Self::set_current_limits), persisted to EEPROM.
    pub fn set_current_limits_and_store<B: FrameTransmit>(
        &self,
        bus: &mut B,
        lower: f32,
        upper: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(
            VescPacket::ConfStoreCurrentLimits,
            &[lower, upper],
            CURRENT_SCALE,
        ))
    }

    /// Input current limits in A.
    pub fn set_input_current_limits<B: FrameTransmit>(
        &self,
        bus: &mut B,
        lower: f32,
        upper: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(
            VescPacket::ConfCurrentLimitsIn,
            &[lower, upper],
            CURRENT_SCALE,
        ))
    }

    pub fn set_input_current_limits_and_store<B: FrameTransmit>(
        &self,
        bus: &mut B,
        lower: f32,
        upper: f32,
    ) -> Result<(), B::Error> {
        bus.transmit(&self.command(
            VescPacket::ConfStoreCurrentLimitsIn,
            &[lower, upper],
            CURRENT_SCALE,
        ))
    }

    /// Packet type of `frame` when it comes from this controller.
    ///
    /// `Some(None)` is a frame of this controller with an unknown packet.
    pub fn classify(&self, frame: &Frame) -> Option<Option<VescPacket>> {
        (frame.is_extended && device_id_of(frame.id) == self.controller_id)
            .then(|| VescPacket::from_raw(packet_of(frame.id)))
    }

    pub fn decode_status1(frame: &Frame) -> Status1 {
        Status1 {
            rpm: i32_at(frame, 0),
            total_current: i16_at(frame, 2) as f32 / 10.0,
            duty_cycle: i16_at(frame, 3) as f32 / 1_000.0,
        }
    }

    pub fn decode_status2(frame: &Frame) -> Status2 {
        Status2 {
            amp_hours_consumed: i32_at(frame, 0) as f32 / 10_000.0,
            amp_hours_regenerated: i32_at(frame, 1) as f32 / 10_000.0,
        }
    }

    pub fn decode_status3(frame: &Frame) -> Status3 {
        Status3 {
            watt_hours_consumed: i32_at(frame, 0) as f32 / 10_000.0,
            watt_hours_regenerated: i32_at(frame, 1) as f32 / 10_000.0,
        }
    }

    pub fn decode_status4(frame: &Frame) -> Status4 {
        Status4 {
            mosfet_temperature: i16_at(frame, 0) as f32 / 10.0,
            motor_temperature: i16_at(frame, 1) as f32 / 10.0,
            total_input_current: i16_at(frame, 2) as f32 / 10.0,
            pid_position: i16_at(frame, 3),
        }
    }

    pub fn decode_status5(frame: &Frame) -> Status5 {
        Status5 {
            tachometer: i32_at(frame, 0),
            input_voltage: i16_at(frame, 2) as f32 / 10.0,
        }
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
