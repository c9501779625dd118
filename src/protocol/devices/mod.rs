//! Device protocols layered on raw frames: battery management system, VESC
//! motor controller, and the car indicator board.
//!
//! Each device only needs [`FrameTransmit`](crate::protocol::transport::traits::frame_transmit::FrameTransmit)
//! to send, and decodes the frames handed to its receive callback. Device
//! identifiers occupy bits 0..8 of the extended identifier and the packet
//! type sits above them.
pub mod bms;
pub mod car_indicators;
pub mod vesc;

/// Device id field of a device-protocol identifier.
pub(crate) const fn device_id_of(id: u32) -> u8 {
    (id & 0xFF) as u8
}

/// Packet field of a device-protocol identifier (bits 8..29).
pub(crate) const fn packet_of(id: u32) -> u32 {
    (id >> 8) & 0x1F_FFFF
}

#[cfg(test)]
pub(crate) mod test_sink {
    use crate::protocol::transport::{can_frame::Frame, traits::frame_transmit::FrameTransmit};

    /// Keeps the last transmitted frame.
    #[derive(Default)]
    pub struct LastFrame(pub Option<Frame>);

    impl FrameTransmit for LastFrame {
        type Error = ();

        fn transmit(&mut self, frame: &Frame) -> Result<(), ()> {
            self.0 = Some(*frame);
            Ok(())
        }
    }

    impl LastFrame {
        pub fn take(&mut self) -> Frame {
            self.0.take().expect("nothing transmitted")
        }
    }
}
