//! Consumer-facing transmit seam. Device protocols encode their messages and
//! hand them to anything implementing [`FrameTransmit`], usually a
//! [`CanBus`](crate::bus::CanBus).
use crate::protocol::transport::can_frame::Frame;

/// Something able to put one frame on the wire.
pub trait FrameTransmit {
    type Error: core::fmt::Debug;

    fn transmit(&mut self, frame: &Frame) -> Result<(), Self::Error>;
}
