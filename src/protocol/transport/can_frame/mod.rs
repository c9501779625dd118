//! In-memory representation of a CAN frame and of the raw records exchanged
//! with peripheral drivers.
use crate::{
    error::FrameError,
    protocol::transport::{can_id::CanId, filter::IdWidth, EXT_ID_MASK, MAX_PAYLOAD_LEN},
};

//==================================================================================PAYLOAD
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Eight payload bytes with width-specific accessors.
///
/// Multi-byte views are always little-endian, regardless of the target.
/// `*_be` accessors exist for device protocols that transmit network order.
pub struct Payload(pub [u8; 8]);

impl Payload {
    pub const fn new() -> Self {
        Self([0; 8])
    }

    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Copies up to eight bytes; the rest stays zero.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut bytes = [0u8; 8];
        let len = data.len().min(MAX_PAYLOAD_LEN);
        bytes[..len].copy_from_slice(&data[..len]);
        Self(bytes)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8; 8] {
        &mut self.0
    }

    /// Whole payload as one 64-bit value.
    #[inline]
    pub fn value(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    #[inline]
    pub fn set_value(&mut self, value: u64) {
        self.0 = value.to_le_bytes();
    }

    /// 32-bit word `index` (0 = bytes 0..4, 1 = bytes 4..8).
    pub fn word(&self, index: usize) -> u32 {
        let start = (index & 1) * 4;
        u32::from_le_bytes([
            self.0[start],
            self.0[start + 1],
            self.0[start + 2],
            self.0[start + 3],
        ])
    }

    pub fn set_word(&mut self, index: usize, value: u32) {
        let start = (index & 1) * 4;
        self.0[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Lower 32 bits of the payload.
    #[inline]
    pub fn lower(&self) -> u32 {
        self.word(0)
    }

    /// Upper 32 bits of the payload.
    #[inline]
    pub fn upper(&self) -> u32 {
        self.word(1)
    }

    /// 16-bit half-word `index` (0..4).
    pub fn half_word(&self, index: usize) -> u16 {
        let start = (index & 3) * 2;
        u16::from_le_bytes([self.0[start], self.0[start + 1]])
    }

    pub fn set_half_word(&mut self, index: usize, value: u16) {
        let start = (index & 3) * 2;
        self.0[start..start + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Big-endian 32-bit word `index`.
    pub fn word_be(&self, index: usize) -> u32 {
        self.word(index).swap_bytes()
    }

    pub fn set_word_be(&mut self, index: usize, value: u32) {
        self.set_word(index, value.swap_bytes());
    }

    /// Big-endian 16-bit half-word `index`.
    pub fn half_word_be(&self, index: usize) -> u16 {
        self.half_word(index).swap_bytes()
    }

    pub fn set_half_word_be(&mut self, index: usize, value: u16) {
        self.set_half_word(index, value.swap_bytes());
    }
}

//==================================================================================FRAME
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// One CAN message as seen by consumers.
pub struct Frame {
    /// 11-bit or 29-bit identifier, depending on `is_extended`.
    pub id: u32,
    pub is_extended: bool,
    /// Remote transmission request.
    pub is_rtr: bool,
    /// Number of valid payload bytes (0 to 8).
    pub len: u8,
    pub data: Payload,
    /// Filter slot that accepted the frame. Only set on received frames.
    pub filter_index: Option<u8>,
}

impl Frame {
    /// Data frame with an 11-bit identifier.
    pub fn new_standard(id: u32, data: &[u8]) -> Result<Self, FrameError> {
        Self::new_data(id, IdWidth::Standard, data)
    }

    /// Data frame with a 29-bit identifier.
    pub fn new_extended(id: u32, data: &[u8]) -> Result<Self, FrameError> {
        Self::new_data(id, IdWidth::Extended, data)
    }

    /// Data frame addressed with the fleet identifier convention.
    pub fn from_can_id(id: CanId, data: &[u8]) -> Result<Self, FrameError> {
        Self::new_data(id.value(), IdWidth::Extended, data)
    }

    /// Remote frame. Received RTR frames are surfaced but never transmitted.
    pub fn new_remote(id: u32, width: IdWidth, dlc: usize) -> Result<Self, FrameError> {
        let mut frame = Self::new_data(id, width, &[])?;
        if dlc > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong { len: dlc });
        }
        frame.is_rtr = true;
        frame.len = dlc as u8;
        Ok(frame)
    }

    fn new_data(id: u32, width: IdWidth, data: &[u8]) -> Result<Self, FrameError> {
        if !width.fits(id) {
            return Err(FrameError::IdentifierOutOfRange { id });
        }
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLong { len: data.len() });
        }
        Ok(Self {
            id,
            is_extended: width.is_extended(),
            is_rtr: false,
            len: data.len() as u8,
            data: Payload::from_slice(data),
            filter_index: None,
        })
    }

    pub fn width(&self) -> IdWidth {
        IdWidth::from_extended(self.is_extended)
    }

    /// Fleet view of the identifier. Meaningful for extended frames only.
    pub fn can_id(&self) -> CanId {
        CanId::from_value(self.id)
    }

    /// Valid payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data.0[..(self.len as usize).min(MAX_PAYLOAD_LEN)]
    }

    /// Whether a hardware filter accepted the frame.
    pub fn is_filter_matched(&self) -> bool {
        self.filter_index.is_some()
    }

    /// Header handed to drivers: identifier masked to its width.
    pub fn tx_header(&self) -> TxHeader {
        TxHeader {
            id: self.id & self.width().id_mask(),
            is_extended: self.is_extended,
            is_rtr: self.is_rtr,
            dlc: self.len,
        }
    }

    /// Canonical frame from a driver record: identifier masked, DLC clamped.
    pub fn from_raw(raw: &RawRxFrame) -> Self {
        let width = IdWidth::from_extended(raw.is_extended);
        Self {
            id: raw.id & width.id_mask(),
            is_extended: raw.is_extended,
            is_rtr: raw.is_rtr,
            len: raw.dlc.min(MAX_PAYLOAD_LEN as u8),
            data: Payload(raw.data),
            filter_index: raw.filter_index,
        }
    }
}

//==================================================================================DRIVER_RECORDS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Transmit header handed to the peripheral driver.
pub struct TxHeader {
    /// Already masked to the identifier width.
    pub id: u32,
    pub is_extended: bool,
    pub is_rtr: bool,
    pub dlc: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Frame as popped from a hardware receive FIFO.
pub struct RawRxFrame {
    pub id: u32,
    pub is_extended: bool,
    pub is_rtr: bool,
    pub dlc: u8,
    pub data: [u8; 8],
    /// Filter slot reported by the controller, if any matched.
    pub filter_index: Option<u8>,
}

//==================================================================================ID_WORD
/// Flag marking an extended identifier in a packed identifier word.
pub const ID_WORD_EXTENDED_FLAG: u32 = 1 << 31;
/// Flag marking a remote frame in a packed identifier word.
pub const ID_WORD_RTR_FLAG: u32 = 1 << 30;

/// Packs identifier, extended and RTR flags into the 32-bit word used by SPI
/// controller drivers (bit 31 extended, bit 30 RTR, bits 0..29 identifier).
pub fn encode_id_word(header: &TxHeader) -> u32 {
    let mut word = header.id & EXT_ID_MASK;
    if header.is_extended {
        word |= ID_WORD_EXTENDED_FLAG;
    }
    if header.is_rtr {
        word |= ID_WORD_RTR_FLAG;
    }
    word
}

/// Inverse of [`encode_id_word`]: returns `(id, is_extended, is_rtr)`.
pub fn decode_id_word(word: u32) -> (u32, bool, bool) {
    let is_extended = word & ID_WORD_EXTENDED_FLAG != 0;
    let width = IdWidth::from_extended(is_extended);
    (
        word & width.id_mask(),
        is_extended,
        word & ID_WORD_RTR_FLAG != 0,
    )
}

//==================================================================================EMBEDDED_CAN
impl embedded_can::Frame for Frame {
    fn new(id: impl Into<embedded_can::Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            embedded_can::Id::Standard(id) => Frame::new_standard(id.as_raw() as u32, data).ok(),
            embedded_can::Id::Extended(id) => Frame::new_extended(id.as_raw(), data).ok(),
        }
    }

    fn new_remote(id: impl Into<embedded_can::Id>, dlc: usize) -> Option<Self> {
        match id.into() {
            embedded_can::Id::Standard(id) => {
                Frame::new_remote(id.as_raw() as u32, IdWidth::Standard, dlc).ok()
            }
            embedded_can::Id::Extended(id) => {
                Frame::new_remote(id.as_raw(), IdWidth::Extended, dlc).ok()
            }
        }
    }

    fn is_extended(&self) -> bool {
        self.is_extended
    }

    fn is_remote_frame(&self) -> bool {
        self.is_rtr
    }

    fn id(&self) -> embedded_can::Id {
        if self.is_extended {
            embedded_can::Id::Extended(
                embedded_can::ExtendedId::new(self.id & EXT_ID_MASK)
                    .unwrap_or(embedded_can::ExtendedId::ZERO),
            )
        } else {
            embedded_can::Id::Standard(
                embedded_can::StandardId::new((self.id & crate::protocol::transport::STD_ID_MASK) as u16)
                    .unwrap_or(embedded_can::StandardId::ZERO),
            )
        }
    }

    fn dlc(&self) -> usize {
        self.len as usize
    }

    fn data(&self) -> &[u8] {
        self.payload()
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
