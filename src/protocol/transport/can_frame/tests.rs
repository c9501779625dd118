//! Unit tests for payload views, frame construction and driver translation.
use super::*;

//==================================================================================PAYLOAD
#[test]
/// All views read the same little-endian bytes.
fn test_payload_views_are_little_endian() {
    let payload = Payload::from_bytes([0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    assert_eq!(payload.value(), 0x0807_0605_0403_0201);
    assert_eq!(payload.lower(), 0x0403_0201);
    assert_eq!(payload.upper(), 0x0807_0605);
    assert_eq!(payload.half_word(0), 0x0201);
    assert_eq!(payload.half_word(3), 0x0807);
    assert_eq!(payload.half_word_be(0), 0x0102);
    assert_eq!(payload.word_be(1), 0x0506_0708);
}

#[test]
/// Writes through one view are visible through the others without touching
/// neighbouring bytes.
fn test_payload_setters() {
    let mut payload = Payload::new();
    payload.set_word(1, 0xAABB_CCDD);
    assert_eq!(payload.bytes(), &[0, 0, 0, 0, 0xDD, 0xCC, 0xBB, 0xAA]);

    payload.set_half_word(0, 0x1234);
    assert_eq!(payload.lower(), 0x0000_1234);
    assert_eq!(payload.upper(), 0xAABB_CCDD);

    payload.set_half_word_be(1, 0x5678);
    assert_eq!(&payload.bytes()[2..4], &[0x56, 0x78]);

    payload.set_value(u64::MAX);
    assert_eq!(payload.bytes(), &[0xFF; 8]);
}

//==================================================================================FRAME
#[test]
/// Constructors validate width and length.
fn test_frame_constructors() {
    let frame = Frame::new_standard(0x100, &[1, 2]).unwrap();
    assert_eq!(frame.id, 0x100);
    assert!(!frame.is_extended);
    assert_eq!(frame.len, 2);
    assert_eq!(frame.payload(), &[1, 2]);
    assert_eq!(frame.filter_index, None);

    assert_eq!(
        Frame::new_standard(0x800, &[]),
        Err(FrameError::IdentifierOutOfRange { id: 0x800 })
    );
    assert_eq!(
        Frame::new_extended(0x1, &[0; 9]),
        Err(FrameError::PayloadTooLong { len: 9 })
    );

    let remote = Frame::new_remote(0x7FF, IdWidth::Standard, 4).unwrap();
    assert!(remote.is_rtr);
    assert_eq!(remote.len, 4);
}

#[test]
/// Driver records are masked and clamped on the way in.
fn test_from_raw_masks_and_clamps() {
    let raw = RawRxFrame {
        id: 0xFFFF_F123,
        is_extended: false,
        is_rtr: false,
        dlc: 15,
        data: [9; 8],
        filter_index: Some(3),
    };
    let frame = Frame::from_raw(&raw);
    assert_eq!(frame.id, 0x123);
    assert_eq!(frame.len, 8);
    assert_eq!(frame.filter_index, Some(3));
    assert!(frame.is_filter_matched());
}

#[test]
/// The transmit header masks to the identifier width.
fn test_tx_header_masks_identifier() {
    let mut frame = Frame::new_extended(0x1ABC_DEF0, &[0xAA]).unwrap();
    assert_eq!(frame.tx_header().id, 0x1ABC_DEF0);

    frame.is_extended = false;
    let header = frame.tx_header();
    assert_eq!(header.id, 0x6F0);
    assert_eq!(header.dlc, 1);
}

#[test]
/// Identifier word layout used by SPI controllers.
fn test_id_word_codec() {
    let header = TxHeader {
        id: 0x1234_5678 & EXT_ID_MASK,
        is_extended: true,
        is_rtr: true,
        dlc: 0,
    };
    let word = encode_id_word(&header);
    assert_eq!(word >> 31, 1);
    assert_eq!((word >> 30) & 1, 1);
    assert_eq!(decode_id_word(word), (header.id, true, true));

    let (id, extended, rtr) = decode_id_word(0x0000_0123);
    assert_eq!((id, extended, rtr), (0x123, false, false));
}

#[test]
/// `embedded-can` view of the frame.
fn test_embedded_can_frame() {
    use embedded_can::Frame as _;

    let id = embedded_can::StandardId::new(0x321).unwrap();
    let frame = Frame::new(id, &[1, 2, 3]).unwrap();
    assert!(!frame.is_extended());
    assert_eq!(frame.dlc(), 3);
    assert_eq!(frame.data(), &[1, 2, 3]);
    assert_eq!(frame.id(), embedded_can::Id::Standard(id));

    let can_id = CanId::new(1, 2, 3, 4, 1);
    let frame = Frame::new(can_id, &[]).unwrap();
    assert!(frame.is_extended());
    assert_eq!(frame.can_id(), can_id);

    assert!(Frame::new(id, &[0; 9]).is_none());
}
