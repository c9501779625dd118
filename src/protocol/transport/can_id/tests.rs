//! Unit tests for the `CanId` accessors, masks and operators.
use super::*;

//==================================================================================CAN_ID
#[test]
/// Every field survives a pack / `from_value` round trip.
fn test_round_trip_fields() {
    for (dst, src, message, kind, prio) in [
        (0x00, 0x00, 0x00, 0x00, 0),
        (0xFF, 0x12, 0x3F, 0x1F, 3),
        (0x42, 0xA5, 0x21, device_type::BMS, priority::HIGH),
        (0x01, 0xFE, 0x15, device_type::STEERING, priority::NORMAL),
    ] {
        let id = CanId::new(dst, src, message, kind, prio);
        let decoded = CanId::from_value(id.value());
        assert_eq!(decoded, id);
        assert_eq!(decoded.dst(), dst);
        assert_eq!(decoded.src(), src);
        assert_eq!(decoded.message(), message);
        assert_eq!(decoded.device_type(), kind);
        assert_eq!(decoded.priority(), prio);
    }
}

#[test]
/// Field masks are pairwise disjoint and together cover exactly 29 bits.
fn test_masks_never_overlap() {
    let masks = [
        CanId::dst_mask(),
        CanId::src_mask(),
        CanId::message_mask(),
        CanId::type_mask(),
        CanId::priority_mask(),
    ];

    for (i, a) in masks.iter().enumerate() {
        for b in masks.iter().skip(i + 1) {
            assert_eq!((*a & *b).value(), 0, "{:#x} overlaps {:#x}", a.0, b.0);
        }
    }

    let all = masks.iter().fold(CanId(0), |acc, m| acc | *m);
    assert_eq!(all.value(), crate::protocol::transport::EXT_ID_MASK);
}

#[test]
/// Known layout of the packed value.
fn test_packed_layout() {
    let id = CanId::new(0x34, 0x12, 0x05, 0x02, 0x01);
    assert_eq!(id.value(), (1 << 27) | (0x02 << 22) | (0x05 << 16) | (0x12 << 8) | 0x34);
}

#[test]
/// Oversized values are truncated to their field and never leak into neighbours.
fn test_wraparound_does_not_corrupt_neighbours() {
    let id = CanId::new(0, 0, 0xFF, 0xFF, 0xFF);
    assert_eq!(id.message(), 0x3F);
    assert_eq!(id.device_type(), 0x1F);
    assert_eq!(id.priority(), 0x03);
    assert_eq!(id.dst(), 0);
    assert_eq!(id.src(), 0);
    assert_eq!(id.value() & !crate::protocol::transport::EXT_ID_MASK, 0);

    let base = CanId::new(0xAA, 0xBB, 0x01, 0x02, 0x01);
    let updated = base.with_message(0xFF);
    assert_eq!(updated.message(), 0x3F);
    assert_eq!(updated.dst(), 0xAA);
    assert_eq!(updated.src(), 0xBB);
    assert_eq!(updated.device_type(), 0x02);
    assert_eq!(updated.priority(), 0x01);
}

#[test]
/// `from_value` drops bits outside of the 29-bit range.
fn test_from_value_masks_upper_bits() {
    let id = CanId::from_value(0xFFFF_FFFF);
    assert_eq!(id.value(), 0x1FFF_FFFF);
    assert_eq!(id.priority(), 3);
}

#[test]
/// Masks select the expected field with the bitwise operators.
fn test_mask_and_compose() {
    let id = CanId::new(0x10, 0x20, 0x03, device_type::MOTOR_CONTROLLER, priority::LOW);
    assert_eq!((id & CanId::src_mask()).value(), 0x20 << 8);

    let composed = CanId::new(0, 0x20, 0, 0, 0) | CanId::new(0x10, 0, 0, 0, 0);
    assert_eq!(composed, CanId::new(0x10, 0x20, 0, 0, 0));
    assert_ne!(composed, id);
}

#[test]
/// Destination 0xFF is reserved for multicast.
fn test_multicast_destination() {
    let id = CanId::new(CanId::MULTICAST_DESTINATION, 0x01, 0, device_type::GENERIC, 0);
    assert!(id.is_multicast());
    assert!(!id.with_dst(0x02).is_multicast());
}

#[test]
/// Conversion into the `embedded-can` identifier keeps the packed value.
fn test_into_embedded_can_id() {
    let id = CanId::new(0x01, 0x02, generic_message::HEARTBEAT, device_type::BMS, priority::NORMAL);
    let ext: embedded_can::ExtendedId = id.into();
    assert_eq!(ext.as_raw(), id.value());
}
