//! Unit tests for VESC command encoding and status decoding.
use super::*;
use crate::protocol::devices::test_sink::LastFrame;

#[test]
/// Single-value commands: 4 bytes, big-endian, scaled.
fn test_single_value_commands() {
    let vesc = VescCan::new(0x0A);
    let mut sink = LastFrame::default();

    vesc.set_duty_cycle(&mut sink, 0.5).unwrap();
    let frame = sink.take();
    assert_eq!(frame.id, 0x0A);
    assert!(frame.is_extended);
    assert_eq!(frame.len, 4);
    assert_eq!(frame.payload(), &50_000i32.to_be_bytes());

    vesc.set_current(&mut sink, -2.5).unwrap();
    let frame = sink.take();
    assert_eq!(frame.id, 0x10A);
    assert_eq!(frame.payload(), &(-2_500i32).to_be_bytes());

    vesc.set_rpm(&mut sink, 1200.0).unwrap();
    assert_eq!(sink.take().id, 0x30A);

    vesc.set_relative_brake_current(&mut sink, 0.25).unwrap();
    let frame = sink.take();
    assert_eq!(frame.id, 0x0B0A);
    assert_eq!(frame.payload(), &250i32.to_be_bytes());
}

#[test]
/// Limit commands carry lower then upper in 8 bytes.
fn test_limit_commands() {
    let vesc = VescCan::new(0x01);
    let mut sink = LastFrame::default();

    vesc.set_current_limits_and_store(&mut sink, -10.0, 60.0).unwrap();
    let frame = sink.take();
    assert_eq!(frame.id, (22 << 8) | 0x01);
    assert_eq!(frame.len, 8);
    assert_eq!(frame.data.word_be(0) as i32, -10_000);
    assert_eq!(frame.data.word_be(1) as i32, 60_000);

    vesc.set_input_current_limits(&mut sink, 0.0, 30.0).unwrap();
    assert_eq!(sink.take().id, (23 << 8) | 0x01);
}

#[test]
/// Frames of other controllers are ignored; unknown packets are flagged.
fn test_classify() {
    let vesc = VescCan::new(0x05);
    let status = Frame::new_extended(VescCan::new(0x05).id(VescPacket::Status4), &[]).unwrap();
    assert_eq!(vesc.classify(&status), Some(Some(VescPacket::Status4)));

    let unknown = Frame::new_extended((200 << 8) | 0x05, &[]).unwrap();
    assert_eq!(vesc.classify(&unknown), Some(None));

    let other = Frame::new_extended(VescCan::new(0x06).id(VescPacket::Status), &[]).unwrap();
    assert_eq!(vesc.classify(&other), None);

    assert_eq!(VescPacket::from_raw(58), Some(VescPacket::Status6));
    assert_eq!(VescPacket::from_raw(27), Some(VescPacket::Status5));
}

#[test]
/// Status broadcasts decode with their fixed scales.
fn test_decode_status() {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&(-3_000i32).to_be_bytes());
    bytes[4..6].copy_from_slice(&125i16.to_be_bytes());
    bytes[6..].copy_from_slice(&(-500i16).to_be_bytes());
    let status = VescCan::decode_status1(&Frame::new_extended(0x905, &bytes).unwrap());
    assert_eq!(status.rpm, -3_000);
    assert_eq!(status.total_current, 12.5);
    assert_eq!(status.duty_cycle, -0.5);

    let mut bytes = [0u8; 8];
    bytes[..2].copy_from_slice(&455i16.to_be_bytes());
    bytes[2..4].copy_from_slice(&600i16.to_be_bytes());
    bytes[4..6].copy_from_slice(&(-15i16).to_be_bytes());
    bytes[6..].copy_from_slice(&900i16.to_be_bytes());
    let status = VescCan::decode_status4(&Frame::new_extended(0x1005, &bytes).unwrap());
    assert_eq!(status.mosfet_temperature, 45.5);
    assert_eq!(status.motor_temperature, 60.0);
    assert_eq!(status.total_input_current, -1.5);
    assert_eq!(status.pid_position, 900);

    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&123_456i32.to_be_bytes());
    bytes[4..6].copy_from_slice(&482i16.to_be_bytes());
    let status = VescCan::decode_status5(&Frame::new_extended(0x1B05, &bytes).unwrap());
    assert_eq!(status.tachometer, 123_456);
    assert_eq!(status.input_voltage, 48.2);

    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&25_000i32.to_be_bytes());
    bytes[4..].copy_from_slice(&5_000i32.to_be_bytes());
    let status = VescCan::decode_status2(&Frame::new_extended(0xE05, &bytes).unwrap());
    assert_eq!(status.amp_hours_consumed, 2.5);
    assert_eq!(status.amp_hours_regenerated, 0.5);
}
