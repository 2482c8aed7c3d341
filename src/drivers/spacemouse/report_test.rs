use std::collections::BTreeMap;

use crate::config::{AxisSpec, ButtonSpec, DeviceProfile};
use crate::drivers::spacemouse::event::{AxisInput, ButtonInput, Event};
use crate::drivers::spacemouse::report::{decode, to_i16, ReportError};
use crate::input::axis::Axis;

/// SpaceNavigator layout: translation on channel 1, rotation on channel 2,
/// buttons on channel 3
fn test_profile() -> DeviceProfile {
    let specs = [
        (Axis::X, 1, 1, 2, 1),
        (Axis::Y, 1, 3, 4, -1),
        (Axis::Z, 1, 5, 6, -1),
        (Axis::Roll, 2, 1, 2, -1),
        (Axis::Pitch, 2, 3, 4, -1),
        (Axis::Yaw, 2, 5, 6, 1),
    ];
    let mut mappings = BTreeMap::new();
    for (axis, channel, byte1, byte2, sign) in specs {
        mappings.insert(
            axis,
            AxisSpec {
                channel,
                byte1,
                byte2,
                sign,
            },
        );
    }
    DeviceProfile {
        name: "SpaceNavigator".to_string(),
        hid_id: (1133, 50726),
        axis_scale: 327.0,
        mappings,
        button_mapping: vec![
            ButtonSpec {
                channel: 3,
                byte: 1,
                bit: 0,
            },
            ButtonSpec {
                channel: 3,
                byte: 1,
                bit: 1,
            },
        ],
    }
}

#[test]
fn test_to_i16() {
    assert_eq!(to_i16(0x47, 0x01), 327);
    assert_eq!(to_i16(0x00, 0x00), 0);
    assert_eq!(to_i16(0xff, 0xff), -1);
    assert_eq!(to_i16(0x00, 0x80), i16::MIN);
    assert_eq!(to_i16(0xff, 0x7f), i16::MAX);
}

#[test]
fn test_decode_translation_report() {
    let profile = test_profile();
    // x = 327, y raw = 100 (sign -1), z raw = 0
    let report = [1u8, 0x47, 0x01, 0x64, 0x00, 0x00, 0x00];
    let events = decode(&report, &profile).unwrap();
    assert_eq!(
        events,
        vec![
            Event::Axis(AxisInput {
                axis: Axis::X,
                value: 327
            }),
            Event::Axis(AxisInput {
                axis: Axis::Y,
                value: -100
            }),
            Event::Axis(AxisInput {
                axis: Axis::Z,
                value: 0
            }),
        ]
    );
}

#[test]
fn test_decode_rotation_report() {
    let profile = test_profile();
    let report = [2u8, 0x0a, 0x00, 0x00, 0x00, 0x9c, 0xff];
    let events = decode(&report, &profile).unwrap();
    assert_eq!(
        events,
        vec![
            Event::Axis(AxisInput {
                axis: Axis::Roll,
                value: -10
            }),
            Event::Axis(AxisInput {
                axis: Axis::Pitch,
                value: 0
            }),
            Event::Axis(AxisInput {
                axis: Axis::Yaw,
                value: -100
            }),
        ]
    );
}

#[test]
fn test_decode_button_report() {
    let profile = test_profile();
    let report = [3u8, 0b0000_0010];
    let events = decode(&report, &profile).unwrap();
    assert_eq!(
        events,
        vec![
            Event::Button(ButtonInput {
                index: 0,
                pressed: false
            }),
            Event::Button(ButtonInput {
                index: 1,
                pressed: true
            }),
        ]
    );
}

#[test]
fn test_decode_is_idempotent() {
    let profile = test_profile();
    let report = [1u8, 0x47, 0x01, 0x64, 0x00, 0x12, 0x80];
    let first = decode(&report, &profile).unwrap();
    let second = decode(&report, &profile).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unreferenced_channel_is_ignored() {
    let profile = test_profile();
    // Channel 23 is not referenced by the profile: not an error, no events
    let report = [23u8, 0x47, 0x01, 0x64, 0x00, 0x00, 0x00];
    let events = decode(&report, &profile).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_short_report_fails() {
    let profile = test_profile();
    // Channel 1 references offsets up to 6; a five-byte report is too short
    let report = [1u8, 0x47, 0x01, 0x64, 0x00];
    let result = decode(&report, &profile);
    assert_eq!(
        result,
        Err(ReportError::TooShort {
            channel: 1,
            len: 5,
            expected: 7
        })
    );
}

#[test]
fn test_empty_report_fails() {
    let profile = test_profile();
    assert_eq!(decode(&[], &profile), Err(ReportError::Empty));
}

#[test]
fn test_negated_i16_min_saturates() {
    let profile = test_profile();
    // y raw = i16::MIN with sign -1 would overflow; it must saturate
    let report = [1u8, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00];
    let events = decode(&report, &profile).unwrap();
    let y = events.iter().find_map(|event| match event {
        Event::Axis(input) if input.axis == Axis::Y => Some(input.value),
        _ => None,
    });
    assert_eq!(y, Some(i16::MAX));
}
