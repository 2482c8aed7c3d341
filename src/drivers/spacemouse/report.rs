//! Data-driven decoding of raw HID reports. The per-device byte layout is a
//! dispatch table in the device profile, not code: one generic routine
//! decodes every supported device, and new devices are added via catalog
//! entries only.

use thiserror::Error;

use crate::config::DeviceProfile;

use super::event::{AxisInput, ButtonInput, Event};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("report is empty")]
    Empty,
    #[error("report on channel {channel} is {len} bytes, expected at least {expected}")]
    TooShort {
        channel: u8,
        len: usize,
        expected: usize,
    },
}

/// Convert two bytes into a little-endian signed 16-bit integer
pub fn to_i16(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

/// Decode one raw HID report against the given device profile.
///
/// The report's leading byte is its channel (report ID). Every axis and
/// button spec on that channel produces one event; reports on channels the
/// profile does not reference decode to no events, since a single logical
/// sample is composed from multiple physical packets. A report shorter than
/// the largest offset referenced on its channel is an error and should be
/// dropped whole.
pub fn decode(report: &[u8], profile: &DeviceProfile) -> Result<Vec<Event>, ReportError> {
    let Some(&channel) = report.first() else {
        return Err(ReportError::Empty);
    };
    let Some(max_offset) = profile.max_offset_for_channel(channel) else {
        return Ok(Vec::new());
    };
    if report.len() <= max_offset {
        return Err(ReportError::TooShort {
            channel,
            len: report.len(),
            expected: max_offset + 1,
        });
    }

    let mut events = Vec::new();
    for (&axis, spec) in profile.mappings.iter() {
        if spec.channel != channel {
            continue;
        }
        let raw = to_i16(report[spec.byte1], report[spec.byte2]);
        // Negating i16::MIN overflows; widen before applying the sign.
        let value = (raw as i32 * spec.sign as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        events.push(Event::Axis(AxisInput { axis, value }));
    }
    for (index, spec) in profile.button_mapping.iter().enumerate() {
        if spec.channel != channel {
            continue;
        }
        let pressed = report[spec.byte] & (1 << spec.bit) != 0;
        events.push(Event::Button(ButtonInput { index, pressed }));
    }

    Ok(events)
}
