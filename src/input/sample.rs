use std::time::{SystemTime, UNIX_EPOCH};

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use super::axis::Axis;

/// Bitset of currently pressed buttons, indexed by their position in the
/// profile's button mapping
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState(u32);

impl ButtonState {
    pub fn set(&mut self, index: usize, pressed: bool) {
        if index >= 32 {
            return;
        }
        if pressed {
            self.0 |= 1 << index;
        } else {
            self.0 &= !(1 << index);
        }
    }

    pub fn is_pressed(&self, index: usize) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Indices of all currently pressed buttons
    pub fn pressed(&self) -> Vec<usize> {
        (0..32).filter(|&i| self.is_pressed(i)).collect()
    }
}

impl Serialize for ButtonState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let pressed = self.pressed();
        let mut seq = serializer.serialize_seq(Some(pressed.len()))?;
        for index in pressed {
            seq.serialize_element(&index)?;
        }
        seq.end()
    }
}

/// One published motion event: the smoothed value of all six axes plus the
/// current button state. Immutable once published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionSample {
    /// Milliseconds since the Unix epoch at assembly time
    pub timestamp_ms: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub buttons: ButtonState,
}

impl MotionSample {
    pub fn new(axes: [f64; 6], buttons: ButtonState) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            timestamp_ms,
            x: axes[Axis::X.index()],
            y: axes[Axis::Y.index()],
            z: axes[Axis::Z.index()],
            roll: axes[Axis::Roll.index()],
            pitch: axes[Axis::Pitch.index()],
            yaw: axes[Axis::Yaw.index()],
            buttons,
        }
    }

    pub fn axes(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.roll, self.pitch, self.yaw]
    }

    /// True when the other sample carries the same motion state, ignoring
    /// the timestamp. Used for change-only delivery.
    pub fn same_motion(&self, other: &Self) -> bool {
        self.axes() == other.axes() && self.buttons == other.buttons
    }
}
