use crate::input::axis::Axis;

/// Events decoded from a single raw HID report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Axis(AxisInput),
    Button(ButtonInput),
}

/// Raw signed deflection of one motion axis, sign already applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisInput {
    pub axis: Axis,
    pub value: i16,
}

/// Pressed/released state of one button
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonInput {
    pub index: usize,
    pub pressed: bool,
}
