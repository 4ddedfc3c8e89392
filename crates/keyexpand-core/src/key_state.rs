use std::fmt;

/// State carried in the `value` field of a key event frame.
///
/// From `evtest` output:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyState {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl KeyState {
    /// Returns true only for the initial press (not autorepeat)
    pub fn just_pressed(self) -> bool {
        matches!(self, KeyState::Press)
    }

    /// Create a KeyState from the raw frame value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Release),
            1 => Some(KeyState::Press),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }

    /// Convert KeyState to its raw frame value
    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyState::Release => write!(f, "release"),
            KeyState::Press => write!(f, "press"),
            KeyState::Repeat => write!(f, "repeat"),
        }
    }
}
