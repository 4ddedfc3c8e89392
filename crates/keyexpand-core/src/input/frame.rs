// Keyexpand Input Layer - Frame Decoding
// Fixed-size little-endian input_event records read from /dev/input/event*

use smallvec::SmallVec;

use super::event::is_key_event;
use crate::key_state::KeyState;

/// Bytes taken by `type`, `code` and `value` at the end of every frame.
pub const FRAME_TAIL_SIZE: usize = 8;

/// Errors produced while decoding a frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid frame layout: size {0} is smaller than the 8-byte event tail")]
    InvalidLayout(usize),
}

/// One decoded input event.
///
/// The timestamp is kept as the opaque bytes read from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEventFrame {
    pub timestamp: SmallVec<[u8; 16]>,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl RawEventFrame {
    /// True for the initial press of a key (type EV_KEY, value 1).
    pub fn is_key_press(&self) -> bool {
        self.key_state().is_some_and(KeyState::just_pressed)
    }

    /// Press/release/repeat state of a key event, `None` for other events.
    pub fn key_state(&self) -> Option<KeyState> {
        if !is_key_event(self.event_type) {
            return None;
        }
        KeyState::from_i32(self.value)
    }
}

/// Frame size in effect for a run.
///
/// Determined once at startup and then used for every read and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    size: usize,
}

impl FrameLayout {
    /// Layout of the kernel `input_event` on this platform
    /// (24 bytes on 64-bit Linux: a 16-byte timeval then type, code, value).
    pub fn native() -> Self {
        Self {
            size: std::mem::size_of::<libc::input_event>(),
        }
    }

    /// Layout with an explicit frame size.
    pub fn with_size(size: usize) -> Result<Self, DecodeError> {
        if size < FRAME_TAIL_SIZE {
            return Err(DecodeError::InvalidLayout(size));
        }
        Ok(Self { size })
    }

    /// Total frame size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the opaque timestamp prefix
    pub fn timestamp_size(&self) -> usize {
        self.size - FRAME_TAIL_SIZE
    }

    /// Decode one frame. The buffer must be exactly `size()` bytes.
    pub fn decode(&self, buf: &[u8]) -> Result<RawEventFrame, DecodeError> {
        if buf.len() != self.size {
            return Err(DecodeError::LengthMismatch {
                expected: self.size,
                actual: buf.len(),
            });
        }

        let (timestamp, tail) = buf.split_at(self.timestamp_size());
        Ok(RawEventFrame {
            timestamp: SmallVec::from_slice(timestamp),
            event_type: u16::from_le_bytes([tail[0], tail[1]]),
            code: u16::from_le_bytes([tail[2], tail[3]]),
            value: i32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]),
        })
    }

    /// Encode a frame with a zeroed timestamp.
    ///
    /// Used to feed synthetic streams in tests and diagnostics.
    pub fn encode(&self, event_type: u16, code: u16, value: i32) -> Vec<u8> {
        let mut buf = vec![0u8; self.timestamp_size()];
        buf.extend_from_slice(&event_type.to_le_bytes());
        buf.extend_from_slice(&code.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
        buf
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::native()
    }
}
