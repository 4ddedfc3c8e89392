// Keyexpand uinput Output Layer
// Virtual keyboard creation and keystroke emission

use std::sync::OnceLock;
use std::time::Duration;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, EventType, InputEvent};

use super::sink::{KeystrokeSink, OutputError};
use crate::input::VIRT_DEVICE_PREFIX;
use crate::key::{
    char_to_key, KeyCode, KEY_BACKSPACE, KEY_ENTER, KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_U,
};
use crate::key_state::KeyState;

/// Virtual uinput keyboard used to inject expansions
pub struct VirtualKeyboard {
    device: evdev::uinput::VirtualDevice,
    key_pre_delay_ms: u64,
    key_post_delay_ms: u64,
}

impl VirtualKeyboard {
    fn debug_output_enabled() -> bool {
        static DEBUG_OUTPUT: OnceLock<bool> = OnceLock::new();
        *DEBUG_OUTPUT.get_or_init(|| {
            std::env::var("KEYEXPAND_DEBUG_OUTPUT")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "on"))
                .unwrap_or(false)
        })
    }

    /// Create a new virtual uinput keyboard
    pub fn new() -> Result<Self, OutputError> {
        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .name(&format!("{} Keyboard", VIRT_DEVICE_PREFIX))
            .with_keys(&keys)
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| OutputError::DeviceCreation(e.to_string()))?;

        log::info!("Virtual keyboard created");

        Ok(Self {
            device,
            key_pre_delay_ms: 0,
            key_post_delay_ms: 0,
        })
    }

    /// Configure output throttle delays in milliseconds.
    pub fn set_throttle_delays(&mut self, key_pre_delay_ms: u64, key_post_delay_ms: u64) {
        self.key_pre_delay_ms = key_pre_delay_ms;
        self.key_post_delay_ms = key_post_delay_ms;
    }

    fn write_key_event(&mut self, key: KeyCode, state: KeyState) -> Result<(), OutputError> {
        let key_event = InputEvent::new(EventType::KEY, key.code(), state.to_i32());
        // SYN event is required for the kernel to process the key event
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| OutputError::WriteError(e.to_string()))
    }

    fn send_key(&mut self, key: KeyCode, state: KeyState) -> Result<(), OutputError> {
        if Self::debug_output_enabled() {
            log::debug!("send_key key={} state={}", key, state);
        }
        if self.key_pre_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.key_pre_delay_ms));
        }
        self.write_key_event(key, state)?;
        if self.key_post_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.key_post_delay_ms));
        }
        Ok(())
    }

    fn tap_key(&mut self, key: KeyCode) -> Result<(), OutputError> {
        self.send_key(key, KeyState::Press)?;
        self.send_key(key, KeyState::Release)
    }

    fn send_ascii_char(&mut self, ch: char) -> Result<bool, OutputError> {
        let Some((key, needs_shift)) = char_to_key(ch) else {
            return Ok(false);
        };

        if needs_shift {
            let shift = KeyCode(KEY_LEFTSHIFT);
            self.send_key(shift, KeyState::Press)?;
            self.tap_key(key)?;
            self.send_key(shift, KeyState::Release)?;
        } else {
            self.tap_key(key)?;
        }

        Ok(true)
    }

    /// Send a Unicode character via the Ctrl+Shift+U compose sequence.
    fn send_unicode(&mut self, ch: char) -> Result<(), OutputError> {
        let ctrl = KeyCode(KEY_LEFTCTRL);
        let shift = KeyCode(KEY_LEFTSHIFT);

        self.send_key(ctrl, KeyState::Press)?;
        self.send_key(shift, KeyState::Press)?;
        self.tap_key(KeyCode(KEY_U))?;
        self.send_key(shift, KeyState::Release)?;
        self.send_key(ctrl, KeyState::Release)?;

        for digit in format!("{:x}", ch as u32).chars() {
            let (key, _) = char_to_key(digit).ok_or(OutputError::UnsupportedChar(ch))?;
            self.tap_key(key)?;
        }
        self.tap_key(KeyCode(KEY_ENTER))
    }
}

impl KeystrokeSink for VirtualKeyboard {
    fn erase_backward(&mut self, count: usize) -> Result<(), OutputError> {
        for _ in 0..count {
            self.tap_key(KeyCode(KEY_BACKSPACE))?;
        }
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<(), OutputError> {
        for ch in text.chars() {
            if !self.send_ascii_char(ch)? {
                self.send_unicode(ch)?;
            }

            // Some apps drop characters when virtual key events arrive with
            // zero gap; pace at 1ms unless a post delay is configured.
            if self.key_post_delay_ms == 0 {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }
}
