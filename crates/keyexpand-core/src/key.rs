// Keyexpand Key Codes
// Named key codes from Linux input-event-codes.h used by the US-QWERTY table

use std::fmt;

include!(concat!(env!("OUT_DIR"), "/key_codes.rs"));

pub const KEY_ESC: u16 = 1;
pub const KEY_BACKSPACE: u16 = 14;
pub const KEY_TAB: u16 = 15;
pub const KEY_ENTER: u16 = 28;
pub const KEY_LEFTCTRL: u16 = 29;
pub const KEY_LEFTSHIFT: u16 = 42;
pub const KEY_RIGHTSHIFT: u16 = 54;
pub const KEY_LEFTALT: u16 = 56;
pub const KEY_SPACE: u16 = 57;
pub const KEY_CAPSLOCK: u16 = 58;
pub const KEY_U: u16 = 22;

/// Names of the 58 codes covered by the built-in table, indexed by code.
///
/// Printable keys are named by the character they produce without shift.
const KEY_NAMES: [&str; 59] = [
    "RESERVED", "ESC", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "-", "=",
    "BACKSPACE", "TAB", "q", "w", "e", "r", "t", "y", "u", "i", "o", "p", "[", "]",
    "ENTER", "CTRL", "a", "s", "d", "f", "g", "h", "j", "k", "l", ";", "'", "`",
    "SHIFT", "\\", "z", "x", "c", "v", "b", "n", "m", ",", ".", "/", "SHIFT", "*",
    "ALT", "SPACE", "CAPSLOCK",
];

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    match code {
        1..=58 => KEY_NAMES[code as usize],
        _ => "UNKNOWN",
    }
}

/// Iterate over every `(code, name)` pair in the built-in table.
pub fn known_keys() -> impl Iterator<Item = (u16, &'static str)> {
    (1..KEY_NAMES.len() as u16).map(|code| (code, KEY_NAMES[code as usize]))
}

/// Key and shift state needed to produce an ASCII character on a US layout.
///
/// Returns `None` for characters that have no direct key.
pub fn char_to_key(ch: char) -> Option<(KeyCode, bool)> {
    if ch.is_ascii_uppercase() {
        return char_to_key(ch.to_ascii_lowercase()).map(|(key, _)| (key, true));
    }

    let shifted = match ch {
        ' ' => return Some((KeyCode(KEY_SPACE), false)),
        '\n' => return Some((KeyCode(KEY_ENTER), false)),
        '\t' => return Some((KeyCode(KEY_TAB), false)),
        '_' => '-',
        '+' => '=',
        '{' => '[',
        '}' => ']',
        '|' => '\\',
        ':' => ';',
        '"' => '\'',
        '<' => ',',
        '>' => '.',
        '?' => '/',
        '~' => '`',
        '!' => '1',
        '@' => '2',
        '#' => '3',
        '$' => '4',
        '%' => '5',
        '^' => '6',
        '&' => '7',
        // '*' has its own key in the table, shift+8 is not needed
        '(' => '9',
        ')' => '0',
        _ => {
            return single_char_code(ch).map(|code| (KeyCode(code), false));
        }
    };

    single_char_code(shifted).map(|code| (KeyCode(code), true))
}

fn single_char_code(ch: char) -> Option<u16> {
    let mut buf = [0u8; 4];
    let needle: &str = ch.encode_utf8(&mut buf);
    known_keys()
        .find(|(_, name)| *name == needle)
        .map(|(code, _)| code)
}
