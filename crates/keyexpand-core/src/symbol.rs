// Keyexpand Symbol Table
// Classifies raw key codes into printable, modifier and control symbols

use std::collections::HashMap;
use std::fmt;

use crate::key::known_keys;

/// Keys that change how other keys are interpreted and never reach the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Shift,
    Ctrl,
    Alt,
    CapsLock,
    Tab,
}

/// Non-printable keys with their own meaning to the expansion machine.
///
/// Space and Enter end a token and start a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Backspace,
    Enter,
    Space,
}

/// Classified meaning of a key code.
///
/// A printable symbol is the text its key appends to the token: one
/// character for most keys, a word such as `ESC` for named keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySymbol {
    Printable(String),
    Modifier(ModifierKind),
    Control(ControlKind),
    Unknown,
}

impl KeySymbol {
    /// Classify a symbol name as it appears in the key table or in config.
    ///
    /// The reserved upper-case names are modifiers or controls; any other
    /// non-empty name without whitespace is printable as-is.
    /// Empty or blank names are `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "SHIFT" => return KeySymbol::Modifier(ModifierKind::Shift),
            "CTRL" => return KeySymbol::Modifier(ModifierKind::Ctrl),
            "ALT" => return KeySymbol::Modifier(ModifierKind::Alt),
            "CAPSLOCK" => return KeySymbol::Modifier(ModifierKind::CapsLock),
            "TAB" => return KeySymbol::Modifier(ModifierKind::Tab),
            "BACKSPACE" => return KeySymbol::Control(ControlKind::Backspace),
            "ENTER" => return KeySymbol::Control(ControlKind::Enter),
            "SPACE" => return KeySymbol::Control(ControlKind::Space),
            _ => {}
        }

        if name.is_empty() || name.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            return KeySymbol::Unknown;
        }
        KeySymbol::Printable(name.to_string())
    }

    pub fn printable(text: &str) -> Self {
        KeySymbol::Printable(text.to_string())
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySymbol::Printable(text) => write!(f, "{}", text),
            KeySymbol::Modifier(kind) => write!(f, "{:?}", kind),
            KeySymbol::Control(kind) => write!(f, "{:?}", kind),
            KeySymbol::Unknown => write!(f, "unknown"),
        }
    }
}

static UNKNOWN: KeySymbol = KeySymbol::Unknown;

/// Immutable code → symbol table.
///
/// Built once at startup and shared by every worker. A replacement table
/// can be supplied from config without touching the expansion machine.
#[derive(Debug, Clone)]
pub struct KeySymbolTable {
    symbols: HashMap<u16, KeySymbol>,
}

impl KeySymbolTable {
    /// The built-in US-QWERTY table.
    pub fn us_qwerty() -> Self {
        Self::from_names(known_keys())
    }

    /// Build a table from `(code, name)` pairs, classifying each name once.
    ///
    /// Names that classify as `Unknown` are left out of the table.
    pub fn from_names<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u16, &'a str)>,
    {
        let symbols = pairs
            .into_iter()
            .map(|(code, name)| (code, KeySymbol::from_name(name)))
            .filter(|(_, symbol)| *symbol != KeySymbol::Unknown)
            .collect();
        Self { symbols }
    }

    /// Classify a key code. Codes outside the table are `Unknown`.
    pub fn lookup(&self, code: u16) -> &KeySymbol {
        self.symbols.get(&code).unwrap_or(&UNKNOWN)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl Default for KeySymbolTable {
    fn default() -> Self {
        Self::us_qwerty()
    }
}
