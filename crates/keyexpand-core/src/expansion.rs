// Keyexpand Expansion State Machine
// Per-device token reconstruction and trigger handling

use crate::state::SubstitutionLookup;
use crate::symbol::{ControlKind, KeySymbol, ModifierKind};

/// Erase-then-type request produced by a matched trigger.
///
/// Always executed as a unit by the output actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionAction {
    /// Backspaces to send: the token plus the trigger keystroke itself
    pub erase_count: usize,
    /// Text typed after erasing
    pub type_text: String,
}

/// What a single press did to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Printable text appended to the buffer
    Appended,
    /// Last character removed (or nothing to remove)
    Erased,
    /// Trigger matched an active entry
    Expand(ExpansionAction),
    /// Trigger without an active match; buffer cleared
    NoMatch,
    /// Modifier press, no effect on the buffer
    Modifier(ModifierKind),
    /// Code not in the symbol table
    Unknown,
}

impl Outcome {
    pub fn action(&self) -> Option<&ExpansionAction> {
        match self {
            Outcome::Expand(action) => Some(action),
            _ => None,
        }
    }
}

/// Token buffer for one device.
///
/// Fed only with key presses; never blocks and never fails.
#[derive(Debug, Default, Clone)]
pub struct ExpansionStateMachine {
    buffer: String,
}

impl ExpansionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Drop the in-progress token.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Apply one key press.
    pub fn feed(&mut self, symbol: &KeySymbol, table: &dyn SubstitutionLookup) -> Outcome {
        match symbol {
            KeySymbol::Modifier(kind) => Outcome::Modifier(*kind),
            KeySymbol::Control(ControlKind::Backspace) => {
                self.buffer.pop();
                Outcome::Erased
            }
            KeySymbol::Control(_) => self.trigger(table),
            KeySymbol::Printable(text) => {
                self.buffer.push_str(text);
                Outcome::Appended
            }
            KeySymbol::Unknown => Outcome::Unknown,
        }
    }

    fn trigger(&mut self, table: &dyn SubstitutionLookup) -> Outcome {
        let token = std::mem::take(&mut self.buffer);

        match table.lookup(&token) {
            Some(entry) if entry.active => Outcome::Expand(ExpansionAction {
                // +1 for the trigger keystroke already delivered to the target
                erase_count: token.chars().count() + 1,
                type_text: entry.description.clone(),
            }),
            _ => Outcome::NoMatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SubstitutionEntry, SubstitutionTable};
    use crate::symbol::KeySymbolTable;

    const SPACE: KeySymbol = KeySymbol::Control(ControlKind::Space);
    const ENTER: KeySymbol = KeySymbol::Control(ControlKind::Enter);
    const BACKSPACE: KeySymbol = KeySymbol::Control(ControlKind::Backspace);

    fn hello_table() -> SubstitutionTable {
        SubstitutionTable::from_entries([SubstitutionEntry::new("hello", "hi there!", true)])
            .unwrap()
    }

    fn type_str(machine: &mut ExpansionStateMachine, table: &SubstitutionTable, text: &str) {
        for ch in text.chars() {
            machine.feed(&KeySymbol::Printable(ch.to_string()), table);
        }
    }

    #[test]
    fn test_printables_concatenate() {
        let table = SubstitutionTable::new();
        let mut machine = ExpansionStateMachine::new();

        for ch in "a1;/*`".chars() {
            assert_eq!(
                machine.feed(&KeySymbol::Printable(ch.to_string()), &table),
                Outcome::Appended
            );
        }
        assert_eq!(machine.buffer(), "a1;/*`");
    }

    #[test]
    fn test_backspace_removes_last_char() {
        let table = SubstitutionTable::new();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hi");

        assert_eq!(machine.feed(&BACKSPACE, &table), Outcome::Erased);
        assert_eq!(machine.buffer(), "h");
    }

    #[test]
    fn test_backspace_on_empty_buffer_is_noop() {
        let table = SubstitutionTable::new();
        let mut machine = ExpansionStateMachine::new();

        assert_eq!(machine.feed(&BACKSPACE, &table), Outcome::Erased);
        assert_eq!(machine.buffer(), "");
    }

    #[test]
    fn test_trigger_with_active_match() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hello");

        let outcome = machine.feed(&SPACE, &table);
        assert_eq!(
            outcome,
            Outcome::Expand(ExpansionAction {
                erase_count: 6,
                type_text: "hi there!".to_string(),
            })
        );
        assert_eq!(machine.buffer(), "");
    }

    #[test]
    fn test_enter_also_triggers() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hello");

        let outcome = machine.feed(&ENTER, &table);
        assert_eq!(outcome.action().map(|a| a.erase_count), Some(6));
    }

    #[test]
    fn test_trigger_with_inactive_match() {
        let table =
            SubstitutionTable::from_entries([SubstitutionEntry::new("hello", "hi there!", false)])
                .unwrap();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hello");

        assert_eq!(machine.feed(&SPACE, &table), Outcome::NoMatch);
        assert_eq!(machine.buffer(), "");
    }

    #[test]
    fn test_trigger_without_match_clears_buffer() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hel");

        assert_eq!(machine.feed(&SPACE, &table), Outcome::NoMatch);
        assert_eq!(machine.buffer(), "");
    }

    #[test]
    fn test_trigger_on_empty_buffer() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        assert_eq!(machine.feed(&SPACE, &table), Outcome::NoMatch);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "Hello");
        assert_eq!(machine.feed(&SPACE, &table), Outcome::NoMatch);
    }

    #[test]
    fn test_modifiers_never_touch_buffer() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hel");

        for kind in [
            ModifierKind::Shift,
            ModifierKind::Ctrl,
            ModifierKind::Alt,
            ModifierKind::CapsLock,
            ModifierKind::Tab,
        ] {
            assert_eq!(
                machine.feed(&KeySymbol::Modifier(kind), &table),
                Outcome::Modifier(kind)
            );
        }
        assert_eq!(machine.buffer(), "hel");

        type_str(&mut machine, &table, "lo");
        assert!(machine.feed(&SPACE, &table).action().is_some());
    }

    #[test]
    fn test_unknown_is_ignored() {
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "he");

        assert_eq!(machine.feed(&KeySymbol::Unknown, &table), Outcome::Unknown);
        assert_eq!(machine.buffer(), "he");
    }

    #[test]
    fn test_escape_appends_its_name() {
        let symbols = KeySymbolTable::us_qwerty();
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();

        // h e l ESC l o SPACE
        let mut outcome = Outcome::Unknown;
        for code in [35, 18, 38, 1, 38, 24] {
            outcome = machine.feed(symbols.lookup(code), &table);
        }
        assert_eq!(outcome, Outcome::Appended);
        assert_eq!(machine.buffer(), "helESClo");
        assert_eq!(machine.feed(symbols.lookup(57), &table), Outcome::NoMatch);
    }

    #[test]
    fn test_escape_word_can_name_an_entry() {
        let symbols = KeySymbolTable::us_qwerty();
        let table =
            SubstitutionTable::from_entries([SubstitutionEntry::new("ESCq", "quit", true)])
                .unwrap();
        let mut machine = ExpansionStateMachine::new();

        for code in [1, 16] {
            machine.feed(symbols.lookup(code), &table);
        }
        let outcome = machine.feed(symbols.lookup(57), &table);
        assert_eq!(outcome.action().map(|a| a.erase_count), Some(5));
    }

    #[test]
    fn test_backspace_then_enter_scenario() {
        let table = SubstitutionTable::new();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "hi");

        machine.feed(&BACKSPACE, &table);
        assert_eq!(machine.buffer(), "h");

        assert_eq!(machine.feed(&ENTER, &table), Outcome::NoMatch);
        assert_eq!(machine.buffer(), "");
    }

    #[test]
    fn test_erase_count_counts_chars_not_bytes() {
        let table = SubstitutionTable::from_entries([SubstitutionEntry::new("ñu", "gnu", true)])
            .unwrap();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "ñu");

        let outcome = machine.feed(&SPACE, &table);
        assert_eq!(outcome.action().map(|a| a.erase_count), Some(3));
    }

    #[test]
    fn test_with_symbol_table_codes() {
        let symbols = KeySymbolTable::us_qwerty();
        let table = hello_table();
        let mut machine = ExpansionStateMachine::new();

        // h e l l o SPACE
        let mut outcome = Outcome::Unknown;
        for code in [35, 18, 38, 38, 24, 57] {
            outcome = machine.feed(symbols.lookup(code), &table);
        }
        assert_eq!(outcome.action().map(|a| a.type_text.as_str()), Some("hi there!"));
    }

    #[test]
    fn test_reset() {
        let table = SubstitutionTable::new();
        let mut machine = ExpansionStateMachine::new();
        type_str(&mut machine, &table, "abc");
        machine.reset();
        assert_eq!(machine.buffer(), "");
    }
}
