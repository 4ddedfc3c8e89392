// Keyexpand End-to-End Expansion Scenarios
//
// Raw input_event frames are fed through a full supervisor with an in-memory
// device and a recording sink. No hardware is required.
//
// Run with: cargo test --test expansion_scenarios

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use keyexpand_core::input::{EV_KEY, EV_SYN};
use keyexpand_core::key::{
    char_to_key, KEY_BACKSPACE, KEY_ENTER, KEY_ESC, KEY_LEFTSHIFT, KEY_SPACE,
};
use keyexpand_core::{
    DeviceOpenError, DeviceSupervisor, FrameLayout, FrameSource, KeySymbolTable, KeystrokeSink,
    OutputActuator, OutputError, ReaderSource, SubstitutionEntry, SubstitutionTable, WorkerError,
    WorkerExit, WorkerReport,
};

// =========================================================================
// Test Helpers
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Erase(usize),
    Type(String),
}

#[derive(Clone, Default)]
struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl KeystrokeSink for Recorder {
    fn erase_backward(&mut self, count: usize) -> Result<(), OutputError> {
        self.calls.lock().push(Call::Erase(count));
        Ok(())
    }

    fn type_text(&mut self, text: &str) -> Result<(), OutputError> {
        self.calls.lock().push(Call::Type(text.to_string()));
        Ok(())
    }
}

/// Builds the byte stream a keyboard would produce.
struct Script {
    layout: FrameLayout,
    bytes: Vec<u8>,
}

impl Script {
    fn new() -> Self {
        Self {
            layout: FrameLayout::native(),
            bytes: Vec::new(),
        }
    }

    fn event(mut self, event_type: u16, code: u16, value: i32) -> Self {
        let frame = self.layout.encode(event_type, code, value);
        self.bytes.extend_from_slice(&frame);
        self
    }

    /// Press and release with SYN reports, like a real keyboard.
    fn tap(self, code: u16) -> Self {
        self.event(EV_KEY, code, 1)
            .event(EV_SYN, 0, 0)
            .event(EV_KEY, code, 0)
            .event(EV_SYN, 0, 0)
    }

    fn type_str(self, text: &str) -> Self {
        text.chars().fold(self, |script, ch| {
            let (key, shift) = char_to_key(ch).expect("typeable test character");
            if shift {
                script
                    .event(EV_KEY, KEY_LEFTSHIFT, 1)
                    .tap(key.code())
                    .event(EV_KEY, KEY_LEFTSHIFT, 0)
            } else {
                script.tap(key.code())
            }
        })
    }
}

fn table(entries: &[(&str, &str, bool)]) -> Arc<SubstitutionTable> {
    Arc::new(
        SubstitutionTable::from_entries(
            entries
                .iter()
                .map(|(name, description, active)| SubstitutionEntry::new(*name, *description, *active)),
        )
        .unwrap(),
    )
}

/// Run one device through the supervisor until its stream ends.
fn run_script(script: Script, table: Arc<SubstitutionTable>) -> (Vec<Call>, WorkerReport) {
    let recorder = Recorder::default();
    let actuator = Arc::new(OutputActuator::new(recorder.clone()));
    let bytes = Arc::new(script.bytes);

    let opener = move |_path: &Path| -> Result<Box<dyn FrameSource>, DeviceOpenError> {
        Ok(Box::new(ReaderSource::new(Cursor::new(bytes.to_vec()))))
    };

    let mut supervisor = DeviceSupervisor::new(
        FrameLayout::native(),
        Arc::new(KeySymbolTable::us_qwerty()),
        table,
        actuator,
    )
    .with_opener(opener);

    assert_eq!(supervisor.start([PathBuf::from("/dev/input/test0")]), 1);
    let mut reports = supervisor.join();
    let calls = recorder.calls.lock().clone();
    (calls, reports.remove(0))
}

fn expansion(erase: usize, text: &str) -> Vec<Call> {
    vec![Call::Erase(erase), Call::Type(text.to_string())]
}

// =========================================================================
// Scenarios
// =========================================================================

#[test]
fn test_name_then_space_expands() {
    let script = Script::new().type_str("hello").tap(KEY_SPACE);
    let (calls, report) = run_script(script, table(&[("hello", "hi there!", true)]));

    assert_eq!(calls, expansion(6, "hi there!"));
    assert_eq!(report.stats.expansions, 1);
}

#[test]
fn test_name_then_enter_expands() {
    let script = Script::new().type_str("brb").tap(KEY_ENTER);
    let (calls, _) = run_script(script, table(&[("brb", "be right back", true)]));

    assert_eq!(calls, expansion(4, "be right back"));
}

#[test]
fn test_inactive_entry_is_silent() {
    let script = Script::new().type_str("sig").tap(KEY_SPACE);
    let (calls, report) = run_script(script, table(&[("sig", "Regards", false)]));

    assert!(calls.is_empty());
    assert_eq!(report.stats.expansions, 0);
}

#[test]
fn test_backspace_corrects_token() {
    let script = Script::new()
        .type_str("hellp")
        .tap(KEY_BACKSPACE)
        .type_str("o")
        .tap(KEY_SPACE);
    let (calls, _) = run_script(script, table(&[("hello", "hi", true)]));

    assert_eq!(calls, expansion(6, "hi"));
}

#[test]
fn test_modifiers_do_not_touch_token() {
    let script = Script::new()
        .type_str("he")
        .tap(KEY_LEFTSHIFT)
        .type_str("l")
        .tap(KEY_LEFTSHIFT)
        .type_str("lo")
        .tap(KEY_SPACE);
    let (calls, _) = run_script(script, table(&[("hello", "hi", true)]));

    assert_eq!(calls, expansion(6, "hi"));
}

#[test]
fn test_escape_breaks_token() {
    // ESC is typed into the token as the word "ESC"
    let script = Script::new()
        .type_str("hel")
        .tap(KEY_ESC)
        .type_str("lo")
        .tap(KEY_SPACE);
    let (calls, _) = run_script(script, table(&[("hello", "hi", true)]));
    assert!(calls.is_empty());

    let script = Script::new().tap(KEY_ESC).type_str("q").tap(KEY_SPACE);
    let (calls, _) = run_script(script, table(&[("ESCq", "quit", true)]));
    assert_eq!(calls, expansion(5, "quit"));
}

#[test]
fn test_unknown_codes_are_ignored() {
    let script = Script::new()
        .type_str("he")
        .tap(200)
        .type_str("llo")
        .tap(KEY_SPACE);
    let (calls, report) = run_script(script, table(&[("hello", "hi", true)]));

    assert_eq!(calls, expansion(6, "hi"));
    assert_eq!(report.stats.presses, 7);
}

#[test]
fn test_repeats_are_not_presses() {
    // Holding 'l' produces repeat events which must not add characters
    let (l, _) = char_to_key('l').unwrap();
    let script = Script::new()
        .type_str("hel")
        .event(EV_KEY, l.code(), 2)
        .event(EV_KEY, l.code(), 2)
        .type_str("lo")
        .tap(KEY_SPACE);
    let (calls, _) = run_script(script, table(&[("hello", "hi", true)]));

    assert_eq!(calls, expansion(6, "hi"));
}

#[test]
fn test_trigger_without_match_resets_token() {
    let script = Script::new()
        .type_str("say")
        .tap(KEY_SPACE)
        .type_str("hello")
        .tap(KEY_SPACE)
        .type_str("hellohello")
        .tap(KEY_SPACE);
    let (calls, report) = run_script(script, table(&[("hello", "hi", true)]));

    assert_eq!(calls, expansion(6, "hi"));
    assert_eq!(report.stats.expansions, 1);
}

#[test]
fn test_match_is_case_sensitive() {
    let script = Script::new()
        .type_str("Hello")
        .tap(KEY_SPACE);
    let (calls, _) = run_script(script, table(&[("hello", "hi", true)]));

    // Shift is a modifier: the token is still lowercase "hello"
    assert_eq!(calls, expansion(6, "hi"));

    let (calls, _) = run_script(
        Script::new().type_str("hello").tap(KEY_SPACE),
        table(&[("Hello", "hi", true)]),
    );
    assert!(calls.is_empty());
}

#[test]
fn test_repeated_expansions_on_one_device() {
    let script = Script::new()
        .type_str("aa")
        .tap(KEY_SPACE)
        .type_str("bb")
        .tap(KEY_ENTER)
        .type_str("aa")
        .tap(KEY_SPACE);
    let (calls, report) = run_script(
        script,
        table(&[("aa", "alpha", true), ("bb", "beta", true)]),
    );

    let mut expected = expansion(3, "alpha");
    expected.extend(expansion(3, "beta"));
    expected.extend(expansion(3, "alpha"));
    assert_eq!(calls, expected);
    assert_eq!(report.stats.expansions, 3);
}

#[test]
fn test_end_of_stream_ends_worker() {
    let (_, report) = run_script(Script::new().type_str("abc"), table(&[]));

    match report.exit {
        WorkerExit::Failed(WorkerError::Read(e)) => {
            assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof)
        }
        other => panic!("unexpected exit: {:?}", other),
    }
    assert_eq!(report.restarts, 0);
}
