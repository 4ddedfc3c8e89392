// Keyexpand Core Library
// Keystroke-driven text expansion across multiple input devices

pub mod config;
pub mod expansion;
pub mod input;
pub mod key;
pub mod key_state;
pub mod output;
pub mod state;
pub mod supervisor;
pub mod symbol;

pub use config::{Config, ConfigError};
pub use expansion::{ExpansionAction, ExpansionStateMachine, Outcome};
pub use input::{
    default_device_paths, is_key_event, is_keyboard, DecodeError, DeviceCapabilities,
    DeviceOpenError, DeviceOpener, FileOpener, FrameLayout, FrameSource, RawEventFrame,
    ReadOutcome, ReaderSource,
};
pub use key::KeyCode;
pub use key_state::KeyState;
pub use output::{KeystrokeSink, OutputActuator, OutputError};
pub use state::{EntryError, SubstitutionEntry, SubstitutionLookup, SubstitutionTable};
pub use supervisor::{
    Backoff, DeviceSupervisor, RestartPolicy, StopToken, WorkerError, WorkerExit, WorkerReport,
    WorkerStats,
};
pub use symbol::{ControlKind, KeySymbol, KeySymbolTable, ModifierKind};

#[cfg(feature = "uinput")]
pub use output::VirtualKeyboard;
