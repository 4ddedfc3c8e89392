// Keyexpand Output Actuator
// Single serialization point for keystroke emission across device workers

use parking_lot::Mutex;

use super::sink::{KeystrokeSink, OutputError};
use crate::expansion::ExpansionAction;

/// Executes expansion actions one at a time.
///
/// Shared by every device worker. The sink lock is held for the full
/// erase-then-type sequence, so two actions never interleave.
pub struct OutputActuator {
    sink: Mutex<Box<dyn KeystrokeSink>>,
}

impl OutputActuator {
    pub fn new<S: KeystrokeSink + 'static>(sink: S) -> Self {
        Self {
            sink: Mutex::new(Box::new(sink)),
        }
    }

    /// Erase `erase_count` characters, then type `type_text`.
    pub fn execute(&self, action: &ExpansionAction) -> Result<(), OutputError> {
        let mut sink = self.sink.lock();
        sink.erase_backward(action.erase_count)?;
        sink.type_text(&action.type_text)
    }
}

impl std::fmt::Debug for OutputActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputActuator").finish_non_exhaustive()
    }
}
