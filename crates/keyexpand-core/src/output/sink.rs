// Keyexpand Output Sink
// Keystroke injection capability consumed by the actuator

/// Error types for output operations
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),

    #[error("Cannot type character {0:?}")]
    UnsupportedChar(char),
}

/// OS input-injection facility.
///
/// Only ever driven through [`OutputActuator::execute`](super::OutputActuator::execute),
/// which holds exclusive access for a whole erase/type pair.
pub trait KeystrokeSink: Send {
    /// Send `count` backward-delete keystrokes.
    fn erase_backward(&mut self, count: usize) -> Result<(), OutputError>;

    /// Type `text` into the focused target.
    fn type_text(&mut self, text: &str) -> Result<(), OutputError>;
}

impl<S: KeystrokeSink + ?Sized> KeystrokeSink for Box<S> {
    fn erase_backward(&mut self, count: usize) -> Result<(), OutputError> {
        (**self).erase_backward(count)
    }

    fn type_text(&mut self, text: &str) -> Result<(), OutputError> {
        (**self).type_text(text)
    }
}
