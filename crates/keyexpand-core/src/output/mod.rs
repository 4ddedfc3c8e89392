// Keyexpand Output Layer
// Serialized erase-and-type actions against the virtual keyboard

mod actuator;
mod sink;

#[cfg(feature = "uinput")]
mod uinput;

pub use actuator::OutputActuator;
pub use sink::{KeystrokeSink, OutputError};

#[cfg(feature = "uinput")]
pub use uinput::VirtualKeyboard;
