// Keyexpand Input Layer
// Frame decoding and device stream access

mod device;
mod event;
mod frame;

#[cfg(feature = "uinput")]
pub use device::list_keyboards;
pub use device::{
    default_device_paths, is_keyboard, is_virtual_device, DeviceCapabilities, DeviceInfo,
    DeviceOpenError, DeviceOpener, DeviceStream, FileOpener, FrameSource, ReadOutcome,
    ReaderSource, POLL_TIMEOUT_MS, VIRT_DEVICE_PREFIX,
};
pub use event::{is_key_event, EV_KEY, EV_SYN};
pub use frame::{DecodeError, FrameLayout, RawEventFrame, FRAME_TAIL_SIZE};
