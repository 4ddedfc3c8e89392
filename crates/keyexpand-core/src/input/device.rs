// Keyexpand Input Layer - Device Streams
// Opening /dev/input/event* paths and reading raw frames from them

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// How long a device read waits before giving the worker a chance to
/// observe its stop token.
pub const POLL_TIMEOUT_MS: i32 = 100;

/// Device path could not be opened
#[derive(Debug, thiserror::Error)]
#[error("Failed to open input device {}: {source}", .path.display())]
pub struct DeviceOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Result of one read attempt on a frame source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were read into the buffer
    Read(usize),
    /// Nothing arrived within the poll timeout
    Idle,
}

/// A byte stream delivering one frame per read.
pub trait FrameSource: Send {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome>;

    /// Name the kernel reports for the device, if it has one.
    fn device_name(&self) -> Option<String> {
        None
    }
}

/// Opens a frame source for a configured device path.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, DeviceOpenError>;
}

impl<F> DeviceOpener for F
where
    F: Fn(&Path) -> Result<Box<dyn FrameSource>, DeviceOpenError> + Send + Sync,
{
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, DeviceOpenError> {
        self(path)
    }
}

/// An opened character device, read with `poll(2)` so reads time out.
#[derive(Debug)]
pub struct DeviceStream {
    file: File,
    timeout_ms: i32,
}

impl DeviceStream {
    pub fn open(path: &Path) -> Result<Self, DeviceOpenError> {
        let file = File::open(path).map_err(|source| DeviceOpenError {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            file,
            timeout_ms: POLL_TIMEOUT_MS,
        })
    }

    fn wait_readable(&self) -> io::Result<bool> {
        let mut poll_fd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        let poll_result = unsafe { libc::poll(&mut poll_fd, 1, self.timeout_ms) };

        if poll_result < 0 {
            let err = io::Error::last_os_error();
            // A signal interrupted the wait; treat it like a timeout so the
            // caller re-checks its stop token.
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }

        Ok(poll_result > 0)
    }
}

impl FrameSource for DeviceStream {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if !self.wait_readable()? {
            return Ok(ReadOutcome::Idle);
        }
        let n = self.file.read(buf)?;
        Ok(ReadOutcome::Read(n))
    }

    fn device_name(&self) -> Option<String> {
        let mut name = [0u8; DEVICE_NAME_LEN];
        let len = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                eviocgname(DEVICE_NAME_LEN) as _,
                name.as_mut_ptr(),
            )
        };
        if len <= 0 {
            return None;
        }

        let bytes = &name[..(len as usize).min(DEVICE_NAME_LEN)];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Some(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }
}

const DEVICE_NAME_LEN: usize = 256;

/// EVIOCGNAME(len) from linux/input.h: _IOC(_IOC_READ, 'E', 0x06, len)
const fn eviocgname(len: usize) -> u64 {
    (2 << 30) | ((len as u64) << 16) | ((b'E' as u64) << 8) | 0x06
}

/// Opens real device files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileOpener;

impl DeviceOpener for FileOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, DeviceOpenError> {
        Ok(Box::new(DeviceStream::open(path)?))
    }
}

/// Adapts any blocking reader into a frame source.
///
/// Every call blocks until the reader returns, so a worker reading from it
/// only observes a stop request between frames.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read + Send> FrameSource for ReaderSource<R> {
    fn read_frame(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        let n = self.reader.read(buf)?;
        Ok(ReadOutcome::Read(n))
    }
}

/// Default device list when none is configured: event0 through event7.
pub fn default_device_paths() -> Vec<PathBuf> {
    (0..8)
        .map(|i| PathBuf::from(format!("/dev/input/event{}", i)))
        .collect()
}

/// Device capabilities extracted from evdev device.capabilities()
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// List of supported key codes (EV_KEY capability codes)
    pub supported_keys: Vec<u16>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: Vec<u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys,
        }
    }

}

// QWERTY row key codes: Q, W, E, R, T, Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// Representative A-Z and SPACE codes for keyboard detection
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44]; // SPACE, A, Z

/// Determine if a device is a keyboard based on its capabilities.
///
/// A device is considered a keyboard if it supports EV_KEY and carries the
/// QWERTY row plus A, Z and SPACE.
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    if !capabilities.has_ev_key {
        return false;
    }

    let key_set: HashSet<u16> = capabilities.supported_keys.iter().copied().collect();

    QWERTY_CODES
        .iter()
        .chain(A_Z_SPACE_CODES)
        .all(|code| key_set.contains(code))
}

/// Virtual device name prefix, excluded from listings and monitoring to
/// avoid feedback.
pub const VIRT_DEVICE_PREFIX: &str = "Keyexpand (virtual)";

/// Check if a device name belongs to our own virtual keyboard.
pub fn is_virtual_device(name: &str) -> bool {
    name.contains(VIRT_DEVICE_PREFIX)
}

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub path: PathBuf,
}

/// List keyboard devices that can be passed as device paths.
#[cfg(feature = "uinput")]
pub fn list_keyboards() -> Vec<DeviceInfo> {
    evdev::enumerate()
        .filter_map(|(path, device)| {
            let name = device.name().unwrap_or("Unknown").to_string();
            if is_virtual_device(&name) {
                return None;
            }

            let has_ev_key = device.supported_events().contains(evdev::EventType::KEY);
            let supported_keys = device
                .supported_keys()
                .map(|keys| keys.iter().map(|k| k.code()).collect())
                .unwrap_or_default();

            is_keyboard(&DeviceCapabilities::new(has_ev_key, supported_keys))
                .then_some(DeviceInfo { name, path })
        })
        .collect()
}
