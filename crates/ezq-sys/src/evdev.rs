// evdev.rs -- raw mouse input from a Linux event device
//
// `-mevdev <device>` reads unaccelerated motion and buttons straight from
// the kernel. With `-mmt` a dedicated thread does blocking reads; otherwise
// the device is non-blocking and polled from the event pump. Motion goes
// into the shared accumulator, button and wheel events are queued for the
// main thread.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};
use thiserror::Error;

use ezq_common::common::com_printf;
use ezq_common::keys::*;

use crate::in_mouse::SharedMouse;

pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_WHEEL: u16 = 0x08;

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_SIDE: u16 = 0x113;
pub const BTN_EXTRA: u16 = 0x114;
pub const BTN_FORWARD: u16 = 0x115;
pub const BTN_BACK: u16 = 0x116;
pub const BTN_LOGITECH8: u16 = 0x117;

/// Pending button events the main thread has not consumed yet.
const KEY_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum EvdevError {
    #[error("Evdev error: open {device} failed: {source}")]
    Open { device: String, source: io::Error },
    #[error("short read ({0} bytes)")]
    ShortRead(usize),
    #[error("read failed: {0}")]
    Read(#[from] io::Error),
}

/// One `struct input_event`, minus the timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    const TIME_SIZE: usize = std::mem::size_of::<libc::timeval>();
    pub const SIZE: usize = Self::TIME_SIZE + 8;

    /// Decode a native-endian event record.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        let rest = buf.get(Self::TIME_SIZE..Self::SIZE)?;
        Some(Self {
            kind: u16::from_ne_bytes([rest[0], rest[1]]),
            code: u16::from_ne_bytes([rest[2], rest[3]]),
            value: i32::from_ne_bytes([rest[4], rest[5], rest[6], rest[7]]),
        })
    }
}

fn button_key(code: u16) -> Option<i32> {
    Some(match code {
        BTN_LEFT => K_MOUSE1,
        BTN_RIGHT => K_MOUSE2,
        BTN_MIDDLE => K_MOUSE3,
        BTN_SIDE => K_MOUSE4,
        BTN_EXTRA => K_MOUSE5,
        BTN_FORWARD => K_MOUSE6,
        BTN_BACK => K_MOUSE7,
        BTN_LOGITECH8 => K_MOUSE8,
        _ => return None,
    })
}

/// State shared between the reader and the main thread.
pub struct EvdevShared {
    pub accum: SharedMouse,
    /// The window is iconified; samples are discarded.
    pub minimized: AtomicBool,
    /// `_windowed_mouse` is on; samples are discarded otherwise.
    pub windowed_mouse: AtomicBool,
    /// Cleared when the device fails.
    pub active: AtomicBool,
    keys: Sender<(i32, bool)>,
}

impl EvdevShared {
    fn accepting(&self) -> bool {
        !self.minimized.load(Ordering::Relaxed) && self.windowed_mouse.load(Ordering::Relaxed)
    }

    fn key(&self, key: i32, down: bool) {
        // a full queue drops the event
        let _ = self.keys.try_send((key, down));
    }

    pub fn handle(&self, ev: &InputEvent) {
        match (ev.kind, ev.code) {
            (EV_REL, REL_X) => self.accum.lock().add(ev.value as f32, 0.0),
            (EV_REL, REL_Y) => self.accum.lock().add(0.0, ev.value as f32),
            (EV_REL, REL_WHEEL) => {
                let key = match ev.value {
                    1 => K_MWHEELUP,
                    -1 => K_MWHEELDOWN,
                    _ => return,
                };
                self.key(key, true);
                self.key(key, false);
            }
            (EV_KEY, code) => {
                if let Some(key) = button_key(code) {
                    self.key(key, ev.value != 0);
                }
            }
            _ => {}
        }
    }
}

/// Read records until the source would block, ends, or fails.
pub fn read_events<R: Read>(src: &mut R, shared: &EvdevShared, threaded: bool) -> Result<(), EvdevError> {
    let mut buf = [0u8; InputEvent::SIZE];

    loop {
        let n = match src.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        if !shared.active.load(Ordering::Relaxed) {
            return Ok(());
        }
        if !shared.accepting() {
            if threaded {
                thread::sleep(Duration::from_millis(10));
            }
            continue;
        }

        if n < InputEvent::SIZE {
            return Err(EvdevError::ShortRead(n));
        }
        if let Some(ev) = InputEvent::parse(&buf) {
            shared.handle(&ev);
        }
    }
}

fn report_failure(device: &str, err: &EvdevError) {
    tracing::warn!(device, error = %err, "evdev reader stopped");
    com_printf(&format!("Error reading from {}\nReverting to standard mouse input\n", device));
}

fn open_device(device: &str, nonblocking: bool) -> Result<File, EvdevError> {
    let mut opts = OpenOptions::new();
    opts.read(true);
    if nonblocking {
        opts.custom_flags(libc::O_NONBLOCK);
    }
    opts.open(device).map_err(|source| EvdevError::Open { device: device.to_string(), source })
}

/// An open raw mouse device.
pub struct EvdevMouse {
    device: String,
    shared: Arc<EvdevShared>,
    keys: Receiver<(i32, bool)>,
    /// Polled from the pump when no reader thread runs.
    file: Option<File>,
    thread: Option<JoinHandle<()>>,
}

impl EvdevMouse {
    pub fn open(device: &str, threaded: bool, accum: SharedMouse) -> Result<Self, EvdevError> {
        let (tx, rx) = bounded(KEY_QUEUE_CAPACITY);
        let shared = Arc::new(EvdevShared {
            accum,
            minimized: AtomicBool::new(false),
            windowed_mouse: AtomicBool::new(true),
            active: AtomicBool::new(true),
            keys: tx,
        });

        let mut mouse = Self { device: device.to_string(), shared, keys: rx, file: None, thread: None };

        if threaded {
            let mut file = open_device(device, false)?;
            let shared = Arc::clone(&mouse.shared);
            let name = device.to_string();
            let spawned = thread::Builder::new().name("evdev-mouse".into()).spawn(move || {
                if let Err(e) = read_events(&mut file, &shared, true) {
                    report_failure(&name, &e);
                }
                shared.active.store(false, Ordering::Relaxed);
            });
            match spawned {
                Ok(handle) => {
                    com_printf("Multithreaded mouse input enabled\n");
                    mouse.thread = Some(handle);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "evdev thread spawn failed");
                    com_printf("Evdev error creating thread\n");
                    mouse.file = Some(open_device(device, true)?);
                }
            }
        } else {
            mouse.file = Some(open_device(device, true)?);
        }

        com_printf(&format!("Evdev {} enabled\n", device));
        Ok(mouse)
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Relaxed)
    }

    pub fn is_threaded(&self) -> bool {
        self.thread.is_some()
    }

    pub fn shared(&self) -> &EvdevShared {
        &self.shared
    }

    pub fn set_minimized(&self, minimized: bool) {
        self.shared.minimized.store(minimized, Ordering::Relaxed);
    }

    pub fn set_windowed_mouse(&self, on: bool) {
        self.shared.windowed_mouse.store(on, Ordering::Relaxed);
    }

    /// Non-threaded mode: read whatever the device has queued.
    pub fn poll(&mut self) {
        if !self.is_active() {
            return;
        }
        let Some(file) = self.file.as_mut() else {
            return;
        };
        if let Err(e) = read_events(file, &self.shared, false) {
            report_failure(&self.device, &e);
            self.stop();
        }
    }

    /// Queued button and wheel events, oldest first.
    pub fn drain_keys(&self) -> Vec<(i32, bool)> {
        self.keys.try_iter().collect()
    }

    /// Close the device. A blocked reader thread exits after its next sample.
    pub fn stop(&mut self) {
        self.shared.active.store(false, Ordering::Relaxed);
        self.shared.windowed_mouse.store(false, Ordering::Relaxed);
        self.file = None;
        self.thread = None;
    }
}

impl Drop for EvdevMouse {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_mouse::{new_shared_mouse, MouseAccum};
    use std::io::Cursor;

    fn record(kind: u16, code: u16, value: i32) -> Vec<u8> {
        let mut v = vec![0u8; InputEvent::TIME_SIZE];
        v.extend_from_slice(&kind.to_ne_bytes());
        v.extend_from_slice(&code.to_ne_bytes());
        v.extend_from_slice(&value.to_ne_bytes());
        v
    }

    fn shared() -> (EvdevShared, Receiver<(i32, bool)>) {
        let (tx, rx) = bounded(KEY_QUEUE_CAPACITY);
        let s = EvdevShared {
            accum: new_shared_mouse(),
            minimized: AtomicBool::new(false),
            windowed_mouse: AtomicBool::new(true),
            active: AtomicBool::new(true),
            keys: tx,
        };
        (s, rx)
    }

    #[test]
    fn test_parse_record() {
        let buf = record(EV_REL, REL_Y, -7);
        assert_eq!(buf.len(), InputEvent::SIZE);
        assert_eq!(InputEvent::parse(&buf), Some(InputEvent { kind: EV_REL, code: REL_Y, value: -7 }));
        assert_eq!(InputEvent::parse(&buf[..InputEvent::SIZE - 1]), None);
    }

    #[test]
    fn test_motion_and_buttons() {
        let (s, rx) = shared();
        let mut data = Vec::new();
        data.extend(record(EV_REL, REL_X, 5));
        data.extend(record(EV_REL, REL_Y, -3));
        data.extend(record(EV_REL, REL_X, 2));
        data.extend(record(EV_KEY, BTN_RIGHT, 1));
        data.extend(record(EV_KEY, BTN_LOGITECH8, 0));
        data.extend(record(EV_REL, REL_WHEEL, -1));
        data.extend(record(EV_REL, REL_WHEEL, 3));
        data.extend(record(EV_KEY, 0x120, 1));

        read_events(&mut Cursor::new(data), &s, false).unwrap();

        assert_eq!(*s.accum.lock(), MouseAccum { x: 7.0, y: -3.0 });
        let keys: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            keys,
            [(K_MOUSE2, true), (K_MOUSE8, false), (K_MWHEELDOWN, true), (K_MWHEELDOWN, false)]
        );
    }

    #[test]
    fn test_samples_dropped_while_minimized() {
        let (s, rx) = shared();
        s.minimized.store(true, Ordering::Relaxed);
        let mut data = record(EV_REL, REL_X, 5);
        data.extend(record(EV_KEY, BTN_LEFT, 1));

        read_events(&mut Cursor::new(data), &s, false).unwrap();
        assert_eq!(*s.accum.lock(), MouseAccum::default());
        assert!(rx.try_iter().next().is_none());

        s.minimized.store(false, Ordering::Relaxed);
        s.windowed_mouse.store(false, Ordering::Relaxed);
        read_events(&mut Cursor::new(record(EV_REL, REL_X, 5)), &s, false).unwrap();
        assert_eq!(*s.accum.lock(), MouseAccum::default());
    }

    #[test]
    fn test_stopped_reader_returns() {
        let (s, rx) = shared();
        s.active.store(false, Ordering::Relaxed);
        let mut data = record(EV_REL, REL_X, 5);
        data.extend(record(EV_KEY, BTN_LEFT, 1));

        read_events(&mut Cursor::new(data), &s, true).unwrap();
        assert_eq!(*s.accum.lock(), MouseAccum::default());
        assert!(rx.try_iter().next().is_none());
    }

    #[test]
    fn test_short_read_is_an_error() {
        let (s, _rx) = shared();
        let data = record(EV_REL, REL_X, 5);
        let err = read_events(&mut Cursor::new(&data[..10]), &s, false).unwrap_err();
        assert!(matches!(err, EvdevError::ShortRead(10)));
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device unplugged"))
        }
    }

    struct WouldBlock;

    impl Read for WouldBlock {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::ErrorKind::WouldBlock.into())
        }
    }

    #[test]
    fn test_read_errors() {
        let (s, _rx) = shared();
        assert!(matches!(read_events(&mut Failing, &s, false), Err(EvdevError::Read(_))));
        assert!(read_events(&mut WouldBlock, &s, false).is_ok());
    }

    #[test]
    fn test_open_missing_device() {
        let err = EvdevMouse::open("/nonexistent/event-device", false, new_shared_mouse());
        assert!(matches!(err, Err(EvdevError::Open { .. })));
    }
}
