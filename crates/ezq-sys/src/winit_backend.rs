// winit_backend.rs -- DisplayBackend on top of winit
//
// winit has no hardware gamma, no video-sync extension and cannot add
// display modes, so those primitives report "unavailable" and the adapter
// falls back accordingly.

use std::collections::VecDeque;
use std::time::Duration;

use raw_window_handle::HasWindowHandle;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{DeviceEvent, DeviceId, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, KeyLocation, NamedKey};
use winit::monitor::{MonitorHandle, VideoModeHandle};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowAttributes, WindowId};

use crate::backend::*;

/// How long the first pump may wait for the event loop to resume.
const PROBE_TIMEOUT: Duration = Duration::from_millis(100);

pub struct WinitBackend {
    event_loop: Option<EventLoop<()>>,
    window: Option<Window>,
    monitor: Option<MonitorHandle>,
    /// Offered modes; the desktop mode is first and has no handle.
    modes: Vec<(DisplayMode, Option<VideoModeHandle>)>,
    /// Mode requested before the window exists.
    pending_mode: Option<DisplayMode>,
    context: bool,
    events: VecDeque<PlatformEvent>,
    motion_masked: bool,
    /// Where a masked warp put the pointer; the matching motion is dropped.
    warp_target: Option<(i32, i32)>,
}

impl WinitBackend {
    /// Connect to the window system and learn the primary monitor's modes.
    pub fn open() -> Result<Self, VidError> {
        let event_loop = EventLoop::new().map_err(|e| VidError::DisplayOpen(e.to_string()))?;

        let mut backend = Self {
            event_loop: Some(event_loop),
            window: None,
            monitor: None,
            modes: Vec::new(),
            pending_mode: None,
            context: false,
            events: VecDeque::new(),
            motion_masked: false,
            warp_target: None,
        };

        // resumed() fires on the first pump and records the monitor
        backend.pump(PROBE_TIMEOUT);
        if backend.monitor.is_none() {
            return Err(VidError::DisplayOpen("no monitor found".to_string()));
        }
        Ok(backend)
    }

    fn pump(&mut self, timeout: Duration) {
        if let Some(mut el) = self.event_loop.take() {
            let status = el.pump_app_events(Some(timeout), self);
            self.event_loop = Some(el);
            if matches!(status, PumpStatus::Exit(_)) {
                self.events.push_back(PlatformEvent::CloseRequested);
            }
        }
    }

    fn record_monitor(&mut self, monitor: MonitorHandle) {
        let size = monitor.size();
        let desktop = DisplayMode {
            width: size.width,
            height: size.height,
            refresh_mhz: monitor.refresh_rate_millihertz().unwrap_or(0),
        };

        self.modes.clear();
        self.modes.push((desktop, None));
        for handle in monitor.video_modes() {
            let size = handle.size();
            let mode = DisplayMode {
                width: size.width,
                height: size.height,
                refresh_mhz: handle.refresh_rate_millihertz(),
            };
            if !self.modes.iter().any(|(m, _)| *m == mode) {
                self.modes.push((mode, Some(handle)));
            }
        }
        tracing::debug!(modes = self.modes.len(), "monitor {:?}", monitor.name());
        self.monitor = Some(monitor);
    }

    /// `None` is the desktop mode (leave exclusive fullscreen).
    fn fullscreen_for(&self, mode: &DisplayMode) -> Option<Fullscreen> {
        self.modes
            .iter()
            .find(|(m, _)| m == mode)
            .and_then(|(_, handle)| handle.clone())
            .map(Fullscreen::Exclusive)
    }
}

impl DisplayBackend for WinitBackend {
    fn choose_visual(&mut self, req: &VisualRequest) -> Option<Visual> {
        let color_bits = self
            .modes
            .iter()
            .filter_map(|(_, h)| h.as_ref())
            .map(|h| h.bit_depth().min(u8::MAX as u16) as u8)
            .max()
            .unwrap_or(24);

        let visual = Visual { color_bits, depth_bits: 24 };
        let wanted = req.red_bits as u32 + req.green_bits as u32 + req.blue_bits as u32;
        let ok = color_bits as u32 >= wanted && visual.depth_bits >= req.depth_bits && req.double_buffer;
        ok.then_some(visual)
    }

    fn desktop_size(&self) -> (u32, u32) {
        self.modes.first().map_or((0, 0), |(m, _)| (m.width, m.height))
    }

    fn video_modes(&self) -> Vec<DisplayMode> {
        self.modes.iter().map(|(m, _)| *m).collect()
    }

    fn validate_mode(&self, mode: &DisplayMode) -> bool {
        self.modes.iter().any(|(m, _)| m == mode)
    }

    fn add_mode(&mut self, mode: &DisplayMode) {
        // only offered modes validate, so there is nothing to add
        tracing::debug!(?mode, "add_mode ignored");
    }

    fn delete_mode(&mut self, mode: &DisplayMode) {
        tracing::debug!(?mode, "delete_mode ignored");
    }

    fn switch_mode(&mut self, mode: &DisplayMode) -> bool {
        if !self.validate_mode(mode) {
            return false;
        }
        let fullscreen = self.fullscreen_for(mode);
        match self.window.as_ref() {
            Some(window) => window.set_fullscreen(fullscreen),
            None => self.pending_mode = Some(*mode),
        }
        true
    }

    fn set_viewport(&mut self, _x: i32, _y: i32) {}

    fn create_window(&mut self, params: &WindowParams) -> Result<(), VidError> {
        let Some(event_loop) = self.event_loop.as_ref() else {
            return Err(VidError::Window("display closed".to_string()));
        };

        let mut attrs = WindowAttributes::default()
            .with_title(params.title.clone())
            .with_inner_size(PhysicalSize::new(params.width, params.height));

        if params.fullscreen {
            let fullscreen = match self.pending_mode.take() {
                Some(mode) => self.fullscreen_for(&mode),
                None => None,
            };
            attrs = attrs.with_fullscreen(fullscreen.or(Some(Fullscreen::Borderless(None))));
        }

        #[allow(deprecated)]
        let window = event_loop.create_window(attrs).map_err(|e| VidError::Window(e.to_string()))?;
        self.window = Some(window);

        // winit reports no initial map; the window is viewable once created
        self.events.push_back(PlatformEvent::Map);
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        if let Some(window) = self.window.as_ref() {
            window.set_title(title);
        }
    }

    fn hide_cursor(&mut self) {
        if let Some(window) = self.window.as_ref() {
            window.set_cursor_visible(false);
        }
    }

    fn create_context(&mut self, _visual: &Visual) -> Result<(), VidError> {
        let window = self.window.as_ref().ok_or_else(|| VidError::Context("no window".to_string()))?;
        window.window_handle().map_err(|e| VidError::Context(e.to_string()))?;
        self.context = true;
        Ok(())
    }

    fn destroy_context(&mut self) {
        self.context = false;
    }

    fn destroy_window(&mut self) {
        self.window = None;
    }

    fn grab_pointer(&mut self) {
        if let Some(window) = self.window.as_ref() {
            if window.set_cursor_grab(CursorGrabMode::Confined).is_err() {
                // Fall back to locked mode (macOS)
                let _ = window.set_cursor_grab(CursorGrabMode::Locked);
            }
        }
    }

    fn ungrab_pointer(&mut self) {
        if let Some(window) = self.window.as_ref() {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
        }
    }

    // winit has no keyboard grab; a focused window already gets every key
    fn grab_keyboard(&mut self) {}

    fn ungrab_keyboard(&mut self) {}

    fn warp_pointer(&mut self, x: i32, y: i32) {
        if let Some(window) = self.window.as_ref() {
            if window.set_cursor_position(PhysicalPosition::new(x, y)).is_ok() && self.motion_masked {
                self.warp_target = Some((x, y));
            }
        }
    }

    fn set_motion_events(&mut self, enabled: bool) {
        self.motion_masked = !enabled;
    }

    fn iconify(&mut self) {
        if let Some(window) = self.window.as_ref() {
            window.set_minimized(true);
        }
    }

    fn gamma_ramp_size(&self) -> usize {
        0
    }

    fn get_gamma_ramp(&self) -> Option<GammaRamp> {
        None
    }

    fn set_gamma_ramp(&mut self, _ramp: &GammaRamp) {}

    fn extensions(&self) -> String {
        String::new()
    }

    fn wait_video_sync(&mut self) {}

    fn flush(&mut self) {}

    fn swap_buffers(&mut self) {
        if !self.context {
            return;
        }
        if let Some(window) = self.window.as_ref() {
            window.pre_present_notify();
        }
    }

    fn dispatch_pending(&mut self) {
        self.pump(Duration::ZERO);
    }

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.events.pop_front()
    }

    fn close(&mut self) {
        self.window = None;
        self.event_loop = None;
        self.events.clear();
    }
}

impl ApplicationHandler for WinitBackend {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.monitor.is_some() {
            return;
        }
        if let Some(monitor) = event_loop.primary_monitor().or_else(|| event_loop.available_monitors().next()) {
            self.record_monitor(monitor);
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.events.push_back(PlatformEvent::CloseRequested),

            WindowEvent::KeyboardInput { event, .. } => {
                let sym = keysym_for(&event.logical_key, event.location);
                let pressed = event.state == ElementState::Pressed;
                self.events.push_back(PlatformEvent::Key { sym, pressed });
            }

            WindowEvent::CursorMoved { position, .. } => {
                let pos = (position.x as i32, position.y as i32);
                if self.warp_target == Some(pos) {
                    self.warp_target = None;
                    return;
                }
                self.events.push_back(PlatformEvent::Motion { x: pos.0, y: pos.1 });
            }

            WindowEvent::MouseInput { state, button, .. } => {
                let index = match button {
                    MouseButton::Left => 1,
                    MouseButton::Middle => 2,
                    MouseButton::Right => 3,
                    _ => return,
                };
                let pressed = state == ElementState::Pressed;
                self.events.push_back(PlatformEvent::Button { index, pressed });
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                if let Some(index) = wheel_button(y) {
                    self.events.push_back(PlatformEvent::Button { index, pressed: true });
                    self.events.push_back(PlatformEvent::Button { index, pressed: false });
                }
            }

            WindowEvent::Occluded(true) => self.events.push_back(PlatformEvent::Unmap),
            WindowEvent::Occluded(false) => self.events.push_back(PlatformEvent::Map),

            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.events.push_back(PlatformEvent::RawMotion { dx: delta.0 as i32, dy: delta.1 as i32 });
        }
    }
}

/// Wheel notches arrive as a press and release of button 4 (up) or 5 (down).
fn wheel_button(y: f32) -> Option<u8> {
    if y > 0.0 {
        Some(4)
    } else if y < 0.0 {
        Some(5)
    } else {
        None
    }
}

fn keysym_for(key: &Key, location: KeyLocation) -> KeySym {
    let numpad = location == KeyLocation::Numpad;
    let right = location == KeyLocation::Right;

    match key {
        Key::Named(named) => {
            let sym = match named {
                NamedKey::ScrollLock => NamedSym::ScrollLock,
                NamedKey::CapsLock => NamedSym::CapsLock,
                NamedKey::NumLock => NamedSym::NumLock,
                NamedKey::PageUp if numpad => NamedSym::KpPageUp,
                NamedKey::PageUp => NamedSym::PageUp,
                NamedKey::PageDown if numpad => NamedSym::KpPageDown,
                NamedKey::PageDown => NamedSym::PageDown,
                NamedKey::Home if numpad => NamedSym::KpHome,
                NamedKey::Home => NamedSym::Home,
                NamedKey::End if numpad => NamedSym::KpEnd,
                NamedKey::End => NamedSym::End,
                NamedKey::ArrowLeft if numpad => NamedSym::KpLeft,
                NamedKey::ArrowLeft => NamedSym::Left,
                NamedKey::ArrowRight if numpad => NamedSym::KpRight,
                NamedKey::ArrowRight => NamedSym::Right,
                NamedKey::ArrowUp if numpad => NamedSym::KpUp,
                NamedKey::ArrowUp => NamedSym::Up,
                NamedKey::ArrowDown if numpad => NamedSym::KpDown,
                NamedKey::ArrowDown => NamedSym::Down,
                NamedKey::Insert if numpad => NamedSym::KpInsert,
                NamedKey::Insert => NamedSym::Insert,
                NamedKey::Delete if numpad => NamedSym::KpDelete,
                NamedKey::Delete => NamedSym::Delete,
                NamedKey::Enter if numpad => NamedSym::KpEnter,
                NamedKey::Enter => NamedSym::Return,
                NamedKey::Clear if numpad => NamedSym::KpBegin,
                NamedKey::Escape => NamedSym::Escape,
                NamedKey::Tab => NamedSym::Tab,
                NamedKey::Backspace => NamedSym::BackSpace,
                NamedKey::Pause => NamedSym::Pause,
                NamedKey::Execute => NamedSym::Execute,
                NamedKey::Shift if right => NamedSym::ShiftR,
                NamedKey::Shift => NamedSym::ShiftL,
                NamedKey::Control if right => NamedSym::ControlR,
                NamedKey::Control => NamedSym::ControlL,
                NamedKey::Alt if right => NamedSym::AltR,
                NamedKey::Alt => NamedSym::AltL,
                NamedKey::AltGraph => NamedSym::AltR,
                NamedKey::Meta if right => NamedSym::MetaR,
                NamedKey::Meta => NamedSym::MetaL,
                NamedKey::Super if right => NamedSym::SuperR,
                NamedKey::Super => NamedSym::SuperL,
                NamedKey::ContextMenu => NamedSym::Menu,
                NamedKey::Space => return KeySym::Char(' '),
                f => match function_key(f) {
                    Some(n) => NamedSym::F(n),
                    None => return KeySym::Unknown,
                },
            };
            KeySym::Named(sym)
        }

        Key::Character(text) => {
            let mut chars = text.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return KeySym::Unknown;
            };
            if numpad {
                let kp = match c {
                    '*' => Some(NamedSym::KpMultiply),
                    '+' => Some(NamedSym::KpAdd),
                    '-' => Some(NamedSym::KpSubtract),
                    '/' => Some(NamedSym::KpDivide),
                    _ => None,
                };
                if let Some(sym) = kp {
                    return KeySym::Named(sym);
                }
            }
            KeySym::Char(c)
        }

        _ => KeySym::Unknown,
    }
}

fn function_key(key: &NamedKey) -> Option<u8> {
    let n = match key {
        NamedKey::F1 => 1,
        NamedKey::F2 => 2,
        NamedKey::F3 => 3,
        NamedKey::F4 => 4,
        NamedKey::F5 => 5,
        NamedKey::F6 => 6,
        NamedKey::F7 => 7,
        NamedKey::F8 => 8,
        NamedKey::F9 => 9,
        NamedKey::F10 => 10,
        NamedKey::F11 => 11,
        NamedKey::F12 => 12,
        _ => return None,
    };
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(key: NamedKey, location: KeyLocation) -> KeySym {
        keysym_for(&Key::Named(key), location)
    }

    #[test]
    fn test_sided_modifiers() {
        assert_eq!(named(NamedKey::Control, KeyLocation::Left), KeySym::Named(NamedSym::ControlL));
        assert_eq!(named(NamedKey::Control, KeyLocation::Right), KeySym::Named(NamedSym::ControlR));
        assert_eq!(named(NamedKey::Shift, KeyLocation::Right), KeySym::Named(NamedSym::ShiftR));
        assert_eq!(named(NamedKey::Alt, KeyLocation::Left), KeySym::Named(NamedSym::AltL));
    }

    #[test]
    fn test_numpad_keys_are_distinct() {
        assert_eq!(named(NamedKey::Enter, KeyLocation::Numpad), KeySym::Named(NamedSym::KpEnter));
        assert_eq!(named(NamedKey::Enter, KeyLocation::Standard), KeySym::Named(NamedSym::Return));
        assert_eq!(named(NamedKey::ArrowUp, KeyLocation::Numpad), KeySym::Named(NamedSym::KpUp));
        assert_eq!(named(NamedKey::Clear, KeyLocation::Numpad), KeySym::Named(NamedSym::KpBegin));
        assert_eq!(keysym_for(&Key::Character("*".into()), KeyLocation::Numpad), KeySym::Named(NamedSym::KpMultiply));
        assert_eq!(keysym_for(&Key::Character("*".into()), KeyLocation::Standard), KeySym::Char('*'));
    }

    #[test]
    fn test_function_and_character_keys() {
        assert_eq!(named(NamedKey::F11, KeyLocation::Standard), KeySym::Named(NamedSym::F(11)));
        assert_eq!(named(NamedKey::F13, KeyLocation::Standard), KeySym::Unknown);
        assert_eq!(named(NamedKey::Space, KeyLocation::Standard), KeySym::Char(' '));
        assert_eq!(keysym_for(&Key::Character("Q".into()), KeyLocation::Standard), KeySym::Char('Q'));
        // composed sequences have no single symbol
        assert_eq!(keysym_for(&Key::Character("ab".into()), KeyLocation::Standard), KeySym::Unknown);
    }

    #[test]
    fn test_wheel_direction() {
        assert_eq!(wheel_button(1.0), Some(4));
        assert_eq!(wheel_button(-0.5), Some(5));
        assert_eq!(wheel_button(0.0), None);
    }
}
