// backend.rs -- the window-system surface the video adapter drives
//
// VidContext owns all policy (mode choice, grabs, gamma edge trigger, key
// translation); a backend only performs the primitive operations.

use thiserror::Error;

/// Fatal video initialisation failures.
#[derive(Debug, Error)]
pub enum VidError {
    #[error("Error couldn't open the display: {0}")]
    DisplayOpen(String),
    #[error("Error couldn't get an RGB, Double-buffered, Depth visual")]
    NoVisual,
    #[error("window creation failed: {0}")]
    Window(String),
    #[error("rendering context creation failed: {0}")]
    Context(String),
}

/// Minimum pixel format the renderer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualRequest {
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub depth_bits: u8,
    pub double_buffer: bool,
}

impl Default for VisualRequest {
    fn default() -> Self {
        Self { red_bits: 1, green_bits: 1, blue_bits: 1, depth_bits: 1, double_buffer: true }
    }
}

/// The pixel format a backend settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visual {
    pub color_bits: u8,
    pub depth_bits: u8,
}

/// A display mode: resolution plus refresh in millihertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub refresh_mhz: u32,
}

impl DisplayMode {
    pub fn new(width: u32, height: u32, refresh_hz: u32) -> Self {
        Self { width, height, refresh_mhz: refresh_hz.saturating_mul(1000) }
    }

    /// Refresh rate rounded to whole hertz.
    pub fn refresh_hz(&self) -> f64 {
        (self.refresh_mhz as f64 / 1000.0).round()
    }
}

pub const GAMMA_RAMP_SIZE: usize = 256;

/// Per-channel 16-bit lookup table applied by the display hardware.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaRamp {
    pub channels: [[u16; GAMMA_RAMP_SIZE]; 3],
}

impl GammaRamp {
    pub fn identity() -> Self {
        let mut ramp = [0u16; GAMMA_RAMP_SIZE];
        for (i, v) in ramp.iter_mut().enumerate() {
            *v = (i as u16) << 8 | i as u16;
        }
        Self { channels: [ramp; 3] }
    }
}

impl std::fmt::Debug for GammaRamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GammaRamp([{}..{}])", self.channels[0][0], self.channels[0][GAMMA_RAMP_SIZE - 1])
    }
}

/// Window creation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowParams {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Undecorated, unmanaged window covering a switched fullscreen mode.
    pub fullscreen: bool,
}

/// Named platform key symbols. Keypad variants are distinct from their
/// main-block counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedSym {
    ScrollLock,
    CapsLock,
    NumLock,
    PageUp,
    PageDown,
    Home,
    End,
    Left,
    Right,
    Up,
    Down,
    Insert,
    Delete,
    Escape,
    Return,
    Tab,
    BackSpace,
    Pause,
    F(u8),
    ShiftL,
    ShiftR,
    ControlL,
    ControlR,
    Execute,
    AltL,
    AltR,
    MetaL,
    MetaR,
    SuperL,
    SuperR,
    Menu,
    KpPageUp,
    KpPageDown,
    KpHome,
    KpEnd,
    KpLeft,
    KpRight,
    KpUp,
    KpDown,
    KpInsert,
    KpDelete,
    KpEnter,
    KpBegin,
    KpMultiply,
    KpAdd,
    KpSubtract,
    KpDivide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySym {
    Named(NamedSym),
    /// The character the key produces.
    Char(char),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformEvent {
    Key { sym: KeySym, pressed: bool },
    /// Absolute pointer position inside the window.
    Motion { x: i32, y: i32 },
    /// Unaccelerated device delta, delivered while grabbed.
    RawMotion { dx: i32, dy: i32 },
    /// Buttons numbered 1 left, 2 middle, 3 right, 4 wheel up, 5 wheel down.
    Button { index: u8, pressed: bool },
    Map,
    Unmap,
    CloseRequested,
}

/// Primitive window-system operations.
pub trait DisplayBackend {
    fn choose_visual(&mut self, req: &VisualRequest) -> Option<Visual>;
    fn desktop_size(&self) -> (u32, u32);
    /// Every mode the display offers. The first entry is the desktop mode.
    fn video_modes(&self) -> Vec<DisplayMode>;
    fn validate_mode(&self, mode: &DisplayMode) -> bool;
    fn add_mode(&mut self, mode: &DisplayMode);
    fn delete_mode(&mut self, mode: &DisplayMode);
    fn switch_mode(&mut self, mode: &DisplayMode) -> bool;
    fn set_viewport(&mut self, x: i32, y: i32);

    fn create_window(&mut self, params: &WindowParams) -> Result<(), VidError>;
    fn set_title(&mut self, title: &str);
    fn hide_cursor(&mut self);
    fn create_context(&mut self, visual: &Visual) -> Result<(), VidError>;
    fn destroy_context(&mut self);
    fn destroy_window(&mut self);

    fn grab_pointer(&mut self);
    fn ungrab_pointer(&mut self);
    fn grab_keyboard(&mut self);
    fn ungrab_keyboard(&mut self);
    fn warp_pointer(&mut self, x: i32, y: i32);
    /// Mask (false) or unmask (true) pointer motion reporting.
    fn set_motion_events(&mut self, enabled: bool);
    fn iconify(&mut self);

    /// Entries per channel; 0 when hardware gamma is unavailable.
    fn gamma_ramp_size(&self) -> usize;
    fn get_gamma_ramp(&self) -> Option<GammaRamp>;
    fn set_gamma_ramp(&mut self, ramp: &GammaRamp);

    /// Space-separated extension names of the rendering interface.
    fn extensions(&self) -> String;
    /// Block until the next vertical retrace.
    fn wait_video_sync(&mut self);
    fn flush(&mut self);
    fn swap_buffers(&mut self);

    /// Collect whatever the window system has queued. Never blocks.
    fn dispatch_pending(&mut self);
    fn poll_event(&mut self) -> Option<PlatformEvent>;
    fn close(&mut self);
}

/// Exact token match in a space-separated extension list.
pub fn has_extension(extensions: &str, name: &str) -> bool {
    if name.is_empty() || name.contains(' ') {
        return false;
    }
    extensions.split(' ').any(|e| e == name)
}
