// vid_mode.rs -- fullscreen display mode selection

use ezq_common::common::com_printf;

use crate::backend::{DisplayBackend, DisplayMode};

/// The display mode switched to for fullscreen play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveMode {
    pub mode: DisplayMode,
    /// Synthesised from `-v_hz` and added to the display; removed again on
    /// shutdown.
    pub custom: bool,
}

impl ActiveMode {
    pub fn refresh_rate(&self) -> f64 {
        self.mode.refresh_hz()
    }
}

/// Index of the smallest mode at least `width`x`height`, minimising the
/// squared distance between requested and offered size.
pub fn best_fit(modes: &[DisplayMode], width: u32, height: u32) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;

    for (i, m) in modes.iter().enumerate() {
        if width > m.width || height > m.height {
            continue;
        }
        let dx = width as i64 - m.width as i64;
        let dy = height as i64 - m.height as i64;
        let dist = dx * dx + dy * dy;
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }
    best.map(|(i, _)| i)
}

/// Highest rate a custom mode can carry in millihertz.
const MAX_CUSTOM_HZ: u32 = u32::MAX / 1000;

/// `base`'s resolution at `refresh_hz`.
pub fn custom_mode(base: &DisplayMode, refresh_hz: i32) -> DisplayMode {
    let hz = (refresh_hz.max(0) as u32).min(MAX_CUSTOM_HZ);
    DisplayMode::new(base.width, base.height, hz)
}

/// Pick and switch to a fullscreen mode. `None` means no mode is large
/// enough and the caller stays windowed.
pub fn select_fullscreen_mode<B: DisplayBackend>(
    backend: &mut B,
    modes: &[DisplayMode],
    width: u32,
    height: u32,
    refresh_hz: Option<i32>,
) -> Option<ActiveMode> {
    let best = modes[best_fit(modes, width, height)?];

    let mut active = None;
    if let Some(hz) = refresh_hz {
        let custom = custom_mode(&best, hz);
        if backend.validate_mode(&custom) {
            backend.add_mode(&custom);
            active = Some(ActiveMode { mode: custom, custom: true });
        } else {
            com_printf(&format!("VID_Init: Refresh rate {} out of range\n", hz));
        }
    }
    let active = active.unwrap_or(ActiveMode { mode: best, custom: false });

    com_printf(&format!("X_vrefresh_rate: {:.6}\n", active.refresh_rate()));
    backend.switch_mode(&active.mode);
    backend.set_viewport(0, 0);
    tracing::info!(
        width = active.mode.width,
        height = active.mode.height,
        refresh_mhz = active.mode.refresh_mhz,
        custom = active.custom,
        "switched display mode"
    );

    Some(active)
}
