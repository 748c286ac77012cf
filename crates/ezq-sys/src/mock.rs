// mock.rs -- scripted display backend for adapter tests

use std::collections::VecDeque;

use crate::backend::*;

pub struct MockBackend {
    /// Every primitive called, in order.
    pub calls: Vec<&'static str>,
    pub desktop: (u32, u32),
    pub modes: Vec<DisplayMode>,
    /// Modes `validate_mode` accepts besides the listed ones.
    pub extra_valid: Vec<DisplayMode>,
    pub has_visual: bool,
    pub gamma_size: usize,
    pub system_ramp: GammaRamp,
    pub applied_ramps: Vec<GammaRamp>,
    pub extensions: String,
    pub events: VecDeque<PlatformEvent>,
    pub window: Option<WindowParams>,
    pub current_mode: Option<DisplayMode>,
    pub added_modes: Vec<DisplayMode>,
    pub motion_enabled: bool,
    pub pointer_grabbed: bool,
    pub keyboard_grabbed: bool,
    pub warps: Vec<(i32, i32)>,
    /// `motion_enabled` at the time of each warp.
    pub warps_masked: Vec<bool>,
    pub titles: Vec<String>,
    pub waits: u32,
    pub swaps: u32,
}

impl MockBackend {
    pub fn new() -> Self {
        let mut dim = GammaRamp::identity();
        for ch in dim.channels.iter_mut() {
            for v in ch.iter_mut() {
                *v /= 2;
            }
        }
        Self {
            calls: Vec::new(),
            desktop: (1920, 1080),
            modes: vec![
                DisplayMode::new(1920, 1080, 60),
                DisplayMode::new(640, 480, 60),
                DisplayMode::new(800, 600, 75),
                DisplayMode::new(1024, 768, 85),
            ],
            extra_valid: Vec::new(),
            has_visual: true,
            gamma_size: 256,
            system_ramp: dim,
            applied_ramps: Vec::new(),
            extensions: "GLX_ARB_get_proc_address GLX_SGI_video_sync".to_string(),
            events: VecDeque::new(),
            window: None,
            current_mode: None,
            added_modes: Vec::new(),
            motion_enabled: true,
            pointer_grabbed: false,
            keyboard_grabbed: false,
            warps: Vec::new(),
            warps_masked: Vec::new(),
            titles: Vec::new(),
            waits: 0,
            swaps: 0,
        }
    }

    pub fn push(&mut self, ev: PlatformEvent) {
        self.events.push_back(ev);
    }

    pub fn called(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| **c == name).count()
    }
}

impl DisplayBackend for MockBackend {
    fn choose_visual(&mut self, _req: &VisualRequest) -> Option<Visual> {
        self.calls.push("choose_visual");
        self.has_visual.then_some(Visual { color_bits: 24, depth_bits: 24 })
    }

    fn desktop_size(&self) -> (u32, u32) {
        self.desktop
    }

    fn video_modes(&self) -> Vec<DisplayMode> {
        self.modes.clone()
    }

    fn validate_mode(&self, mode: &DisplayMode) -> bool {
        self.modes.contains(mode) || self.extra_valid.contains(mode)
    }

    fn add_mode(&mut self, mode: &DisplayMode) {
        self.calls.push("add_mode");
        self.added_modes.push(*mode);
    }

    fn delete_mode(&mut self, mode: &DisplayMode) {
        self.calls.push("delete_mode");
        self.added_modes.retain(|m| m != mode);
    }

    fn switch_mode(&mut self, mode: &DisplayMode) -> bool {
        self.calls.push("switch_mode");
        self.current_mode = Some(*mode);
        true
    }

    fn set_viewport(&mut self, _x: i32, _y: i32) {
        self.calls.push("set_viewport");
    }

    fn create_window(&mut self, params: &WindowParams) -> Result<(), VidError> {
        self.calls.push("create_window");
        self.window = Some(params.clone());
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.titles.push(title.to_string());
    }

    fn hide_cursor(&mut self) {
        self.calls.push("hide_cursor");
    }

    fn create_context(&mut self, _visual: &Visual) -> Result<(), VidError> {
        self.calls.push("create_context");
        Ok(())
    }

    fn destroy_context(&mut self) {
        self.calls.push("destroy_context");
    }

    fn destroy_window(&mut self) {
        self.calls.push("destroy_window");
        self.window = None;
    }

    fn grab_pointer(&mut self) {
        self.calls.push("grab_pointer");
        self.pointer_grabbed = true;
    }

    fn ungrab_pointer(&mut self) {
        self.calls.push("ungrab_pointer");
        self.pointer_grabbed = false;
    }

    fn grab_keyboard(&mut self) {
        self.keyboard_grabbed = true;
    }

    fn ungrab_keyboard(&mut self) {
        self.keyboard_grabbed = false;
    }

    fn warp_pointer(&mut self, x: i32, y: i32) {
        self.warps.push((x, y));
        self.warps_masked.push(!self.motion_enabled);
    }

    fn set_motion_events(&mut self, enabled: bool) {
        self.motion_enabled = enabled;
    }

    fn iconify(&mut self) {
        self.calls.push("iconify");
    }

    fn gamma_ramp_size(&self) -> usize {
        self.gamma_size
    }

    fn get_gamma_ramp(&self) -> Option<GammaRamp> {
        Some(self.system_ramp.clone())
    }

    fn set_gamma_ramp(&mut self, ramp: &GammaRamp) {
        self.calls.push("set_gamma_ramp");
        self.applied_ramps.push(ramp.clone());
    }

    fn extensions(&self) -> String {
        self.extensions.clone()
    }

    fn wait_video_sync(&mut self) {
        self.waits += 1;
    }

    fn flush(&mut self) {
        self.calls.push("flush");
    }

    fn swap_buffers(&mut self) {
        self.swaps += 1;
    }

    fn dispatch_pending(&mut self) {}

    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.events.pop_front()
    }

    fn close(&mut self) {
        self.calls.push("close");
    }
}
