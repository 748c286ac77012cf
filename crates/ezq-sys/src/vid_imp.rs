// vid_imp.rs -- video and input adapter
//
// Owns the window, rendering context, input grabs, hardware gamma and vsync
// state, and turns window-system events into key and mouse input. All
// window-system access goes through a DisplayBackend.

use std::sync::Arc;
use std::time::Duration;

use ezq_client::client::ClientState;
use ezq_common::common::{com_printf, sys_double_time, ComArgs, DISTNAME, DISTVER};
use ezq_common::cvar::{ChangeVerdict, CvarContext, CvarFlags, CvarGuard};
use ezq_common::keys::*;
use ezq_common::q_shared::{q_atof, q_atoi};

use crate::backend::*;
use crate::evdev::EvdevMouse;
use crate::in_mouse::SharedMouse;
use crate::keymap::translate_key;
use crate::vid_mode::{select_fullscreen_mode, ActiveMode};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

const VIDEO_SYNC_EXTENSION: &str = "GLX_SGI_video_sync";

/// Sleep per frame while iconified.
const MINIMIZED_SLEEP: Duration = Duration::from_millis(10);

/// Console (2D) geometry derived at start-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VidDef {
    pub width: u32,
    pub height: u32,
    pub conwidth: u32,
    pub conheight: u32,
    pub aspect: f32,
    pub numpages: u32,
}

/// Window size and console geometry from `-current`, `-width`, `-height`,
/// `-conwidth` and `-conheight`.
pub fn compute_viddef(args: &ComArgs, desktop: (u32, u32)) -> (u32, u32, VidDef) {
    let (width, height) = if args.check_parm("-current").is_some() {
        desktop
    } else {
        let parm = |name: &str, default: u32| {
            args.parm_value(name).map_or(default, |v| q_atoi(v).max(1) as u32)
        };
        (parm("-width", DEFAULT_WIDTH), parm("-height", DEFAULT_HEIGHT))
    };

    // multiple of eight
    let conwidth = args.parm_value("-conwidth").map_or(640, q_atoi) & 0xfff8;
    let conwidth = conwidth.max(320) as u32;

    let conheight = args
        .parm_value("-conheight")
        .map_or(conwidth as i32 * 3 / 4, q_atoi)
        .max(200) as u32;

    let conwidth = conwidth.min(width);
    let conheight = conheight.min(height);

    let vid = VidDef {
        width: conwidth,
        height: conheight,
        conwidth,
        conheight,
        aspect: (conheight as f32 / conwidth as f32) * (320.0 / 240.0),
        numpages: 2,
    };
    (width, height, vid)
}

#[derive(Debug, Clone, Copy)]
struct VidCvars {
    vid_hwgammacontrol: usize,
    windowed_mouse: usize,
    cl_keypad: usize,
    vid_vsync: Option<usize>,
}

/// Hardware gamma ramp state.
#[derive(Default)]
struct HwGamma {
    /// The display offers a 256-entry ramp.
    works: bool,
    enabled: bool,
    old_enabled: bool,
    /// A custom ramp is loaded and the system ramp must be put back.
    custom: bool,
    system: Option<GammaRamp>,
    /// The renderer's ramp; shared, never copied.
    current: Option<Arc<GammaRamp>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Modifiers {
    ctrl: bool,
    shift: bool,
    alt: bool,
}

pub struct VidContext<B: DisplayBackend> {
    backend: B,
    pub vid: VidDef,
    scr_width: u32,
    scr_height: u32,
    /// Context created and not yet shut down.
    live: bool,
    modes: Vec<DisplayMode>,
    vidmode: Option<ActiveMode>,
    refresh_rate: f64,
    minimized: bool,
    grabbed: bool,
    /// Grabs report unaccelerated deltas instead of recentring.
    allow_direct_mouse: bool,
    direct_mouse: bool,
    allow_keyboard_grab: bool,
    old_windowed_mouse: f32,
    gamma: HwGamma,
    update_vsync: bool,
    frame_start: f64,
    mods: Modifiers,
    accum: SharedMouse,
    evdev: Option<EvdevMouse>,
    cv: VidCvars,
}

impl<B: DisplayBackend> VidContext<B> {
    /// VID_Init
    pub fn init(mut backend: B, cvars: &mut CvarContext, args: &ComArgs, accum: SharedMouse) -> Result<Self, VidError> {
        cvars.register("vid_ref", "gl", CvarFlags::ROM);
        cvars.register("vid_mode", "0", CvarFlags::empty());
        let vid_hwgammacontrol = cvars.register("vid_hwgammacontrol", "1", CvarFlags::empty());
        let windowed_mouse = cvars.register("_windowed_mouse", "1", CvarFlags::ARCHIVE);
        cvars.register("m_filter", "0", CvarFlags::empty());
        let cl_keypad = cvars.register("cl_keypad", "1", CvarFlags::empty());

        let visual = backend.choose_visual(&VisualRequest::default()).ok_or(VidError::NoVisual)?;

        let (width, height, vid) = compute_viddef(args, backend.desktop_size());

        let modes = backend.video_modes();
        let mut vidmode = None;
        if args.check_parm("-fullscreen").is_some() {
            let refresh = args.parm_value("-v_hz").map(q_atoi);
            vidmode = select_fullscreen_mode(&mut backend, &modes, width, height, refresh);
            if vidmode.is_none() {
                tracing::info!(width, height, "no display mode large enough, staying windowed");
            }
        }

        backend.create_window(&WindowParams {
            width,
            height,
            title: format!("{} {}", DISTNAME, DISTVER),
            fullscreen: vidmode.is_some(),
        })?;
        backend.hide_cursor();

        if vidmode.is_some() {
            backend.warp_pointer(0, 0);
            backend.flush();
            backend.set_viewport(0, 0);
        }
        backend.flush();

        backend.create_context(&visual)?;

        let mut ctx = Self {
            backend,
            vid,
            scr_width: width,
            scr_height: height,
            live: true,
            refresh_rate: vidmode.map_or(0.0, |m: ActiveMode| m.refresh_rate()),
            modes,
            vidmode,
            minimized: false,
            grabbed: false,
            allow_direct_mouse: args.check_parm("-nodga").is_none() && args.check_parm("-nomdga").is_none(),
            direct_mouse: false,
            allow_keyboard_grab: args.check_parm("-nokdga").is_none(),
            old_windowed_mouse: 0.0,
            gamma: HwGamma::default(),
            update_vsync: false,
            frame_start: 0.0,
            mods: Modifiers::default(),
            accum,
            evdev: None,
            cv: VidCvars { vid_hwgammacontrol, windowed_mouse, cl_keypad, vid_vsync: None },
        };

        ctx.init_extensions(cvars, args);
        ctx.init_hw_gamma(cvars, args);

        com_printf(&format!("Video mode {}x{} initialized.\n", width, height));

        if let Some(device) = args.parm_value("-mevdev") {
            let threaded = args.check_parm("-mmt").is_some();
            match EvdevMouse::open(device, threaded, Arc::clone(&ctx.accum)) {
                Ok(mouse) => ctx.evdev = Some(mouse),
                Err(e) => com_printf(&format!("{}\n", e)),
            }
        }

        tracing::debug!(width, height, fullscreen = ctx.vidmode.is_some(), "video initialized");
        Ok(ctx)
    }

    /// GL_Init_GLX
    fn init_extensions(&mut self, cvars: &mut CvarContext, args: &ComArgs) {
        let extensions = self.backend.extensions();
        if args.check_parm("-gl_ext").is_some() {
            com_printf(&format!("GLX_EXTENSIONS: {}\n", extensions));
        }

        if args.check_parm("-noswapctrl").is_none() && has_extension(&extensions, VIDEO_SYNC_EXTENSION) {
            com_printf("Vsync control extensions found\n");
            self.cv.vid_vsync = Some(cvars.register("vid_vsync", "", CvarFlags::empty()));
        }
    }

    /// InitHWGamma
    fn init_hw_gamma(&mut self, cvars: &CvarContext, args: &ComArgs) {
        if args.check_parm("-nohwgamma").is_some() {
            return;
        }

        if self.backend.gamma_ramp_size() == GAMMA_RAMP_SIZE {
            self.gamma.system = self.backend.get_gamma_ramp();
            self.gamma.works = self.gamma.system.is_some();
        }
        self.gamma.enabled = cvars.value_by_handle(self.cv.vid_hwgammacontrol) != 0.0 && self.gamma.works;
    }

    // ============================================================
    // Gamma
    // ============================================================

    /// VID_SetDeviceGammaRamp -- remember the renderer's ramp and load it
    /// if hardware gamma is enabled.
    pub fn set_device_gamma_ramp(&mut self, ramp: Arc<GammaRamp>) {
        if !self.gamma.works {
            return;
        }
        if self.gamma.enabled {
            self.backend.set_gamma_ramp(&ramp);
            self.gamma.custom = true;
        }
        self.gamma.current = Some(ramp);
    }

    fn restore_hw_gamma(&mut self) {
        if self.gamma.works && self.gamma.custom {
            self.gamma.custom = false;
            if let Some(ref system) = self.gamma.system {
                self.backend.set_gamma_ramp(system);
            }
        }
    }

    pub fn gamma_works(&self) -> bool {
        self.gamma.works
    }

    // ============================================================
    // Frame bracket
    // ============================================================

    /// GL_BeginRendering -- returns the drawable (x, y, width, height).
    pub fn begin_rendering(&mut self) -> (i32, i32, u32, u32) {
        self.frame_start = sys_double_time();
        (0, 0, self.scr_width, self.scr_height)
    }

    /// GL_EndRendering
    pub fn end_rendering(&mut self, cvars: &CvarContext) {
        self.gamma.enabled = cvars.value_by_handle(self.cv.vid_hwgammacontrol) != 0.0 && self.gamma.works;
        if self.gamma.enabled != self.gamma.old_enabled {
            self.gamma.old_enabled = self.gamma.enabled;
            match self.gamma.current.clone() {
                Some(ramp) if self.gamma.enabled => self.set_device_gamma_ramp(ramp),
                _ => self.restore_hw_gamma(),
            }
        }

        if let Some(handle) = self.cv.vid_vsync {
            let elapsed = sys_double_time() - self.frame_start;
            if elapsed <= self.refresh_interval() && self.update_vsync && !cvars.string_by_handle(handle).is_empty() {
                self.backend.wait_video_sync();
            }
        }

        if self.minimized {
            std::thread::sleep(MINIMIZED_SLEEP);
            return;
        }

        self.backend.flush();
        self.backend.swap_buffers();
    }

    /// Seconds per retrace of the switched mode; unbounded when windowed.
    pub fn refresh_interval(&self) -> f64 {
        if self.refresh_rate > 0.0 {
            1.0 / self.refresh_rate
        } else {
            f64::INFINITY
        }
    }

    // ============================================================
    // Grabs
    // ============================================================

    fn center(&self) -> (i32, i32) {
        ((self.scr_width / 2) as i32, (self.scr_height / 2) as i32)
    }

    fn install_grabs(&mut self) {
        self.backend.grab_pointer();
        if self.allow_direct_mouse {
            self.direct_mouse = true;
        } else {
            let (cx, cy) = self.center();
            self.backend.warp_pointer(cx, cy);
        }
        if self.allow_keyboard_grab {
            self.backend.grab_keyboard();
        }
        self.grabbed = true;
    }

    fn uninstall_grabs(&mut self) {
        self.direct_mouse = false;
        self.backend.ungrab_pointer();
        self.backend.ungrab_keyboard();
        self.grabbed = false;
    }

    pub fn grabbed(&self) -> bool {
        self.grabbed
    }

    // ============================================================
    // Event pump
    // ============================================================

    fn evdev_active(&self) -> bool {
        self.evdev.as_ref().is_some_and(EvdevMouse::is_active)
    }

    /// Sys_SendKeyEvents -- drain queued input. Returns true when the window
    /// system asked the application to close.
    pub fn send_key_events(&mut self, cvars: &mut CvarContext, keys: &mut dyn KeyDispatch) -> bool {
        if !self.live {
            return false;
        }

        if let Some(mouse) = self.evdev.as_mut() {
            if !mouse.is_threaded() {
                mouse.poll();
            }
            for (key, down) in mouse.drain_keys() {
                keys.key_event(key, down);
            }
            if !mouse.is_active() {
                self.evdev = None;
            }
        }

        let mut close_requested = false;
        self.backend.dispatch_pending();
        while let Some(ev) = self.backend.poll_event() {
            if ev == PlatformEvent::CloseRequested {
                close_requested = true;
                continue;
            }
            self.handle_event(ev, cvars, keys);
        }

        let windowed_mouse = cvars.value_by_handle(self.cv.windowed_mouse);
        if self.old_windowed_mouse != windowed_mouse {
            self.old_windowed_mouse = windowed_mouse;
            if windowed_mouse == 0.0 {
                self.uninstall_grabs();
            } else {
                self.install_grabs();
            }
        }
        if let Some(mouse) = self.evdev.as_ref() {
            mouse.set_windowed_mouse(windowed_mouse != 0.0);
        }

        close_requested
    }

    fn handle_event(&mut self, ev: PlatformEvent, cvars: &mut CvarContext, keys: &mut dyn KeyDispatch) {
        let windowed_mouse = cvars.value_by_handle(self.cv.windowed_mouse) != 0.0;

        match ev {
            PlatformEvent::Key { sym, pressed } => {
                let key = translate_key(sym, cvars.value_by_handle(self.cv.cl_keypad) != 0.0);
                if is_ctrl(key) {
                    self.mods.ctrl = pressed;
                }
                if is_shift(key) {
                    self.mods.shift = pressed;
                }
                if is_alt(key) {
                    self.mods.alt = pressed;
                }
                if key != 0 {
                    keys.key_event(key, pressed);
                }
            }

            PlatformEvent::Motion { x, y } => {
                if !windowed_mouse || self.evdev_active() || self.direct_mouse {
                    return;
                }
                let (cx, cy) = self.center();
                self.accum.lock().add((x - cx) as f32, (y - cy) as f32);

                // move the pointer back to the centre without seeing that motion
                self.backend.set_motion_events(false);
                self.backend.warp_pointer(cx, cy);
                self.backend.set_motion_events(true);
            }

            PlatformEvent::RawMotion { dx, dy } => {
                if windowed_mouse && !self.evdev_active() && self.direct_mouse {
                    self.accum.lock().add(dx as f32, dy as f32);
                }
            }

            PlatformEvent::Button { index, pressed } => {
                if self.evdev_active() {
                    return;
                }
                let key = match index {
                    1 => K_MOUSE1,
                    2 => K_MOUSE3,
                    3 => K_MOUSE2,
                    4 => K_MWHEELUP,
                    5 => K_MWHEELDOWN,
                    _ => return,
                };
                keys.key_event(key, pressed);
            }

            PlatformEvent::Map => self.on_map(cvars),

            PlatformEvent::Unmap => {
                keys.clear_states();
                if cvars.value_by_handle(self.cv.vid_hwgammacontrol) != 0.0 && self.gamma.works {
                    cvars.force_set("vid_hwgammacontrol", "0");
                }
                self.uninstall_grabs();
                self.set_minimized(true);
            }

            PlatformEvent::CloseRequested => {}
        }
    }

    fn on_map(&mut self, cvars: &mut CvarContext) {
        self.install_grabs();

        if self.vidmode.is_none() && cvars.value_by_handle(self.cv.windowed_mouse) == 0.0 {
            cvars.set("_windowed_mouse", "1");
        }

        if !self.minimized {
            return;
        }
        self.set_minimized(false);

        if cvars.value_by_handle(self.cv.vid_hwgammacontrol) == 0.0 && self.gamma.works {
            cvars.force_set("vid_hwgammacontrol", "1");
        }

        if let Some(active) = self.vidmode {
            self.backend.set_title(&format!("{} {}", DISTNAME, DISTVER));
            self.backend.switch_mode(&active.mode);
            self.backend.set_viewport(0, 0);
        }
    }

    fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
        if let Some(mouse) = self.evdev.as_ref() {
            mouse.set_minimized(minimized);
        }
    }

    pub fn minimized(&self) -> bool {
        self.minimized
    }

    pub fn is_ctrl_down(&self) -> bool {
        self.mods.ctrl
    }

    pub fn is_shift_down(&self) -> bool {
        self.mods.shift
    }

    pub fn is_alt_down(&self) -> bool {
        self.mods.alt
    }

    // ============================================================
    // Window state
    // ============================================================

    /// VID_Minimize_f -- iconify. A switched fullscreen mode gives the
    /// desktop its own mode back first.
    pub fn vid_minimize(&mut self, client: &ClientState) {
        if self.vidmode.is_some() {
            let title = if client.is_disconnected() {
                DISTNAME.to_string()
            } else {
                format!("{} - {}", DISTNAME, client.servername)
            };
            self.backend.set_title(&title);
            self.backend.iconify();
            if let Some(desktop) = self.modes.first().copied() {
                self.backend.switch_mode(&desktop);
            }
        } else {
            self.backend.iconify();
        }
    }

    pub fn vidmode(&self) -> Option<&ActiveMode> {
        self.vidmode.as_ref()
    }

    pub fn refresh_rate(&self) -> f64 {
        self.refresh_rate
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// VID_Shutdown -- put the display back the way it was found. Safe to
    /// call more than once.
    pub fn shutdown(&mut self) {
        if let Some(mut mouse) = self.evdev.take() {
            mouse.stop();
        }

        if !self.live {
            return;
        }
        self.live = false;

        self.uninstall_grabs();
        self.restore_hw_gamma();

        self.backend.destroy_context();
        self.backend.destroy_window();
        if let Some(active) = self.vidmode.take() {
            if let Some(desktop) = self.modes.first().copied() {
                self.backend.switch_mode(&desktop);
            }
            if active.custom {
                self.backend.delete_mode(&active.mode);
            }
        }
        self.backend.close();
        tracing::debug!("video shut down");
    }
}

impl<B: DisplayBackend> Drop for VidContext<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// On-change hooks for `_windowed_mouse` and `vid_vsync`.
impl<B: DisplayBackend> CvarGuard for VidContext<B> {
    fn on_change(&mut self, _cvars: &mut CvarContext, name: &str, value: &str) -> ChangeVerdict {
        match name {
            "_windowed_mouse" => {
                if self.vidmode.is_some() && q_atof(value) == 0.0 {
                    com_printf(&format!("Cannot turn {} off when using -fullscreen mode\n", name));
                    return ChangeVerdict::Reject;
                }
                ChangeVerdict::Accept
            }
            "vid_vsync" => {
                self.update_vsync = q_atoi(value) != 0;
                ChangeVerdict::Accept
            }
            _ => ChangeVerdict::Accept,
        }
    }
}
