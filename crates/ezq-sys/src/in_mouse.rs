// in_mouse.rs -- mouse accumulation and movement command building
//
// Relative displacement is accumulated by the event pump and, when enabled,
// by the raw device reader thread. The movement builder consumes it once
// per command.

use std::sync::Arc;

use parking_lot::Mutex;

use ezq_common::cvar::{CvarContext, CvarFlags};
use ezq_common::q_shared::{bound, UserCmd, Vec3, PITCH, YAW};

/// Accumulated relative pointer displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseAccum {
    pub x: f32,
    pub y: f32,
}

impl MouseAccum {
    pub fn add(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Returns the displacement and zeroes it.
    pub fn take(&mut self) -> (f32, f32) {
        let d = (self.x, self.y);
        *self = Self::default();
        d
    }
}

pub type SharedMouse = Arc<Mutex<MouseAccum>>;

pub fn new_shared_mouse() -> SharedMouse {
    Arc::new(Mutex::new(MouseAccum::default()))
}

/// Cvar handles of the look/move tuning variables.
#[derive(Debug, Clone, Copy)]
pub struct MouseCvars {
    pub m_filter: usize,
    pub m_accel: usize,
    pub sensitivity: usize,
    pub m_yaw: usize,
    pub m_pitch: usize,
    pub m_forward: usize,
    pub m_side: usize,
    pub lookstrafe: usize,
    pub freelook: usize,
}

/// IN_Init -- register the mouse tuning variables.
pub fn in_init(cvars: &mut CvarContext) -> MouseCvars {
    MouseCvars {
        m_filter: cvars.register("m_filter", "0", CvarFlags::empty()),
        m_accel: cvars.register("m_accel", "0", CvarFlags::ARCHIVE),
        sensitivity: cvars.register("sensitivity", "3", CvarFlags::ARCHIVE),
        m_yaw: cvars.register("m_yaw", "0.022", CvarFlags::empty()),
        m_pitch: cvars.register("m_pitch", "0.022", CvarFlags::ARCHIVE),
        m_forward: cvars.register("m_forward", "1", CvarFlags::empty()),
        m_side: cvars.register("m_side", "0.8", CvarFlags::empty()),
        lookstrafe: cvars.register("lookstrafe", "0", CvarFlags::ARCHIVE),
        freelook: cvars.register("freelook", "1", CvarFlags::ARCHIVE),
    }
}

/// Snapshot of everything `in_mouse_move` reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseMoveParams {
    pub m_filter: f32,
    pub m_accel: f32,
    pub sensitivity: f32,
    pub m_yaw: f32,
    pub m_pitch: f32,
    pub m_forward: f32,
    pub m_side: f32,
    pub lookstrafe: bool,
    /// Free look or the mlook button.
    pub mlook: bool,
    /// The strafe button is held.
    pub strafe: bool,
}

impl MouseMoveParams {
    pub fn from_cvars(cvars: &CvarContext, handles: &MouseCvars, mlook_held: bool, strafe: bool) -> Self {
        Self {
            m_filter: cvars.value_by_handle(handles.m_filter),
            m_accel: cvars.value_by_handle(handles.m_accel),
            sensitivity: cvars.value_by_handle(handles.sensitivity),
            m_yaw: cvars.value_by_handle(handles.m_yaw),
            m_pitch: cvars.value_by_handle(handles.m_pitch),
            m_forward: cvars.value_by_handle(handles.m_forward),
            m_side: cvars.value_by_handle(handles.m_side),
            lookstrafe: cvars.value_by_handle(handles.lookstrafe) != 0.0,
            mlook: cvars.value_by_handle(handles.freelook) != 0.0 || mlook_held,
            strafe,
        }
    }
}

/// Mouse state owned by the movement builder.
#[derive(Debug)]
pub struct MouseInput {
    pub accum: SharedMouse,
    old_mouse_x: f32,
    old_mouse_y: f32,
}

impl MouseInput {
    pub fn new(accum: SharedMouse) -> Self {
        Self { accum, old_mouse_x: 0.0, old_mouse_y: 0.0 }
    }
}

/// IN_MouseMove -- fold the accumulated displacement into `cmd` and the
/// view angles.
pub fn in_mouse_move(input: &mut MouseInput, cmd: &mut UserCmd, viewangles: &mut Vec3, p: &MouseMoveParams) {
    let (tx, ty) = input.accum.lock().take();
    let (mut mouse_x, mut mouse_y) = (tx, ty);

    if p.m_filter != 0.0 {
        let filterfrac = bound(0.0, p.m_filter, 1.0) / 2.0;
        mouse_x = tx * (1.0 - filterfrac) + input.old_mouse_x * filterfrac;
        mouse_y = ty * (1.0 - filterfrac) + input.old_mouse_y * filterfrac;
    }

    input.old_mouse_x = tx;
    input.old_mouse_y = ty;

    let scale = if p.m_accel != 0.0 {
        let mousespeed = (tx * tx + ty * ty).sqrt();
        mousespeed * p.m_accel + p.sensitivity
    } else {
        p.sensitivity
    };
    mouse_x *= scale;
    mouse_y *= scale;

    // add mouse X/Y movement to cmd
    if p.strafe || (p.lookstrafe && p.mlook) {
        cmd.sidemove = cmd.sidemove.saturating_add((p.m_side * mouse_x) as i16);
    } else {
        viewangles[YAW] -= p.m_yaw * mouse_x;
    }

    if p.mlook && !p.strafe {
        viewangles[PITCH] = bound(-70.0, viewangles[PITCH] + p.m_pitch * mouse_y, 80.0);
    } else {
        cmd.forwardmove = cmd.forwardmove.saturating_sub((p.m_forward * mouse_y) as i16);
    }
}

/// force_centerview
pub fn force_centerview(viewangles: &mut Vec3) {
    viewangles[PITCH] = 0.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> MouseMoveParams {
        MouseMoveParams {
            m_filter: 0.0,
            m_accel: 0.0,
            sensitivity: 2.0,
            m_yaw: 0.5,
            m_pitch: 0.5,
            m_forward: 1.0,
            m_side: 1.0,
            lookstrafe: false,
            mlook: true,
            strafe: false,
        }
    }

    fn feed(input: &MouseInput, dx: f32, dy: f32) {
        input.accum.lock().add(dx, dy);
    }

    #[test]
    fn test_look_turns_view() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd::default();
        let mut angles: Vec3 = [0.0; 3];

        feed(&input, 10.0, 4.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &params());

        assert_eq!(angles[YAW], -10.0);
        assert_eq!(angles[PITCH], 4.0);
        assert_eq!(cmd, UserCmd::default());
        assert_eq!(*input.accum.lock(), MouseAccum::default());
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd::default();
        let mut angles: Vec3 = [0.0; 3];

        feed(&input, 0.0, 1000.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &params());
        assert_eq!(angles[PITCH], 80.0);

        feed(&input, 0.0, -1000.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &params());
        assert_eq!(angles[PITCH], -70.0);
    }

    #[test]
    fn test_strafe_moves_instead_of_turning() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd::default();
        let mut angles: Vec3 = [0.0; 3];
        let p = MouseMoveParams { strafe: true, ..params() };

        feed(&input, 5.0, 3.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);

        assert_eq!(cmd.sidemove, 10);
        assert_eq!(cmd.forwardmove, -6);
        assert_eq!(angles, [0.0; 3]);
    }

    #[test]
    fn test_without_mlook_vertical_motion_walks() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd::default();
        let mut angles: Vec3 = [0.0; 3];
        let p = MouseMoveParams { mlook: false, lookstrafe: true, ..params() };

        feed(&input, 1.0, -5.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);

        // lookstrafe only applies with mlook
        assert_eq!(angles[YAW], -1.0);
        assert_eq!(cmd.forwardmove, 10);
        assert_eq!(angles[PITCH], 0.0);
    }

    #[test]
    fn test_filter_blends_previous_sample() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd::default();
        let mut angles: Vec3 = [0.0; 3];
        let p = MouseMoveParams { m_filter: 1.0, sensitivity: 1.0, m_yaw: 1.0, ..params() };

        feed(&input, 8.0, 0.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);
        // half of the first sample, half of the (zero) previous one
        assert_eq!(angles[YAW], -4.0);

        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);
        // no new motion; the previous raw sample still contributes
        assert_eq!(angles[YAW], -8.0);

        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);
        assert_eq!(angles[YAW], -8.0);
    }

    #[test]
    fn test_accel_scales_with_speed() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd::default();
        let mut angles: Vec3 = [0.0; 3];
        let p = MouseMoveParams { m_accel: 0.5, sensitivity: 1.0, m_yaw: 1.0, ..params() };

        feed(&input, 3.0, 4.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);
        // speed 5: scale 5 * 0.5 + 1
        assert_eq!(angles[YAW], -10.5);
    }

    #[test]
    fn test_moves_saturate() {
        let mut input = MouseInput::new(new_shared_mouse());
        let mut cmd = UserCmd { sidemove: i16::MAX - 1, ..Default::default() };
        let mut angles: Vec3 = [0.0; 3];
        let p = MouseMoveParams { strafe: true, ..params() };

        feed(&input, 100.0, 0.0);
        in_mouse_move(&mut input, &mut cmd, &mut angles, &p);
        assert_eq!(cmd.sidemove, i16::MAX);
    }

    #[test]
    fn test_force_centerview() {
        let mut angles: Vec3 = [30.0, 90.0, 0.0];
        force_centerview(&mut angles);
        assert_eq!(angles, [0.0, 90.0, 0.0]);
    }

    #[test]
    fn test_in_init_defaults() {
        let mut cvars = CvarContext::new();
        let h = in_init(&mut cvars);
        let p = MouseMoveParams::from_cvars(&cvars, &h, false, false);
        assert_eq!(p.sensitivity, 3.0);
        assert!(p.mlook);
        assert!(!p.lookstrafe);
    }
}
