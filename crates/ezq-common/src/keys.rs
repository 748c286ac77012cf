// keys.rs -- internal key codes and the key-event dispatch seam
//
// Printable keys are their lowercase ASCII value; everything else lives
// above 127.

pub const K_TAB: i32 = 9;
pub const K_ENTER: i32 = 13;
pub const K_ESCAPE: i32 = 27;
pub const K_SPACE: i32 = 32;
pub const K_BACKSPACE: i32 = 127;
pub const K_UPARROW: i32 = 128;
pub const K_DOWNARROW: i32 = 129;
pub const K_LEFTARROW: i32 = 130;
pub const K_RIGHTARROW: i32 = 131;
pub const K_ALT: i32 = 132;
pub const K_CTRL: i32 = 133;
pub const K_SHIFT: i32 = 134;
pub const K_F1: i32 = 135;
pub const K_F2: i32 = 136;
pub const K_F3: i32 = 137;
pub const K_F4: i32 = 138;
pub const K_F5: i32 = 139;
pub const K_F6: i32 = 140;
pub const K_F7: i32 = 141;
pub const K_F8: i32 = 142;
pub const K_F9: i32 = 143;
pub const K_F10: i32 = 144;
pub const K_F11: i32 = 145;
pub const K_F12: i32 = 146;
pub const K_INS: i32 = 147;
pub const K_DEL: i32 = 148;
pub const K_PGDN: i32 = 149;
pub const K_PGUP: i32 = 150;
pub const K_HOME: i32 = 151;
pub const K_END: i32 = 152;
pub const K_CAPSLOCK: i32 = 153;
pub const K_SCRLCK: i32 = 154;

// keypad
pub const KP_NUMLOCK: i32 = 155;
pub const KP_SLASH: i32 = 156;
pub const KP_STAR: i32 = 157;
pub const KP_MINUS: i32 = 158;
pub const KP_HOME: i32 = 159;
pub const KP_UPARROW: i32 = 160;
pub const KP_PGUP: i32 = 161;
pub const KP_LEFTARROW: i32 = 162;
pub const KP_5: i32 = 163;
pub const KP_RIGHTARROW: i32 = 164;
pub const KP_END: i32 = 165;
pub const KP_DOWNARROW: i32 = 166;
pub const KP_PGDN: i32 = 167;
pub const KP_PLUS: i32 = 168;
pub const KP_ENTER: i32 = 169;
pub const KP_INS: i32 = 170;
pub const KP_DEL: i32 = 171;

// sided modifiers
pub const K_LALT: i32 = 172;
pub const K_RALT: i32 = 173;
pub const K_LCTRL: i32 = 174;
pub const K_RCTRL: i32 = 175;
pub const K_LSHIFT: i32 = 176;
pub const K_RSHIFT: i32 = 177;
pub const K_LWIN: i32 = 178;
pub const K_RWIN: i32 = 179;
pub const K_MENU: i32 = 180;

pub const K_MOUSE1: i32 = 200;
pub const K_MOUSE2: i32 = 201;
pub const K_MOUSE3: i32 = 202;
pub const K_MOUSE4: i32 = 203;
pub const K_MOUSE5: i32 = 204;
pub const K_MOUSE6: i32 = 205;
pub const K_MOUSE7: i32 = 206;
pub const K_MOUSE8: i32 = 207;

pub const K_MWHEELDOWN: i32 = 239;
pub const K_MWHEELUP: i32 = 240;

pub const K_PAUSE: i32 = 255;

pub fn is_ctrl(key: i32) -> bool {
    matches!(key, K_CTRL | K_LCTRL | K_RCTRL)
}

pub fn is_shift(key: i32) -> bool {
    matches!(key, K_SHIFT | K_LSHIFT | K_RSHIFT)
}

pub fn is_alt(key: i32) -> bool {
    matches!(key, K_ALT | K_LALT | K_RALT)
}

/// The key-binding subsystem the platform layer feeds.
pub trait KeyDispatch {
    fn key_event(&mut self, key: i32, down: bool);

    /// Release every key currently held down.
    fn clear_states(&mut self);
}
