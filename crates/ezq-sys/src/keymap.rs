// keymap.rs -- platform key symbol to internal key code translation

use ezq_common::keys::*;

use crate::backend::{KeySym, NamedSym};

/// (symbol, code, code when `cl_keypad` is on). Keypad keys fall back to
/// their main-block meaning unless keypad codes are requested.
static NAMED_KEYS: &[(NamedSym, i32, Option<i32>)] = &[
    (NamedSym::ScrollLock, K_SCRLCK, None),
    (NamedSym::CapsLock, K_CAPSLOCK, None),
    (NamedSym::NumLock, K_PAUSE, Some(KP_NUMLOCK)),
    (NamedSym::PageUp, K_PGUP, None),
    (NamedSym::PageDown, K_PGDN, None),
    (NamedSym::Home, K_HOME, None),
    (NamedSym::End, K_END, None),
    (NamedSym::Left, K_LEFTARROW, None),
    (NamedSym::Right, K_RIGHTARROW, None),
    (NamedSym::Up, K_UPARROW, None),
    (NamedSym::Down, K_DOWNARROW, None),
    (NamedSym::Insert, K_INS, None),
    (NamedSym::Delete, K_DEL, None),
    (NamedSym::Escape, K_ESCAPE, None),
    (NamedSym::Return, K_ENTER, None),
    (NamedSym::Tab, K_TAB, None),
    (NamedSym::BackSpace, K_BACKSPACE, None),
    (NamedSym::Pause, K_PAUSE, None),
    (NamedSym::ShiftL, K_LSHIFT, None),
    (NamedSym::ShiftR, K_RSHIFT, None),
    (NamedSym::Execute, K_LCTRL, None),
    (NamedSym::ControlL, K_LCTRL, None),
    (NamedSym::ControlR, K_RCTRL, None),
    (NamedSym::AltL, K_LALT, None),
    (NamedSym::MetaL, K_LALT, None),
    (NamedSym::AltR, K_RALT, None),
    (NamedSym::MetaR, K_RALT, None),
    (NamedSym::SuperL, K_LWIN, None),
    (NamedSym::SuperR, K_RWIN, None),
    (NamedSym::Menu, K_MENU, None),
    // keypad
    (NamedSym::KpPageUp, K_PGUP, Some(KP_PGUP)),
    (NamedSym::KpPageDown, K_PGDN, Some(KP_PGDN)),
    (NamedSym::KpHome, K_HOME, Some(KP_HOME)),
    (NamedSym::KpEnd, K_END, Some(KP_END)),
    (NamedSym::KpLeft, K_LEFTARROW, Some(KP_LEFTARROW)),
    (NamedSym::KpRight, K_RIGHTARROW, Some(KP_RIGHTARROW)),
    (NamedSym::KpUp, K_UPARROW, Some(KP_UPARROW)),
    (NamedSym::KpDown, K_DOWNARROW, Some(KP_DOWNARROW)),
    (NamedSym::KpInsert, K_INS, Some(KP_INS)),
    (NamedSym::KpDelete, K_DEL, Some(KP_DEL)),
    (NamedSym::KpEnter, K_ENTER, Some(KP_ENTER)),
    (NamedSym::KpBegin, b'5' as i32, Some(KP_5)),
    (NamedSym::KpMultiply, b'*' as i32, Some(KP_STAR)),
    (NamedSym::KpAdd, b'+' as i32, Some(KP_PLUS)),
    (NamedSym::KpSubtract, b'-' as i32, Some(KP_MINUS)),
    (NamedSym::KpDivide, b'/' as i32, Some(KP_SLASH)),
];

/// Translate a platform key symbol. Returns 0 for keys with no internal code.
pub fn translate_key(sym: KeySym, keypad: bool) -> i32 {
    match sym {
        KeySym::Named(NamedSym::F(n @ 1..=12)) => K_F1 + n as i32 - 1,
        KeySym::Named(named) => NAMED_KEYS
            .iter()
            .find(|(s, _, _)| *s == named)
            .map_or(0, |&(_, plain, kp)| match kp {
                Some(code) if keypad => code,
                _ => plain,
            }),
        KeySym::Char(c) => {
            // only Latin-1 has a single-byte code
            let code = c as u32;
            if code > 0xff {
                return 0;
            }
            c.to_ascii_lowercase() as i32
        }
        KeySym::Unknown => 0,
    }
}
