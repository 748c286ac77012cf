// q_shared.rs -- types and helpers shared by every crate

pub type Vec3 = [f32; 3];

pub const PITCH: usize = 0; // up / down
pub const YAW: usize = 1; // left / right
pub const ROLL: usize = 2; // fall over

/// One frame of movement sent to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UserCmd {
    pub msec: u8,
    pub angles: Vec3,
    pub forwardmove: i16,
    pub sidemove: i16,
    pub upmove: i16,
    pub buttons: u8,
    pub impulse: u8,
}

pub fn bound<T: PartialOrd>(min: T, v: T, max: T) -> T {
    if v < min {
        min
    } else if v > max {
        max
    } else {
        v
    }
}

/// Length of the longest prefix of `s` that looks like a number.
fn numeric_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    &s[..end]
}

/// Parse a float the way the console does: leading whitespace is skipped,
/// trailing garbage is ignored, and anything unparsable yields 0.
pub fn q_atof(s: &str) -> f32 {
    numeric_prefix(s.trim_start()).parse::<f32>().unwrap_or(0.0)
}

pub fn q_atoi(s: &str) -> i32 {
    let p = numeric_prefix(s.trim_start());
    let p = p.split('.').next().unwrap_or("");
    p.parse::<i32>().unwrap_or(0)
}

/// Look up `key` in a `\key\value\key\value` info string. Returns "" if absent.
pub fn info_value_for_key<'a>(s: &'a str, key: &str) -> &'a str {
    let s = s.strip_prefix('\\').unwrap_or(s);
    let mut parts = s.split('\\');
    while let Some(k) = parts.next() {
        let v = parts.next().unwrap_or("");
        if k == key {
            return v;
        }
    }
    ""
}
