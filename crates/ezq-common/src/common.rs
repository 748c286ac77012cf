// common.rs -- console printing, start-up parameters and timing

use std::cell::RefCell;
use std::sync::OnceLock;
use std::time::Instant;

pub const DISTNAME: &str = "ezQuake";
pub const DISTVER: &str = "0.31";

pub const MAX_NUM_ARGVS: usize = 50;

// ============================================================
// Redirect buffer for Com_Printf
// ============================================================

// Per-thread, so a redirect only captures what its own caller prints.
thread_local! {
    static RD_BUFFER: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Begin redirecting printf output into a buffer.
pub fn com_begin_redirect() {
    RD_BUFFER.with(|b| *b.borrow_mut() = Some(String::new()));
}

/// Stop redirecting and return everything printed since `com_begin_redirect`.
pub fn com_end_redirect() -> String {
    RD_BUFFER.with(|b| b.borrow_mut().take()).unwrap_or_default()
}

/// Print to the console. Output is captured while a redirect is active.
pub fn com_printf(msg: &str) {
    let captured = RD_BUFFER.with(|b| match *b.borrow_mut() {
        Some(ref mut s) => {
            s.push_str(msg);
            true
        }
        None => false,
    });
    if !captured {
        print!("{}", msg);
    }
}

/// Developer-only print.
pub fn com_dprintf(msg: &str) {
    tracing::debug!(target: "console", "{}", msg.trim_end());
}

// ============================================================
// COM argument handling
// ============================================================

#[derive(Debug, Clone, Default)]
pub struct ComArgs {
    argv: Vec<String>,
}

impl ComArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut a = Self::new();
        a.init(args);
        a
    }

    pub fn init(&mut self, args: &[String]) {
        let argc = args.len().min(MAX_NUM_ARGVS);
        self.argv = args[..argc].to_vec();
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    pub fn argv(&self, arg: usize) -> &str {
        self.argv.get(arg).map_or("", String::as_str)
    }

    /// Returns the position (1 to argc-1) of `parm` in the argument list,
    /// or `None` if it is not present.
    pub fn check_parm(&self, parm: &str) -> Option<usize> {
        self.argv
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, a)| a.as_str() == parm)
            .map(|(i, _)| i)
    }

    /// The argument following `parm`, if both are present.
    pub fn parm_value(&self, parm: &str) -> Option<&str> {
        let i = self.check_parm(parm)?;
        self.argv.get(i + 1).map(String::as_str)
    }
}

// ============================================================
// Timing
// ============================================================

static START: OnceLock<Instant> = OnceLock::new();

/// Seconds elapsed since the first call.
pub fn sys_double_time() -> f64 {
    START.get_or_init(Instant::now).elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> ComArgs {
        let v: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        ComArgs::from_args(&v)
    }

    #[test]
    fn test_check_parm_skips_program_name() {
        let a = args(&["-width", "-width", "800"]);
        assert_eq!(a.check_parm("-width"), Some(1));
        assert_eq!(a.parm_value("-width"), Some("800"));
    }

    #[test]
    fn test_parm_value() {
        let a = args(&["ezq", "-width", "800", "-fullscreen"]);
        assert_eq!(a.parm_value("-width"), Some("800"));
        assert_eq!(a.parm_value("-fullscreen"), None);
        assert_eq!(a.check_parm("-fullscreen"), Some(3));
        assert_eq!(a.check_parm("-height"), None);
        assert_eq!(a.argv(10), "");
    }

    #[test]
    fn test_double_time_monotonic() {
        let t0 = sys_double_time();
        let t1 = sys_double_time();
        assert!(t1 >= t0);
    }
}
