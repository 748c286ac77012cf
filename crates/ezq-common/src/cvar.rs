// cvar.rs — dynamic variable tracking
//
// Besides archive and write protection, variables can be locked (`ROM`) or
// bounded (`RULESET_MIN` / `RULESET_MAX`) while a competition ruleset is
// active.

use std::collections::HashMap;

use crate::common::com_printf;
use crate::q_shared::q_atof;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        const ARCHIVE     = 0x0001;
        const NOSET       = 0x0008;
        /// Locked by a ruleset; the user cannot change it.
        const ROM         = 0x0020;
        const RULESET_MIN = 0x0040;
        const RULESET_MAX = 0x0080;
    }
}

/// Outcome of an on-change hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    Accept,
    Reject,
}

impl ChangeVerdict {
    pub fn is_accepted(self) -> bool {
        self == ChangeVerdict::Accept
    }
}

/// Which bound `set_ruleset_limit` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesetLimit {
    Min,
    Max,
}

/// Hook consulted before a user-initiated assignment. Returning `Reject`
/// leaves the variable untouched; the hook prints its own explanation.
pub trait CvarGuard {
    fn on_change(&mut self, cvars: &mut CvarContext, name: &str, value: &str) -> ChangeVerdict;
}

/// A guard that accepts everything.
pub struct NoGuard;

impl CvarGuard for NoGuard {
    fn on_change(&mut self, _cvars: &mut CvarContext, _name: &str, _value: &str) -> ChangeVerdict {
        ChangeVerdict::Accept
    }
}

/// A console variable.
#[derive(Clone, Debug)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: CvarFlags,
    pub value: f32,
    pub ruleset_min: f32,
    pub ruleset_max: f32,
}

/// The full cvar system context.
#[derive(Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    cvar_index: HashMap<String, usize>,
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    pub fn find_var_mut(&mut self, name: &str) -> Option<&mut Cvar> {
        match self.cvar_index.get(name) {
            Some(&idx) => Some(&mut self.cvar_vars[idx]),
            None => None,
        }
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |v| v.value)
    }

    /// Get the string value of a cvar. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        self.find_var(name).map_or("", |v| v.string.as_str())
    }

    pub fn value_by_handle(&self, handle: usize) -> f32 {
        self.cvar_vars.get(handle).map_or(0.0, |v| v.value)
    }

    pub fn string_by_handle(&self, handle: usize) -> &str {
        self.cvar_vars.get(handle).map_or("", |v| v.string.as_str())
    }

    /// Find a cvar, registering it with `value` when it does not exist yet.
    /// An existing cvar keeps its value; `flags` are OR'd in. Without a
    /// value, a missing cvar is not created.
    pub fn get(&mut self, name: &str, value: Option<&str>, flags: CvarFlags) -> Option<usize> {
        match value {
            Some(value) => Some(self.register(name, value, flags)),
            None => {
                let idx = self.find_var_index(name)?;
                self.cvar_vars[idx].flags |= flags;
                Some(idx)
            }
        }
    }

    /// Register a cvar, or find it if it already exists.
    pub fn register(&mut self, name: &str, value: &str, flags: CvarFlags) -> usize {
        if let Some(idx) = self.find_var_index(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            value: q_atof(value),
            ruleset_min: 0.0,
            ruleset_max: 0.0,
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Apply ruleset bounds to an incoming value.
    fn clamp_to_ruleset(var: &Cvar, value: &str) -> Option<String> {
        let v = q_atof(value);
        if var.flags.contains(CvarFlags::RULESET_MAX) && v > var.ruleset_max {
            com_printf(&format!(
                "{} limited to {} by the current ruleset\n",
                var.name, var.ruleset_max
            ));
            return Some(format_value(var.ruleset_max));
        }
        if var.flags.contains(CvarFlags::RULESET_MIN) && v < var.ruleset_min {
            com_printf(&format!(
                "{} limited to {} by the current ruleset\n",
                var.name, var.ruleset_min
            ));
            return Some(format_value(var.ruleset_min));
        }
        None
    }

    fn set2(&mut self, name: &str, value: &str, force: bool) -> usize {
        let idx = match self.find_var_index(name) {
            Some(idx) => idx,
            None => return self.register(name, value, CvarFlags::empty()),
        };

        let mut value = value.to_string();

        if !force {
            let var = &self.cvar_vars[idx];
            if var.flags.contains(CvarFlags::ROM) {
                com_printf(&format!("\"{}\" is write protected\n", name));
                return idx;
            }
            if var.flags.contains(CvarFlags::NOSET) {
                com_printf(&format!("{} is write protected.\n", name));
                return idx;
            }
            if let Some(clamped) = Self::clamp_to_ruleset(var, &value) {
                value = clamped;
            }
        }

        let var = &mut self.cvar_vars[idx];
        if value != var.string {
            var.value = q_atof(&value);
            var.string = value;
        }
        idx
    }

    /// Set a cvar value (respects ROM, NOSET and ruleset bounds).
    pub fn set(&mut self, name: &str, value: &str) -> usize {
        self.set2(name, value, false)
    }

    /// Force-set a cvar value (ignores ROM, NOSET and bounds).
    pub fn force_set(&mut self, name: &str, value: &str) -> usize {
        self.set2(name, value, true)
    }

    /// User-initiated assignment: write protection is checked first, then
    /// `guard` may veto the change.
    pub fn set_guarded(&mut self, name: &str, value: &str, guard: &mut dyn CvarGuard) -> ChangeVerdict {
        if let Some(var) = self.find_var(name) {
            if var.flags.contains(CvarFlags::ROM) {
                com_printf(&format!("\"{}\" is write protected\n", name));
                return ChangeVerdict::Reject;
            }
            if var.flags.contains(CvarFlags::NOSET) {
                com_printf(&format!("{} is write protected.\n", name));
                return ChangeVerdict::Reject;
            }
        }

        if guard.on_change(self, name, value) == ChangeVerdict::Reject {
            return ChangeVerdict::Reject;
        }

        self.set(name, value);
        ChangeVerdict::Accept
    }

    pub fn flags(&self, name: &str) -> CvarFlags {
        self.find_var(name).map_or(CvarFlags::empty(), |v| v.flags)
    }

    pub fn set_flags(&mut self, name: &str, flags: CvarFlags) {
        if let Some(var) = self.find_var_mut(name) {
            var.flags = flags;
        }
    }

    /// Record a ruleset limit on `name`. Does not change the value or flags.
    pub fn set_ruleset_limit(&mut self, name: &str, value: &str, which: RulesetLimit) {
        if let Some(var) = self.find_var_mut(name) {
            match which {
                RulesetLimit::Min => var.ruleset_min = q_atof(value),
                RulesetLimit::Max => var.ruleset_max = q_atof(value),
            }
        }
    }
}

/// Print a float the way cvars store it: integers without a fraction.
pub fn format_value(value: f32) -> String {
    if value == (value as i32) as f32 {
        format!("{}", value as i32)
    } else {
        format!("{}", value)
    }
}
