// rulesets.rs -- competition rulesets
//
// A ruleset is a named bundle of cvar constraints. Exactly one is active;
// switching first reverts everything the previous one touched, then applies
// the new table.

use ezq_common::common::{com_dprintf, com_printf, ComArgs};
use ezq_common::cvar::{ChangeVerdict, CvarContext, CvarFlags, RulesetLimit};
use ezq_common::q_shared::q_atof;

use crate::client::{ClientHooks, ClientState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ruleset {
    #[default]
    Default,
    Smackdown,
    Mtfl,
}

impl Ruleset {
    pub const ALL: [Ruleset; 3] = [Ruleset::Default, Ruleset::Smackdown, Ruleset::Mtfl];

    pub fn name(self) -> &'static str {
        match self {
            Ruleset::Default => "default",
            Ruleset::Smackdown => "smackdown",
            Ruleset::Mtfl => "MTFL",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Ruleset::Default => "default",
            Ruleset::Smackdown => "Smackdown",
            Ruleset::Mtfl => "MTFL",
        }
    }

    /// Case-insensitive lookup of a ruleset name.
    pub fn from_name(name: &str) -> Option<Ruleset> {
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(name.trim()))
    }

    fn cvars(self) -> &'static [RulesetCvar] {
        match self {
            Ruleset::Default => &[],
            Ruleset::Smackdown => SMACKDOWN_CVARS,
            Ruleset::Mtfl => MTFL_CVARS,
        }
    }
}

/// How a ruleset constrains one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CvarEffect {
    /// Forced to this value and made read-only.
    Locked(&'static str),
    /// The user may pick any value up to this one.
    MaxBound(&'static str),
    /// The user may pick any value down to this one.
    MinBound(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct RulesetCvar {
    pub name: &'static str,
    pub effect: CvarEffect,
}

const fn locked(name: &'static str, value: &'static str) -> RulesetCvar {
    RulesetCvar { name, effect: CvarEffect::Locked(value) }
}

static SMACKDOWN_CVARS: &[RulesetCvar] = &[
    locked("cl_hud", "0"),       // arbitrary on-screen text and message filtering
    locked("cl_rollalpha", "20"), // see enemies dodge without rolling yourself
    locked("r_shiftbeam", "0"),
];

// Only applied while independent physics is on.
static SMACKDOWN_INDPHYS_CVARS: &[RulesetCvar] = &[locked("cl_c2spps", "0")];

static MTFL_CVARS: &[RulesetCvar] = &[
    locked("r_drawflat", "0"),
    locked("amf_detpacklights", "0"),
    locked("vid_hwgammacontrol", "1"),
    locked("gl_textureless", "0"),
    locked("r_fullbrightSkins", "0"),
    locked("cl_c2spps", "0"),
    RulesetCvar { name: "gl_picmip", effect: CvarEffect::MaxBound("3") },
    RulesetCvar { name: "gl_max_size", effect: CvarEffect::MinBound("512") },
];

/// Policy values derived from the active ruleset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RulesetDef {
    pub ruleset: Ruleset,
    pub max_fps: f32,
    pub restrict_triggers: bool,
    pub restrict_packet: bool,
    pub restrict_particles: bool,
}

impl RulesetDef {
    pub const BASELINE: RulesetDef = RulesetDef {
        ruleset: Ruleset::Default,
        max_fps: 72.0,
        restrict_triggers: false,
        restrict_packet: false,
        restrict_particles: false,
    };

    pub fn for_ruleset(ruleset: Ruleset) -> RulesetDef {
        match ruleset {
            Ruleset::Smackdown => RulesetDef {
                ruleset,
                max_fps: 77.0,
                restrict_triggers: true,
                // packet could be abused as an external timer
                restrict_packet: true,
                restrict_particles: true,
            },
            _ => RulesetDef { ruleset, ..Self::BASELINE },
        }
    }
}

impl Default for RulesetDef {
    fn default() -> Self {
        Self::BASELINE
    }
}

/// Model categories the external-texture policy distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelHint {
    Normal,
    Eyes,
    Backpack,
}

/// What a cvar looked like before the active ruleset touched it.
#[derive(Debug, Clone)]
struct SavedCvar {
    name: &'static str,
    string: String,
    flags: CvarFlags,
    /// Locked values are put back on exit; bounded ones keep what the user
    /// chose inside the bound.
    restore_value: bool,
}

#[derive(Debug, Default)]
pub struct Rulesets {
    def: RulesetDef,
    saved: Vec<SavedCvar>,
}

impl Rulesets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the `ruleset` cvar and apply `-ruleset <name>` if given.
    pub fn init(
        &mut self,
        cvars: &mut CvarContext,
        args: &ComArgs,
        client: &ClientState,
        hooks: &mut dyn ClientHooks,
    ) {
        cvars.register("ruleset", "default", CvarFlags::empty());

        let Some(requested) = args.parm_value("-ruleset") else {
            return;
        };

        match Ruleset::from_name(requested) {
            Some(r @ (Ruleset::Smackdown | Ruleset::Mtfl)) => {
                let name = r.name().to_ascii_lowercase();
                if self.on_change_ruleset(cvars, client, hooks, &name).is_accepted() {
                    cvars.set("ruleset", &name);
                }
            }
            _ => self.def = RulesetDef::BASELINE,
        }
    }

    pub fn current(&self) -> Ruleset {
        self.def.ruleset
    }

    pub fn def(&self) -> &RulesetDef {
        &self.def
    }

    /// On-change hook of the `ruleset` cvar. Only allowed while disconnected.
    pub fn on_change_ruleset(
        &mut self,
        cvars: &mut CvarContext,
        client: &ClientState,
        hooks: &mut dyn ClientHooks,
        value: &str,
    ) -> ChangeVerdict {
        if !client.is_disconnected() {
            com_printf("ruleset can be changed only in disconnected mode\n");
            return ChangeVerdict::Reject;
        }

        let Some(target) = Ruleset::from_name(value) else {
            com_printf(&format!("Unknown ruleset \"{}\"\n", value));
            return ChangeVerdict::Reject;
        };

        self.leave(cvars);

        // custom textures (eyes, backpack) must be reloaded under the new rules
        hooks.cache_flush();

        self.enter(cvars, target);

        hooks.reinit_all_macros();

        com_printf(&format!("Ruleset {} initialized\n", target.title()));
        tracing::info!(ruleset = target.name(), overrides = self.saved.len(), "ruleset changed");
        ChangeVerdict::Accept
    }

    /// Undo every override of the active ruleset.
    fn leave(&mut self, cvars: &mut CvarContext) {
        for saved in self.saved.drain(..).rev() {
            if saved.restore_value {
                cvars.force_set(saved.name, &saved.string);
            }
            cvars.set_flags(saved.name, saved.flags);
        }
        self.def = RulesetDef::BASELINE;
    }

    fn enter(&mut self, cvars: &mut CvarContext, ruleset: Ruleset) {
        for entry in ruleset.cvars() {
            self.apply(cvars, entry);
        }

        if ruleset == Ruleset::Smackdown && cvars.variable_value("cl_independentPhysics") != 0.0 {
            for entry in SMACKDOWN_INDPHYS_CVARS {
                self.apply(cvars, entry);
            }
        }

        self.def = RulesetDef::for_ruleset(ruleset);
    }

    fn apply(&mut self, cvars: &mut CvarContext, entry: &RulesetCvar) {
        let default = match entry.effect {
            CvarEffect::Locked(v) | CvarEffect::MaxBound(v) | CvarEffect::MinBound(v) => v,
        };
        cvars.register(entry.name, default, CvarFlags::empty());

        let flags = cvars.flags(entry.name);
        self.saved.push(SavedCvar {
            name: entry.name,
            string: cvars.variable_string(entry.name).to_string(),
            flags,
            restore_value: matches!(entry.effect, CvarEffect::Locked(_)),
        });

        match entry.effect {
            CvarEffect::Locked(v) => {
                cvars.force_set(entry.name, v);
                cvars.set_flags(entry.name, flags | CvarFlags::ROM);
            }
            CvarEffect::MaxBound(v) => {
                cvars.set_ruleset_limit(entry.name, v, RulesetLimit::Max);
                cvars.set_flags(entry.name, flags | CvarFlags::RULESET_MAX);
                if cvars.variable_value(entry.name) > q_atof(v) {
                    cvars.force_set(entry.name, v);
                }
            }
            CvarEffect::MinBound(v) => {
                cvars.set_ruleset_limit(entry.name, v, RulesetLimit::Min);
                cvars.set_flags(entry.name, flags | CvarFlags::RULESET_MIN);
                if cvars.variable_value(entry.name) < q_atof(v) {
                    cvars.force_set(entry.name, v);
                }
            }
        }
        com_dprintf(&format!("ruleset: {} -> {:?}\n", entry.name, entry.effect));
    }

    // ============================================================
    // Policy queries
    // ============================================================

    pub fn ruleset_name(&self) -> &'static str {
        self.def.ruleset.name()
    }

    /// Frame-rate cap. Multiview demo playback renders every view per frame.
    pub fn max_fps(&self, client: &ClientState) -> f32 {
        if client.multiview && client.mvdplayback {
            return client.num_views as f32 * self.def.max_fps;
        }
        self.def.max_fps
    }

    pub fn restrict_triggers(&self) -> bool {
        self.def.restrict_triggers
    }

    /// Spectators, demo playback and standby are never restricted.
    pub fn restrict_packet(&self, client: &ClientState) -> bool {
        !client.spectator && !client.demoplayback && !client.standby && self.def.restrict_packet
    }

    pub fn restrict_particles(&self, client: &ClientState) -> bool {
        !client.spectator
            && !client.demoplayback
            && !client.standby
            && self.def.restrict_particles
            && !client.allow_cheats
    }

    pub fn disallow_external_texture(&self, hint: ModelHint) -> bool {
        match hint {
            ModelHint::Eyes => true,
            ModelHint::Backpack => self.def.ruleset == Ruleset::Smackdown,
            ModelHint::Normal => false,
        }
    }

    pub fn allow_timerefresh(&self, client: &ClientState) -> bool {
        match self.def.ruleset {
            Ruleset::Smackdown => client.standby || client.spectator || client.demoplayback,
            _ => true,
        }
    }

    pub fn allow_no_shadows(&self) -> bool {
        !matches!(self.def.ruleset, Ruleset::Smackdown | Ruleset::Mtfl)
    }
}
