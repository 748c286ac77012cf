// Client-side policy: session state, competition rulesets and the cvar hooks
// that enforce them.

pub mod client;
pub mod cvar_guards;
pub mod rulesets;
