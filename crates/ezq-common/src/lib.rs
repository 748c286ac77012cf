// Shared engine services: console output, start-up parameters, cvars and key codes

pub mod common;
pub mod cvar;
pub mod keys;
pub mod q_shared;
