// Platform layer: window-system adapter, raw mouse input and process exit.

pub mod backend;
pub mod evdev;
pub mod in_mouse;
pub mod keymap;
pub mod signals;
pub mod sys;
pub mod vid_imp;
pub mod vid_mode;
pub mod winit_backend;

#[cfg(test)]
mod mock;
