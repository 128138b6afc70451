//! A CHIP-8 virtual machine.
//!
//! [`Chip8`] owns the whole machine: 4 KiB of memory with the hex font at
//! 0x000, sixteen V registers, a 128-entry call stack, the delay and sound
//! timers, a 64x32 framebuffer and the hex keypad. Hosts drive it with
//! wall-clock deltas; timers always tick at 60 Hz and instructions run at the
//! configured rate in between.

pub mod chip8;
pub mod config;
pub mod display;
pub mod instruction;
pub mod keypad;
pub mod state;
pub mod timing;

pub use chip8::Chip8;
pub use config::Config;
pub use display::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
