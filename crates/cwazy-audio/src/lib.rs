//! cpal-backed audio host for the CW receiver simulator.
//!
//! The control thread edits the graph through a lock-free command queue;
//! the output callback applies the edits, renders, and counts frames for
//! the session clock.

mod device;
mod filter;
pub mod host;
mod noise;
mod oscillator;
mod render;

pub use host::{CpalContext, CpalHost};
