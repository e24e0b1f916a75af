//! BWT Emulator Library
//!
//! This library emulates the input pipeline of the Braille Writing Tutor:
//! button transitions become bytecode on a serial-style transport, glyphs are
//! typed as timed dot pulses, and button activity can be recorded, replayed,
//! and scripted.

// Module declarations
pub mod cli;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod models;
pub mod services;
pub mod transport;
#[cfg(feature = "web")]
pub mod web;
