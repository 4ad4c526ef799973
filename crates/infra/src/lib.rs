//! Runtime infrastructure for speakerdsp
//!
//! Everything that moves samples in and out of an `Engine`.

pub mod audio;

pub use audio::*;
