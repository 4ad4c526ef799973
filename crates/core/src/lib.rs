//! speakerdsp core
//!
//! Signal-processing engine for a multi-channel speaker processor: source
//! mixing, per-channel delay, cascaded biquad filtering, make-up gain and
//! output conditioning on fixed-point sample blocks.

pub mod domain;

pub use domain::*;
