//! # pacer-sim
//!
//! Plausible along-route GPS sequences for virtual runners, pinned to a
//! seed so every run of the same configuration produces byte-identical
//! fixes. Used to exercise the correction pipeline end to end without
//! hardware, and to pin the deterministic semantics the core's
//! scenario tests rely on.

pub mod generator;
pub mod sample;

pub use generator::{SimConfig, VirtualRunner, generate_runners, interleave};
pub use sample::SAMPLE_GPX;
