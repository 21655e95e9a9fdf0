//! DSP building blocks, pure Rust and sample-at-a-time.
//!
//! The engine assembles these into the melodic chain, the binaural pair and
//! the ambient recipes. Nothing here allocates per sample.

pub mod envelope;
pub mod filter;
pub mod modulation;
pub mod noise;
pub mod oscillator;
pub mod percussion;
pub mod ramp;
pub mod reverb;
pub mod voice;
