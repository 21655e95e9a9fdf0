//! Melodic sequencing: a golden-ratio ladder walked in Fibonacci-sized
//! steps, with notes spaced by a golden-ratio rhythm.
//!
//! Everything here is deterministic: given the same base frequency and the
//! same number of calls, the same pitches come out in the same order.

pub mod rhythm;
pub mod scale;
pub mod walker;

pub use rhythm::RhythmPattern;
pub use scale::{PHI, build_fibonacci, build_scale};
pub use walker::MelodicWalker;
