//! Post-generation assembly: duration measurement, offset math,
//! loop-stretch, concatenation, and the final mix.

pub mod engine;
pub mod offsets;
