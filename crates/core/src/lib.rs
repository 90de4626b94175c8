//! Soundloom core — declarative audio-script rendering pipeline.
//!
//! Takes a script of narrated and ambient audio events, renders each
//! event through external generation services, and assembles the
//! results into one mixed track. Data flows strictly forward:
//! loader → normalizer → linker → planner → dispatcher → assembly,
//! with one feedback point: background placement depends on measured
//! foreground durations, which exist only after rendering.

pub mod assembly;
pub mod audio;
pub mod cache;
pub mod error;
pub mod plan;
pub mod render;
pub mod script;
pub mod types;

pub use error::PipelineError;
pub use types::{AudioEvent, BackgroundSpan, Kind, Layout, Timeline};
