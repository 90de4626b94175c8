//! Typed pipeline errors, one enum per phase.
//!
//! Every fatal error surfaces as a [`PipelineError`] whose display
//! names the phase and the offending entity, so calling tooling gets a
//! stable diagnostic instead of a raw backtrace.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Kind;

/// Bad or incomplete event records (loader / normalizer).
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("event {index}: not a JSON object")]
    NotAnObject { index: usize },

    #[error("event {index}: missing or unrecognized layout {found:?}")]
    BadLayout { index: usize, found: Option<String> },

    #[error("event {index}: missing or unrecognized audio_type {found:?}")]
    BadKind { index: usize, found: Option<String> },

    #[error("event {index}: {source}")]
    Malformed {
        index: usize,
        source: serde_json::Error,
    },
}

/// Structural defects found while pairing background markers against
/// the foreground sequence.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("background event missing pairing id")]
    MissingPairId,

    #[error("background event {pair_id} missing start/stop action")]
    MissingAction { pair_id: i64 },

    #[error("background stop with id {pair_id} has no matching start")]
    UnmatchedStop { pair_id: i64 },

    #[error("background start with id {pair_id} while a span with that id is still open")]
    DuplicateStart { pair_id: i64 },

    #[error("background span {pair_id} never stopped before end of script")]
    Unterminated { pair_id: i64 },

    #[error("background span {pair_id} has no begin bound (no foreground event while open)")]
    MissingBegin { pair_id: i64 },

    #[error("background span {pair_id} has no end bound")]
    MissingEnd { pair_id: i64 },

    #[error("background span {pair_id} ends before it begins ({begin} > {end})")]
    EndBeforeBegin {
        pair_id: i64,
        begin: usize,
        end: usize,
    },

    #[error("background span {pair_id} covers no foreground events")]
    EmptySpan { pair_id: i64 },
}

/// Events that cannot be routed to a generation job.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read voice map {path}: {source}")]
    VoiceMapRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse voice map {path}: {source}")]
    VoiceMapParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("speech event {sequence_id} has no character")]
    MissingCharacter { sequence_id: usize },

    #[error("no voice profile for character {character:?} (speech event {sequence_id})")]
    UnknownCharacter {
        character: String,
        sequence_id: usize,
    },

    #[error("background span {pair_id} has unroutable kind {kind:?}")]
    UnroutableBackground { pair_id: i64, kind: Kind },
}

/// External rendering-service failures; always fatal to the run.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("job {slot}: {cause:#}")]
    Render { slot: String, cause: anyhow::Error },

    #[error("job {slot}: failed to prepare reference audio: {cause:#}")]
    Reference { slot: String, cause: anyhow::Error },

    #[error("job {slot}: failed to write output: {source}")]
    Write {
        slot: String,
        source: std::io::Error,
    },
}

/// Measurement / stretch / mix invariant violations.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no foreground clips to assemble")]
    EmptyForeground,

    #[error("clip {slot}: {cause:#}")]
    Clip { slot: String, cause: anyhow::Error },

    #[error("background {slot}: stretch target {target_seconds}s is not positive")]
    BadStretchTarget { slot: String, target_seconds: f64 },

    #[error("background {slot}: seed clip is empty")]
    EmptySeed { slot: String },
}

/// Umbrella error for the whole run; display names the failing phase.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("normalize: {0}")]
    Schema(#[from] SchemaError),

    #[error("link: {0}")]
    Link(#[from] LinkError),

    #[error("plan: {0}")]
    Plan(#[from] PlanError),

    #[error("generate: {0}")]
    Generation(#[from] GenerationError),

    #[error("assemble: {0}")]
    Assembly(#[from] AssemblyError),
}

impl PipelineError {
    /// Name of the phase the error belongs to.
    pub fn phase(&self) -> &'static str {
        match self {
            PipelineError::Schema(_) => "normalize",
            PipelineError::Link(_) => "link",
            PipelineError::Plan(_) => "plan",
            PipelineError::Generation(_) => "generate",
            PipelineError::Assembly(_) => "assemble",
        }
    }
}
