//! Timeline-to-job planning.
//!
//! Turns a linked timeline into two independent generation job groups
//! (ambient and speech) plus the slot bookkeeping the assembly engine
//! needs later. Planning is pure bookkeeping: it fails fast on
//! unroutable events before any external service is touched.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::PlanError;
use crate::plan::slots::SlotNamer;
use crate::plan::voices::{VoiceMap, VoiceProfile};
use crate::types::{Kind, Layout, Timeline};

/// Seed length for background clips, in seconds.
///
/// The true span length is unknown until foreground durations are
/// measured; the seed is loop-stretched to fit during assembly.
pub const BACKGROUND_SEED_SECONDS: f64 = 30.0;

/// Duration used for foreground sound/music events that omit `len`.
pub const DEFAULT_AMBIENT_SECONDS: f64 = 8.0;

/// What a single generation job asks the external service for.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPayload {
    Ambient {
        prompt: String,
        duration: f64,
        volume: f64,
    },
    Speech {
        text: String,
        character: String,
        voice: VoiceProfile,
        volume: f64,
    },
}

/// One request to an external rendering service, executed exactly
/// once and writing exactly one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationJob {
    pub job_id: Uuid,
    pub slot: PathBuf,
    pub payload: JobPayload,
}

/// A background slot awaiting loop-stretch, with its foreground
/// interval.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundTrack {
    pub slot: PathBuf,
    pub begin: usize,
    pub end: usize,
}

/// The full generation plan: two independent job groups plus the
/// deferred assembly inputs.
#[derive(Debug, Clone, Default)]
pub struct RenderPlan {
    /// Sound-effect and music jobs, foreground and background.
    pub ambient_jobs: Vec<GenerationJob>,
    /// Speech jobs.
    pub speech_jobs: Vec<GenerationJob>,
    /// Foreground slots in sequence order.
    pub foreground_slots: Vec<PathBuf>,
    /// Background slots with their resolved intervals, in script
    /// order of their start markers.
    pub background_tracks: Vec<BackgroundTrack>,
}

impl RenderPlan {
    pub fn job_count(&self) -> usize {
        self.ambient_jobs.len() + self.speech_jobs.len()
    }
}

/// Options controlling the planner.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Directory the slots live in.
    pub clip_dir: PathBuf,
    /// Seed length for background clips.
    pub seed_seconds: f64,
}

impl PlanOptions {
    pub fn new(clip_dir: &Path) -> Self {
        Self {
            clip_dir: clip_dir.to_path_buf(),
            seed_seconds: BACKGROUND_SEED_SECONDS,
        }
    }
}

/// Build a [`RenderPlan`] from a timeline and voice map.
pub fn plan(
    timeline: &Timeline,
    voices: &VoiceMap,
    options: &PlanOptions,
) -> Result<RenderPlan, PlanError> {
    let mut namer = SlotNamer::new();
    let mut out = RenderPlan::default();

    for (sequence_id, event) in timeline.foreground.iter().enumerate() {
        let name = namer.next(event.layout, event.kind, &event.description);
        let slot = options.clip_dir.join(&name);
        out.foreground_slots.push(slot.clone());

        match event.kind {
            Kind::Speech => {
                let character = event
                    .character
                    .clone()
                    .ok_or(PlanError::MissingCharacter { sequence_id })?;
                let voice = voices
                    .get(&character)
                    .cloned()
                    .ok_or_else(|| PlanError::UnknownCharacter {
                        character: character.clone(),
                        sequence_id,
                    })?;
                out.speech_jobs.push(GenerationJob {
                    job_id: Uuid::new_v4(),
                    slot,
                    payload: JobPayload::Speech {
                        text: event.description.clone(),
                        character,
                        voice,
                        volume: event.volume,
                    },
                });
            }
            Kind::SoundEffect | Kind::Music => {
                out.ambient_jobs.push(GenerationJob {
                    job_id: Uuid::new_v4(),
                    slot,
                    payload: JobPayload::Ambient {
                        prompt: event.description.clone(),
                        duration: event.duration.unwrap_or(DEFAULT_AMBIENT_SECONDS),
                        volume: event.volume,
                    },
                });
            }
        }
    }

    for span in &timeline.background {
        let event = &span.event;
        if event.kind == Kind::Speech {
            return Err(PlanError::UnroutableBackground {
                pair_id: span.pair_id(),
                kind: event.kind,
            });
        }

        let name = namer.next(Layout::Background, event.kind, &event.description);
        let slot = options.clip_dir.join(&name);
        out.ambient_jobs.push(GenerationJob {
            job_id: Uuid::new_v4(),
            slot: slot.clone(),
            payload: JobPayload::Ambient {
                prompt: event.description.clone(),
                duration: options.seed_seconds,
                volume: event.volume,
            },
        });
        out.background_tracks.push(BackgroundTrack {
            slot,
            begin: span.begin,
            end: span.end,
        });
    }

    log::info!(
        "planned {} ambient and {} speech jobs ({} foreground, {} background)",
        out.ambient_jobs.len(),
        out.speech_jobs.len(),
        out.foreground_slots.len(),
        out.background_tracks.len()
    );
    Ok(out)
}
