//! The assembly engine: measure, place, stretch, concatenate, mix.
//!
//! Runs strictly after every generation job has written its slot.
//! Steps are sequential; each consumes the previous step's output.
//! Mixing is pure summation of already-normalized clips, so the final
//! mix duration always equals the foreground master duration.

use std::path::{Path, PathBuf};

use crate::assembly::offsets::place;
use crate::audio::io::{read_wav, read_wav_at, wav_duration, write_wav};
use crate::audio::mix::{concatenate, loop_to_length, overlay_at, seconds_to_samples};
use crate::error::AssemblyError;
use crate::plan::planner::RenderPlan;
use crate::types::RenderedClip;

/// File name of the concatenated foreground track.
pub const FOREGROUND_NAME: &str = "foreground.wav";

/// File name of the final mix.
pub const MIX_NAME: &str = "final_mix.wav";

/// A background track's computed placement, kept for the manifest.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Placement {
    pub slot: PathBuf,
    pub offset_seconds: f64,
    pub span_seconds: f64,
}

/// Everything the assembly produced.
#[derive(Debug, Clone)]
pub struct AssemblyOutput {
    pub mix_path: PathBuf,
    pub foreground_path: PathBuf,
    pub master_seconds: f64,
    pub sample_rate: u32,
    /// Measured foreground clips in sequence order.
    pub clips: Vec<RenderedClip>,
    pub placements: Vec<Placement>,
}

fn slot_name(slot: &Path) -> String {
    slot.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| slot.display().to_string())
}

fn clip_error(slot: &Path, cause: anyhow::Error) -> AssemblyError {
    AssemblyError::Clip {
        slot: slot_name(slot),
        cause,
    }
}

/// Assemble the final mix from rendered slots.
///
/// `out_dir` receives the foreground master and the final mix;
/// stretched background clips are written back over their seed slots.
pub fn assemble(plan: &RenderPlan, out_dir: &Path) -> Result<AssemblyOutput, AssemblyError> {
    if plan.foreground_slots.is_empty() {
        return Err(AssemblyError::EmptyForeground);
    }

    // 1. Measure rendered foreground durations; these are the only
    //    authority for background placement.
    let mut clips = Vec::with_capacity(plan.foreground_slots.len());
    for slot in &plan.foreground_slots {
        let duration_seconds = wav_duration(slot).map_err(|e| clip_error(slot, e))?;
        clips.push(RenderedClip {
            path: slot.clone(),
            duration_seconds,
        });
    }
    let durations: Vec<f64> = clips.iter().map(|c| c.duration_seconds).collect();

    // 2. The first clip sets the master rate.
    let (first, master_rate) = read_wav(&plan.foreground_slots[0])
        .map_err(|e| clip_error(&plan.foreground_slots[0], e))?;
    let mut foreground_buffers = vec![first];
    for slot in &plan.foreground_slots[1..] {
        let samples = read_wav_at(slot, master_rate).map_err(|e| clip_error(slot, e))?;
        foreground_buffers.push(samples);
    }

    // 3. Concatenate the foreground master, gapless, in sequence
    //    order.
    let mut master = concatenate(&foreground_buffers);
    drop(foreground_buffers);
    let master_seconds = master.len() as f64 / master_rate as f64;
    let foreground_path = out_dir.join(FOREGROUND_NAME);
    write_wav(&foreground_path, &master, master_rate)
        .map_err(|e| clip_error(&foreground_path, e))?;
    log::info!(
        "foreground master: {} clip(s), {:.2}s",
        clips.len(),
        master_seconds
    );

    // 4. Loop-stretch each background seed to its measured span and
    //    overlay it at its measured offset.
    let mut placements = Vec::with_capacity(plan.background_tracks.len());
    for track in &plan.background_tracks {
        let (offset_seconds, span_seconds) = place(&durations, track.begin, track.end);
        if span_seconds <= 0.0 {
            return Err(AssemblyError::BadStretchTarget {
                slot: slot_name(&track.slot),
                target_seconds: span_seconds,
            });
        }

        let seed = read_wav_at(&track.slot, master_rate).map_err(|e| clip_error(&track.slot, e))?;
        if seed.is_empty() {
            return Err(AssemblyError::EmptySeed {
                slot: slot_name(&track.slot),
            });
        }

        let target_len = seconds_to_samples(span_seconds, master_rate);
        let stretched = loop_to_length(&seed, target_len);
        // The seed has served its purpose; the slot now holds the
        // exact-length rendering.
        write_wav(&track.slot, &stretched, master_rate)
            .map_err(|e| clip_error(&track.slot, e))?;

        let offset = seconds_to_samples(offset_seconds, master_rate);
        overlay_at(&mut master, &stretched, offset);
        log::info!(
            "background {}: offset {:.2}s, span {:.2}s",
            slot_name(&track.slot),
            offset_seconds,
            span_seconds
        );
        placements.push(Placement {
            slot: track.slot.clone(),
            offset_seconds,
            span_seconds,
        });
    }

    // 5. The mix inherits the master's length exactly.
    let mix_path = out_dir.join(MIX_NAME);
    write_wav(&mix_path, &master, master_rate).map_err(|e| clip_error(&mix_path, e))?;
    log::info!("final mix: {} ({:.2}s)", mix_path.display(), master_seconds);

    Ok(AssemblyOutput {
        mix_path,
        foreground_path,
        master_seconds,
        sample_rate: master_rate,
        clips,
        placements,
    })
}
