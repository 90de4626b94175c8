//! Two-group job execution.
//!
//! The ambient and speech groups target independent services and have
//! no data dependency on each other, so they run on separate worker
//! threads; within a group, jobs run in plan order. Any job failure
//! is fatal to the run. Every job owns a distinct slot, so the
//! workers never contend on a file.

use std::path::{Path, PathBuf};

use crate::cache::{RenderCache, request_fingerprint};
use crate::error::GenerationError;
use crate::plan::planner::{GenerationJob, JobPayload, RenderPlan};
use crate::render::client::{AmbientRequest, Renderer, SpeechRequest, prepare_reference};

/// Dispatcher configuration.
#[derive(Debug)]
pub struct DispatchOptions {
    /// Rendered-clip cache; None disables caching.
    pub cache: Option<RenderCache>,
    /// Directory for converted voice-reference uploads.
    pub reference_dir: PathBuf,
}

/// Short slot identity for diagnostics.
fn slot_name(slot: &Path) -> String {
    slot.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| slot.display().to_string())
}

/// Write rendered bytes to a slot via temp file + rename.
fn write_slot(slot: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = slot.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.persist(slot).map_err(|e| e.error)?;
    Ok(())
}

/// Cache fingerprint for a job's payload.
fn fingerprint(payload: &JobPayload) -> String {
    match payload {
        JobPayload::Ambient {
            prompt,
            duration,
            volume,
        } => request_fingerprint(&["ambient", prompt, &duration.to_string(), &volume.to_string()]),
        JobPayload::Speech {
            text,
            character,
            voice,
            volume,
        } => {
            let wav = voice
                .wav_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            let npz = voice
                .npz_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
            request_fingerprint(&[
                "speech",
                text,
                character,
                &voice.asr_text,
                &wav,
                &npz,
                &volume.to_string(),
            ])
        }
    }
}

/// Render one job into its slot.
fn run_job(
    job: &GenerationJob,
    renderer: &dyn Renderer,
    options: &DispatchOptions,
) -> Result<(), GenerationError> {
    let slot = slot_name(&job.slot);
    log::debug!("job {} -> {}", job.job_id, slot);
    let key = fingerprint(&job.payload);

    if let Some(cache) = &options.cache {
        if let Some(cached) = cache.lookup(&key) {
            let copy = || -> std::io::Result<()> {
                if let Some(parent) = job.slot.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&cached, &job.slot)?;
                Ok(())
            };
            return copy().map_err(|source| GenerationError::Write { slot, source });
        }
    }

    let bytes = match &job.payload {
        JobPayload::Ambient {
            prompt,
            duration,
            volume,
        } => {
            log::info!("ambient [{}] {:.1}s: {}", slot, duration, prompt);
            let request = AmbientRequest {
                prompt: prompt.clone(),
                duration: *duration,
                volume: *volume,
                negative_prompt: " ".to_string(),
            };
            renderer
                .render_ambient(&request)
                .map_err(|cause| GenerationError::Render {
                    slot: slot.clone(),
                    cause,
                })?
        }
        JobPayload::Speech {
            text,
            character,
            voice,
            volume,
        } => {
            log::info!("speech [{}] {}: {}", slot, character, text);
            let source =
                voice
                    .wav_path
                    .as_ref()
                    .ok_or_else(|| GenerationError::Reference {
                        slot: slot.clone(),
                        cause: anyhow::anyhow!(
                            "voice profile for {:?} has no reference recording",
                            character
                        ),
                    })?;
            let reference_audio = prepare_reference(source, &options.reference_dir)
                .map_err(|cause| GenerationError::Reference {
                    slot: slot.clone(),
                    cause,
                })?;
            let request = SpeechRequest {
                text: text.clone(),
                reference_transcript: voice.asr_text.clone(),
                reference_audio,
                voice_id: voice
                    .npz_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
                speed: 1.0,
                normalize: true,
                volume: *volume,
            };
            renderer
                .render_speech(&request)
                .map_err(|cause| GenerationError::Render {
                    slot: slot.clone(),
                    cause,
                })?
        }
    };

    write_slot(&job.slot, &bytes).map_err(|source| GenerationError::Write {
        slot: slot.clone(),
        source,
    })?;

    if let Some(cache) = &options.cache {
        if let Err(e) = cache.store(&key, &bytes) {
            log::warn!("failed to cache render for {}: {:#}", slot, e);
        }
    }
    Ok(())
}

/// Run one job group to completion, in order.
fn run_group(
    label: &str,
    jobs: &[GenerationJob],
    renderer: &dyn Renderer,
    options: &DispatchOptions,
) -> Result<(), GenerationError> {
    log::info!("{} group: {} job(s)", label, jobs.len());
    for job in jobs {
        run_job(job, renderer, options)?;
    }
    log::info!("{} group complete", label);
    Ok(())
}

/// Execute the whole plan: ambient and speech groups concurrently,
/// joined before returning. Every slot file exists on success.
pub fn dispatch(
    plan: &RenderPlan,
    renderer: &dyn Renderer,
    options: &DispatchOptions,
) -> Result<(), GenerationError> {
    log::debug!("dispatching via {} backend", renderer.name());
    std::thread::scope(|scope| {
        let ambient =
            scope.spawn(|| run_group("ambient", &plan.ambient_jobs, renderer, options));
        let speech = scope.spawn(|| run_group("speech", &plan.speech_jobs, renderer, options));

        let ambient_result = ambient.join().expect("ambient worker panicked");
        let speech_result = speech.join().expect("speech worker panicked");
        ambient_result.and(speech_result)
    })
}
