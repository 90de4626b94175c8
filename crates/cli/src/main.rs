//! Soundloom CLI — render declarative audio scripts into a single mix.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use soundloom_core::assembly::engine::{AssemblyOutput, assemble};
use soundloom_core::cache::RenderCache;
use soundloom_core::plan::planner::{
    BACKGROUND_SEED_SECONDS, JobPayload, PlanOptions, RenderPlan, plan,
};
use soundloom_core::plan::voices::load_voice_map;
use soundloom_core::render::client::get_renderer;
use soundloom_core::render::dispatch::{DispatchOptions, dispatch};
use soundloom_core::script::{linker, loader, normalize};
use soundloom_core::types::Timeline;

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "soundloom",
    about = "Render declarative audio scripts into a single mixed track",
    version,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full pipeline: link, generate, and mix
    Render(RenderArgs),
    /// Dry run: link and print the generation plan, no external calls
    Plan(PlanArgs),
    /// Re-assemble from already-rendered clips
    Assemble(AssembleArgs),
}

// ─── Shared arguments ────────────────────────────────────────────

#[derive(Parser, Debug)]
struct SharedArgs {
    /// Script file, one JSON event per line
    script: PathBuf,

    /// Character-to-voice profile map (JSON)
    #[arg(long)]
    voices: PathBuf,

    /// Output directory
    #[arg(long, default_value = "./soundloom-output")]
    output_dir: PathBuf,

    /// Show verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

// ─── Render ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Generate every event and assemble the final mix")]
struct RenderArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Base URL of the rendering services
    #[arg(long, default_value = "http://localhost:8000")]
    service_url: String,

    /// Per-request timeout in seconds (generation is slow)
    #[arg(long, default_value_t = 300)]
    request_timeout: u64,

    /// Seed length for background clips in seconds
    #[arg(long, default_value_t = BACKGROUND_SEED_SECONDS)]
    seed_duration: f64,

    /// Disable the rendered-clip cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Archive the per-event clips next to the mix
    #[arg(long, default_value_t = false)]
    zip_clips: bool,
}

// ─── Plan ────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Validate the script and print the generation plan")]
struct PlanArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Seed length for background clips in seconds
    #[arg(long, default_value_t = BACKGROUND_SEED_SECONDS)]
    seed_duration: f64,
}

// ─── Assemble ────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Measure and mix clips rendered by an earlier run")]
struct AssembleArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Seed length for background clips in seconds
    #[arg(long, default_value_t = BACKGROUND_SEED_SECONDS)]
    seed_duration: f64,
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Command::Render(a) if a.shared.verbose => "debug",
        Command::Plan(a) if a.shared.verbose => "debug",
        Command::Assemble(a) if a.shared.verbose => "debug",
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Render(args) => run_render(args),
        Command::Plan(args) => run_plan(args),
        Command::Assemble(args) => run_assemble(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

/// File name of a slot, for display.
fn slot_label(slot: &Path) -> String {
    slot.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| slot.display().to_string())
}

/// Load, normalize, and link the script.
fn build_timeline(script: &Path) -> Result<Timeline> {
    let values = loader::load_script(script).map_err(soundloom_core::PipelineError::from)?;
    let events = normalize::normalize_events(values).map_err(soundloom_core::PipelineError::from)?;
    let timeline = linker::link(events).map_err(soundloom_core::PipelineError::from)?;
    log::info!(
        "linked timeline: {} foreground event(s), {} background span(s)",
        timeline.foreground.len(),
        timeline.background.len()
    );
    Ok(timeline)
}

/// Build the generation plan for a script.
fn build_plan(shared: &SharedArgs, seed_duration: f64) -> Result<RenderPlan> {
    let timeline = build_timeline(&shared.script)?;
    let voices = load_voice_map(&shared.voices).map_err(soundloom_core::PipelineError::from)?;
    let mut options = PlanOptions::new(&shared.output_dir.join("audio"));
    options.seed_seconds = seed_duration;
    let render_plan =
        plan(&timeline, &voices, &options).map_err(soundloom_core::PipelineError::from)?;
    Ok(render_plan)
}

/// Write the run manifest next to the output audio.
fn write_manifest(shared: &SharedArgs, output: &AssemblyOutput) -> Result<()> {
    let manifest = serde_json::json!({
        "script": shared.script,
        "sample_rate": output.sample_rate,
        "foreground": output.clips,
        "background": output.placements,
        "foreground_master": output.foreground_path,
        "mix": output.mix_path,
        "mix_seconds": output.master_seconds,
    });
    let path = shared.output_dir.join("manifest.json");
    std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("failed to write manifest: {}", path.display()))?;
    log::info!("manifest: {}", path.display());
    Ok(())
}

/// Archive the per-event clips into clips.zip.
fn zip_clips(clip_dir: &Path, output_dir: &Path) -> Result<()> {
    let zip_path = output_dir.join("clips.zip");
    let zip_file = std::fs::File::create(&zip_path)?;
    let mut zip = zip::ZipWriter::new(zip_file);
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in std::fs::read_dir(clip_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map(|e| e == "wav").unwrap_or(false) {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            zip.start_file(&name, options)?;
            let data = std::fs::read(&path)?;
            std::io::Write::write_all(&mut zip, &data)?;
        }
    }
    zip.finish()?;
    log::info!("created {}", zip_path.display());
    Ok(())
}

// ─── Render runner ───────────────────────────────────────────────

fn run_render(args: RenderArgs) -> Result<()> {
    let render_plan = build_plan(&args.shared, args.seed_duration)?;
    let clip_dir = args.shared.output_dir.join("audio");
    std::fs::create_dir_all(&clip_dir)?;

    let renderer = get_renderer(
        &args.service_url,
        Duration::from_secs(args.request_timeout),
    )?;
    let dispatch_options = DispatchOptions {
        cache: if args.no_cache {
            None
        } else {
            Some(RenderCache::at_default_location())
        },
        reference_dir: args.shared.output_dir.join("refs"),
    };
    dispatch(&render_plan, renderer.as_ref(), &dispatch_options)
        .map_err(soundloom_core::PipelineError::from)?;

    let output =
        assemble(&render_plan, &clip_dir).map_err(soundloom_core::PipelineError::from)?;
    write_manifest(&args.shared, &output)?;

    if args.zip_clips {
        zip_clips(&clip_dir, &args.shared.output_dir)?;
    }

    println!("Rendered {} clip(s)", render_plan.job_count());
    println!("Output: {}", output.mix_path.display());
    Ok(())
}

// ─── Plan runner ─────────────────────────────────────────────────

fn run_plan(args: PlanArgs) -> Result<()> {
    let render_plan = build_plan(&args.shared, args.seed_duration)?;

    println!("ambient group ({} job(s)):", render_plan.ambient_jobs.len());
    for job in &render_plan.ambient_jobs {
        if let JobPayload::Ambient { prompt, duration, .. } = &job.payload {
            println!(
                "  {}  {:>6.1}s  {}",
                slot_label(&job.slot),
                duration,
                prompt
            );
        }
    }

    println!("speech group ({} job(s)):", render_plan.speech_jobs.len());
    for job in &render_plan.speech_jobs {
        if let JobPayload::Speech { character, text, .. } = &job.payload {
            println!("  {}  [{}]  {}", slot_label(&job.slot), character, text);
        }
    }

    println!("background track(s): {}", render_plan.background_tracks.len());
    for track in &render_plan.background_tracks {
        println!(
            "  {}  foreground [{}, {})",
            slot_label(&track.slot),
            track.begin,
            track.end
        );
    }
    Ok(())
}

// ─── Assemble runner ─────────────────────────────────────────────

fn run_assemble(args: AssembleArgs) -> Result<()> {
    let render_plan = build_plan(&args.shared, args.seed_duration)?;
    let clip_dir = args.shared.output_dir.join("audio");

    let missing: Vec<String> = render_plan
        .ambient_jobs
        .iter()
        .chain(render_plan.speech_jobs.iter())
        .filter(|job| !job.slot.exists())
        .map(|job| job.slot.display().to_string())
        .collect();
    if !missing.is_empty() {
        bail!(
            "{} rendered clip(s) missing (run `soundloom render` first): {}",
            missing.len(),
            missing.join(", ")
        );
    }

    let output =
        assemble(&render_plan, &clip_dir).map_err(soundloom_core::PipelineError::from)?;
    write_manifest(&args.shared, &output)?;

    println!("Output: {}", output.mix_path.display());
    Ok(())
}
