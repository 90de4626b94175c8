//! Rendering-service interface and HTTP backend.
//!
//! The services are opaque neural backends reached over HTTP: an
//! ambient endpoint for sound effects and music, and a voice-cloning
//! speech endpoint. Both return raw WAV bytes. Generation is
//! compute-heavy, so timeouts are generous and caller-configured.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Serialize;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Request for one ambient (sound-effect or music) rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmbientRequest {
    pub prompt: String,
    pub duration: f64,
    /// Loudness target in LUFS; normalization happens service-side.
    pub volume: f64,
    pub negative_prompt: String,
}

/// Request for one speech rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// Transcript of the reference recording.
    pub reference_transcript: String,
    /// Reference recording to upload (16 kHz mono WAV).
    pub reference_audio: PathBuf,
    /// Precomputed voice embedding known to the service, if any.
    pub voice_id: Option<String>,
    pub speed: f64,
    pub normalize: bool,
    /// Loudness target in LUFS.
    pub volume: f64,
}

/// A rendering backend.
///
/// The HTTP client is the production implementation; tests substitute
/// local synthesizers.
pub trait Renderer: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Render an ambient clip, returning WAV bytes.
    fn render_ambient(&self, request: &AmbientRequest) -> Result<Vec<u8>>;

    /// Render a speech clip, returning WAV bytes.
    fn render_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>>;
}

/// HTTP backend talking to the generation services.
pub struct HttpRenderer {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRenderer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn take_audio(response: reqwest::blocking::Response) -> Result<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail: String = body.chars().take(300).collect();
            bail!("service returned HTTP {}: {}", status, detail);
        }
        let bytes = response.bytes().context("failed to read response body")?;
        if bytes.is_empty() {
            bail!("service returned an empty body");
        }
        Ok(bytes.to_vec())
    }
}

impl Renderer for HttpRenderer {
    fn name(&self) -> &str {
        "http"
    }

    fn render_ambient(&self, request: &AmbientRequest) -> Result<Vec<u8>> {
        let url = format!("{}/audio", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("request to {} failed", url))?;
        Self::take_audio(response)
    }

    fn render_speech(&self, request: &SpeechRequest) -> Result<Vec<u8>> {
        if !request.reference_audio.exists() {
            bail!(
                "reference audio not found: {}",
                request.reference_audio.display()
            );
        }

        let url = format!("{}/tts", self.base_url);
        let mut form = reqwest::blocking::multipart::Form::new()
            .text("tts_text", request.text.clone())
            .text("prompt_text", request.reference_transcript.clone())
            .text("speed", request.speed.to_string())
            .text("normalize", request.normalize.to_string())
            .text("volume", request.volume.to_string())
            .file("prompt_speech_file", &request.reference_audio)
            .with_context(|| {
                format!(
                    "failed to attach reference audio: {}",
                    request.reference_audio.display()
                )
            })?;
        if let Some(voice_id) = &request.voice_id {
            form = form.text("voice_id", voice_id.clone());
        }

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .with_context(|| format!("request to {} failed", url))?;
        Self::take_audio(response)
    }
}

/// Build the production renderer.
pub fn get_renderer(base_url: &str, timeout: Duration) -> Result<Box<dyn Renderer>> {
    Ok(Box::new(HttpRenderer::new(base_url, timeout)?))
}

/// Convert arbitrary reference audio to the 16 kHz mono WAV the
/// speech service expects. Returns the converted path.
pub fn prepare_reference(source: &Path, work_dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "reference".to_string());
    let dest = work_dir.join(format!("{}_16k.wav", stem));
    if dest.exists() {
        return Ok(dest);
    }
    crate::audio::io::extract_audio(source, &dest, 16000)
        .with_context(|| format!("failed to convert reference audio: {}", source.display()))?;
    Ok(dest)
}
