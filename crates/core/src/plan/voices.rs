//! Voice-profile resolution input.
//!
//! An external JSON map from character name to a reference recording
//! (or precomputed voice embedding) plus its transcript. Consumed
//! read-only when building speech jobs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Reference material for cloning one character's voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Reference recording to upload with speech requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wav_path: Option<PathBuf>,
    /// Precomputed voice embedding, if the service has one on file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npz_path: Option<PathBuf>,
    /// Transcript of the reference recording.
    pub asr_text: String,
}

pub type VoiceMap = HashMap<String, VoiceProfile>;

/// Load the character-to-voice map from a JSON file.
pub fn load_voice_map(path: &Path) -> Result<VoiceMap, PlanError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanError::VoiceMapRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| PlanError::VoiceMapParse {
        path: path.to_path_buf(),
        source,
    })
}
