use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where an event sits in the output: the sequential narrative track,
/// or an underlay spanning part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Foreground,
    Background,
}

/// What kind of audio an event produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Speech,
    SoundEffect,
    Music,
}

impl Kind {
    /// Canonical wire tag, used in slot file names.
    pub fn tag(&self) -> &'static str {
        match self {
            Kind::Speech => "speech",
            Kind::SoundEffect => "sound_effect",
            Kind::Music => "music",
        }
    }
}

/// Background span marker: opens or closes an underlay interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundAction {
    Start,
    Stop,
}

fn default_volume() -> f64 {
    // Matches the rendering services' normalization default.
    -23.0
}

/// One canonical script entry.
///
/// Wire field names follow the script format (`desc`, `len`, `vol`);
/// the normalizer rewrites older aliases (`speaker`, `duration`, `sfx`,
/// `bgm`) before deserialization. Unknown fields are carried through
/// untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEvent {
    pub layout: Layout,
    #[serde(rename = "audio_type")]
    pub kind: Kind,
    /// Generation prompt (sound/music) or spoken transcript (speech).
    #[serde(rename = "desc", default)]
    pub description: String,
    /// Speaking character, speech events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<String>,
    /// Requested clip duration in seconds (foreground sound/music).
    #[serde(rename = "len", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Loudness target in LUFS.
    #[serde(rename = "vol", default = "default_volume")]
    pub volume: f64,
    /// Author-supplied pairing key, background events only.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<i64>,
    /// Start/stop marker, background events only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<BackgroundAction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A resolved background interval.
///
/// `begin` and `end` index into foreground sequence space; `end` is
/// exclusive, so `[begin, end)` covers exactly the foreground events
/// observed while the span was open.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundSpan {
    pub event: AudioEvent,
    pub begin: usize,
    pub end: usize,
}

impl BackgroundSpan {
    /// Pairing key of the underlying start event.
    pub fn pair_id(&self) -> i64 {
        self.event.pair_id.unwrap_or_default()
    }
}

/// The fully linked script: foreground events in sequence order
/// (index = sequence id) plus resolved background spans in script
/// order of their start markers. Built once per run, then immutable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Timeline {
    pub foreground: Vec<AudioEvent>,
    pub background: Vec<BackgroundSpan>,
}

/// A rendered audio asset on disk with its measured duration.
///
/// Foreground durations drive all offset math; background seed
/// durations are discarded once the clip is loop-stretched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedClip {
    pub path: std::path::PathBuf,
    pub duration_seconds: f64,
}
