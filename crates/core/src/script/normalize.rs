//! Event normalization: canonicalize heterogeneous script records.
//!
//! Older scripts use `speaker`/`duration` where current ones use
//! `character`/`len`, abbreviate kinds as `sfx`/`bgm`, and put speech
//! transcripts in `text` rather than `desc`. Normalization rewrites
//! those aliases, validates `layout` and `audio_type`, and
//! deserializes into [`AudioEvent`]. Unknown fields pass through
//! untouched. Pure; no I/O.

use serde_json::Value;

use crate::error::SchemaError;
use crate::types::AudioEvent;

const LAYOUTS: &[&str] = &["foreground", "background"];
const KINDS: &[&str] = &["speech", "sound_effect", "music"];

/// Map an `audio_type` value to its canonical form.
fn canonical_kind(kind: &str) -> &str {
    match kind {
        "sfx" => "sound_effect",
        "bgm" => "music",
        other => other,
    }
}

/// Rename `from` to `to` unless the canonical key is already present.
fn rewrite_alias(map: &mut serde_json::Map<String, Value>, from: &str, to: &str) {
    if !map.contains_key(to) {
        if let Some(value) = map.remove(from) {
            map.insert(to.to_string(), value);
        }
    }
}

/// Normalize one raw record into a canonical event.
///
/// `index` is the record's position in the script, used in
/// diagnostics.
pub fn normalize_event(index: usize, value: Value) -> Result<AudioEvent, SchemaError> {
    let Value::Object(mut map) = value else {
        return Err(SchemaError::NotAnObject { index });
    };

    rewrite_alias(&mut map, "speaker", "character");
    rewrite_alias(&mut map, "duration", "len");
    rewrite_alias(&mut map, "text", "desc");

    let kind_value = map
        .get("audio_type")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    if let Some(kind) = kind_value.as_deref() {
        let canonical = canonical_kind(kind);
        if canonical != kind {
            map.insert("audio_type".to_string(), Value::String(canonical.to_string()));
        }
    }

    let layout = map.get("layout").and_then(|v| v.as_str());
    if !layout.is_some_and(|l| LAYOUTS.contains(&l)) {
        return Err(SchemaError::BadLayout {
            index,
            found: layout.map(str::to_string),
        });
    }

    let kind = map.get("audio_type").and_then(|v| v.as_str());
    if !kind.is_some_and(|k| KINDS.contains(&k)) {
        return Err(SchemaError::BadKind {
            index,
            found: kind.map(str::to_string),
        });
    }

    serde_json::from_value(Value::Object(map))
        .map_err(|source| SchemaError::Malformed { index, source })
}

/// Normalize a whole script. Fails on the first bad record.
pub fn normalize_events(values: Vec<Value>) -> Result<Vec<AudioEvent>, SchemaError> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| normalize_event(index, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackgroundAction, Kind, Layout};
    use serde_json::json;

    #[test]
    fn test_normalize_canonical_record() {
        let e = normalize_event(
            0,
            json!({"layout": "foreground", "audio_type": "speech",
                   "character": "guide", "desc": "hello there"}),
        )
        .unwrap();
        assert_eq!(e.layout, Layout::Foreground);
        assert_eq!(e.kind, Kind::Speech);
        assert_eq!(e.character.as_deref(), Some("guide"));
    }

    #[test]
    fn test_normalize_speaker_alias() {
        let e = normalize_event(
            0,
            json!({"layout": "foreground", "audio_type": "speech",
                   "speaker": "guide", "text": "hello"}),
        )
        .unwrap();
        assert_eq!(e.character.as_deref(), Some("guide"));
        assert_eq!(e.description, "hello");
    }

    #[test]
    fn test_normalize_duration_alias() {
        let e = normalize_event(
            0,
            json!({"layout": "foreground", "audio_type": "sfx",
                   "desc": "door creak", "duration": 3.5}),
        )
        .unwrap();
        assert_eq!(e.kind, Kind::SoundEffect);
        assert_eq!(e.duration, Some(3.5));
    }

    #[test]
    fn test_normalize_bgm_alias() {
        let e = normalize_event(
            0,
            json!({"layout": "background", "audio_type": "bgm",
                   "desc": "soft piano", "id": 1, "action": "start"}),
        )
        .unwrap();
        assert_eq!(e.kind, Kind::Music);
        assert_eq!(e.action, Some(BackgroundAction::Start));
    }

    #[test]
    fn test_normalize_canonical_wins_over_alias() {
        let e = normalize_event(
            0,
            json!({"layout": "foreground", "audio_type": "speech",
                   "character": "guide", "speaker": "old-name", "desc": "hi"}),
        )
        .unwrap();
        assert_eq!(e.character.as_deref(), Some("guide"));
        // The losing alias stays untouched in extra
        assert_eq!(e.extra.get("speaker").and_then(|v| v.as_str()), Some("old-name"));
    }

    #[test]
    fn test_normalize_missing_layout() {
        let err = normalize_event(3, json!({"audio_type": "speech", "desc": "x"})).unwrap_err();
        match err {
            SchemaError::BadLayout { index, found } => {
                assert_eq!(index, 3);
                assert!(found.is_none());
            }
            other => panic!("expected BadLayout, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_unrecognized_kind() {
        let err = normalize_event(
            1,
            json!({"layout": "foreground", "audio_type": "foley", "desc": "x"}),
        )
        .unwrap_err();
        match err {
            SchemaError::BadKind { index, found } => {
                assert_eq!(index, 1);
                assert_eq!(found.as_deref(), Some("foley"));
            }
            other => panic!("expected BadKind, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_non_object() {
        let err = normalize_event(0, json!(["not", "an", "object"])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject { index: 0 }));
    }

    #[test]
    fn test_normalize_events_stops_at_first_error() {
        let values = vec![
            json!({"layout": "foreground", "audio_type": "speech", "desc": "ok"}),
            json!({"layout": "sideways", "audio_type": "speech", "desc": "bad"}),
        ];
        let err = normalize_events(values).unwrap_err();
        assert!(matches!(err, SchemaError::BadLayout { index: 1, .. }));
    }
}
