//! Deterministic output-slot naming.
//!
//! Every event maps to exactly one WAV slot named
//! `{fg|bg}_{kind}_{n}_{label}.wav`. The counter is scoped per
//! (layout, kind) pair and increments in script order, so no two jobs
//! can ever share a slot within a run.

use std::collections::HashMap;

use crate::types::{Kind, Layout};

/// Longest label derived from an event description.
const MAX_LABEL_LEN: usize = 40;

/// Per-run slot namer with per-(layout, kind) monotonic counters.
///
/// Instance state, not a global: concurrent runs each own a namer.
#[derive(Debug, Default)]
pub struct SlotNamer {
    counters: HashMap<(Layout, Kind), usize>,
}

impl SlotNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next slot file name for an event.
    pub fn next(&mut self, layout: Layout, kind: Kind, description: &str) -> String {
        let counter = self.counters.entry((layout, kind)).or_insert(0);
        let index = *counter;
        *counter += 1;

        let layout_tag = match layout {
            Layout::Foreground => "fg",
            Layout::Background => "bg",
        };
        format!("{}_{}_{}_{}.wav", layout_tag, kind.tag(), index, abbrev(description))
    }
}

/// Compress a description into a short file-name-safe label.
///
/// Keeps the first few words, lowercased and stripped to
/// alphanumerics, joined by underscores.
pub fn abbrev(text: &str) -> String {
    let mut label = text
        .split_whitespace()
        .take(6)
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    label.truncate(MAX_LABEL_LEN);
    let label = label.trim_end_matches('_').to_string();
    if label.is_empty() {
        "clip".to_string()
    } else {
        label
    }
}
