//! Timeline linking: foreground sequencing and background span
//! resolution.
//!
//! A single left-to-right pass assigns dense sequence ids to
//! foreground events and pairs background start/stop markers into
//! closed `[begin, end)` intervals over foreground sequence space.
//! The open-span map lives on the pass's stack; linking the same
//! script always produces the same timeline.

use std::collections::HashMap;

use crate::error::LinkError;
use crate::types::{AudioEvent, BackgroundAction, BackgroundSpan, Layout, Timeline};

/// A background span that has been started but not yet stopped.
struct OpenSpan {
    event: AudioEvent,
    /// Script position of the start marker, for output ordering.
    opened_at: usize,
    begin: Option<usize>,
    end: Option<usize>,
}

/// Check resolved bounds for the four structural defects.
///
/// `end` is exclusive, so `begin == end` means the span covered no
/// foreground events at all.
pub fn validate_bounds(
    pair_id: i64,
    begin: Option<usize>,
    end: Option<usize>,
) -> Result<(usize, usize), LinkError> {
    let begin = begin.ok_or(LinkError::MissingBegin { pair_id })?;
    let end = end.ok_or(LinkError::MissingEnd { pair_id })?;
    if begin > end {
        return Err(LinkError::EndBeforeBegin { pair_id, begin, end });
    }
    if begin == end {
        return Err(LinkError::EmptySpan { pair_id });
    }
    Ok((begin, end))
}

/// Link normalized events into a [`Timeline`].
pub fn link(events: Vec<AudioEvent>) -> Result<Timeline, LinkError> {
    let mut foreground: Vec<AudioEvent> = Vec::new();
    let mut open: HashMap<i64, OpenSpan> = HashMap::new();
    let mut resolved: Vec<(usize, BackgroundSpan)> = Vec::new();

    for (script_index, event) in events.into_iter().enumerate() {
        match event.layout {
            Layout::Foreground => {
                let id = foreground.len();
                for span in open.values_mut() {
                    span.begin.get_or_insert(id);
                    // End bound tracks one past the last foreground
                    // event seen while the span is open.
                    span.end = Some(id + 1);
                }
                foreground.push(event);
            }
            Layout::Background => {
                let pair_id = event.pair_id.ok_or(LinkError::MissingPairId)?;
                match event.action {
                    Some(BackgroundAction::Start) => {
                        if open.contains_key(&pair_id) {
                            return Err(LinkError::DuplicateStart { pair_id });
                        }
                        open.insert(
                            pair_id,
                            OpenSpan {
                                event,
                                opened_at: script_index,
                                begin: None,
                                end: None,
                            },
                        );
                    }
                    Some(BackgroundAction::Stop) => {
                        // The pair id is free again after this; a
                        // later start with the same id opens a fresh
                        // span.
                        let span = open
                            .remove(&pair_id)
                            .ok_or(LinkError::UnmatchedStop { pair_id })?;
                        let (begin, end) = validate_bounds(pair_id, span.begin, span.end)?;
                        resolved.push((
                            span.opened_at,
                            BackgroundSpan {
                                event: span.event,
                                begin,
                                end,
                            },
                        ));
                    }
                    None => return Err(LinkError::MissingAction { pair_id }),
                }
            }
        }
    }

    if let Some(pair_id) = open.keys().min().copied() {
        return Err(LinkError::Unterminated { pair_id });
    }

    // Spans close in stop order; report them in start order so slot
    // counters downstream follow the script.
    resolved.sort_by_key(|(opened_at, _)| *opened_at);

    Ok(Timeline {
        foreground,
        background: resolved.into_iter().map(|(_, span)| span).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;
    use serde_json::Map;

    fn fg(desc: &str) -> AudioEvent {
        AudioEvent {
            layout: Layout::Foreground,
            kind: Kind::Speech,
            description: desc.to_string(),
            character: Some("narrator".to_string()),
            duration: None,
            volume: -23.0,
            pair_id: None,
            action: None,
            extra: Map::new(),
        }
    }

    fn bg(pair_id: i64, action: BackgroundAction) -> AudioEvent {
        AudioEvent {
            layout: Layout::Background,
            kind: Kind::Music,
            description: "rain on a tin roof".to_string(),
            character: None,
            duration: None,
            volume: -30.0,
            pair_id: Some(pair_id),
            action: Some(action),
            extra: Map::new(),
        }
    }

    #[test]
    fn test_sequence_ids_dense_in_script_order() {
        let timeline = link(vec![fg("a"), fg("b"), fg("c")]).unwrap();
        assert_eq!(timeline.foreground.len(), 3);
        assert_eq!(timeline.foreground[0].description, "a");
        assert_eq!(timeline.foreground[2].description, "c");
    }

    #[test]
    fn test_span_covers_foreground_between_markers() {
        // start, fg0, fg1, stop, fg2
        let timeline = link(vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            fg("b"),
            bg(1, BackgroundAction::Stop),
            fg("c"),
        ])
        .unwrap();
        assert_eq!(timeline.background.len(), 1);
        let span = &timeline.background[0];
        assert_eq!((span.begin, span.end), (0, 2));
    }

    #[test]
    fn test_span_opened_mid_script() {
        // fg0, start, fg1, fg2, stop
        let timeline = link(vec![
            fg("a"),
            bg(4, BackgroundAction::Start),
            fg("b"),
            fg("c"),
            bg(4, BackgroundAction::Stop),
        ])
        .unwrap();
        let span = &timeline.background[0];
        assert_eq!((span.begin, span.end), (1, 3));
    }

    #[test]
    fn test_end_tracks_last_seen_foreground() {
        // The end bound must be one past the *last* foreground event
        // observed before the stop, not the first.
        let timeline = link(vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            fg("b"),
            fg("c"),
            fg("d"),
            bg(1, BackgroundAction::Stop),
        ])
        .unwrap();
        assert_eq!((timeline.background[0].begin, timeline.background[0].end), (0, 4));
    }

    #[test]
    fn test_unmatched_stop() {
        let err = link(vec![fg("a"), bg(9, BackgroundAction::Stop)]).unwrap_err();
        assert!(matches!(err, LinkError::UnmatchedStop { pair_id: 9 }));
    }

    #[test]
    fn test_stop_immediately_after_start() {
        let err = link(vec![
            fg("a"),
            bg(1, BackgroundAction::Start),
            bg(1, BackgroundAction::Stop),
        ])
        .unwrap_err();
        assert!(matches!(err, LinkError::MissingBegin { pair_id: 1 }));
    }

    #[test]
    fn test_unterminated_span() {
        let err = link(vec![bg(2, BackgroundAction::Start), fg("a")]).unwrap_err();
        assert!(matches!(err, LinkError::Unterminated { pair_id: 2 }));
    }

    #[test]
    fn test_duplicate_start_same_pair_id() {
        let err = link(vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            bg(1, BackgroundAction::Start),
        ])
        .unwrap_err();
        assert!(matches!(err, LinkError::DuplicateStart { pair_id: 1 }));
    }

    #[test]
    fn test_pair_id_reuse_after_stop() {
        let timeline = link(vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            bg(1, BackgroundAction::Stop),
            fg("b"),
            bg(1, BackgroundAction::Start),
            fg("c"),
            bg(1, BackgroundAction::Stop),
        ])
        .unwrap();
        assert_eq!(timeline.background.len(), 2);
        assert_eq!((timeline.background[0].begin, timeline.background[0].end), (0, 1));
        assert_eq!((timeline.background[1].begin, timeline.background[1].end), (2, 3));
    }

    #[test]
    fn test_overlapping_spans_with_distinct_ids() {
        let timeline = link(vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            bg(2, BackgroundAction::Start),
            fg("b"),
            bg(1, BackgroundAction::Stop),
            fg("c"),
            bg(2, BackgroundAction::Stop),
        ])
        .unwrap();
        assert_eq!(timeline.background.len(), 2);
        // Output order follows start markers, not stop markers
        assert_eq!(timeline.background[0].pair_id(), 1);
        assert_eq!(timeline.background[1].pair_id(), 2);
        assert_eq!((timeline.background[0].begin, timeline.background[0].end), (0, 2));
        assert_eq!((timeline.background[1].begin, timeline.background[1].end), (1, 3));
    }

    #[test]
    fn test_nested_spans_reported_in_start_order() {
        let timeline = link(vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            bg(2, BackgroundAction::Start),
            fg("b"),
            bg(2, BackgroundAction::Stop),
            fg("c"),
            bg(1, BackgroundAction::Stop),
        ])
        .unwrap();
        assert_eq!(timeline.background[0].pair_id(), 1);
        assert_eq!(timeline.background[1].pair_id(), 2);
        assert_eq!((timeline.background[0].begin, timeline.background[0].end), (0, 3));
        assert_eq!((timeline.background[1].begin, timeline.background[1].end), (1, 2));
    }

    #[test]
    fn test_missing_pair_id() {
        let mut event = bg(0, BackgroundAction::Start);
        event.pair_id = None;
        assert!(matches!(link(vec![event]).unwrap_err(), LinkError::MissingPairId));
    }

    #[test]
    fn test_missing_action() {
        let mut event = bg(5, BackgroundAction::Start);
        event.action = None;
        assert!(matches!(
            link(vec![event]).unwrap_err(),
            LinkError::MissingAction { pair_id: 5 }
        ));
    }

    #[test]
    fn test_validate_bounds_rejects_inverted() {
        let err = validate_bounds(3, Some(4), Some(2)).unwrap_err();
        assert!(matches!(
            err,
            LinkError::EndBeforeBegin { pair_id: 3, begin: 4, end: 2 }
        ));
    }

    #[test]
    fn test_validate_bounds_rejects_empty() {
        let err = validate_bounds(3, Some(2), Some(2)).unwrap_err();
        assert!(matches!(err, LinkError::EmptySpan { pair_id: 3 }));
    }

    #[test]
    fn test_validate_bounds_accepts_closed_interval() {
        assert_eq!(validate_bounds(1, Some(0), Some(2)).unwrap(), (0, 2));
    }

    #[test]
    fn test_link_deterministic() {
        let events = vec![
            bg(1, BackgroundAction::Start),
            fg("a"),
            fg("b"),
            bg(1, BackgroundAction::Stop),
        ];
        let a = link(events.clone()).unwrap();
        let b = link(events).unwrap();
        assert_eq!(a, b);
    }
}
