//! Content-alignment timeline: maps media time ranges to content segments
//! (verses, in practice).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One timeline entry. `origin` and `duration` are milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentEvent {
    pub origin: f64,
    pub duration: f64,
    #[serde(
        default,
        alias = "verse_id",
        alias = "segmentId",
        deserialize_with = "segment_id_from_any"
    )]
    pub segment_id: Option<String>,
}

impl SegmentEvent {
    pub fn contains(&self, time_ms: f64) -> bool {
        time_ms >= self.origin && time_ms < self.origin + self.duration
    }
}

// Segment ids arrive as numbers or strings depending on the content source.
fn segment_id_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Ordered list of segment events.
///
/// Entries are expected sorted by origin and non-overlapping, but neither is
/// enforced. When several entries contain the same instant, the one with the
/// earliest origin wins; equal origins resolve to the entry listed first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    events: Vec<SegmentEvent>,
}

impl Timeline {
    pub fn new(events: Vec<SegmentEvent>) -> Self {
        Self { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Entry active at `time_ms`, if any.
    pub fn active_at(&self, time_ms: f64) -> Option<&SegmentEvent> {
        if !time_ms.is_finite() {
            return None;
        }
        self.events
            .iter()
            .filter(|event| event.contains(time_ms))
            .fold(None, |best: Option<&SegmentEvent>, event| match best {
                Some(b) if b.origin <= event.origin => Some(b),
                _ => Some(event),
            })
    }
}

impl From<Vec<SegmentEvent>> for Timeline {
    fn from(events: Vec<SegmentEvent>) -> Self {
        Self::new(events)
    }
}
