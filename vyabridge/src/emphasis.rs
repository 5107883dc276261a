//! Visual emphasis of the segment matching the playback position.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::surface::{Document, SegmentNode};
use crate::timeline::Timeline;

/// Which segment is emphasized now, and which one was before.
#[derive(Default, Clone)]
pub struct EmphasizedNode {
    pub previous: Option<Arc<dyn SegmentNode>>,
    pub current: Option<Arc<dyn SegmentNode>>,
}

/// Keeps at most one segment emphasized and, in follow mode, scrolls it into
/// view.
pub struct EmphasisManager {
    document: Arc<dyn Document>,
    class: String,
    segment_prefix: String,
    follow_mode: bool,
    emphasized: EmphasizedNode,
}

impl EmphasisManager {
    /// Creates the manager and emphasizes the preamble node when it exists.
    pub fn new(
        document: Arc<dyn Document>,
        class: impl Into<String>,
        segment_prefix: impl Into<String>,
        preamble_dom_id: &str,
        follow_mode: bool,
    ) -> Self {
        let class = class.into();
        let current = match document.segment(preamble_dom_id) {
            Some(node) => {
                node.add_class(&class);
                Some(node)
            }
            None => {
                warn!(dom_id = preamble_dom_id, "[EMPHASIZE] no preamble node found");
                None
            }
        };

        Self {
            document,
            class,
            segment_prefix: segment_prefix.into(),
            follow_mode,
            emphasized: EmphasizedNode {
                previous: None,
                current,
            },
        }
    }

    pub fn is_follow_mode(&self) -> bool {
        self.follow_mode
    }

    pub fn set_follow_mode(&mut self, enabled: bool) {
        self.follow_mode = enabled;
    }

    /// Flips follow mode and returns the new value.
    pub fn toggle_follow_mode(&mut self) -> bool {
        self.follow_mode = !self.follow_mode;
        self.follow_mode
    }

    pub fn emphasized(&self) -> &EmphasizedNode {
        &self.emphasized
    }

    pub fn current_dom_id(&self) -> Option<String> {
        self.emphasized.current.as_ref().map(|node| node.dom_id())
    }

    /// Emphasizes the segment active at `time_ms`. Returns true when the
    /// emphasis moved.
    pub fn emphasize_by_time(&mut self, time_ms: f64, timeline: &Timeline) -> bool {
        let Some(segment_id) = timeline
            .active_at(time_ms)
            .and_then(|event| event.segment_id.clone())
        else {
            return false;
        };
        self.emphasize_segment(&segment_id)
    }

    /// Emphasizes the segment with content id `segment_id`.
    pub fn emphasize_segment(&mut self, segment_id: &str) -> bool {
        if segment_id.is_empty() {
            return false;
        }
        let dom_id = format!("{}{}", self.segment_prefix, segment_id);
        self.update_emphasis(&dom_id)
    }

    /// Moves emphasis to the node `dom_id`.
    ///
    /// A node that is not rendered leaves the current emphasis untouched.
    pub fn update_emphasis(&mut self, dom_id: &str) -> bool {
        if self.current_dom_id().as_deref() == Some(dom_id) {
            return false;
        }

        let Some(target) = self.document.segment(dom_id) else {
            debug!(dom_id, "[EMPHASIZE] target node not rendered, skipping");
            return false;
        };

        let previous = self.emphasized.current.take();
        if let Some(node) = &previous {
            node.remove_class(&self.class);
        }

        target.add_class(&self.class);
        if self.follow_mode {
            target.focus();
            target.scroll_into_view();
        }

        self.emphasized = EmphasizedNode {
            previous,
            current: Some(target),
        };
        true
    }
}
