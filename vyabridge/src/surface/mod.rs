//! Display surfaces the bridge writes to.
//!
//! Each node has exactly one writer: the component it was handed to at mount
//! time. Other components ask that owner for changes through a message.

pub mod memory;

use std::sync::Arc;

/// A node whose text content is rendered (current time, duration).
pub trait TextNode: Send + Sync {
    fn set_text(&self, text: &str);
    fn text(&self) -> String;
}

/// A node rendered as a proportional fill (progress bar).
pub trait FillNode: Send + Sync {
    /// `width` is a CSS length, e.g. `"25%"`.
    fn set_width(&self, width: &str);
    fn width(&self) -> String;
}

/// A content segment that can be visually emphasized.
pub trait SegmentNode: Send + Sync {
    fn dom_id(&self) -> String;
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);
    fn has_class(&self, class: &str) -> bool;
    /// Smoothly scrolls the node to the vertical center of the viewport.
    fn scroll_into_view(&self);
    fn focus(&self);
}

/// Lookup of segment nodes by DOM id. Content may not be rendered yet, so a
/// missing id is a normal outcome.
pub trait Document: Send + Sync {
    fn segment(&self, dom_id: &str) -> Option<Arc<dyn SegmentNode>>;
}

/// UI affordances that adapters may reveal.
pub trait UiAffordance: Send + Sync {
    /// Shows the explicit "enable audio" control after an autoplay refusal.
    fn reveal_enable_audio(&self);
}
