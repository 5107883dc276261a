//! Headless, in-memory surfaces.
//!
//! Used by the simulator binary and by tests in place of a real DOM.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use super::{Document, FillNode, SegmentNode, TextNode, UiAffordance};

#[derive(Default)]
pub struct MemoryText {
    text: Mutex<String>,
}

impl MemoryText {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl TextNode for MemoryText {
    fn set_text(&self, text: &str) {
        *self.text.lock() = text.to_string();
    }

    fn text(&self) -> String {
        self.text.lock().clone()
    }
}

#[derive(Default)]
pub struct MemoryFill {
    width: Mutex<String>,
}

impl MemoryFill {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl FillNode for MemoryFill {
    fn set_width(&self, width: &str) {
        *self.width.lock() = width.to_string();
    }

    fn width(&self) -> String {
        self.width.lock().clone()
    }
}

pub struct MemorySegment {
    dom_id: String,
    classes: Mutex<BTreeSet<String>>,
    scrolls: AtomicUsize,
    focused: AtomicBool,
}

impl MemorySegment {
    pub fn new(dom_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            dom_id: dom_id.into(),
            classes: Mutex::new(BTreeSet::new()),
            scrolls: AtomicUsize::new(0),
            focused: AtomicBool::new(false),
        })
    }

    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }
}

impl SegmentNode for MemorySegment {
    fn dom_id(&self) -> String {
        self.dom_id.clone()
    }

    fn add_class(&self, class: &str) {
        self.classes.lock().insert(class.to_string());
    }

    fn remove_class(&self, class: &str) {
        self.classes.lock().remove(class);
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.lock().contains(class)
    }

    fn scroll_into_view(&self) {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
    }

    fn focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
    }
}

/// Segment registry standing in for the rendered page.
#[derive(Default)]
pub struct MemoryDocument {
    segments: RwLock<HashMap<String, Arc<MemorySegment>>>,
}

impl MemoryDocument {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Renders a segment node, returning the existing one if already present.
    pub fn insert(&self, dom_id: &str) -> Arc<MemorySegment> {
        self.segments
            .write()
            .entry(dom_id.to_string())
            .or_insert_with(|| MemorySegment::new(dom_id))
            .clone()
    }

    pub fn get(&self, dom_id: &str) -> Option<Arc<MemorySegment>> {
        self.segments.read().get(dom_id).cloned()
    }

    /// DOM ids currently carrying `class`, sorted.
    pub fn ids_with_class(&self, class: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .segments
            .read()
            .values()
            .filter(|segment| segment.has_class(class))
            .map(|segment| segment.dom_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

impl Document for MemoryDocument {
    fn segment(&self, dom_id: &str) -> Option<Arc<dyn SegmentNode>> {
        self.get(dom_id).map(|s| s as Arc<dyn SegmentNode>)
    }
}

/// Counts how often the enable-audio control was revealed.
#[derive(Default)]
pub struct MemoryAffordance {
    reveals: AtomicUsize,
}

impl MemoryAffordance {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reveal_count(&self) -> usize {
        self.reveals.load(Ordering::SeqCst)
    }
}

impl UiAffordance for MemoryAffordance {
    fn reveal_enable_audio(&self) {
        self.reveals.fetch_add(1, Ordering::SeqCst);
    }
}
