//! Scripted in-memory page surface for tests.
//!
//! A [`ScriptedSurface`] plays back a sequence of [`Frame`]s, each one a
//! snapshot of the visible elements on the page. Interactions that mutate a
//! real page (clicking a marked element, scrolling a marked element into
//! view, navigating) advance to the next frame. References taken from an
//! earlier frame come back [`SurfaceError::Stale`], which models live-page
//! staleness faithfully.
//!
//! All interactions are recorded so tests can assert on click sequences,
//! typed text, and scroll-trigger counts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SurfaceError;
use crate::surface::{ElementRef, PageSurface};

/// One scripted element: the selectors it answers to, its content, and
/// whether interacting with it advances the page to the next frame.
#[derive(Debug, Clone)]
pub struct ScriptedElement {
    name: String,
    selectors: Vec<String>,
    parent: Option<String>,
    text: String,
    attrs: HashMap<String, String>,
    advance_on_click: bool,
    advance_on_scroll: bool,
}

impl ScriptedElement {
    pub fn new(name: &str, selectors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            parent: None,
            text: String::new(),
            attrs: HashMap::new(),
            advance_on_click: false,
            advance_on_scroll: false,
        }
    }

    /// Scope this element under a named parent (for `find_in` lookups).
    pub fn child_of(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    /// Clicking this element advances to the next frame.
    pub fn advance_on_click(mut self) -> Self {
        self.advance_on_click = true;
        self
    }

    /// Scrolling this element into view advances to the next frame.
    pub fn advance_on_scroll(mut self) -> Self {
        self.advance_on_scroll = true;
        self
    }

    fn matches(&self, selector: &str) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }
}

/// One visible-page snapshot.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    elements: Vec<ScriptedElement>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(mut self, element: ScriptedElement) -> Self {
        self.elements.push(element);
        self
    }
}

/// Fake [`PageSurface`] driven by scripted frames.
pub struct ScriptedSurface {
    frames: Vec<Frame>,
    current: AtomicUsize,
    advance_on_goto: bool,
    clicks: Mutex<Vec<String>>,
    typed: Mutex<Vec<(String, String)>>,
    scrolls: AtomicUsize,
    visits: Mutex<Vec<String>>,
}

impl ScriptedSurface {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            current: AtomicUsize::new(0),
            advance_on_goto: false,
            clicks: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            scrolls: AtomicUsize::new(0),
            visits: Mutex::new(Vec::new()),
        }
    }

    /// Treat every navigation as a page change (advances one frame).
    pub fn advance_on_goto(mut self) -> Self {
        self.advance_on_goto = true;
        self
    }

    /// Names of clicked elements, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    /// (element name, text) pairs typed, in order.
    pub fn typed(&self) -> Vec<(String, String)> {
        self.typed.lock().unwrap().clone()
    }

    /// Number of scroll-into-view calls (the feed's load trigger).
    pub fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    /// Navigated URLs, in order.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }

    fn frame_index(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    fn advance(&self) {
        let last = self.frames.len().saturating_sub(1);
        let _ = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some((cur + 1).min(last))
            });
    }

    fn encode(frame: usize, index: usize) -> ElementRef {
        ElementRef(((frame as u64) << 32) | index as u64)
    }

    /// Resolve a reference against the current frame; references from an
    /// earlier frame are stale.
    fn resolve(&self, el: &ElementRef) -> Result<&ScriptedElement, SurfaceError> {
        let frame = (el.0 >> 32) as usize;
        let index = (el.0 & 0xffff_ffff) as usize;
        if frame != self.frame_index() {
            return Err(SurfaceError::Stale);
        }
        self.frames[frame]
            .elements
            .get(index)
            .ok_or(SurfaceError::Stale)
    }

    fn matching(&self, selector: &str) -> Vec<(usize, &ScriptedElement)> {
        let frame = self.frame_index();
        self.frames
            .get(frame)
            .map(|f| {
                f.elements
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.matches(selector))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageSurface for ScriptedSurface {
    async fn goto(&self, url: &str) -> Result<(), SurfaceError> {
        self.visits.lock().unwrap().push(url.to_string());
        if self.advance_on_goto {
            self.advance();
        }
        Ok(())
    }

    async fn find_visible(&self, selector: &str) -> Result<Option<ElementRef>, SurfaceError> {
        let frame = self.frame_index();
        Ok(self
            .matching(selector)
            .first()
            .map(|(i, _)| Self::encode(frame, *i)))
    }

    async fn find_all_visible(&self, selector: &str) -> Result<Vec<ElementRef>, SurfaceError> {
        let frame = self.frame_index();
        Ok(self
            .matching(selector)
            .into_iter()
            .map(|(i, _)| Self::encode(frame, i))
            .collect())
    }

    async fn find_in(
        &self,
        parent: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, SurfaceError> {
        let parent_name = self.resolve(parent)?.name.clone();
        let frame = self.frame_index();
        Ok(self.frames[frame]
            .elements
            .iter()
            .enumerate()
            .find(|(_, e)| e.matches(selector) && e.parent.as_deref() == Some(&parent_name))
            .map(|(i, _)| Self::encode(frame, i)))
    }

    async fn count(&self, selector: &str) -> Result<usize, SurfaceError> {
        Ok(self.matching(selector).len())
    }

    async fn text(&self, el: &ElementRef) -> Result<String, SurfaceError> {
        Ok(self.resolve(el)?.text.clone())
    }

    async fn attr(&self, el: &ElementRef, name: &str) -> Result<Option<String>, SurfaceError> {
        Ok(self.resolve(el)?.attrs.get(name).cloned())
    }

    async fn click(&self, el: &ElementRef) -> Result<(), SurfaceError> {
        let (name, advances) = {
            let element = self.resolve(el)?;
            (element.name.clone(), element.advance_on_click)
        };
        self.clicks.lock().unwrap().push(name);
        if advances {
            self.advance();
        }
        Ok(())
    }

    async fn type_text(&self, el: &ElementRef, text: &str) -> Result<(), SurfaceError> {
        let name = self.resolve(el)?.name.clone();
        self.typed.lock().unwrap().push((name, text.to_string()));
        Ok(())
    }

    async fn scroll_into_view(&self, el: &ElementRef) -> Result<(), SurfaceError> {
        let advances = {
            let element = self.resolve(el)?;
            element.advance_on_scroll
        };
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        if advances {
            self.advance();
        }
        Ok(())
    }
}
