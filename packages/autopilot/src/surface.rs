//! Page surface abstraction: the only channel to the live page.
//!
//! Everything above this layer (locator, collector, flow) talks to the page
//! through [`PageSurface`], so the core logic can run against the scripted
//! fake in [`crate::testing`] as well as a real browser tab.
//!
//! Element references are opaque tokens, valid only until the page mutates.
//! Callers re-acquire them by semantic query on every tick and never hold
//! long-lived handles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use tokio::sync::Mutex;

use crate::error::SurfaceError;

/// Opaque handle to one element located on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(pub(crate) u64);

/// Queries and actions against the live page.
///
/// Lookup methods return `Ok(None)`/empty for absence; `Err` is reserved for
/// transport-level failures (dropped connection, stale handle, script
/// failure). Only elements currently visible to a user are returned.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Navigate the page, invalidating all outstanding element references.
    async fn goto(&self, url: &str) -> Result<(), SurfaceError>;

    /// First visible element matching `selector`, if any.
    async fn find_visible(&self, selector: &str) -> Result<Option<ElementRef>, SurfaceError>;

    /// All visible elements matching `selector`, in document order.
    async fn find_all_visible(&self, selector: &str) -> Result<Vec<ElementRef>, SurfaceError>;

    /// First visible descendant of `parent` matching `selector`, if any.
    async fn find_in(
        &self,
        parent: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, SurfaceError>;

    /// Number of visible elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, SurfaceError>;

    /// Rendered text content of the element, trimmed.
    async fn text(&self, el: &ElementRef) -> Result<String, SurfaceError>;

    /// Attribute value, `None` when the attribute is absent.
    async fn attr(&self, el: &ElementRef, name: &str) -> Result<Option<String>, SurfaceError>;

    async fn click(&self, el: &ElementRef) -> Result<(), SurfaceError>;

    async fn type_text(&self, el: &ElementRef, text: &str) -> Result<(), SurfaceError>;

    /// Scroll the element into the viewport (the feed's load trigger).
    async fn scroll_into_view(&self, el: &ElementRef) -> Result<(), SurfaceError>;
}

/// Visibility predicate evaluated in-page against `this` element.
const IS_VISIBLE_FN: &str = r#"function() {
    const el = this;
    if (el.disabled) return false;
    const style = window.getComputedStyle(el);
    if (!style || style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') return false;
    const rect = el.getBoundingClientRect();
    return !!rect && rect.width >= 2 && rect.height >= 2;
}"#;

/// Production [`PageSurface`] over a chromiumoxide CDP page.
///
/// Located elements are parked in a registry keyed by the token handed out;
/// the registry is cleared on navigation since every prior reference is
/// stale from that point on.
pub struct CdpSurface {
    page: Page,
    handles: Mutex<HashMap<u64, Element>>,
    next_id: AtomicU64,
}

/// Upper bound on parked elements; far more than one tick ever registers.
const MAX_LIVE_HANDLES: usize = 256;

/// Drop the oldest entries once the registry exceeds `max`. Ids are handed
/// out monotonically, so the smallest keys are the oldest references; an
/// evicted reference reads as stale afterwards, which callers already treat
/// as re-acquire-by-query.
fn evict_oldest<V>(handles: &mut HashMap<u64, V>, max: usize) {
    if handles.len() <= max {
        return;
    }
    let mut ids: Vec<u64> = handles.keys().copied().collect();
    ids.sort_unstable();
    for id in &ids[..handles.len() - max] {
        handles.remove(id);
    }
}

impl CdpSurface {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            handles: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn transport(err: impl std::fmt::Display) -> SurfaceError {
        SurfaceError::Transport(err.to_string())
    }

    async fn is_visible(element: &Element) -> Result<bool, SurfaceError> {
        let ret = element
            .call_js_fn(IS_VISIBLE_FN, false)
            .await
            .map_err(Self::transport)?;
        Ok(ret
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn register(&self, element: Element) -> ElementRef {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handles = self.handles.lock().await;
        handles.insert(id, element);
        evict_oldest(&mut handles, MAX_LIVE_HANDLES);
        ElementRef(id)
    }

    async fn visible_subset(&self, elements: Vec<Element>) -> Result<Vec<ElementRef>, SurfaceError> {
        let mut out = Vec::new();
        for element in elements {
            if Self::is_visible(&element).await? {
                out.push(self.register(element).await);
            }
        }
        Ok(out)
    }

    /// Run `op` against the registered element. The handle map stays locked
    /// for the duration, which is fine: one run drives one page serially.
    async fn with_element<T, F>(&self, el: &ElementRef, op: F) -> Result<T, SurfaceError>
    where
        F: for<'a> FnOnce(
            &'a Element,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<T, SurfaceError>> + Send + 'a>,
        >,
        F: Send,
        T: Send,
    {
        let guard = self.handles.lock().await;
        let element = guard.get(&el.0).ok_or(SurfaceError::Stale)?;
        op(element).await
    }
}

#[async_trait]
impl PageSurface for CdpSurface {
    async fn goto(&self, url: &str) -> Result<(), SurfaceError> {
        self.handles.lock().await.clear();
        self.page.goto(url).await.map_err(Self::transport)?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(Self::transport)?;
        Ok(())
    }

    async fn find_visible(&self, selector: &str) -> Result<Option<ElementRef>, SurfaceError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(Self::transport)?;
        for element in elements {
            if Self::is_visible(&element).await? {
                return Ok(Some(self.register(element).await));
            }
        }
        Ok(None)
    }

    async fn find_all_visible(&self, selector: &str) -> Result<Vec<ElementRef>, SurfaceError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(Self::transport)?;
        self.visible_subset(elements).await
    }

    async fn find_in(
        &self,
        parent: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, SurfaceError> {
        let children = {
            let guard = self.handles.lock().await;
            let element = guard.get(&parent.0).ok_or(SurfaceError::Stale)?;
            element
                .find_elements(selector)
                .await
                .map_err(Self::transport)?
        };
        for child in children {
            if Self::is_visible(&child).await? {
                return Ok(Some(self.register(child).await));
            }
        }
        Ok(None)
    }

    async fn count(&self, selector: &str) -> Result<usize, SurfaceError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(Self::transport)?;
        let mut n = 0;
        for element in &elements {
            if Self::is_visible(element).await? {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn text(&self, el: &ElementRef) -> Result<String, SurfaceError> {
        self.with_element(el, |element| {
            Box::pin(async move {
                let text = element.inner_text().await.map_err(Self::transport)?;
                Ok(text.unwrap_or_default().trim().to_string())
            })
        })
        .await
    }

    async fn attr(&self, el: &ElementRef, name: &str) -> Result<Option<String>, SurfaceError> {
        let name = name.to_string();
        self.with_element(el, move |element| {
            Box::pin(async move { element.attribute(name).await.map_err(Self::transport) })
        })
        .await
    }

    async fn click(&self, el: &ElementRef) -> Result<(), SurfaceError> {
        self.with_element(el, |element| {
            Box::pin(async move {
                element.scroll_into_view().await.map_err(Self::transport)?;
                element.click().await.map_err(Self::transport)?;
                Ok(())
            })
        })
        .await
    }

    async fn type_text(&self, el: &ElementRef, text: &str) -> Result<(), SurfaceError> {
        let text = text.to_string();
        self.with_element(el, move |element| {
            Box::pin(async move {
                element.click().await.map_err(Self::transport)?;
                element.type_str(text).await.map_err(Self::transport)?;
                Ok(())
            })
        })
        .await
    }

    async fn scroll_into_view(&self, el: &ElementRef) -> Result<(), SurfaceError> {
        self.with_element(el, |element| {
            Box::pin(async move {
                element.scroll_into_view().await.map_err(Self::transport)?;
                Ok(())
            })
        })
        .await
    }
}
