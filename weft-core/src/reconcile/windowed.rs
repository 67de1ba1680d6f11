//! Windowed List Reconciler
//!
//! A specialization of the keyed reconciler for long lists: only items
//! whose index falls inside the visible range - plus a buffer of entries
//! on each side - are materialized. Entries entering the window are
//! rendered, entries leaving it are disposed, and entries staying inside
//! are repositioned (their offset updated) but never re-rendered.
//!
//! Two things re-run the pass:
//!
//! - the reactive source changing (the pass reads it, like the keyed
//!   reconciler), and
//! - the viewport moving. The viewport is host geometry, not application
//!   data, so it lives outside the dependency graph;
//!   [`set_viewport`](WindowedList::set_viewport) and
//!   [`refresh`](WindowedList::refresh) re-invoke the pass directly.

use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::error::Error;
use crate::reactive::Effect;
use crate::state::{ListHandle, Value};

use super::disposal::DisposalRegistry;
use super::host::SlotHost;

/// Windowing parameters: the fixed extent of one item along the scroll
/// axis, and how many off-screen entries to keep materialized on each
/// side of the visible range.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    item_extent: f64,
    buffer: usize,
}

impl Window {
    /// Validate windowing parameters.
    ///
    /// The item extent must be positive and finite; a degenerate extent
    /// would make every index "visible" at once.
    pub fn new(item_extent: f64, buffer: usize) -> Result<Self, Error> {
        if !item_extent.is_finite() || item_extent <= 0.0 {
            return Err(Error::InvalidExtent);
        }
        Ok(Self {
            item_extent,
            buffer,
        })
    }

    pub fn item_extent(&self) -> f64 {
        self.item_extent
    }

    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// The `[start, end)` index range covering the viewport plus the
    /// buffer, clamped to `[0, len)`.
    fn range(&self, viewport: Viewport, len: usize) -> (usize, usize) {
        let offset = viewport.offset.max(0.0);

        let first_visible = (offset / self.item_extent).floor() as usize;
        let last_visible = ((offset + viewport.extent) / self.item_extent).ceil() as usize;

        let start = first_visible.saturating_sub(self.buffer);
        let end = last_visible.saturating_add(self.buffer).min(len);

        (start.min(end), end)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Viewport {
    offset: f64,
    extent: f64,
}

/// A mounted windowed reconciliation.
pub struct WindowedList<K, R> {
    effect: Effect,
    entries: Arc<Mutex<IndexMap<K, (usize, R)>>>,
    viewport: Arc<Mutex<Viewport>>,
    host: Arc<dyn SlotHost<R>>,
    disposal: DisposalRegistry<R>,
}

impl<K, R> WindowedList<K, R>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    R: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Mount a windowed reconciliation of `source` into `host`.
    ///
    /// The viewport starts at offset zero with zero extent - only the
    /// leading buffer is materialized until the host reports its real
    /// geometry via [`set_viewport`](Self::set_viewport).
    pub fn mount<H, IF, KF, RF>(
        host: Arc<H>,
        items: IF,
        key_fn: KF,
        render: RF,
        disposal: DisposalRegistry<R>,
        window: Window,
    ) -> Self
    where
        H: SlotHost<R> + 'static,
        IF: Fn() -> ListHandle + Send + Sync + 'static,
        KF: Fn(&Value) -> K + Send + Sync + 'static,
        RF: Fn(&Value) -> R + Send + Sync + 'static,
    {
        let host: Arc<dyn SlotHost<R>> = host;
        let entries: Arc<Mutex<IndexMap<K, (usize, R)>>> = Arc::new(Mutex::new(IndexMap::new()));
        let viewport = Arc::new(Mutex::new(Viewport::default()));

        let effect = {
            let entries = Arc::clone(&entries);
            let viewport = Arc::clone(&viewport);
            let host = Arc::clone(&host);
            let disposal = disposal.clone();

            Effect::new(move || {
                let items = items().to_vec();
                let viewport = *viewport.lock();
                let (start, end) = window.range(viewport, items.len());

                let mut entries = entries.lock();
                let mut next: IndexMap<K, (usize, R)> = IndexMap::with_capacity(end - start);
                let mut rendered = 0usize;

                for (index, item) in items[start..end].iter().enumerate() {
                    let index = start + index;
                    let key = key_fn(item);
                    let offset = index as f64 * window.item_extent;

                    if let Some((_, resource)) = entries.shift_remove(&key) {
                        // Still inside the window: reposition only.
                        host.place(&resource, offset);
                        next.insert(key, (index, resource));
                    } else {
                        let resource = render(item);
                        host.insert(&resource);
                        host.place(&resource, offset);
                        next.insert(key, (index, resource));
                        rendered += 1;
                    }
                }

                // Whatever is left fell outside [start, end).
                let evicted = entries.len();
                for (_, (_, resource)) in entries.drain(..) {
                    disposal.run_and_clear(&resource);
                    host.remove(&resource);
                }

                *entries = next;

                tracing::debug!(start, end, rendered, evicted, "reconciled window");
            })
        };

        Self {
            effect,
            entries,
            viewport,
            host,
            disposal,
        }
    }

    /// Report new viewport geometry and re-run the pass.
    ///
    /// `offset` is the scroll position, `extent` the visible span, both in
    /// the unit of the window's item extent.
    pub fn set_viewport(&self, offset: f64, extent: f64) {
        *self.viewport.lock() = Viewport { offset, extent };
        self.effect.schedule();
    }

    /// Re-run the pass with unchanged geometry.
    pub fn refresh(&self) {
        self.effect.schedule();
    }

    /// Number of materialized entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Stop reconciling and tear down every materialized entry.
    pub fn unmount(self) {
        self.effect.dispose();

        let mut entries = self.entries.lock();
        for (_, (_, resource)) in entries.drain(..) {
            self.disposal.run_and_clear(&resource);
            self.host.remove(&resource);
        }
    }
}

impl<K, R> std::fmt::Debug for WindowedList<K, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedList")
            .field("effect", &self.effect)
            .finish()
    }
}
