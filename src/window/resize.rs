//! Size-change notifications and the corner grip that produces most of them.
//!
//! Any change to a window's measured size is queued as a [`ResizeEntry`]. The
//! desktop drains the queue in batches, skips windows that are gone and
//! forwards the rest to their resize hooks.

use std::collections::BTreeSet;

use super::{FloatRect, ResizeMode, WindowId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeEntry {
    pub window: WindowId,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Default)]
pub struct ResizeObserver {
    observed: BTreeSet<WindowId>,
    pending: Vec<ResizeEntry>,
}

impl ResizeObserver {
    /// Start observing `id`. The first observation queues the initial
    /// measurement; observing again does nothing.
    pub fn observe(&mut self, id: &WindowId, width: u16, height: u16) {
        if self.observed.insert(id.clone()) {
            self.pending.push(ResizeEntry {
                window: id.clone(),
                width,
                height,
            });
        }
    }

    pub fn unobserve(&mut self, id: &WindowId) {
        self.observed.remove(id);
        self.pending.retain(|entry| &entry.window != id);
    }

    pub fn is_observed(&self, id: &WindowId) -> bool {
        self.observed.contains(id)
    }

    /// Queue a notification. Windows that are not observed are dropped.
    pub fn notify(&mut self, window: &WindowId, width: u16, height: u16) {
        if self.observed.contains(window) {
            self.pending.push(ResizeEntry {
                window: window.clone(),
                width,
                height,
            });
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_batch(&mut self) -> Vec<ResizeEntry> {
        std::mem::take(&mut self.pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Right,
    BottomRight,
}

impl From<ResizeMode> for ResizeEdge {
    fn from(mode: ResizeMode) -> Self {
        match mode {
            ResizeMode::Both => ResizeEdge::BottomRight,
            ResizeMode::Horizontal => ResizeEdge::Right,
        }
    }
}

/// A grip drag in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GripDrag {
    pub id: WindowId,
    pub edge: ResizeEdge,
    pub start: FloatRect,
    pub start_col: u16,
    pub start_row: u16,
}

impl GripDrag {
    /// Rectangle for a pointer now at `(column, row)`. The origin never
    /// moves; only the right and bottom edges follow the pointer.
    pub fn apply(&self, column: u16, row: u16, min_width: u16, min_height: u16) -> FloatRect {
        let dx = column as i32 - self.start_col as i32;
        let dy = row as i32 - self.start_row as i32;
        let mut width = self.start.width as i32 + dx;
        let mut height = self.start.height as i32;
        if self.edge == ResizeEdge::BottomRight {
            height += dy;
        }
        width = width.max(min_width.max(1) as i32).min(u16::MAX as i32);
        height = height.max(min_height.max(1) as i32).min(u16::MAX as i32);
        FloatRect {
            x: self.start.x,
            y: self.start.y,
            width: width as u16,
            height: height as u16,
        }
    }
}
