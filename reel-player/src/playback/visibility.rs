//! Visibility classification for feed cells

use reel_common::events::{CellId, VisibilityState};
use std::collections::HashMap;

/// Axis-aligned rectangle in screen points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// True when `other` lies entirely inside `self` (edges inclusive)
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// True when the two rectangles share a region of non-zero area
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }
}

/// Classify a cell frame against the viewport
pub fn classify(frame: &Rect, viewport: &Rect) -> VisibilityState {
    if viewport.contains(frame) {
        VisibilityState::FullyVisible
    } else if viewport.intersects(frame) {
        VisibilityState::PartiallyVisible
    } else {
        VisibilityState::Offscreen
    }
}

/// Remembers each cell's last visibility and reports only changes
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    last: HashMap<CellId, VisibilityState>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify every frame and return the cells whose state changed
    ///
    /// Output keeps the order of `frames` (feed order). A cell seen for the
    /// first time always counts as a change.
    pub fn update(
        &mut self,
        viewport: &Rect,
        frames: &[(CellId, Rect)],
    ) -> Vec<(CellId, VisibilityState)> {
        let mut changes = Vec::new();
        for (cell, frame) in frames {
            let state = classify(frame, viewport);
            if self.last.insert(*cell, state) != Some(state) {
                changes.push((*cell, state));
            }
        }
        changes
    }

    /// Drop remembered state for a recycled cell
    pub fn forget(&mut self, cell: CellId) {
        self.last.remove(&cell);
    }

    pub fn state(&self, cell: CellId) -> Option<VisibilityState> {
        self.last.get(&cell).copied()
    }
}
