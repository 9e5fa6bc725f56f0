//! Positioned rectangles
//!
//! Every component in a scene carries a [`CoordinateBox`]. Layout is the
//! only writer of `position` and `bounds` during a pass; rendering reads
//! them. Setters report what kind of change happened so that callers can
//! react to a resize differently from a move.

use serde::{Deserialize, Serialize};

/// The kind of change a mutation made to a [`CoordinateBox`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxChange {
    /// `position` changed
    Position,
    /// `bounds` changed
    Bounds,
}

/// A rectangle given by its lower-left corner and its size
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateBox {
    /// `[x, y]` of the lower-left corner
    pub position: [f64; 2],
    /// `[width, height]`
    pub bounds: [f64; 2],
}

impl CoordinateBox {
    pub fn new(position: [f64; 2], bounds: [f64; 2]) -> Self {
        Self { position, bounds }
    }

    /// A box at the origin with the given size
    pub fn with_size(width: f64, height: f64) -> Self {
        Self::new([0.0, 0.0], [width, height])
    }

    pub fn x(&self) -> f64 {
        self.position[0]
    }

    pub fn y(&self) -> f64 {
        self.position[1]
    }

    pub fn width(&self) -> f64 {
        self.bounds[0]
    }

    pub fn height(&self) -> f64 {
        self.bounds[1]
    }

    /// Last column covered by the box (inclusive)
    pub fn x2(&self) -> f64 {
        if self.width() > 0.0 {
            self.x() + self.width() - 1.0
        } else {
            self.x()
        }
    }

    /// Last row covered by the box (inclusive)
    pub fn y2(&self) -> f64 {
        if self.height() > 0.0 {
            self.y() + self.height() - 1.0
        } else {
            self.y()
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) -> Option<BoxChange> {
        if self.position == [x, y] {
            return None;
        }
        self.position = [x, y];
        Some(BoxChange::Position)
    }

    pub fn set_bounds(&mut self, width: f64, height: f64) -> Option<BoxChange> {
        if self.bounds == [width, height] {
            return None;
        }
        self.bounds = [width, height];
        Some(BoxChange::Bounds)
    }

    pub fn set_x(&mut self, x: f64) -> Option<BoxChange> {
        self.set_position(x, self.y())
    }

    pub fn set_y(&mut self, y: f64) -> Option<BoxChange> {
        self.set_position(self.x(), y)
    }

    pub fn set_width(&mut self, width: f64) -> Option<BoxChange> {
        self.set_bounds(width, self.height())
    }

    pub fn set_height(&mut self, height: f64) -> Option<BoxChange> {
        self.set_bounds(self.width(), height)
    }

    /// Move the right edge, keeping `x` fixed
    pub fn set_x2(&mut self, x2: f64) -> Option<BoxChange> {
        if x2 < self.x() {
            return self.set_width(0.0);
        }
        self.set_width(x2 - self.x() + 1.0)
    }

    /// Move the top edge, keeping `y` fixed
    pub fn set_y2(&mut self, y2: f64) -> Option<BoxChange> {
        if y2 < self.y() {
            return self.set_height(0.0);
        }
        self.set_height(y2 - self.y() + 1.0)
    }

    /// Whether the point lies inside the box
    pub fn is_in(&self, x: f64, y: f64) -> bool {
        x >= self.x() && x <= self.x2() && y >= self.y() && y <= self.y2()
    }
}

/// Insets between a container's box and its contents box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Padding {
    pub fn new(left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// The same inset on every side
    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}
