use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn center(&self) -> Point {
        Point {
            x: f64::from(self.width) / 2.0,
            y: f64::from(self.height) / 2.0,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A rectangle in page coordinates, used for bounded screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Region {
    /// A `width` x `height` region centered on `at`, clamped to the viewport.
    pub fn around(at: Point, width: f64, height: f64, viewport: Viewport) -> Self {
        let max_x = f64::from(viewport.width);
        let max_y = f64::from(viewport.height);
        let width = width.min(max_x);
        let height = height.min(max_y);
        let x = (at.x - width / 2.0).clamp(0.0, max_x - width);
        let y = (at.y - height / 2.0).clamp(0.0, max_y - height);
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
