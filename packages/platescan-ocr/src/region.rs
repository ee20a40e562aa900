use serde::{Deserialize, Serialize};

/// Four-number box as reported by a detector: `[x1, y1, x2, y2]`.
///
/// Detectors disagree on units. When all four values lie in `[0, 1]` the box
/// is read as ratios of the image size, otherwise as absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// Integer pixel rectangle, always inside the image it was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_slice(values: &[f32]) -> Option<Self> {
        match values {
            [x1, y1, x2, y2] => Some(Self::new(*x1, *y1, *x2, *y2)),
            _ => None,
        }
    }

    pub fn is_normalized(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }

    /// Resolves the box against an image of `width` x `height`, clamping to
    /// its bounds. Returns `None` for degenerate or fully outside boxes.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<PixelRect> {
        if [self.x1, self.y1, self.x2, self.y2].iter().any(|v| !v.is_finite()) {
            return None;
        }

        let (sx, sy) = if self.is_normalized() {
            (width as f32, height as f32)
        } else {
            (1.0, 1.0)
        };

        let left = (self.x1.min(self.x2) * sx).floor().clamp(0.0, width as f32);
        let right = (self.x1.max(self.x2) * sx).ceil().clamp(0.0, width as f32);
        let top = (self.y1.min(self.y2) * sy).floor().clamp(0.0, height as f32);
        let bottom = (self.y1.max(self.y2) * sy).ceil().clamp(0.0, height as f32);

        let rect = PixelRect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        };
        if rect.width == 0 || rect.height == 0 {
            None
        } else {
            Some(rect)
        }
    }
}

/// One object found by a vehicle detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}
