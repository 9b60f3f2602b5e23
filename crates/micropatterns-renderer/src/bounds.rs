//! Screen-space extents of display-list items.
//!
//! Two boxes per item:
//! * visual: every pixel the rasterizer may touch (conservative outward),
//! * marking: pixels the item is guaranteed to cover completely (conservative
//!   inward). Only opaque items have one.

use micropatterns_lang::types::affine::{self, Affine};
use micropatterns_lang::{DisplayListItem, DrawOp};

/// Integer pixel rectangle, `[min, max)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ScreenRect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn is_empty(&self) -> bool { self.min_x >= self.max_x || self.min_y >= self.max_y }
    pub fn width(&self) -> i32 { self.max_x.saturating_sub(self.min_x).max(0) }
    pub fn height(&self) -> i32 { self.max_y.saturating_sub(self.min_y).max(0) }

    /// Intersection with `[0, width) × [0, height)`, `None` when empty.
    pub fn clip(&self, width: i32, height: i32) -> Option<Self> {
        let r = Self::new(self.min_x.max(0), self.min_y.max(0), self.max_x.min(width), self.max_y.min(height));
        (!r.is_empty()).then_some(r)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Extent {
    fn of_points(points: &[(f64, f64)]) -> Self {
        points.iter().fold(
            Extent { min_x: f64::INFINITY, min_y: f64::INFINITY, max_x: f64::NEG_INFINITY, max_y: f64::NEG_INFINITY },
            |e, &(x, y)| Extent { min_x: e.min_x.min(x), min_y: e.min_y.min(y), max_x: e.max_x.max(x), max_y: e.max_y.max(y) },
        )
    }

    fn around(cx: f64, cy: f64, half: f64) -> Self {
        Extent { min_x: cx - half, min_y: cy - half, max_x: cx + half, max_y: cy + half }
    }

    /// Pixels whose centre may fall inside. `slack` widens the far edges
    /// for outlines, whose pixels sit on the extent itself.
    fn outward(&self, slack: i32) -> ScreenRect {
        ScreenRect::new(
            self.min_x.floor() as i32,
            self.min_y.floor() as i32,
            (self.max_x.ceil() as i32).saturating_add(slack),
            (self.max_y.ceil() as i32).saturating_add(slack),
        )
    }

    /// Pixels lying entirely inside.
    fn inward(&self) -> ScreenRect {
        ScreenRect::new(
            self.min_x.ceil() as i32,
            self.min_y.ceil() as i32,
            self.max_x.floor() as i32,
            self.max_y.floor() as i32,
        )
    }

    fn is_finite(&self) -> bool {
        self.min_x.is_finite() && self.max_x.is_finite() && self.min_y.is_finite() && self.max_y.is_finite()
    }
}

/// Smallest and largest singular values of the linear part.
pub fn stretch_range(m: &Affine) -> (f64, f64) {
    let p = m[0] * m[0] + m[1] * m[1] + m[2] * m[2] + m[3] * m[3];
    let q = affine::det(m).abs();
    let d = (p * p - 4.0 * q * q).max(0.0).sqrt();
    (((p - d) / 2.0).max(0.0).sqrt(), ((p + d) / 2.0).sqrt())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemBounds {
    /// Clipped to the surface, never empty.
    pub visual: ScreenRect,
    /// Unclipped, may be empty.
    pub marking: Option<ScreenRect>,
}

/// `None` when the item is degenerate or entirely off the surface.
pub fn item_bounds(item: &DisplayListItem, width: i32, height: i32) -> Option<ItemBounds> {
    let (extent, slack) = visual_extent(item)?;
    if !extent.is_finite() { return None; }
    let visual = extent.outward(slack).clip(width, height)?;
    let marking = if item.is_opaque { marking_extent(item).map(|e| e.inward()) } else { None };
    Some(ItemBounds { visual, marking })
}

/// Logical box `(x, y, w, h)` of the box-shaped ops.
fn logical_box(item: &DisplayListItem) -> Option<(f64, f64, f64, f64)> {
    let (x, y) = (item.param("X") as f64, item.param("Y") as f64);
    let (w, h) = match item.op {
        DrawOp::Pixel | DrawOp::FillPixel => (1.0, 1.0),
        DrawOp::Rect | DrawOp::FillRect => (item.param("WIDTH") as f64, item.param("HEIGHT") as f64),
        DrawOp::Draw => {
            let asset = item.asset.as_ref()?;
            (asset.width as f64, asset.height as f64)
        }
        _ => return None,
    };
    (w > 0.0 && h > 0.0).then_some((x, y, w, h))
}

fn corners(item: &DisplayListItem, (x, y, w, h): (f64, f64, f64, f64)) -> [(f64, f64); 4] {
    [
        item.to_screen(x, y),
        item.to_screen(x + w, y),
        item.to_screen(x + w, y + h),
        item.to_screen(x, y + h),
    ]
}

fn visual_extent(item: &DisplayListItem) -> Option<(Extent, i32)> {
    match item.op {
        DrawOp::Line => {
            let a = item.to_screen(item.param("X1") as f64, item.param("Y1") as f64);
            let b = item.to_screen(item.param("X2") as f64, item.param("Y2") as f64);
            Some((Extent::of_points(&[a, b]), 1))
        }
        DrawOp::Circle | DrawOp::FillCircle => {
            let r = item.param("RADIUS") as f64;
            if r <= 0.0 { return None; }
            let (cx, cy) = item.to_screen(item.param("X") as f64, item.param("Y") as f64);
            let (_, max) = stretch_range(&item.matrix);
            let reach = (r * item.scale * max).max(1.0);
            let slack = if item.op == DrawOp::Circle { 1 } else { 0 };
            Some((Extent::around(cx, cy, reach), slack))
        }
        // Outlines are lines between rounded corners.
        DrawOp::Rect => Some((Extent::of_points(&corners(item, logical_box(item)?)), 1)),
        DrawOp::Pixel | DrawOp::FillPixel | DrawOp::FillRect | DrawOp::Draw => {
            Some((Extent::of_points(&corners(item, logical_box(item)?)), 0))
        }
    }
}

fn marking_extent(item: &DisplayListItem) -> Option<Extent> {
    let (min_stretch, _) = stretch_range(&item.matrix);
    match item.op {
        DrawOp::FillCircle => {
            let r = item.param("RADIUS") as f64;
            if r <= 0.0 { return None; }
            let (cx, cy) = item.to_screen(item.param("X") as f64, item.param("Y") as f64);
            Some(Extent::around(cx, cy, r * item.scale * min_stretch / std::f64::consts::SQRT_2))
        }
        DrawOp::Pixel | DrawOp::FillPixel | DrawOp::FillRect | DrawOp::Draw => {
            let b = logical_box(item)?;
            if affine::is_axis_aligned(&item.matrix) {
                return Some(Extent::of_points(&corners(item, b)));
            }
            // Rotated: square inscribed in the rectangle's incircle.
            let (x, y, w, h) = b;
            let (cx, cy) = item.to_screen(x + w / 2.0, y + h / 2.0);
            let radius = w.min(h) * item.scale * min_stretch / 2.0;
            Some(Extent::around(cx, cy, radius / std::f64::consts::SQRT_2))
        }
        DrawOp::Line | DrawOp::Rect | DrawOp::Circle => None,
    }
}
