use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::affine::{self, Affine};
use crate::types::asset::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Black,
    White,
}

impl Color {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "BLACK" => Some(Color::Black),
            "WHITE" => Some(Color::White),
            _ => None,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Color::Black => "BLACK", Color::White => "WHITE" })
    }
}

/// Drawing commands that produce display-list items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    Pixel,
    FillPixel,
    Line,
    Rect,
    FillRect,
    Circle,
    FillCircle,
    Draw,
}

impl DrawOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "PIXEL" => DrawOp::Pixel,
            "FILL_PIXEL" => DrawOp::FillPixel,
            "LINE" => DrawOp::Line,
            "RECT" => DrawOp::Rect,
            "FILL_RECT" => DrawOp::FillRect,
            "CIRCLE" => DrawOp::Circle,
            "FILL_CIRCLE" => DrawOp::FillCircle,
            "DRAW" => DrawOp::Draw,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            DrawOp::Pixel => "PIXEL",
            DrawOp::FillPixel => "FILL_PIXEL",
            DrawOp::Line => "LINE",
            DrawOp::Rect => "RECT",
            DrawOp::FillRect => "FILL_RECT",
            DrawOp::Circle => "CIRCLE",
            DrawOp::FillCircle => "FILL_CIRCLE",
            DrawOp::Draw => "DRAW",
        }
    }

    /// Integer parameters resolved for this command. Missing ones default to 0.
    pub fn int_params(self) -> &'static [&'static str] {
        match self {
            DrawOp::Pixel | DrawOp::FillPixel | DrawOp::Draw => &["X", "Y"],
            DrawOp::Line => &["X1", "Y1", "X2", "Y2"],
            DrawOp::Rect | DrawOp::FillRect => &["X", "Y", "WIDTH", "HEIGHT"],
            DrawOp::Circle | DrawOp::FillCircle => &["X", "Y", "RADIUS"],
        }
    }

    /// Whether items of this kind fully cover their screen bounds. `DRAW`
    /// depends on its asset and is decided when the item is built.
    pub fn is_opaque_shape(self) -> bool {
        matches!(self, DrawOp::Pixel | DrawOp::FillPixel | DrawOp::FillRect | DrawOp::FillCircle)
    }
}

// ─── Display list ─────────────────────────────────────────────────────────────

/// One drawing operation with every parameter resolved and the drawing state
/// captured at the moment it was emitted.
#[derive(Debug, Clone)]
pub struct DisplayListItem {
    pub op: DrawOp,
    pub line: usize,
    pub int_params: BTreeMap<String, i32>,
    /// Only `NAME` for `DRAW`, upper-cased.
    pub string_params: BTreeMap<String, String>,
    pub matrix: Affine,
    pub inverse: Affine,
    pub scale: f64,
    pub color: Color,
    /// `None` = solid fill.
    pub fill: Option<Arc<Asset>>,
    /// The bitmap a `DRAW` places.
    pub asset: Option<Arc<Asset>>,
    pub is_opaque: bool,
}

impl DisplayListItem {
    pub fn new(op: DrawOp, line: usize) -> Self {
        Self {
            op,
            line,
            int_params: BTreeMap::new(),
            string_params: BTreeMap::new(),
            matrix: affine::identity(),
            inverse: affine::identity(),
            scale: 1.0,
            color: Color::Black,
            fill: None,
            asset: None,
            is_opaque: op.is_opaque_shape(),
        }
    }

    /// Resolved integer parameter, 0 when absent.
    pub fn param(&self, key: &str) -> i32 {
        self.int_params.get(key).copied().unwrap_or(0)
    }

    pub fn with_param(mut self, key: &str, value: i32) -> Self {
        self.int_params.insert(key.to_string(), value);
        self
    }

    pub fn to_screen(&self, lx: f64, ly: f64) -> (f64, f64) {
        affine::to_screen(&self.matrix, self.scale, lx, ly)
    }

    pub fn to_logical(&self, sx: f64, sy: f64) -> (f64, f64) {
        affine::to_logical(&self.inverse, self.scale, sx, sy)
    }
}
