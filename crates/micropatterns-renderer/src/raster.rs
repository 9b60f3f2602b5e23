//! Rasterization of single display-list items.
//!
//! Filled shapes are drawn by inverse sampling: each candidate screen pixel's
//! centre is mapped back to logical space and tested there, so rotation and
//! scale never leave holes. Outlines are drawn as Bresenham lines between
//! rounded screen points, clipped to the surface first.

use micropatterns_lang::types::affine;
use micropatterns_lang::{Color, DisplayListItem, DrawOp};

use crate::bounds::{self, ScreenRect};
use crate::surface::Surface;

/// Outline circles are polygons with this many segments at least.
const MIN_CIRCLE_SEGMENTS: usize = 20;
const MAX_CIRCLE_SEGMENTS: usize = 180;

/// Paint `item`, touching only pixels inside `clip`.
pub fn draw_item<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem, clip: &ScreenRect) {
    match item.op {
        DrawOp::Pixel | DrawOp::FillPixel => draw_pixel(surface, item, clip),
        DrawOp::Line => {
            let a = item.to_screen(item.param("X1") as f64, item.param("Y1") as f64);
            let b = item.to_screen(item.param("X2") as f64, item.param("Y2") as f64);
            line(surface, round(a), round(b), item.color);
        }
        DrawOp::Rect => draw_rect(surface, item),
        DrawOp::FillRect => fill_rect(surface, item, clip),
        DrawOp::Circle => draw_circle(surface, item),
        DrawOp::FillCircle => fill_circle(surface, item, clip),
        DrawOp::Draw => draw_asset(surface, item, clip),
    }
}

/// Color of a filled shape at a logical position. Set pattern bits take the
/// item color, clear bits its inverse, so patterned fills stay opaque.
pub fn fill_color(item: &DisplayListItem, lx: f64, ly: f64) -> Color {
    match &item.fill {
        None => item.color,
        Some(pattern) if pattern.tiled_bit(lx, ly) => item.color,
        Some(_) => item.color.inverse(),
    }
}

fn round((x, y): (f64, f64)) -> (f64, f64) {
    (x.round(), y.round())
}

/// Visit every pixel in `clip` with its centre in logical space.
fn sample<S, F>(surface: &mut S, item: &DisplayListItem, clip: &ScreenRect, mut shade: F) -> usize
where
    S: Surface + ?Sized,
    F: FnMut(f64, f64) -> Option<Color>,
{
    let mut painted = 0;
    for py in clip.min_y..clip.max_y {
        for px in clip.min_x..clip.max_x {
            let (lx, ly) = item.to_logical(px as f64 + 0.5, py as f64 + 0.5);
            if let Some(color) = shade(lx, ly) {
                surface.set_pixel(px, py, color);
                painted += 1;
            }
        }
    }
    painted
}

/// Integral screen offset when the item is a pure integer translation that
/// fits in `i32`.
fn integer_offset(item: &DisplayListItem) -> Option<(i64, i64)> {
    let m = &item.matrix;
    let fits = |v: f64| v.fract() == 0.0 && v.abs() <= i32::MAX as f64;
    (affine::is_translation_only(m) && fits(m[4]) && fits(m[5]) && fits(item.scale))
        .then(|| (m[4] as i64, m[5] as i64))
}

/// Screen span `[start, end)` of `len` logical units at `pos`, or `None` when
/// it does not fit in `i64`.
fn scaled_span(pos: i32, len: i32, scale: i64, offset: i64) -> Option<(i64, i64)> {
    let start = i64::from(pos).checked_mul(scale)?.checked_add(offset)?;
    Some((start, start.checked_add(i64::from(len).checked_mul(scale)?)?))
}

// ─── Box shapes ───────────────────────────────────────────────────────────────

fn draw_pixel<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem, clip: &ScreenRect) {
    let (x, y) = (item.param("X") as f64, item.param("Y") as f64);
    let painted = sample(surface, item, clip, |lx, ly| {
        (lx >= x && lx < x + 1.0 && ly >= y && ly < y + 1.0).then_some(item.color)
    });
    // A cell too small or too skewed to contain a pixel centre still shows.
    if painted == 0 {
        let (sx, sy) = item.to_screen(x + 0.5, y + 0.5);
        surface.set_pixel(sx.floor() as i32, sy.floor() as i32, item.color);
    }
}

fn fill_rect<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem, clip: &ScreenRect) {
    let (x, y) = (item.param("X"), item.param("Y"));
    let (w, h) = (item.param("WIDTH"), item.param("HEIGHT"));
    if w <= 0 || h <= 0 { return; }

    if item.fill.is_none() {
        if let Some((tx, ty)) = integer_offset(item) {
            let s = item.scale as i64;
            if let (Some((x0, x1)), Some((y0, y1))) = (scaled_span(x, w, s, tx), scaled_span(y, h, s, ty)) {
                // Clamped to the clip, so the narrowing casts are lossless.
                let (x0, x1) = (x0.max(i64::from(clip.min_x)), x1.min(i64::from(clip.max_x)));
                let (y0, y1) = (y0.max(i64::from(clip.min_y)), y1.min(i64::from(clip.max_y)));
                if x0 < x1 && y0 < y1 {
                    surface.fill_rect(x0 as i32, y0 as i32, (x1 - x0) as i32, (y1 - y0) as i32, item.color);
                }
                return;
            }
        }
    }

    let (x, y, w, h) = (x as f64, y as f64, w as f64, h as f64);
    sample(surface, item, clip, |lx, ly| {
        (lx >= x && lx < x + w && ly >= y && ly < y + h).then(|| fill_color(item, lx, ly))
    });
}

fn draw_rect<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem) {
    let (x, y) = (item.param("X") as f64, item.param("Y") as f64);
    let (w, h) = (item.param("WIDTH") as f64, item.param("HEIGHT") as f64);
    if w <= 0.0 || h <= 0.0 { return; }
    let c = [
        round(item.to_screen(x, y)),
        round(item.to_screen(x + w, y)),
        round(item.to_screen(x + w, y + h)),
        round(item.to_screen(x, y + h)),
    ];
    for i in 0..4 {
        line(surface, c[i], c[(i + 1) % 4], item.color);
    }
}

fn draw_asset<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem, clip: &ScreenRect) {
    let Some(asset) = item.asset.as_ref() else { return };
    let (x, y) = (item.param("X"), item.param("Y"));

    if item.scale == 1.0 {
        if let Some((tx, ty)) = integer_offset(item) {
            if let (Ok(bx), Ok(by)) = (i32::try_from(i64::from(x) + tx), i32::try_from(i64::from(y) + ty)) {
                surface.blit(bx, by, &asset.data, asset.width, asset.height, item.color);
                return;
            }
        }
    }

    let (x, y) = (x as f64, y as f64);
    let (w, h) = (asset.width as i64, asset.height as i64);
    sample(surface, item, clip, |lx, ly| {
        let bx = (lx - x).floor() as i64;
        let by = (ly - y).floor() as i64;
        (bx >= 0 && by >= 0 && bx < w && by < h && asset.bit(bx as usize, by as usize)).then_some(item.color)
    });
}

// ─── Circles ──────────────────────────────────────────────────────────────────

fn fill_circle<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem, clip: &ScreenRect) {
    let r = item.param("RADIUS") as f64;
    if r <= 0.0 { return; }
    let (cx, cy) = (item.param("X") as f64, item.param("Y") as f64);
    sample(surface, item, clip, |lx, ly| {
        let (dx, dy) = (lx - cx, ly - cy);
        (dx * dx + dy * dy <= r * r).then(|| fill_color(item, lx, ly))
    });
}

fn draw_circle<S: Surface + ?Sized>(surface: &mut S, item: &DisplayListItem) {
    let r = item.param("RADIUS") as f64;
    if r <= 0.0 { return; }
    let (cx, cy) = (item.param("X") as f64, item.param("Y") as f64);
    let (_, stretch) = bounds::stretch_range(&item.matrix);
    let screen_radius = r * item.scale * stretch;
    let segments = ((screen_radius * std::f64::consts::TAU / 4.0).ceil() as usize)
        .clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS);

    let vertex = |i: usize| {
        let t = std::f64::consts::TAU * i as f64 / segments as f64;
        round(item.to_screen(cx + r * t.cos(), cy + r * t.sin()))
    };
    let mut prev = vertex(0);
    for i in 1..=segments {
        let next = vertex(i % segments);
        line(surface, prev, next, item.color);
        prev = next;
    }
}

// ─── Lines ────────────────────────────────────────────────────────────────────

/// Bresenham, both endpoints inclusive. The segment is first cut to a
/// one-pixel margin around the surface, so far-off endpoints cost nothing.
pub fn line<S: Surface + ?Sized>(surface: &mut S, a: (f64, f64), b: (f64, f64), color: Color) {
    let window = (-1.0, -1.0, surface.width() as f64, surface.height() as f64);
    let Some((a, b)) = clip_segment(a, b, window) else { return };
    let (x0, y0) = (a.0.round() as i64, a.1.round() as i64);
    let (x1, y1) = (b.0.round() as i64, b.1.round() as i64);

    let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
    let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
    let (mut x, mut y, mut err) = (x0, y0, dx + dy);
    loop {
        // Inside the window, so within i32.
        surface.set_pixel(x as i32, y as i32, color);
        if x == x1 && y == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Liang–Barsky: the part of segment `a`–`b` inside `(min_x, min_y, max_x,
/// max_y)`, or `None` when it misses.
fn clip_segment(a: (f64, f64), b: (f64, f64), (min_x, min_y, max_x, max_y): (f64, f64, f64, f64))
    -> Option<((f64, f64), (f64, f64))>
{
    if ![a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()) { return None; }
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, a.0 - min_x), (dx, max_x - a.0), (-dy, a.1 - min_y), (dy, max_y - a.1)] {
        if p == 0.0 {
            if q < 0.0 { return None; }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 { return None; }
            t0 = t0.max(r);
        } else {
            if r < t0 { return None; }
            t1 = t1.min(r);
        }
    }
    Some(((a.0 + t0 * dx, a.1 + t0 * dy), (a.0 + t1 * dx, a.1 + t1 * dy)))
}
