use log::debug;
use micropatterns_lang::{Color, DisplayListItem, Interrupt};

use crate::bounds::{self, ScreenRect};
use crate::occlusion::{DEFAULT_BLOCK_SIZE, OcclusionBuffer};
use crate::raster;
use crate::surface::Surface;

/// Per-render settings. Defaults match the e-paper firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub block_size: i32,
    pub background: Color,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { block_size: DEFAULT_BLOCK_SIZE, background: Color::White }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub total: usize,
    pub rendered: usize,
    pub culled_off_screen: usize,
    pub culled_by_occlusion: usize,
    pub interrupted: bool,
}

/// Paints display lists, skipping items that are off the surface or hidden
/// behind later opaque items.
///
/// Culling walks the list last-to-first, so the occlusion grid only ever
/// holds cells covered by items that paint *after* the one being tested.
/// Survivors are then painted first-to-last, which gives exactly the pixels
/// of naive painting in script order.
pub struct DisplayListRenderer {
    occlusion: OcclusionBuffer,
    options: RenderOptions,
    interrupt: Option<Interrupt>,
    stats: RenderStats,
}

impl DisplayListRenderer {
    pub fn new(width: i32, height: i32, options: RenderOptions) -> Self {
        Self {
            occlusion: OcclusionBuffer::new(width, height, options.block_size),
            options,
            interrupt: None,
            stats: RenderStats::default(),
        }
    }

    /// Poll `interrupt` between items in both passes.
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn set_interrupt(&mut self, interrupt: Option<Interrupt>) { self.interrupt = interrupt; }

    pub fn stats(&self) -> RenderStats { self.stats }
    pub fn occlusion(&self) -> &OcclusionBuffer { &self.occlusion }
    pub fn options(&self) -> RenderOptions { self.options }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(Interrupt::is_requested)
    }

    /// Clear the surface and paint `items`. Returns false when interrupted;
    /// an interrupted cull pass paints nothing, an interrupted paint pass
    /// leaves what was painted so far.
    pub fn render<S: Surface + ?Sized>(&mut self, items: &[DisplayListItem], surface: &mut S) -> bool {
        let (width, height) = (surface.width(), surface.height());
        if self.occlusion.dimensions() != (width, height) {
            self.occlusion = OcclusionBuffer::new(width, height, self.options.block_size);
        }
        self.occlusion.reset();
        self.stats = RenderStats { total: items.len(), ..RenderStats::default() };
        surface.clear(self.options.background);

        let Some(visible) = self.cull(items, width, height) else {
            self.stats.interrupted = true;
            debug!("render interrupted while culling ({} items)", items.len());
            return false;
        };

        for &(index, clip) in visible.iter().rev() {
            if self.interrupted() {
                self.stats.interrupted = true;
                break;
            }
            raster::draw_item(surface, &items[index], &clip);
            self.stats.rendered += 1;
        }

        let s = &self.stats;
        debug!(
            "render: {} items, {} drawn, {} off-screen, {} occluded{}",
            s.total,
            s.rendered,
            s.culled_off_screen,
            s.culled_by_occlusion,
            if s.interrupted { ", interrupted" } else { "" },
        );
        !s.interrupted
    }

    /// Reverse pass. Survivors come back last-to-first with their clipped
    /// visual bounds.
    fn cull(&mut self, items: &[DisplayListItem], width: i32, height: i32) -> Option<Vec<(usize, ScreenRect)>> {
        let mut visible = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate().rev() {
            if self.interrupted() { return None; }

            let Some(b) = bounds::item_bounds(item, width, height) else {
                self.stats.culled_off_screen += 1;
                continue;
            };
            let v = b.visual;
            if item.is_opaque && self.occlusion.is_area_occluded(v.min_x, v.min_y, v.max_x, v.max_y) {
                self.stats.culled_by_occlusion += 1;
                continue;
            }
            visible.push((index, v));

            if let Some(m) = b.marking {
                if let Some((x0, y0, x1, y1)) = self.occlusion.snap_inward(m.min_x, m.min_y, m.max_x, m.max_y) {
                    self.occlusion.mark_area_opaque(x0, y0, x1, y1);
                }
            }
        }
        Some(visible)
    }
}
