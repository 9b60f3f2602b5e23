//! Coarse occlusion grid. One byte per `block_size × block_size` cell; a set
//! cell means everything inside it is already covered by opaque output.
//!
//! All rectangles are `[min, max)` in screen pixels.

pub const DEFAULT_BLOCK_SIZE: i32 = 16;

#[derive(Debug, Clone)]
pub struct OcclusionBuffer {
    width: i32,
    height: i32,
    block_size: i32,
    grid_width: i32,
    grid_height: i32,
    cells: Vec<u8>,
}

impl OcclusionBuffer {
    pub fn new(width: i32, height: i32, block_size: i32) -> Self {
        let block_size = block_size.max(1);
        let (width, height) = (width.max(0), height.max(0));
        let cells_along = |len: i32| ((i64::from(len) + i64::from(block_size) - 1) / i64::from(block_size)) as i32;
        let (grid_width, grid_height) = (cells_along(width), cells_along(height));
        Self {
            width,
            height,
            block_size,
            grid_width,
            grid_height,
            cells: vec![0; (grid_width * grid_height) as usize],
        }
    }

    pub fn block_size(&self) -> i32 { self.block_size }
    pub fn dimensions(&self) -> (i32, i32) { (self.width, self.height) }
    pub fn grid_size(&self) -> (i32, i32) { (self.grid_width, self.grid_height) }

    pub fn reset(&mut self) { self.cells.fill(0); }

    pub fn is_marked(&self, col: i32, row: i32) -> bool {
        col >= 0 && row >= 0 && col < self.grid_width && row < self.grid_height
            && self.cells[(row * self.grid_width + col) as usize] != 0
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Cell range `(start_col, start_row, end_col, end_row)`, inclusive,
    /// of every cell the rectangle intersects. `None` for empty rectangles.
    fn cell_range(&self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Option<(i32, i32, i32, i32)> {
        let (min_x, min_y) = (min_x.max(0), min_y.max(0));
        let (max_x, max_y) = (max_x.min(self.width), max_y.min(self.height));
        if min_x >= max_x || min_y >= max_y { return None; }
        let bs = self.block_size;
        Some((
            min_x / bs,
            min_y / bs,
            ((max_x - 1) / bs).min(self.grid_width - 1),
            ((max_y - 1) / bs).min(self.grid_height - 1),
        ))
    }

    /// Mark every cell the rectangle intersects.
    pub fn mark_area_opaque(&mut self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) {
        let Some((c0, r0, c1, r1)) = self.cell_range(min_x, min_y, max_x, max_y) else { return };
        for r in r0..=r1 {
            let row = (r * self.grid_width) as usize;
            self.cells[row + c0 as usize..=row + c1 as usize].fill(1);
        }
    }

    /// True only when every intersected cell is marked. Empty or inverted
    /// rectangles are never occluded.
    pub fn is_area_occluded(&self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> bool {
        let Some((c0, r0, c1, r1)) = self.cell_range(min_x, min_y, max_x, max_y) else { return false };
        (r0..=r1).all(|r| {
            let row = (r * self.grid_width) as usize;
            self.cells[row + c0 as usize..=row + c1 as usize].iter().all(|&c| c != 0)
        })
    }

    /// Shrink a rectangle to the cells it covers completely. An edge touching
    /// or past the surface border keeps the border, so partial edge cells
    /// still count as covered.
    pub fn snap_inward(&self, min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Option<(i32, i32, i32, i32)> {
        let bs = i64::from(self.block_size);
        let up = |v: i32, limit: i32| {
            if v <= 0 { 0 } else { ((i64::from(v) + bs - 1) / bs * bs).min(i64::from(limit)) as i32 }
        };
        let down = |v: i32, limit: i32| if v >= limit { limit } else { (i64::from(v.max(0)) / bs * bs) as i32 };

        let (x0, y0) = (up(min_x, self.width), up(min_y, self.height));
        let (x1, y1) = (down(max_x, self.width), down(max_y, self.height));
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}
