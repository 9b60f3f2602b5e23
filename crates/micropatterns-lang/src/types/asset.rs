//! Pattern assets defined with `DEFINE PATTERN`. Immutable after parse and
//! shared by reference between the script, the display list and the renderer.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Maximum number of patterns a single script may define.
pub const MAX_ASSETS: usize = 16;

/// Patterns larger than this in either dimension are accepted with a warning.
pub const RECOMMENDED_MAX_DIM: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Upper-cased lookup key.
    pub name: String,
    /// Name as written in the script.
    pub display_name: String,
    pub width: usize,
    pub height: usize,
    /// Row-major bits, one byte per cell, each 0 or 1.
    pub data: Vec<u8>,
}

impl Asset {
    pub fn new(display_name: impl Into<String>, width: usize, height: usize, data: Vec<u8>) -> Self {
        let display_name = display_name.into();
        Self { name: display_name.to_uppercase(), display_name, width, height, data }
    }

    #[inline]
    pub fn bit(&self, x: usize, y: usize) -> bool {
        self.data.get(y * self.width + x).copied().unwrap_or(0) == 1
    }

    /// Bit at a logical position with the pattern tiled infinitely in both
    /// directions. Negative coordinates wrap the same way positive ones do.
    pub fn tiled_bit(&self, lx: f64, ly: f64) -> bool {
        if self.width == 0 || self.height == 0 { return false; }
        let x = (lx.floor() as i64).rem_euclid(self.width as i64) as usize;
        let y = (ly.floor() as i64).rem_euclid(self.height as i64) as usize;
        self.bit(x, y)
    }

    /// True when every bit is set, so drawing the asset covers its whole box.
    pub fn is_fully_opaque(&self) -> bool {
        !self.data.is_empty() && self.data.iter().all(|&b| b == 1)
    }
}

// ─── Table ────────────────────────────────────────────────────────────────────

/// Case-insensitive name → asset map.
#[derive(Debug, Clone, Default)]
pub struct AssetTable {
    assets: BTreeMap<String, Arc<Asset>>,
}

impl AssetTable {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, name: &str) -> Option<&Arc<Asset>> {
        self.assets.get(&name.to_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(&name.to_uppercase())
    }

    /// Insert an asset under its upper-cased name. Returns false if the name
    /// was already taken; the existing entry is kept.
    pub fn insert(&mut self, asset: Asset) -> bool {
        if self.assets.contains_key(&asset.name) { return false; }
        self.assets.insert(asset.name.clone(), Arc::new(asset));
        true
    }

    pub fn len(&self) -> usize { self.assets.len() }
    pub fn is_empty(&self) -> bool { self.assets.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Asset>> {
        self.assets.values()
    }

    pub fn clear(&mut self) { self.assets.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiling_wraps_negative_coordinates() {
        let a = Asset::new("checker", 2, 2, vec![1, 0, 0, 1]);
        assert!(a.tiled_bit(0.5, 0.5));
        assert!(!a.tiled_bit(1.5, 0.5));
        assert!(!a.tiled_bit(-0.5, 0.5));
        assert!(a.tiled_bit(-0.5, -0.5));
        assert!(a.tiled_bit(3.2, 3.9));
    }

    #[test]
    fn table_lookup_ignores_case() {
        let mut t = AssetTable::new();
        assert!(t.insert(Asset::new("Dots", 1, 1, vec![1])));
        assert!(t.get("DOTS").is_some());
        assert!(t.get("dots").is_some());
        assert!(!t.insert(Asset::new("dOtS", 1, 1, vec![0])));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn opacity_requires_every_bit() {
        assert!(Asset::new("a", 2, 1, vec![1, 1]).is_fully_opaque());
        assert!(!Asset::new("b", 2, 1, vec![1, 0]).is_fully_opaque());
    }
}
