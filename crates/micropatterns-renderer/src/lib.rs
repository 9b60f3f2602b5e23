pub mod bounds;
pub mod controller;
pub mod occlusion;
pub mod raster;
pub mod renderer;
pub mod surface;

pub use bounds::{ItemBounds, ScreenRect};
pub use controller::{RenderResult, render_script};
pub use occlusion::{DEFAULT_BLOCK_SIZE, OcclusionBuffer};
pub use renderer::{DisplayListRenderer, RenderOptions, RenderStats};
pub use surface::{MonoCanvas, Surface};
