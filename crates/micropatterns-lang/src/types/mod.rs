pub mod affine;
pub mod asset;
pub mod draw;
