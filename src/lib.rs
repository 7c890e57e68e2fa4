//! CPU renderer that composites a photo plate and a 3D scene, then color
//! grades the result through a 3D LUT stored as a tiled 2D atlas.

pub mod background;
pub mod config;
pub mod driver;
pub mod error;
pub mod grading;
pub mod lut;
pub mod pass;
pub mod pipeline;
pub mod plate;
pub mod sampler;
pub mod scene;
pub mod types;
pub mod window;

pub use error::Error;
