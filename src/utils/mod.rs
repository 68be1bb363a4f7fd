//! Utility modules for colour handling

pub mod channels;
pub mod color;

pub use channels::{to_rgb, to_rgba};
pub use color::ColorParser;
