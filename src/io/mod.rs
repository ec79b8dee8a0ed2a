//! Frame sources for the binary.

pub mod image_dir;

pub use image_dir::ImageDirSource;
