pub mod calib;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod io;
pub mod output;
pub mod pipeline;
pub mod system;
pub mod transport;
