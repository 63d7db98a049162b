//! Church Map Viewer - desktop client for the church directory
//!
//! A full-screen walkers map with clustered church markers, a confession
//! filter, and an offline cache of the directory. All interaction rules live
//! in the `church-map-lib` crate; this crate is the egui/eframe shell around
//! them.

mod app;
mod directory;

pub use app::ChurchMapApp;
pub use directory::{FileDirectory, HttpDirectory, UnconfiguredDirectory};
