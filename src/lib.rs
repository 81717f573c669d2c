//! mapsync Library
//!
//! Headless driver for the map-and-search state synchronization core.

pub mod headless;
pub mod link;

pub use headless::runner::{run_headless, HeadlessOptions};
