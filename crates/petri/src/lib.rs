//! # Petri - headless cell arena runner
//!
//! Loads layered configuration, runs the arena without a renderer and reports
//! the final standings.

pub mod config;
pub mod headless;

// Re-export core modules for convenience
pub use petri_core::organism;
pub use petri_core::simulation;
pub use petri_core::world;

pub use config::PetriConfig;
pub use headless::{RunReport, Standing};
