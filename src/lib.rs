// src/lib.rs - Library interface for WingMorph

pub mod config;
pub mod errors;
pub mod geometry;
pub mod grid;
pub mod image_io;
pub mod labeling;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod snake;
pub mod spline;
pub mod structure;

// Re-export commonly used types and functions
pub use config::{Config, EquatorChoice};
pub use errors::{Result, WingMorphError};
pub use image_io::{load_image, InputImage};
pub use pipeline::{process_image, process_structure};

// Region labeling
pub use labeling::{
    label_regions, BinaryRaster, BoundingBox, EllipseFit, EllipseFitter, LabeledRaster,
    LabelingResult, RegionStats,
};

// Snake model
pub use snake::{DeformableModel, ScaleCurve, SnakeParameters, SplineSnakeModel, TerminalStatus};
pub use structure::{BoundaryCurve, StructureGeometry};

// Projection
pub use grid::{Grid, SphereEquator};
pub use projection::{generate_grid, EquatorMode};
