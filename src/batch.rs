//! Batch runs over a directory of image stacks

/// Find TIFF stacks in the input directory
pub mod read;

/// Group background and glomeruli stacks by sample id
pub mod pair;

/// Run settings and their defaults
pub mod config;

/// Render, submit and clean up one job per input
pub mod run;
