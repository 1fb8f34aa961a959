// Shared utilities: path conversion and glob matching.

pub mod paths;
pub mod patterns;

pub use patterns::PatternSet;
