//! Domain layer for Architecture Guardian
//!
//! CDD Principle: Domain Model - Pure data model for graded architecture violations
//! - Independent of file systems, configuration formats and terminals
//! - Expresses the ubiquitous language of layers, violations and severities

pub mod violations;

// Re-export main domain types for convenience
pub use violations::*;
