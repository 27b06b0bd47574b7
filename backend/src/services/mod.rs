//! Pure business computations shared by the domain services

pub mod scoring;

pub use scoring::{aggregate_score, SubScores};
