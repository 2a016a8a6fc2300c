use serde::{Deserialize, Serialize};

/// Result of racing a trained model once.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RaceReport {
    pub track: String,
    pub model_generation: usize,
    pub model_fitness: f64,
    pub end: String,
    pub disqualified: bool,
    pub fitness: f64,
    pub time: f64,
    pub progress: f64,
}
