use std::{
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use kartai_brain::{
    model::{ModelArtifact, ModelError, best_model_path, generation_model_path},
    network::Brain,
    sensor::SensorLayout,
};

/// Fitness and generation of the best network persisted so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestRecord {
    pub generation: usize,
    pub fitness: f64,
}

/// Writes model artifacts of one training run.
///
/// The best-ever record lives behind a mutex: comparing a candidate against
/// it, writing `<track>_best.json` and updating the record happen under one
/// lock, so concurrent evaluations never persist a worse network over a
/// better one.
#[derive(Debug)]
pub struct ModelStore {
    models_dir: PathBuf,
    track: String,
    sensors: SensorLayout,
    best: Mutex<Option<BestRecord>>,
}

impl ModelStore {
    #[must_use]
    pub fn new(models_dir: impl Into<PathBuf>, track: impl Into<String>, sensors: SensorLayout) -> Self {
        Self {
            models_dir: models_dir.into(),
            track: track.into(),
            sensors,
            best: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn best_path(&self) -> PathBuf {
        best_model_path(&self.models_dir, &self.track)
    }

    #[must_use]
    pub fn generation_path(&self, generation: usize) -> PathBuf {
        generation_model_path(&self.models_dir, &self.track, generation)
    }

    #[must_use]
    pub fn best(&self) -> Option<BestRecord> {
        *self.best.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persists `brain` as the best model if it beats the current record.
    ///
    /// Returns `true` if the record was updated. A failed write is logged and
    /// leaves the record unchanged.
    pub fn offer_best<B>(&self, generation: usize, fitness: f64, brain: &B) -> bool
    where
        B: Brain,
    {
        let mut best = self.best.lock().unwrap_or_else(PoisonError::into_inner);
        if best.is_some_and(|record| fitness <= record.fitness) {
            return false;
        }

        let path = self.best_path();
        let artifact = ModelArtifact::new(&*self.track, generation, fitness, self.sensors.clone(), brain);
        if let Err(err) = artifact.save(&path) {
            tracing::warn!(error = %err, path = %path.display(), "failed to save best model");
            return false;
        }
        *best = Some(BestRecord {
            generation,
            fitness,
        });
        tracing::info!(generation, fitness, path = %path.display(), "new best model");
        true
    }

    /// Writes a generation snapshot.
    pub fn save_generation<B>(
        &self,
        generation: usize,
        fitness: f64,
        brain: &B,
    ) -> Result<PathBuf, ModelError>
    where
        B: Brain,
    {
        let path = self.generation_path(generation);
        ModelArtifact::new(&*self.track, generation, fitness, self.sensors.clone(), brain)
            .save(&path)?;
        tracing::info!(generation, fitness, path = %path.display(), "saved generation snapshot");
        Ok(path)
    }
}
