use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Arc,
};

use crate::{
    model::{ModelArtifact, ModelError, best_model_path},
    network::{Brain, Perceptron},
    sensor::SensorLayout,
};

/// A loaded model ready to drive.
#[derive(Debug)]
pub struct LoadedBrain<B> {
    pub brain: B,
    pub sensors: SensorLayout,
    pub generation: usize,
    pub fitness: f64,
}

/// Best-model networks loaded from a models directory, keyed by track.
///
/// Each track's `<track>_best.json` is read at most once; later lookups
/// share the loaded network.
#[derive(Debug)]
pub struct BrainCache<B = Perceptron> {
    models_dir: PathBuf,
    entries: HashMap<String, Arc<LoadedBrain<B>>>,
}

impl<B> BrainCache<B>
where
    B: Brain,
{
    #[must_use]
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
            entries: HashMap::new(),
        }
    }

    /// Returns the best model for `track`, loading it on first use.
    pub fn get_or_load(&mut self, track: &str) -> Result<Arc<LoadedBrain<B>>, ModelError> {
        if let Some(entry) = self.entries.get(track) {
            return Ok(Arc::clone(entry));
        }
        let path = best_model_path(&self.models_dir, track);
        let artifact = ModelArtifact::load(&path)?;
        let entry = Arc::new(LoadedBrain {
            brain: artifact.to_brain()?,
            sensors: artifact.sensors,
            generation: artifact.generation,
            fitness: artifact.fitness,
        });
        tracing::debug!(track, path = %path.display(), "loaded model");
        self.entries.insert(track.to_owned(), Arc::clone(&entry));
        Ok(entry)
    }

    /// Drops the cached model of `track` so the next lookup reloads it.
    pub fn invalidate(&mut self, track: &str) -> bool {
        self.entries.remove(track).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
