//! Trained model artifacts.
//!
//! An artifact is a pretty-printed JSON file:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "track": "circuit",
//!   "generation": 42,
//!   "fitness": 31874.2,
//!   "timestamp": "2026-03-01T12:00:00Z",
//!   "sensors": ["forward", "left", "right", ...],
//!   "network": { "input_size": 10, "hidden_size": 10, "output_size": 3, ... }
//! }
//! ```
//!
//! `format_version` and `sensors` form the contract between the trainer and
//! whoever loads the network: the sensor list fixes the meaning and order of
//! every network input.

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write as _},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    network::{Brain, NetworkError, SerializedNetwork},
    sensor::SensorLayout,
};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ModelError {
    #[display("failed to access model file {}", path.display())]
    #[from(ignore)]
    Io { path: PathBuf, source: io::Error },
    #[display("failed to parse model file {}", path.display())]
    #[from(ignore)]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to encode model for {}", path.display())]
    #[from(ignore)]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("unsupported model format version {_0} (expected {})", MODEL_FORMAT_VERSION)]
    #[from(ignore)]
    UnsupportedVersion(#[error(not(source))] u32),
    #[display("model lists {sensors} sensors but its network takes {inputs} inputs")]
    #[from(ignore)]
    SensorMismatch { sensors: usize, inputs: usize },
    #[display("invalid network in model")]
    Network(NetworkError),
}

/// A persisted network together with its training context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub track: String,
    pub generation: usize,
    pub fitness: f64,
    pub timestamp: DateTime<Utc>,
    pub sensors: SensorLayout,
    pub network: SerializedNetwork,
}

impl ModelArtifact {
    /// Captures `brain` as an artifact stamped with the current time.
    pub fn new<B>(
        track: impl Into<String>,
        generation: usize,
        fitness: f64,
        sensors: SensorLayout,
        brain: &B,
    ) -> Self
    where
        B: Brain,
    {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            track: track.into(),
            generation,
            fitness,
            timestamp: Utc::now(),
            sensors,
            network: brain.to_serialized(),
        }
    }

    /// Checks the format version and the sensor/input contract.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion(self.format_version));
        }
        if self.sensors.len() != self.network.input_size {
            return Err(ModelError::SensorMismatch {
                sensors: self.sensors.len(),
                inputs: self.network.input_size,
            });
        }
        Ok(())
    }

    /// Rebuilds the network after validating the artifact.
    pub fn to_brain<B>(&self) -> Result<B, ModelError>
    where
        B: Brain,
    {
        self.validate()?;
        Ok(B::from_serialized(self.network.clone())?)
    }

    /// Reads and validates an artifact.
    pub fn load<P>(path: P) -> Result<Self, ModelError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_owned(),
            source,
        })?;
        let artifact: Self = serde_json::from_reader(io::BufReader::new(file)).map_err(
            |source| ModelError::Parse {
                path: path.to_owned(),
                source,
            },
        )?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Writes the artifact as pretty JSON.
    ///
    /// The file is written next to its destination and renamed into place, so
    /// readers never observe a partially written model.
    pub fn save<P>(&self, path: P) -> Result<(), ModelError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let io_error = |source| ModelError::Io {
            path: path.to_owned(),
            source,
        };
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_error)?;
        }

        let tmp_path = path.with_extension("json.tmp");
        let file = File::create(&tmp_path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| ModelError::Encode {
            path: path.to_owned(),
            source,
        })?;
        writeln!(writer).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        drop(writer);
        fs::rename(&tmp_path, path).map_err(io_error)?;
        Ok(())
    }
}

/// `<dir>/<track>_best.json`
#[must_use]
pub fn best_model_path(dir: &Path, track: &str) -> PathBuf {
    dir.join(format!("{track}_best.json"))
}

/// `<dir>/<track>_generation_<generation>.json`
#[must_use]
pub fn generation_model_path(dir: &Path, track: &str, generation: usize) -> PathBuf {
    dir.join(format!("{track}_generation_{generation}.json"))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use crate::network::{Perceptron, Topology};

    use super::*;

    fn sample() -> (ModelArtifact, Perceptron) {
        let net = Perceptron::random(Topology::default(), &mut Pcg32::seed_from_u64(3));
        let artifact = ModelArtifact::new("circuit", 12, 345.5, SensorLayout::default(), &net);
        (artifact, net)
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let (artifact, net) = sample();
        let path = best_model_path(dir.path(), "circuit");
        artifact.save(&path).unwrap();

        assert!(path.ends_with("circuit_best.json"));
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
        let restored: Perceptron = loaded.to_brain().unwrap();
        assert_eq!(restored.forward(&[0.3; 10]), net.forward(&[0.3; 10]));
    }

    #[test]
    fn test_network_is_nested_object() {
        let (artifact, _) = sample();
        let value = serde_json::to_value(&artifact).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["network"]["input_size"], 10);
        assert_eq!(value["sensors"][0], "forward");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_validate_rejects_mismatch() {
        let (mut artifact, _) = sample();
        artifact.sensors = SensorLayout::new(vec![]);
        assert!(matches!(
            artifact.validate(),
            Err(ModelError::SensorMismatch {
                sensors: 0,
                inputs: 10
            })
        ));

        let (mut artifact, _) = sample();
        artifact.format_version = 2;
        assert!(matches!(
            artifact.to_brain::<Perceptron>(),
            Err(ModelError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ModelArtifact::load(dir.path().join("nope.json")),
            Err(ModelError::Io { .. })
        ));
    }

    #[test]
    fn test_generation_path() {
        assert_eq!(
            generation_model_path(Path::new("models"), "circuit", 10),
            Path::new("models/circuit_generation_10.json")
        );
    }
}
