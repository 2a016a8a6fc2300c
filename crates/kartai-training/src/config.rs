use kartai_brain::{fitness::FitnessError, network::Topology, sensor::SensorLayout};
use serde::{Deserialize, Serialize};

use crate::{
    adaptation::{AdaptationParams, RateBounds},
    simulator::RaceConfig,
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ConfigError {
    #[display("population size must be at least 2, got {_0}")]
    #[from(ignore)]
    PopulationTooSmall(#[error(not(source))] usize),
    #[display("elite count {elite_count} must be smaller than the population size {population_size}")]
    #[from(ignore)]
    TooManyElites {
        elite_count: usize,
        population_size: usize,
    },
    #[display("sensor layout has {sensors} sensors but the network takes {inputs} inputs")]
    #[from(ignore)]
    SensorMismatch { sensors: usize, inputs: usize },
    #[display("network topology {_0} is unusable for driving")]
    #[from(ignore)]
    InvalidTopology(#[error(not(source))] Topology),
    #[display("rate bounds for `{_0}` must satisfy 0 <= min <= initial <= max <= 1")]
    #[from(ignore)]
    InvalidRate(#[error(not(source))] &'static str),
    #[display("invalid parameter `{_0}`")]
    #[from(ignore)]
    InvalidParameter(#[error(not(source))] &'static str),
    #[display("invalid fitness parameters")]
    Fitness(FitnessError),
}

/// Settings of one training run.
///
/// Every field has a default, so a configuration file only needs the values
/// it changes:
///
/// ```
/// # use kartai_training::config::TrainingConfig;
/// let config: TrainingConfig =
///     serde_json::from_str(r#"{ "population_size": 20, "race": { "simulation": { "laps": 1 } } }"#)?;
/// assert_eq!(config.population_size, 20);
/// assert_eq!(config.race.simulation.laps, 1);
/// assert_eq!(config.elite_count, 5);
/// config.validate()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub track: String,
    pub generations: usize,
    pub population_size: usize,
    pub elite_count: usize,
    pub topology: Topology,
    pub sensors: SensorLayout,
    pub mutation: RateBounds,
    pub new_blood: RateBounds,
    pub adaptation: AdaptationParams,
    /// Save a generation snapshot every this many generations.
    pub checkpoint_interval: usize,
    /// Seed of the evolution RNG; random when absent.
    pub seed: Option<u64>,
    pub race: RaceConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            track: "circuit".to_owned(),
            generations: 50,
            population_size: 50,
            elite_count: 5,
            topology: Topology::default(),
            sensors: SensorLayout::default(),
            mutation: RateBounds::new(0.1, 0.02, 0.5),
            new_blood: RateBounds::new(0.05, 0.01, 0.3),
            adaptation: AdaptationParams::default(),
            checkpoint_interval: 10,
            seed: None,
            race: RaceConfig::default(),
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.track.is_empty() {
            return Err(ConfigError::InvalidParameter("track"));
        }
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.elite_count >= self.population_size {
            return Err(ConfigError::TooManyElites {
                elite_count: self.elite_count,
                population_size: self.population_size,
            });
        }
        let Topology {
            input_size,
            hidden_size,
            output_size,
        } = self.topology;
        if input_size == 0 || hidden_size == 0 || output_size < 2 {
            return Err(ConfigError::InvalidTopology(self.topology));
        }
        if self.sensors.len() != input_size {
            return Err(ConfigError::SensorMismatch {
                sensors: self.sensors.len(),
                inputs: input_size,
            });
        }
        if !self.mutation.is_valid() {
            return Err(ConfigError::InvalidRate("mutation"));
        }
        if !self.new_blood.is_valid() {
            return Err(ConfigError::InvalidRate("new_blood"));
        }
        if self.checkpoint_interval == 0 {
            return Err(ConfigError::InvalidParameter("checkpoint_interval"));
        }

        let adaptation = &self.adaptation;
        if !(adaptation.relax_factor.is_finite() && adaptation.relax_factor > 0.0) {
            return Err(ConfigError::InvalidParameter("adaptation.relax_factor"));
        }
        if !(adaptation.boost_factor.is_finite() && adaptation.boost_factor > 0.0) {
            return Err(ConfigError::InvalidParameter("adaptation.boost_factor"));
        }
        if adaptation.stagnation_limit == 0 {
            return Err(ConfigError::InvalidParameter("adaptation.stagnation_limit"));
        }

        let sim = &self.race.simulation;
        let positive = [
            ("race.simulation.dt", sim.dt),
            ("race.simulation.time_budget", sim.time_budget),
            ("race.simulation.disqualify_after", sim.disqualify_after),
            ("race.kart.max_speed", self.race.kart.max_speed),
            ("race.kart.acceleration", self.race.kart.acceleration),
            ("race.kart.radius", self.race.kart.radius),
            ("race.kart.boost_multiplier", self.race.kart.boost_multiplier),
            ("race.sensors.forward_range", self.race.sensors.forward_range),
            ("race.sensors.side_range", self.race.sensors.side_range),
            ("race.sensors.diagonal_range", self.race.sensors.diagonal_range),
            ("race.sensors.checkpoint_scale", self.race.sensors.checkpoint_scale),
        ];
        if let Some((name, _)) = positive
            .into_iter()
            .find(|(_, v)| !(v.is_finite() && *v > 0.0))
        {
            return Err(ConfigError::InvalidParameter(name));
        }
        let unit = [
            ("race.kart.friction", self.race.kart.friction),
            ("race.kart.angular_damping", self.race.kart.angular_damping),
        ];
        if let Some((name, _)) = unit
            .into_iter()
            .find(|(_, v)| !(0.0..=1.0).contains(v))
        {
            return Err(ConfigError::InvalidParameter(name));
        }
        if sim.laps == 0 {
            return Err(ConfigError::InvalidParameter("race.simulation.laps"));
        }

        let kart = &self.race.kart;
        self.race
            .fitness
            .validate(sim.laps, sim.dt, kart.max_speed * kart.boost_multiplier)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kartai_brain::sensor::SensorKind;

    use crate::adaptation::RateAdapter;

    use super::*;

    #[test]
    fn test_default_is_valid() {
        TrainingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_bad_population() {
        let config = TrainingConfig {
            population_size: 1,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationTooSmall(1))
        ));

        let config = TrainingConfig {
            population_size: 4,
            elite_count: 4,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyElites { .. })
        ));
    }

    #[test]
    fn test_rejects_sensor_mismatch() {
        let config = TrainingConfig {
            sensors: SensorLayout::new(vec![SensorKind::Forward, SensorKind::Heading]),
            ..TrainingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SensorMismatch {
                sensors: 2,
                inputs: 10
            })
        ));
    }

    #[test]
    fn test_rejects_bad_rates_and_physics() {
        let config = TrainingConfig {
            mutation: RateBounds::new(0.9, 0.1, 0.5),
            ..TrainingConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate("mutation"))
        ));

        let mut config = TrainingConfig::default();
        config.race.simulation.dt = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter("race.simulation.dt"))
        ));

        let mut config = TrainingConfig::default();
        config.race.fitness.lap_bonus = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Fitness(_))));
    }

    #[test]
    fn test_default_new_blood_recovers_after_long_improvement() {
        let config = TrainingConfig::default();
        let mut adapter =
            RateAdapter::new(config.adaptation.clone(), config.mutation, config.new_blood);
        for i in 0..100 {
            adapter.observe(f64::from(i));
        }
        assert!(config.new_blood.min > 0.0);
        assert_eq!(adapter.new_blood_rate(), config.new_blood.min);

        // four boosts bring the floor back above the starting rate
        for _ in 0..4 * config.adaptation.stagnation_limit {
            adapter.observe(0.0);
        }
        assert!(adapter.new_blood_rate() >= config.new_blood.initial);
    }
}
