//! The generation loop.
//!
//! A [`TrainingSession`] owns the population, the rate adapter and the
//! evolution RNG of one training run. Each generation it:
//!
//! 1. races every individual in parallel, offering every non-disqualified
//!    result to the [`ModelStore`] as a best-ever candidate
//! 2. ranks the population and summarizes it in a [`GenerationReport`]
//! 3. feeds the generation's best fitness to the [`RateAdapter`]
//! 4. writes a generation snapshot every `checkpoint_interval` generations
//! 5. breeds the next generation with the adapted rates
//!
//! The final generation is always snapshotted and never bred.

use kartai_brain::network::Brain;
use kartai_engine::Track;
use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use crate::{
    adaptation::{Adaptation, RateAdapter},
    config::{ConfigError, TrainingConfig},
    genetic::{Population, PopulationEvolver},
    simulator::{RaceOutcome, RaceSimulator},
    stats::FitnessStats,
    store::{BestRecord, ModelStore},
};

/// Summary of one evaluated generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// 1-based generation number.
    pub generation: usize,
    pub best: f64,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    /// Standard deviation of the generation's fitness.
    pub std_dev: f64,
    /// Number of disqualified individuals.
    pub disqualified: usize,
    /// Rates the next generation is bred with.
    pub mutation_rate: f64,
    pub new_blood_rate: f64,
    /// Every individual was disqualified.
    pub degenerate: bool,
    pub adaptation: Adaptation,
}

/// Outcome of a complete training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    pub generations: usize,
    /// Best fitness of the final generation.
    pub final_best: f64,
    /// Best network persisted during the run, if any.
    pub best_ever: Option<BestRecord>,
}

#[derive(Debug)]
pub struct TrainingSession<'a, B> {
    config: &'a TrainingConfig,
    track: &'a Track,
    store: &'a ModelStore,
    population: Population<B>,
    adapter: RateAdapter,
    rng: Pcg32,
    generation: usize,
}

impl<'a, B> TrainingSession<'a, B>
where
    B: Brain,
{
    /// Validates the configuration and creates a random initial population.
    pub fn new(
        config: &'a TrainingConfig,
        track: &'a Track,
        store: &'a ModelStore,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_rng(&mut rand::rng()),
        };
        let population = Population::random(config.topology, config.population_size, &mut rng);
        let adapter = RateAdapter::new(config.adaptation.clone(), config.mutation, config.new_blood);
        Ok(Self {
            config,
            track,
            store,
            population,
            adapter,
            rng,
            generation: 0,
        })
    }

    #[must_use]
    pub fn population(&self) -> &Population<B> {
        &self.population
    }

    /// Number of generations evaluated so far.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Evaluates the current population and adapts the rates.
    ///
    /// Afterwards the population is ranked, best first.
    pub fn evaluate(&mut self) -> GenerationReport {
        self.generation += 1;
        let generation = self.generation;
        let simulator = RaceSimulator::new(self.track, &self.config.sensors, &self.config.race);
        let store = self.store;

        self.population.evaluate_fitness(|network| {
            let outcome = simulator.run(network).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "race could not start");
                RaceOutcome::faulted()
            });
            if !outcome.disqualified {
                store.offer_best(generation, outcome.fitness, network);
            }
            outcome
        });

        let individuals = self.population.individuals();
        let stats = self.population.compute_fitness_stats();
        let FitnessStats {
            min,
            max: best,
            mean,
            median,
            std_dev,
        } = stats.unwrap_or(FitnessStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
        });
        let disqualified = individuals.iter().filter(|ind| ind.is_disqualified()).count();
        let degenerate = self.population.is_degenerate();
        if degenerate {
            tracing::warn!(generation, "every individual was disqualified");
        }

        let adaptation = self.adapter.observe(best);
        let report = GenerationReport {
            generation,
            best,
            mean,
            median,
            min,
            std_dev,
            disqualified,
            mutation_rate: self.adapter.mutation_rate(),
            new_blood_rate: self.adapter.new_blood_rate(),
            degenerate,
            adaptation,
        };
        tracing::info!(
            generation,
            best = report.best,
            mean = report.mean,
            median = report.median,
            min = report.min,
            std_dev = report.std_dev,
            disqualified,
            mutation_rate = report.mutation_rate,
            new_blood_rate = report.new_blood_rate,
            %adaptation,
            "generation evaluated"
        );

        if generation % self.config.checkpoint_interval == 0 {
            self.save_snapshot();
        }
        report
    }

    /// Breeds the next generation from the ranked population.
    pub fn breed(&mut self) {
        let evolver = PopulationEvolver {
            elite_count: self.config.elite_count,
            mutation_rate: self.adapter.mutation_rate(),
            new_blood_rate: self.adapter.new_blood_rate(),
        };
        self.population = evolver.evolve(&self.population, &mut self.rng);
    }

    /// Runs every configured generation, calling `on_generation` after each.
    pub fn run<F>(&mut self, mut on_generation: F) -> TrainingSummary
    where
        F: FnMut(&GenerationReport),
    {
        let generations = self.config.generations;
        let mut final_best = 0.0;
        for i in 0..generations {
            let report = self.evaluate();
            on_generation(&report);
            final_best = report.best;
            if i + 1 < generations {
                self.breed();
            }
        }
        if self.generation > 0 && self.generation % self.config.checkpoint_interval != 0 {
            self.save_snapshot();
        }
        TrainingSummary {
            generations: self.generation,
            final_best,
            best_ever: self.store.best(),
        }
    }

    fn save_snapshot(&self) {
        let Some(best) = self.population.individuals().first() else {
            return;
        };
        if let Err(err) = self
            .store
            .save_generation(self.generation, best.fitness(), best.network())
        {
            tracing::warn!(error = %err, generation = self.generation, "failed to save generation snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use kartai_brain::network::Perceptron;
    use kartai_engine::Checkpoint;

    use super::*;

    fn track() -> Track {
        Track::new(
            vec![
                Checkpoint::new(DVec3::ZERO, 2.0),
                Checkpoint::new(DVec3::new(0.0, 0.0, -10.0), 2.0),
            ],
            vec![],
            vec![],
        )
        .unwrap()
    }

    fn config() -> TrainingConfig {
        let mut config = TrainingConfig {
            generations: 3,
            population_size: 6,
            elite_count: 1,
            checkpoint_interval: 2,
            seed: Some(5),
            ..TrainingConfig::default()
        };
        config.race.simulation.time_budget = 5.0;
        config
    }

    #[test]
    fn test_rejects_invalid_config() {
        let track = track();
        let dir = tempfile::tempdir().unwrap();
        let config = TrainingConfig {
            population_size: 0,
            ..TrainingConfig::default()
        };
        let store = ModelStore::new(dir.path(), "t", config.sensors.clone());
        assert!(TrainingSession::<Perceptron>::new(&config, &track, &store).is_err());
    }

    #[test]
    fn test_run_reports_every_generation_and_snapshots() {
        let track = track();
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = ModelStore::new(dir.path(), "straight", config.sensors.clone());
        let mut session = TrainingSession::<Perceptron>::new(&config, &track, &store).unwrap();

        let mut reports = vec![];
        let summary = session.run(|report| reports.push(report.clone()));

        assert_eq!(summary.generations, 3);
        assert_eq!(
            reports.iter().map(|r| r.generation).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        for report in &reports {
            assert!(report.min <= report.mean && report.mean <= report.best);
            assert!(report.min <= report.median && report.median <= report.best);
            assert!(report.std_dev >= 0.0);
            assert_eq!(report.degenerate, report.disqualified == 6);
        }
        for pair in reports.windows(2) {
            assert!(pair[1].best >= pair[0].best, "elitism keeps the best");
        }
        assert!(store.generation_path(2).exists());
        assert!(store.generation_path(3).exists());
        assert!(!store.generation_path(1).exists());
        assert_eq!(summary.best_ever.is_some(), store.best_path().exists());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let track = track();
        let config = config();
        let run = || {
            let dir = tempfile::tempdir().unwrap();
            let store = ModelStore::new(dir.path(), "straight", config.sensors.clone());
            let mut session = TrainingSession::<Perceptron>::new(&config, &track, &store).unwrap();
            let mut bests = vec![];
            session.run(|report| bests.push(report.best));
            bests
        };
        assert_eq!(run(), run());
    }
}
