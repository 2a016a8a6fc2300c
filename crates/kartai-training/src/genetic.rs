//! Genetic algorithm evolving populations of driving networks.
//!
//! # Algorithm Overview
//!
//! Each generation goes through the following cycle:
//!
//! 1. **Evaluate Fitness** - every individual races once, in parallel
//! 2. **Rank** - individuals are sorted by fitness, best first
//! 3. **Elite Selection** - the top `elite_count` individuals are carried over
//!    unchanged, fitness included
//! 4. **New Blood** - with probability `new_blood_rate` a slot is filled by a
//!    freshly initialized network
//! 5. **Roulette Selection** - otherwise two parents are drawn with
//!    probability proportional to their fitness
//! 6. **Crossover and Mutation** - the parents' child is mutated at
//!    `mutation_rate`
//!
//! # Roulette Weights
//!
//! Fitness can be negative, so selection weights are fitness shifted by the
//! population minimum. The worst individual therefore has weight zero. When
//! every weight is zero (all individuals scored the same, for example a fully
//! disqualified generation) parents are drawn uniformly.
//!
//! # Parallelization
//!
//! Evaluation splits the population into one chunk per available core and
//! evaluates each chunk on a scoped thread. A panic while evaluating an
//! individual disqualifies that individual only.

use std::{
    num::NonZero,
    panic::{self, AssertUnwindSafe},
    thread,
};

use kartai_brain::network::{Brain, Topology};
use rand::{
    Rng,
    distr::{Distribution as _, weighted::WeightedIndex},
    seq::IndexedRandom as _,
};

use crate::{simulator::RaceOutcome, stats::FitnessStats};

/// A candidate network and the fitness it last scored.
#[derive(Debug, Clone)]
pub struct Individual<B> {
    network: B,
    fitness: f64,
    disqualified: bool,
}

impl<B> Individual<B>
where
    B: Brain,
{
    /// Wraps a network that has not been evaluated yet.
    #[must_use]
    pub fn new(network: B) -> Self {
        Self {
            network,
            fitness: 0.0,
            disqualified: false,
        }
    }

    #[must_use]
    pub fn random<R>(topology: Topology, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::new(B::random(topology, rng))
    }

    #[must_use]
    pub fn network(&self) -> &B {
        &self.network
    }

    #[must_use]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[must_use]
    pub fn is_disqualified(&self) -> bool {
        self.disqualified
    }

    fn record(&mut self, outcome: &RaceOutcome) {
        self.fitness = if outcome.disqualified {
            0.0
        } else {
            outcome.fitness
        };
        self.disqualified = outcome.disqualified;
    }
}

/// A generation of individuals sharing one topology.
#[derive(Debug, Clone)]
pub struct Population<B> {
    topology: Topology,
    individuals: Vec<Individual<B>>,
}

impl<B> Population<B>
where
    B: Brain,
{
    /// Creates `count` randomly initialized individuals.
    #[must_use]
    pub fn random<R>(topology: Topology, count: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..count)
            .map(|_| Individual::random(topology, rng))
            .collect();
        Self {
            topology,
            individuals,
        }
    }

    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual<B>] {
        &self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Returns `true` if every individual was disqualified in the last evaluation.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.individuals.iter().all(Individual::is_disqualified)
    }

    /// Evaluates every individual in parallel, then sorts the population by
    /// fitness in descending order (best first).
    ///
    /// `evaluate` is called once per individual, possibly from several threads
    /// at the same time. If it panics the individual is disqualified.
    pub fn evaluate_fitness<F>(&mut self, evaluate: F)
    where
        F: Fn(&B) -> RaceOutcome + Sync,
    {
        for ind in &mut self.individuals {
            ind.fitness = 0.0;
            ind.disqualified = false;
        }

        let workers = thread::available_parallelism().map_or(1, NonZero::get);
        let chunk_size = self.individuals.len().div_ceil(workers).max(1);
        let evaluate = &evaluate;
        thread::scope(|s| {
            for chunk in self.individuals.chunks_mut(chunk_size) {
                s.spawn(move || {
                    for ind in chunk {
                        let outcome =
                            panic::catch_unwind(AssertUnwindSafe(|| evaluate(&ind.network)))
                                .unwrap_or_else(|_| {
                                    tracing::warn!("individual evaluation panicked");
                                    RaceOutcome::faulted()
                                });
                        ind.record(&outcome);
                    }
                });
            }
        });

        // sort by fitness descending
        self.individuals
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    /// Descriptive statistics of the population's fitness.
    #[must_use]
    pub fn compute_fitness_stats(&self) -> Option<FitnessStats> {
        FitnessStats::new(self.individuals.iter().map(|ind| ind.fitness))
    }
}

/// Parameters turning one generation into the next.
#[derive(Debug, Clone)]
pub struct PopulationEvolver {
    /// Number of top individuals preserved unchanged.
    pub elite_count: usize,
    /// Per-parameter mutation probability of bred children.
    pub mutation_rate: f64,
    /// Probability that a non-elite slot gets a fresh random network.
    pub new_blood_rate: f64,
}

impl PopulationEvolver {
    /// Creates the next generation, of the same size as `population`.
    ///
    /// `population` must be sorted by fitness, best first.
    #[must_use]
    pub fn evolve<B, R>(&self, population: &Population<B>, rng: &mut R) -> Population<B>
    where
        B: Brain,
        R: Rng + ?Sized,
    {
        let individuals = &population.individuals;
        assert!(
            individuals.is_sorted_by(|a, b| a.fitness >= b.fitness),
            "population must be ranked before evolving"
        );

        let mut next = Vec::with_capacity(individuals.len());
        // elite selection
        next.extend(
            individuals[..self.elite_count.min(individuals.len())]
                .iter()
                .cloned(),
        );

        let roulette = Roulette::new(individuals);
        let new_blood_rate = self.new_blood_rate.clamp(0.0, 1.0);
        while next.len() < individuals.len() {
            let network = if rng.random_bool(new_blood_rate) {
                B::random(population.topology, rng)
            } else {
                let p1 = roulette.select(individuals, rng);
                let p2 = roulette.select(individuals, rng);
                let mut child = p1.network.crossover(&p2.network, rng);
                child.mutate(self.mutation_rate, rng);
                child
            };
            next.push(Individual::new(network));
        }

        Population {
            topology: population.topology,
            individuals: next,
        }
    }
}

/// Fitness-proportional parent selection over min-shifted fitness.
#[derive(Debug)]
struct Roulette {
    weights: Option<WeightedIndex<f64>>,
}

impl Roulette {
    fn new<B>(individuals: &[Individual<B>]) -> Self {
        let min = individuals
            .iter()
            .map(|ind| ind.fitness)
            .fold(f64::INFINITY, f64::min);
        // all-zero weights are rejected, which leaves the uniform fallback
        let weights =
            WeightedIndex::new(individuals.iter().map(|ind| ind.fitness - min)).ok();
        Self { weights }
    }

    fn select<'a, B, R>(&self, individuals: &'a [Individual<B>], rng: &mut R) -> &'a Individual<B>
    where
        R: Rng + ?Sized,
    {
        match &self.weights {
            Some(weights) => &individuals[weights.sample(rng)],
            None => individuals
                .choose(rng)
                .expect("roulette selection needs a non-empty population"),
        }
    }
}
