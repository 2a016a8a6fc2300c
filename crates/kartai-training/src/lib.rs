//! Neuroevolution of kart drivers.
//!
//! This crate trains [`Brain`](kartai_brain::network::Brain) networks to
//! drive around a track. Candidate networks race in a headless simulation,
//! are scored by a shaped fitness function and bred with a genetic algorithm
//! until the best driver completes its laps reliably.
//!
//! # How Training Works
//!
//! 1. **Population** - create random networks of a fixed topology
//! 2. **Evaluation** - every network races once on the track ([`simulator`])
//! 3. **Ranking** - individuals are sorted by fitness ([`genetic`])
//! 4. **Reproduction** - elites survive, the rest are bred by roulette
//!    selection, crossover and mutation, or replaced by new blood
//! 5. **Adaptation** - mutation and new-blood rates react to progress
//!    ([`adaptation`])
//! 6. **Persistence** - the best network ever seen and periodic snapshots are
//!    written as model artifacts ([`store`])
//!
//! [`session::TrainingSession`] runs the whole loop from a
//! [`config::TrainingConfig`].
//!
//! # Architecture
//!
//! ```text
//! TrainingSession
//!     ↓ evolves
//! Population of networks
//!     ↓ raced by
//! RaceSimulator (kartai-engine physics, kartai-brain driver)
//!     ↓ scored by
//! FitnessTracker
//!     ↓ best persisted by
//! ModelStore
//! ```

pub mod adaptation;
pub mod config;
pub mod genetic;
pub mod session;
pub mod simulator;
pub mod stats;
pub mod store;
