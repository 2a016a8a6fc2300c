//! Headless race simulation.
//!
//! A race puts one kart on checkpoint 0 facing checkpoint 1, rolling at a
//! small initial speed, and advances it at a fixed time step:
//!
//! 1. the driver reads its sensors and applies the network's action
//! 2. the kart integrates one step and captures checkpoints
//! 3. power-up pads respawn and hand out their power-ups
//! 4. obstacle collisions are resolved
//! 5. the tick is scored
//!
//! The race ends when the kart completes the configured number of laps, when
//! the time budget runs out, or when the kart is disqualified. A kart is
//! disqualified when it stays slower than `stuck_speed` for longer than
//! `disqualify_after`, when it touches an obstacle, or when its state stops
//! being finite. A disqualified kart scores zero.
//!
//! Races are deterministic: the same network on the same track with the same
//! parameters always produces the same outcome.

use kartai_brain::{
    driver::{AiDriver, DriverError},
    fitness::FitnessParams,
    network::Brain,
    sensor::{SensorLayout, SensorParams},
};
use kartai_engine::{Kart, KartParams, PowerupField, Track};
use serde::{Deserialize, Serialize};

/// Timing and termination rules of a race.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Seconds per tick.
    pub dt: f64,
    /// Seconds before the race is stopped.
    pub time_budget: f64,
    pub laps: u32,
    /// Seconds below `stuck_speed` after which the kart is disqualified.
    pub disqualify_after: f64,
    pub initial_speed: f64,
    pub disqualify_on_collision: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            time_budget: 120.0,
            laps: 3,
            disqualify_after: 2.0,
            initial_speed: 0.1,
            disqualify_on_collision: true,
        }
    }
}

/// Everything that parameterizes a race apart from the network and track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub simulation: SimulationParams,
    pub kart: KartParams,
    pub sensors: SensorParams,
    pub fitness: FitnessParams,
}

/// How a race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum RaceEnd {
    /// All laps completed.
    #[display("finished")]
    Finished,
    /// Time budget exhausted.
    #[display("time up")]
    TimeUp,
    #[display("stuck")]
    Stuck,
    #[display("collision")]
    Collision,
    /// Non-finite state or a panic during simulation.
    #[display("fault")]
    Fault,
}

impl RaceEnd {
    #[must_use]
    pub fn is_disqualification(self) -> bool {
        matches!(self, Self::Stuck | Self::Collision | Self::Fault)
    }
}

/// Result of one race.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceOutcome {
    pub fitness: f64,
    pub disqualified: bool,
    pub end: RaceEnd,
    /// Seconds simulated.
    pub time: f64,
    /// Lap progress at the end of the race.
    pub progress: f64,
}

impl RaceOutcome {
    /// Outcome of a race that could not be simulated.
    #[must_use]
    pub fn faulted() -> Self {
        Self {
            fitness: 0.0,
            disqualified: true,
            end: RaceEnd::Fault,
            time: 0.0,
            progress: 0.0,
        }
    }
}

/// Runs races of networks on one track.
///
/// The simulator only borrows the track and configuration, so one instance
/// can be shared by every evaluation thread.
#[derive(Debug, Clone, Copy)]
pub struct RaceSimulator<'a> {
    track: &'a Track,
    layout: &'a SensorLayout,
    config: &'a RaceConfig,
}

impl<'a> RaceSimulator<'a> {
    #[must_use]
    pub fn new(track: &'a Track, layout: &'a SensorLayout, config: &'a RaceConfig) -> Self {
        Self {
            track,
            layout,
            config,
        }
    }

    /// Races `brain` and returns the outcome.
    pub fn run<B>(&self, brain: &B) -> Result<RaceOutcome, DriverError>
    where
        B: Brain,
    {
        self.run_with(brain, |_| {})
    }

    /// Races `brain`, handing the kart to `observe` after every tick.
    pub fn run_with<B, F>(&self, brain: &B, mut observe: F) -> Result<RaceOutcome, DriverError>
    where
        B: Brain,
        F: FnMut(&Kart),
    {
        let RaceConfig {
            simulation: sim,
            kart: kart_params,
            sensors,
            fitness,
        } = self.config;
        let track = self.track;

        let mut driver = AiDriver::new(brain, self.layout, sensors, fitness.clone())?;
        let mut kart = Kart::new(kart_params.clone());
        kart.place_on_start(track, sim.initial_speed);
        let mut pads = PowerupField::new(track);

        let mut time = 0.0;
        let mut end = RaceEnd::TimeUp;
        while time < sim.time_budget {
            // missiles and mines have no target without opponents
            let _used = driver.drive(&mut kart, track);
            kart.update_physics(sim.dt);
            let event = kart.update_progress(track);
            pads.update(sim.dt);
            pads.collect(track, &mut kart);
            let collided = track.check_obstacle_collisions(&mut kart);
            time += sim.dt;
            driver.score(&kart, event, sim.dt);
            observe(&kart);

            if !kart.position().is_finite()
                || !kart.velocity().is_finite()
                || !driver.fitness().total().is_finite()
            {
                end = RaceEnd::Fault;
                break;
            }
            if collided && sim.disqualify_on_collision {
                end = RaceEnd::Collision;
                break;
            }
            if driver.fitness().stuck_time() > sim.disqualify_after {
                end = RaceEnd::Stuck;
                break;
            }
            if kart.current_lap() > sim.laps {
                driver.fitness_mut().add_bonus(fitness.finish_bonus);
                end = RaceEnd::Finished;
                break;
            }
        }

        let disqualified = end.is_disqualification();
        let outcome = RaceOutcome {
            fitness: if disqualified {
                0.0
            } else {
                driver.fitness().total()
            },
            disqualified,
            end,
            time,
            progress: kart.progress(),
        };
        tracing::debug!(
            end = %outcome.end,
            fitness = outcome.fitness,
            time = outcome.time,
            progress = outcome.progress,
            "race finished"
        );
        Ok(outcome)
    }
}
