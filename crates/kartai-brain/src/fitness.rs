//! Shaped fitness accumulated while a network drives.
//!
//! Every tick contributes:
//!
//! - `progress_weight × progress`
//! - `checkpoint_bonus` on the tick a checkpoint is captured
//! - `-stall_penalty × (t − stall_grace)` once `t`, the time since the last
//!   capture, exceeds `stall_grace`
//! - `-time_cost × dt`
//! - `speed_weight × speed`, and `-reverse_penalty × speed` while reversing
//! - `-stuck_penalty` once, after the kart has been slower than `stuck_speed`
//!   for more than `stuck_grace` seconds
//! - `lap_bonus` on the tick a lap is completed
//!
//! The event terms are ordered by magnitude so that a lap outweighs any
//! number of avoided stuck penalties, which outweigh checkpoints, which
//! outweigh any single tick of shaping. [`FitnessParams::validate`] checks
//! the ordering.

use kartai_engine::{Kart, ProgressEvent};
use serde::{Deserialize, Serialize};

/// Minimum ratio between consecutive fitness magnitudes.
pub const MAGNITUDE_RATIO: f64 = 2.0;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum FitnessError {
    #[display("fitness parameter `{_0}` must be finite and non-negative")]
    InvalidParameter(#[error(not(source))] &'static str),
    #[display(
        "fitness term `{larger}` ({larger_value}) must be at least twice `{smaller}` ({smaller_value})"
    )]
    MagnitudeOrder {
        larger: &'static str,
        larger_value: f64,
        smaller: &'static str,
        smaller_value: f64,
    },
}

/// Coefficients of the fitness terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessParams {
    pub progress_weight: f64,
    pub checkpoint_bonus: f64,
    /// Seconds without a capture before the stall penalty kicks in.
    pub stall_grace: f64,
    pub stall_penalty: f64,
    /// Cost per second of race time.
    pub time_cost: f64,
    pub speed_weight: f64,
    pub reverse_penalty: f64,
    pub stuck_speed: f64,
    pub stuck_grace: f64,
    pub stuck_penalty: f64,
    pub lap_bonus: f64,
    /// Added by the simulator when the kart finishes all laps.
    pub finish_bonus: f64,
}

impl Default for FitnessParams {
    fn default() -> Self {
        Self {
            progress_weight: 1.0,
            checkpoint_bonus: 100.0,
            stall_grace: 5.0,
            stall_penalty: 0.5,
            time_cost: 50.0,
            speed_weight: 0.1,
            reverse_penalty: 0.5,
            stuck_speed: 0.5,
            stuck_grace: 1.0,
            stuck_penalty: 1000.0,
            lap_bonus: 5000.0,
            finish_bonus: 10_000.0,
        }
    }
}

impl FitnessParams {
    /// Checks every coefficient and the magnitude ordering of the terms.
    ///
    /// The per-tick bound is the largest single-tick contribution of the
    /// progress, time, speed and reverse terms, given the race's `laps`, time
    /// step `dt` and the kart's top speed including boost.
    pub fn validate(&self, laps: u32, dt: f64, max_speed: f64) -> Result<(), FitnessError> {
        let fields = [
            ("progress_weight", self.progress_weight),
            ("checkpoint_bonus", self.checkpoint_bonus),
            ("stall_grace", self.stall_grace),
            ("stall_penalty", self.stall_penalty),
            ("time_cost", self.time_cost),
            ("speed_weight", self.speed_weight),
            ("reverse_penalty", self.reverse_penalty),
            ("stuck_speed", self.stuck_speed),
            ("stuck_grace", self.stuck_grace),
            ("stuck_penalty", self.stuck_penalty),
            ("lap_bonus", self.lap_bonus),
            ("finish_bonus", self.finish_bonus),
        ];
        if let Some((name, _)) = fields.into_iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(FitnessError::InvalidParameter(name));
        }

        let per_tick = [
            self.progress_weight * f64::from(laps),
            self.time_cost * dt,
            self.speed_weight * max_speed,
            self.reverse_penalty * max_speed,
        ]
        .into_iter()
        .fold(0.0, f64::max);

        let ladder = [
            ("lap_bonus", self.lap_bonus),
            ("stuck_penalty", self.stuck_penalty),
            ("checkpoint_bonus", self.checkpoint_bonus),
            ("per_tick_bound", per_tick),
        ];
        for (&(larger, larger_value), &(smaller, smaller_value)) in ladder.iter().zip(&ladder[1..]) {
            if larger_value < MAGNITUDE_RATIO * smaller_value {
                return Err(FitnessError::MagnitudeOrder {
                    larger,
                    larger_value,
                    smaller,
                    smaller_value,
                });
            }
        }
        Ok(())
    }
}

/// Running fitness of one race.
#[derive(Debug, Clone)]
pub struct FitnessTracker {
    params: FitnessParams,
    total: f64,
    since_checkpoint: f64,
    stuck_time: f64,
    stuck_penalized: bool,
}

impl FitnessTracker {
    #[must_use]
    pub fn new(params: FitnessParams) -> Self {
        Self {
            params,
            total: 0.0,
            since_checkpoint: 0.0,
            stuck_time: 0.0,
            stuck_penalized: false,
        }
    }

    #[must_use]
    pub fn params(&self) -> &FitnessParams {
        &self.params
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Seconds the kart has continuously been slower than `stuck_speed`.
    #[must_use]
    pub fn stuck_time(&self) -> f64 {
        self.stuck_time
    }

    /// Adds a one-off amount, such as the finish bonus.
    pub fn add_bonus(&mut self, amount: f64) {
        self.total += amount;
    }

    /// Scores one tick after physics and progress were updated. Returns the
    /// tick's contribution.
    pub fn record_tick(&mut self, kart: &Kart, event: ProgressEvent, dt: f64) -> f64 {
        let p = &self.params;
        let speed = kart.speed();
        let mut delta = p.progress_weight * kart.progress();

        if event.checkpoint_captured {
            delta += p.checkpoint_bonus;
            self.since_checkpoint = 0.0;
        } else {
            self.since_checkpoint += dt;
            if self.since_checkpoint > p.stall_grace {
                delta -= p.stall_penalty * (self.since_checkpoint - p.stall_grace);
            }
        }

        delta -= p.time_cost * dt;
        delta += p.speed_weight * speed;
        if kart.is_reversing() {
            delta -= p.reverse_penalty * speed;
        }

        if speed < p.stuck_speed {
            self.stuck_time += dt;
            if self.stuck_time > p.stuck_grace && !self.stuck_penalized {
                delta -= p.stuck_penalty;
                self.stuck_penalized = true;
            }
        } else {
            self.stuck_time = 0.0;
            self.stuck_penalized = false;
        }

        if event.lap_completed {
            delta += p.lap_bonus;
        }

        self.total += delta;
        delta
    }
}
