//! Headless kart-racing world: track fixtures, collision geometry and kart kinematics.
//!
//! This crate holds the parts of the racing game that the AI trainer needs to
//! reproduce without any rendering:
//!
//! - [`Track`] - checkpoints, static obstacles and power-up pads loaded from a fixture file
//! - [`Obstacle`] - oriented box supporting ray casts and kart collision queries
//! - [`Kart`] - kinematic integrator driven by throttle/steering forces
//! - [`PowerupField`] - per-race pickup state of the track's power-up pads
//!
//! The track is immutable once loaded and can be shared across threads; every
//! piece of per-race mutable state lives in [`Kart`] or [`PowerupField`].
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use kartai_engine::{Checkpoint, Kart, KartParams, Track};
//!
//! let track = Track::new(
//!     vec![
//!         Checkpoint::new(DVec3::ZERO, 5.0),
//!         Checkpoint::new(DVec3::new(0.0, 0.0, -30.0), 5.0),
//!     ],
//!     vec![],
//!     vec![],
//! )
//! .unwrap();
//!
//! let mut kart = Kart::new(KartParams::default());
//! kart.place_on_start(&track, 0.1);
//! kart.apply_force(kart.acceleration_force(), 0.0);
//! kart.update_physics(1.0 / 60.0);
//! kart.update_progress(&track);
//! assert_eq!(kart.next_checkpoint(), 1);
//! ```

use std::path::PathBuf;

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Errors raised while loading or validating a track fixture.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum TrackError {
    #[display("failed to read track file {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[display("failed to parse track file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("track needs at least 2 checkpoints, got {_0}")]
    TooFewCheckpoints(#[error(not(source))] usize),
    #[display("checkpoint #{_0} has a non-finite position or non-positive radius")]
    InvalidCheckpoint(#[error(not(source))] usize),
    #[display("obstacle #{_0} has a non-finite position or non-positive size")]
    InvalidObstacle(#[error(not(source))] usize),
    #[display("power-up pad #{_0} has a non-finite position")]
    InvalidPowerupPad(#[error(not(source))] usize),
}
